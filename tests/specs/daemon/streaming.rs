//! End-to-end: tailed file to subscriber frames.

use crate::prelude::*;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

#[test]
fn tailed_lines_stream_to_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("app.log");
    std::fs::write(&log_path, "").unwrap();
    write_custom_agent(dir.path(), &log_path);

    let daemon = DaemonUnderTest::spawn(dir.path());

    // Subscribe to the logs channel over plain TCP.
    let stream = TcpStream::connect(daemon.hub_addr()).unwrap();
    stream.set_read_timeout(Some(FRAME_TIMEOUT)).unwrap();
    let mut write_half = stream.try_clone().unwrap();
    write_half
        .write_all(b"{\"type\":\"subscribe\",\"channels\":[\"logs\"]}\n")
        .unwrap();
    let mut reader = BufReader::new(stream);

    // Give the subscription a moment to register, then emit lines.
    std::thread::sleep(std::time::Duration::from_millis(300));
    let mut log = std::fs::OpenOptions::new()
        .append(true)
        .open(&log_path)
        .unwrap();
    writeln!(log, "[12:00:00] INFO hello").unwrap();
    writeln!(log, "[12:00:01] ERROR bad").unwrap();
    log.sync_all().unwrap();

    let mut frames = Vec::new();
    let mut line = String::new();
    while frames.len() < 2 {
        line.clear();
        let n = reader.read_line(&mut line).expect("frame within timeout");
        assert!(n > 0, "connection closed early");
        let frame: serde_json::Value = serde_json::from_str(&line).unwrap();
        if frame["type"] == "log-entry" {
            frames.push(frame);
        }
    }

    assert_eq!(frames[0]["data"]["message"], "[12:00:00] INFO hello");
    assert_eq!(frames[0]["data"]["level"], "info");
    assert_eq!(frames[1]["data"]["message"], "[12:00:01] ERROR bad");
    assert_eq!(frames[1]["data"]["level"], "error");
    for frame in &frames {
        let source = frame["data"]["source"].as_str().unwrap();
        assert!(source.ends_with("app.log"), "{source}");
    }
}

#[test]
fn entries_are_spooled_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("app.log");
    std::fs::write(&log_path, "one line before startup\n").unwrap();
    write_custom_agent(dir.path(), &log_path);

    let _daemon = DaemonUnderTest::spawn(dir.path());

    // The sink batches for 250ms before writing.
    let spool = dir.path().join("spool/spool.jsonl");
    assert!(
        wait_until(std::time::Duration::from_secs(10), || {
            std::fs::read_to_string(&spool)
                .map(|s| s.contains("one line before startup"))
                .unwrap_or(false)
        }),
        "spooled entry not found"
    );
}
