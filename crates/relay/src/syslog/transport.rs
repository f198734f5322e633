// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syslog transports.
//!
//! UDP is stateless: one short-lived socket per message. TCP and TLS keep
//! a long-lived connection that is dropped on error and transparently
//! re-established on the next send, under exponential backoff
//! (100 ms → 5 s cap).

use super::config::Protocol;
use super::format::octet_frame;
use super::RelayError;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(5);

const UDP_TEST_TIMEOUT: Duration = Duration::from_secs(2);
const TCP_TEST_TIMEOUT: Duration = Duration::from_secs(5);
const TLS_TEST_TIMEOUT: Duration = Duration::from_secs(5);

enum Conn {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// Per-forwarder transport state, owned by its sender task.
pub(crate) struct Transport {
    host: String,
    port: u16,
    protocol: Protocol,
    conn: Option<Conn>,
    backoff: Duration,
    retry_at: Option<Instant>,
}

impl Transport {
    pub(crate) fn new(host: String, port: u16, protocol: Protocol) -> Self {
        Self {
            host,
            port,
            protocol,
            conn: None,
            backoff: BACKOFF_BASE,
            retry_at: None,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Send one rendered message. Stream transports apply octet framing.
    pub(crate) async fn send(&mut self, message: &str) -> Result<(), RelayError> {
        match self.protocol {
            Protocol::Udp => send_udp(&self.addr(), message).await,
            Protocol::Tcp | Protocol::TcpTls => self.send_stream(message).await,
        }
    }

    async fn send_stream(&mut self, message: &str) -> Result<(), RelayError> {
        if self.conn.is_none() {
            if let Some(retry_at) = self.retry_at {
                let now = Instant::now();
                if now < retry_at {
                    tokio::time::sleep(retry_at - now).await;
                }
            }
            match self.connect().await {
                Ok(conn) => {
                    self.conn = Some(conn);
                    self.backoff = BACKOFF_BASE;
                    self.retry_at = None;
                    debug!(addr = %self.addr(), protocol = %self.protocol, "syslog connection established");
                }
                Err(e) => {
                    self.note_failure();
                    return Err(e);
                }
            }
        }

        let framed = octet_frame(message);
        let result = match self.conn.as_mut() {
            Some(Conn::Tcp(stream)) => write_line(stream, &framed).await,
            Some(Conn::Tls(stream)) => write_line(stream.as_mut(), &framed).await,
            None => return Err(RelayError::NotConnected),
        };

        if let Err(e) = result {
            // Drop the connection; the next send reconnects under backoff.
            self.conn = None;
            self.note_failure();
            return Err(RelayError::Io(e));
        }
        Ok(())
    }

    fn note_failure(&mut self) {
        self.retry_at = Some(Instant::now() + self.backoff);
        self.backoff = (self.backoff * 2).min(BACKOFF_CAP);
    }

    async fn connect(&self) -> Result<Conn, RelayError> {
        let stream = TcpStream::connect(self.addr()).await?;
        match self.protocol {
            Protocol::Tcp => Ok(Conn::Tcp(stream)),
            Protocol::TcpTls => {
                let tls = tls_connect(&self.host, stream).await?;
                Ok(Conn::Tls(Box::new(tls)))
            }
            Protocol::Udp => Err(RelayError::InvalidConfig(
                "udp has no persistent connection".into(),
            )),
        }
    }
}

async fn write_line<W: AsyncWriteExt + Unpin>(writer: &mut W, framed: &str) -> std::io::Result<()> {
    writer.write_all(framed.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

async fn send_udp(addr: &str, message: &str) -> Result<(), RelayError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.send_to(message.as_bytes(), addr).await?;
    Ok(())
}

fn tls_config() -> &'static Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let mut roots = RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            warn!(error = %error, "skipping unreadable native root certificate");
        }
        for cert in native.certs {
            if let Err(e) = roots.add(cert) {
                warn!(error = %e, "skipping invalid native root certificate");
            }
        }
        Arc::new(
            ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        )
    })
}

async fn tls_connect(host: &str, stream: TcpStream) -> Result<TlsStream<TcpStream>, RelayError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| RelayError::InvalidConfig(format!("bad TLS server name '{host}': {e}")))?;
    let connector = TlsConnector::from(Arc::clone(tls_config()));
    Ok(connector.connect(server_name, stream).await?)
}

/// Latency-reported reachability probe.
pub async fn test_connection(
    host: &str,
    port: u16,
    protocol: Protocol,
) -> Result<Duration, RelayError> {
    let addr = format!("{host}:{port}");
    let started = Instant::now();
    match protocol {
        Protocol::Udp => {
            tokio::time::timeout(UDP_TEST_TIMEOUT, send_udp(&addr, ""))
                .await
                .map_err(|_| RelayError::Timeout)??;
        }
        Protocol::Tcp => {
            tokio::time::timeout(TCP_TEST_TIMEOUT, TcpStream::connect(&addr))
                .await
                .map_err(|_| RelayError::Timeout)??;
        }
        Protocol::TcpTls => {
            tokio::time::timeout(TLS_TEST_TIMEOUT, async {
                let stream = TcpStream::connect(&addr).await?;
                tls_connect(host, stream).await
            })
            .await
            .map_err(|_| RelayError::Timeout)??;
        }
    }
    Ok(started.elapsed())
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
