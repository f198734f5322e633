// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{AgentId, ServiceId};
use std::path::PathBuf;

#[test]
fn events_serialize_with_scoped_type_tags() {
    let event = ControlEvent::PathRemoved {
        path: PathBuf::from("/tmp/a.log"),
        reason: "path-invalid".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "path:removed");
    assert_eq!(json["reason"], "path-invalid");
}

#[test]
fn events_round_trip() {
    let events = vec![
        ControlEvent::AgentDisabled {
            agent_id: AgentId::new("cursor"),
            reason: "no valid paths".to_string(),
        },
        ControlEvent::StorageDropped { batch_size: 512 },
        ControlEvent::ServiceRestarting {
            service: ServiceId::new("clickhouse"),
            restart_count: 2,
        },
    ];
    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        let back: ControlEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

#[test]
fn path_invalid_carries_error_count() {
    let event = ControlEvent::PathInvalid {
        agent_id: AgentId::new("vscode"),
        path: PathBuf::from("/gone.log"),
        error_count: 5,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "path:invalid");
    assert_eq!(json["error_count"], 5);
}
