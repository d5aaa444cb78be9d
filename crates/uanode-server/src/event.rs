// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event notifications.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uanode_core::ids::object_types;
use uanode_core::{LocalizedText, NodeId, Variant};
use uuid::Uuid;

/// An event raised by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique id of this occurrence.
    pub event_id: Vec<u8>,
    /// Event type.
    pub event_type: NodeId,
    /// Node that raised the event.
    pub source_node: NodeId,
    /// Browse name of the source.
    pub source_name: String,
    /// When the event occurred.
    pub time: DateTime<Utc>,
    /// When the server received the event.
    pub receive_time: DateTime<Utc>,
    /// Human readable message.
    pub message: LocalizedText,
    /// Severity 1..=1000.
    pub severity: u16,
    /// Session the event belongs to. Session-scoped events only reach items of
    /// the same session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<NodeId>,
    /// Additional fields by browse path.
    #[serde(default)]
    pub fields: BTreeMap<String, Variant>,
}

impl Event {
    /// Creates an event of `event_type` raised by `source_node`.
    pub fn new(event_type: NodeId, source_node: NodeId, message: impl Into<LocalizedText>) -> Self {
        let now = Utc::now();
        Self {
            event_id: Uuid::new_v4().as_bytes().to_vec(),
            event_type,
            source_node,
            source_name: String::new(),
            time: now,
            receive_time: now,
            message: message.into(),
            severity: 500,
            session_id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Marker queued before replayed conditions.
    pub fn refresh_start(source_node: NodeId) -> Self {
        Self::new(object_types::REFRESH_START_EVENT_TYPE, source_node, "RefreshStart")
            .with_severity(100)
    }

    /// Marker queued after replayed conditions.
    pub fn refresh_end(source_node: NodeId) -> Self {
        Self::new(object_types::REFRESH_END_EVENT_TYPE, source_node, "RefreshEnd")
            .with_severity(100)
    }

    /// Sets the source name.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Sets the severity, clamped to 1..=1000.
    pub fn with_severity(mut self, severity: u16) -> Self {
        self.severity = severity.clamp(1, 1000);
        self
    }

    /// Scopes the event to a session.
    pub fn with_session(mut self, session_id: NodeId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Adds a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a standard or additional field by name.
    pub fn field(&self, name: &str) -> Option<Variant> {
        match name {
            "EventId" => Some(Variant::ByteString(self.event_id.clone())),
            "EventType" => Some(Variant::from(self.event_type.clone())),
            "SourceNode" => Some(Variant::from(self.source_node.clone())),
            "SourceName" => Some(Variant::String(self.source_name.clone())),
            "Time" => Some(Variant::DateTime(self.time)),
            "ReceiveTime" => Some(Variant::DateTime(self.receive_time)),
            "Message" => Some(Variant::from(self.message.clone())),
            "Severity" => Some(Variant::UInt16(self.severity)),
            other => self.fields.get(other).cloned(),
        }
    }
}
