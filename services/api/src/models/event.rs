//! Event model: one entry of a stash's activity feed

use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Success,
    #[default]
    Info,
    Warning,
    Danger,
}

/// Event entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(flatten)]
    pub meta: Meta,
    pub stash_id: String,
    /// Member the event is attributed to
    pub member_id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub title: String,
    pub message: String,
}

impl_entity!(Event, "events", "Event");

impl Event {
    pub fn new(
        stash_id: &str,
        member_id: &str,
        kind: EventType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            meta: Meta::new(),
            stash_id: stash_id.to_string(),
            member_id: member_id.to_string(),
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Event create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub id: String,
    pub stash_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<EventType>,
    pub title: Option<String>,
    pub message: Option<String>,
}

impl EventPayload {
    pub fn apply(&self, event: &Event) -> Event {
        let mut updated = event.clone();
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(title) = &self.title {
            updated.title = title.clone();
        }
        if let Some(message) = &self.message {
            updated.message = message.clone();
        }
        updated
    }
}
