//! Episode wire formats.
//!
//! A saved episode comes in two formats. In the **standard** format each
//! event is a `[kind, timestamp, agent_id, payload]` tuple. In the
//! **compact** format events are squashed into pipe-delimited lines, which
//! makes them slower to convert but easy to read and hand-edit; compact rows
//! may also express their timestamp as an offset relative to the previous
//! event (see [`crate::timestamp`]), which suits small hand-crafted
//! conversation logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventKind, SavedEvent, ValidationError};
use crate::timestamp::{parse_duration, parse_timestamp};

const SEPARATOR: char = '|';

/// Errors raised while decoding saved episodes and events.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized event kind tag '{0}'")]
    UnknownKind(String),
    #[error("malformed compact row '{0}': expected 4 pipe-separated fields")]
    MalformedRow(String),
    #[error("timestamp '{0}' is neither ISO-8601 nor a relative offset")]
    Timestamp(String),
    #[error("no action is registered under type tag '{0}'")]
    UnknownAction(String),
    #[error("{kind} event carries an invalid payload: {detail}")]
    Payload { kind: EventKind, detail: String },
    #[error("malformed episode envelope: {0}")]
    Envelope(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("action payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire envelope for a saved episode, tagged by format.
///
/// `invited_agents` holds a single id today; the list is the extension
/// point for multi-invitee conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum SavedEpisode {
    #[serde(rename = "standard")]
    Standard {
        id: String,
        timestamp: String,
        starter_agent: String,
        invited_agents: Vec<String>,
        events: Vec<SavedEvent>,
    },
    #[serde(rename = "compact")]
    Compact {
        id: String,
        timestamp: String,
        starter_agent: String,
        invited_agents: Vec<String>,
        events: Vec<String>,
    },
}

impl SavedEpisode {
    pub fn is_compact(&self) -> bool {
        matches!(self, SavedEpisode::Compact { .. })
    }

    /// Squashes a standard envelope into compact rows. Compact input is
    /// returned unchanged.
    pub fn into_compact(self) -> SavedEpisode {
        match self {
            SavedEpisode::Compact { .. } => self,
            SavedEpisode::Standard {
                id,
                timestamp,
                starter_agent,
                invited_agents,
                events,
            } => SavedEpisode::Compact {
                id,
                timestamp,
                starter_agent,
                invited_agents,
                events: events.iter().map(compact_event).collect(),
            },
        }
    }

    /// Re-expands compact rows into the standard envelope, restoring
    /// per-event timestamps and absent fields. Standard input is returned
    /// unchanged.
    pub fn into_standard(self) -> Result<SavedEpisode, DecodeError> {
        match self {
            SavedEpisode::Standard { .. } => Ok(self),
            SavedEpisode::Compact {
                id,
                timestamp,
                starter_agent,
                invited_agents,
                events,
            } => {
                // The episode's own creation timestamp seeds relative
                // offsets until the first absolute row.
                let mut last = parse_timestamp(&timestamp)
                    .map_err(|_| DecodeError::Timestamp(timestamp.clone()))?;
                let mut expanded = Vec::with_capacity(events.len());
                for row in &events {
                    let (event, event_timestamp) = uncompact_row(row, last)?;
                    expanded.push(event);
                    last = event_timestamp;
                }
                Ok(SavedEpisode::Standard {
                    id,
                    timestamp,
                    starter_agent,
                    invited_agents,
                    events: expanded,
                })
            }
        }
    }
}

/// Writes one saved event as a pipe-delimited row.
///
/// Structured payloads (action envelopes) are JSON-encoded into the payload
/// cell; absent payloads render as an empty cell.
fn compact_event(saved: &SavedEvent) -> String {
    let agent = saved.2.as_deref().unwrap_or_default();
    let payload = match &saved.3 {
        None => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(structured) => structured.to_string(),
    };
    format!(
        "{kind}{sep}{ts}{sep}{agent}{sep}{payload}",
        kind = saved.0,
        ts = saved.1,
        agent = agent,
        payload = payload,
        sep = SEPARATOR,
    )
}

/// Parses one pipe-delimited row back into a saved event.
///
/// The payload cell is terminal, so pipes inside utterance text or action
/// JSON belong to it.
fn uncompact_row(
    row: &str,
    last: DateTime<Utc>,
) -> Result<(SavedEvent, DateTime<Utc>), DecodeError> {
    let mut cells = row.splitn(4, SEPARATOR);
    let (Some(kind_cell), Some(ts_cell), Some(agent_cell), Some(payload_cell)) =
        (cells.next(), cells.next(), cells.next(), cells.next())
    else {
        return Err(DecodeError::MalformedRow(row.to_string()));
    };

    let kind: EventKind = kind_cell.parse()?;
    let timestamp = uncompact_timestamp(ts_cell, last)?;
    let agent = (!agent_cell.is_empty()).then(|| agent_cell.to_string());
    let payload = match kind {
        EventKind::Utterance => {
            (!payload_cell.is_empty()).then(|| Value::String(payload_cell.to_string()))
        }
        EventKind::Action => {
            if payload_cell.is_empty() {
                return Err(DecodeError::Payload {
                    kind,
                    detail: "action events require a payload".to_string(),
                });
            }
            Some(serde_json::from_str(payload_cell)?)
        }
        EventKind::Leave => None,
    };

    let saved = SavedEvent(
        kind.to_string(),
        timestamp.to_rfc3339(),
        agent,
        payload,
    );
    Ok((saved, timestamp))
}

/// Absolute parsing is tried first; anything that is not a valid timestamp
/// falls back to a relative offset from the previous event.
fn uncompact_timestamp(cell: &str, last: DateTime<Utc>) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(timestamp) = parse_timestamp(cell) {
        return Ok(timestamp);
    }
    match parse_duration(cell) {
        Ok(offset) => Ok(last + offset),
        Err(_) => Err(DecodeError::Timestamp(cell.to_string())),
    }
}
