//! Conversation event types.
//!
//! An [`Event`] is anything that can happen in a conversation: an utterance,
//! an action, or a participant leaving. Events are immutable once
//! constructed, with one exception: the acted marker, set when the event is
//! delivered into an episode.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use duet_events::{AgentId, Event, EventKind};
//!
//! let alice = AgentId::new("alice").unwrap();
//! let event = Event::utterance(Utc::now(), alice, "hello there");
//! assert_eq!(event.kind(), EventKind::Utterance);
//! assert!(event.acted_at().is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::action::{Action, SavedAction};
use crate::codec::DecodeError;
use crate::timestamp::parse_timestamp;

/// The three kinds of conversation event.
///
/// Wire tags are stable, lowercase, case-sensitive strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Utterance,
    Action,
    Leave,
}

impl EventKind {
    /// Returns all event kind variants.
    pub fn all() -> &'static [EventKind] {
        &[EventKind::Utterance, EventKind::Action, EventKind::Leave]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Utterance => write!(f, "utterance"),
            EventKind::Action => write!(f, "action"),
            EventKind::Leave => write!(f, "leave"),
        }
    }
}

impl FromStr for EventKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utterance" => Ok(EventKind::Utterance),
            "action" => Ok(EventKind::Action),
            "leave" => Ok(EventKind::Leave),
            _ => Err(DecodeError::UnknownKind(s.to_string())),
        }
    }
}

/// Error raised when an event or identity is constructed with malformed
/// fields.
///
/// The type system already rules out the other malformed constructions the
/// wire formats could carry (non-time timestamp values, live participant
/// handles in the identity field); what remains is that an identity must be
/// an actual string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("agent id must be a non-empty identity string")]
    EmptyAgentId,
}

/// Opaque identity of a conversation participant.
///
/// Events and episodes store identities as plain strings, never live agent
/// handles, so they stay serializable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an identity from a non-empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyAgentId);
        }
        Ok(Self(id))
    }

    /// Generates a fresh random identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Payload of an event, tagged by kind.
///
/// The three kinds are closed and stable; consumers match exhaustively.
#[derive(Debug, Clone)]
pub enum EventBody {
    /// A natural-language utterance.
    Utterance(String),
    /// An action with a serializable side effect.
    Action(Box<dyn Action>),
    /// The issuing participant left the conversation.
    Leave,
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::Utterance(_) => EventKind::Utterance,
            EventBody::Action(_) => EventKind::Action,
            EventBody::Leave => EventKind::Leave,
        }
    }
}

impl PartialEq for EventBody {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EventBody::Utterance(a), EventBody::Utterance(b)) => a == b,
            (EventBody::Action(a), EventBody::Action(b)) => {
                a.type_tag() == b.type_tag() && a.save() == b.save()
            }
            (EventBody::Leave, EventBody::Leave) => true,
            _ => false,
        }
    }
}

/// Wire form of an event: a `[kind, timestamp, agent_id, payload]` tuple.
///
/// The agent and payload cells may be null; action payloads are
/// [`SavedAction`] envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEvent(
    pub String,
    pub String,
    pub Option<String>,
    pub Option<Value>,
);

/// One atomic happening in a conversation.
#[derive(Debug, Clone)]
pub struct Event {
    body: EventBody,
    timestamp: DateTime<Utc>,
    agent_id: AgentId,
    acted: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates an event from its body, timestamp and issuer identity.
    pub fn new(body: EventBody, timestamp: DateTime<Utc>, agent_id: AgentId) -> Self {
        Self {
            body,
            timestamp,
            agent_id,
            acted: None,
        }
    }

    /// Creates an utterance event.
    pub fn utterance(
        timestamp: DateTime<Utc>,
        agent_id: AgentId,
        text: impl Into<String>,
    ) -> Self {
        Self::new(EventBody::Utterance(text.into()), timestamp, agent_id)
    }

    /// Creates an action event.
    pub fn action(timestamp: DateTime<Utc>, agent_id: AgentId, action: Box<dyn Action>) -> Self {
        Self::new(EventBody::Action(action), timestamp, agent_id)
    }

    /// Creates a leave event.
    pub fn leave(timestamp: DateTime<Utc>, agent_id: AgentId) -> Self {
        Self::new(EventBody::Leave, timestamp, agent_id)
    }

    pub fn body(&self) -> &EventBody {
        &self.body
    }

    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Timestamp of the moment the event was issued in an episode, if any.
    pub fn acted_at(&self) -> Option<DateTime<Utc>> {
        self.acted
    }

    /// Marks the event as acted, defaulting to the current time.
    ///
    /// Callers must invoke this at most once per event per episode: a second
    /// invocation silently overwrites the previous marker.
    pub fn mark_acted(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.acted = Some(timestamp.unwrap_or_else(Utc::now));
    }

    /// Returns a copy of this event with the acted marker cleared, for
    /// re-issuing the event in a different episode without implying it was
    /// already delivered there.
    pub fn detached(&self) -> Event {
        Event {
            acted: None,
            ..self.clone()
        }
    }

    /// Exports the event to its wire tuple.
    ///
    /// The kind becomes its string tag, the timestamp an ISO-8601 string,
    /// and action payloads their own serialized envelope.
    pub fn save(&self) -> SavedEvent {
        let payload = match &self.body {
            EventBody::Utterance(text) => Some(Value::String(text.clone())),
            EventBody::Action(action) => {
                let envelope = SavedAction::from_action(action.as_ref());
                Some(serde_json::json!({
                    "type": envelope.type_tag,
                    "data": envelope.data,
                }))
            }
            EventBody::Leave => None,
        };
        SavedEvent(
            self.kind().to_string(),
            self.timestamp.to_rfc3339(),
            Some(self.agent_id.to_string()),
            payload,
        )
    }

    /// Loads an event from its wire tuple, resolving action payloads through
    /// the registry.
    pub fn load(saved: &SavedEvent, registry: &crate::ActionRegistry) -> Result<Event, DecodeError> {
        let kind: EventKind = saved.0.parse()?;
        let timestamp =
            parse_timestamp(&saved.1).map_err(|_| DecodeError::Timestamp(saved.1.clone()))?;
        let agent_id = AgentId::new(saved.2.clone().unwrap_or_default())?;

        let body = match kind {
            EventKind::Utterance => {
                let text = match &saved.3 {
                    Some(Value::String(text)) => text.clone(),
                    None => String::new(),
                    Some(other) => {
                        return Err(DecodeError::Payload {
                            kind,
                            detail: format!("expected a string, got {other}"),
                        })
                    }
                };
                EventBody::Utterance(text)
            }
            EventKind::Action => {
                let value = saved.3.as_ref().ok_or_else(|| DecodeError::Payload {
                    kind,
                    detail: "action events require a payload".to_string(),
                })?;
                let envelope: SavedAction = serde_json::from_value(value.clone())?;
                EventBody::Action(registry.load(&envelope)?)
            }
            EventKind::Leave => EventBody::Leave,
        };

        Ok(Event::new(body, timestamp, agent_id))
    }
}

// The acted marker is deliberately excluded: the wire form carries no acted
// column, and a loaded episode must compare equal to the one it was saved
// from.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
            && self.timestamp == other.timestamp
            && self.agent_id == other.agent_id
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            EventBody::Utterance(text) => {
                write!(f, "utterance '{}' by {}", text, self.agent_id)
            }
            EventBody::Action(action) => {
                write!(f, "action '{}' by {}", action.type_tag(), self.agent_id)
            }
            EventBody::Leave => write!(f, "leave by {}", self.agent_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_registry, NoteAction, RecordedAction};
    use chrono::TimeZone;

    fn alice() -> AgentId {
        AgentId::new("alice").unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 12, 28, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(EventKind::Utterance.to_string(), "utterance");
        assert_eq!(EventKind::Action.to_string(), "action");
        assert_eq!(EventKind::Leave.to_string(), "leave");
        assert_eq!("utterance".parse::<EventKind>().unwrap(), EventKind::Utterance);
        assert_eq!("leave".parse::<EventKind>().unwrap(), EventKind::Leave);
    }

    #[test]
    fn test_kind_tags_round_trip_for_all_variants() {
        for kind in EventKind::all() {
            assert_eq!(kind.to_string().parse::<EventKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_kind_tag_case_sensitive() {
        assert!(matches!(
            "Utterance".parse::<EventKind>(),
            Err(DecodeError::UnknownKind(_))
        ));
        assert!(matches!(
            "departure".parse::<EventKind>(),
            Err(DecodeError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_kind_serde_tags() {
        assert_eq!(
            serde_json::to_string(&EventKind::Utterance).unwrap(),
            r#""utterance""#
        );
        assert_eq!(serde_json::to_string(&EventKind::Leave).unwrap(), r#""leave""#);
    }

    #[test]
    fn test_agent_id_rejects_empty() {
        assert_eq!(AgentId::new(""), Err(ValidationError::EmptyAgentId));
        assert!(AgentId::new("alice").is_ok());
    }

    #[test]
    fn test_agent_id_random_is_unique() {
        assert_ne!(AgentId::random(), AgentId::random());
    }

    #[test]
    fn test_mark_acted_defaults_to_now() {
        let mut event = Event::utterance(fixed_time(), alice(), "hello there");
        assert!(event.acted_at().is_none());

        let before = Utc::now();
        event.mark_acted(None);
        let acted = event.acted_at().unwrap();
        assert!(acted >= before);
        assert!(acted <= Utc::now());
    }

    #[test]
    fn test_mark_acted_explicit_timestamp() {
        let mut event = Event::utterance(fixed_time(), alice(), "hello there");
        let when = Utc.with_ymd_and_hms(2018, 2, 4, 18, 5, 25).unwrap();
        event.mark_acted(Some(when));
        assert_eq!(event.acted_at(), Some(when));
    }

    #[test]
    fn test_mark_acted_twice_overwrites() {
        // Boundary case: double marking is not rejected, the second call
        // silently wins.
        let mut event = Event::utterance(fixed_time(), alice(), "hello there");
        let first = Utc.with_ymd_and_hms(2018, 2, 4, 18, 5, 25).unwrap();
        let second = Utc.with_ymd_and_hms(2020, 7, 1, 9, 0, 0).unwrap();
        event.mark_acted(Some(first));
        event.mark_acted(Some(second));
        assert_eq!(event.acted_at(), Some(second));
    }

    #[test]
    fn test_detached_clears_acted() {
        let mut event = Event::utterance(fixed_time(), alice(), "hello there");
        event.mark_acted(None);

        let copy = event.detached();
        assert_eq!(copy, event);
        assert!(copy.acted_at().is_none());
    }

    #[test]
    fn test_equality_ignores_acted() {
        let mut a = Event::utterance(fixed_time(), alice(), "hello there");
        let b = Event::utterance(fixed_time(), alice(), "hello there");
        a.mark_acted(None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_inequality() {
        let base = Event::utterance(fixed_time(), alice(), "hello there");
        let other_text = Event::utterance(fixed_time(), alice(), "general Kenobi!");
        let other_time = Event::utterance(Utc::now(), alice(), "hello there");
        let other_agent =
            Event::utterance(fixed_time(), AgentId::new("bob").unwrap(), "hello there");
        let other_kind = Event::leave(fixed_time(), alice());

        assert_ne!(base, other_text);
        assert_ne!(base, other_time);
        assert_ne!(base, other_agent);
        assert_ne!(base, other_kind);
    }

    #[test]
    fn test_save_utterance() {
        let event = Event::utterance(fixed_time(), alice(), "hello there");
        let saved = event.save();
        assert_eq!(saved.0, "utterance");
        assert_eq!(saved.1, fixed_time().to_rfc3339());
        assert_eq!(saved.2.as_deref(), Some("alice"));
        assert_eq!(saved.3, Some(Value::String("hello there".to_string())));
    }

    #[test]
    fn test_save_leave_has_no_payload() {
        let event = Event::leave(fixed_time(), alice());
        let saved = event.save();
        assert_eq!(saved.0, "leave");
        assert_eq!(saved.3, None);
    }

    #[test]
    fn test_save_action_wraps_envelope() {
        let event = Event::action(fixed_time(), alice(), Box::new(NoteAction::new("remember")));
        let saved = event.save();
        assert_eq!(saved.0, "action");
        let payload = saved.3.unwrap();
        assert_eq!(payload["type"], "note");
        assert_eq!(payload["data"]["text"], "remember");
    }

    #[test]
    fn test_round_trip_each_kind() {
        let registry = fixture_registry();
        let events = [
            Event::utterance(fixed_time(), alice(), "hello there"),
            Event::action(fixed_time(), alice(), Box::new(RecordedAction::new())),
            Event::leave(fixed_time(), alice()),
        ];
        for event in events {
            let loaded = Event::load(&event.save(), &registry).unwrap();
            assert_eq!(loaded, event);
            assert!(loaded.acted_at().is_none());
        }
    }

    #[test]
    fn test_load_rejects_unknown_kind() {
        let registry = fixture_registry();
        let saved = SavedEvent(
            "shout".to_string(),
            fixed_time().to_rfc3339(),
            Some("alice".to_string()),
            None,
        );
        assert!(matches!(
            Event::load(&saved, &registry),
            Err(DecodeError::UnknownKind(tag)) if tag == "shout"
        ));
    }

    #[test]
    fn test_load_rejects_bad_timestamp() {
        let registry = fixture_registry();
        let saved = SavedEvent(
            "leave".to_string(),
            "not-a-time".to_string(),
            Some("alice".to_string()),
            None,
        );
        assert!(matches!(
            Event::load(&saved, &registry),
            Err(DecodeError::Timestamp(_))
        ));
    }

    #[test]
    fn test_load_rejects_unregistered_action() {
        let registry = crate::ActionRegistry::new();
        let event = Event::action(fixed_time(), alice(), Box::new(RecordedAction::new()));
        assert!(matches!(
            Event::load(&event.save(), &registry),
            Err(DecodeError::UnknownAction(tag)) if tag == "recorded"
        ));
    }

    #[test]
    fn test_load_rejects_missing_agent() {
        let registry = fixture_registry();
        let saved = SavedEvent("leave".to_string(), fixed_time().to_rfc3339(), None, None);
        assert!(matches!(
            Event::load(&saved, &registry),
            Err(DecodeError::Validation(ValidationError::EmptyAgentId))
        ));
    }

    #[test]
    fn test_display() {
        let event = Event::utterance(fixed_time(), alice(), "hi");
        assert_eq!(event.to_string(), "utterance 'hi' by alice");
        let event = Event::leave(fixed_time(), alice());
        assert_eq!(event.to_string(), "leave by alice");
    }
}
