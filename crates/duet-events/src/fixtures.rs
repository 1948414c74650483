//! Ready-made actions for testing.
//!
//! This module provides canned [`Action`] implementations for other crates
//! to use in their tests. Enable the `test-fixtures` feature to access
//! these helpers.
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // duet-events = { path = "../duet-events", features = ["test-fixtures"] }
//!
//! use duet_events::fixtures::{fixture_registry, NoteAction, RecordedAction};
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::action::{Action, ActionRegistry};
use crate::codec::DecodeError;
use crate::event::EventKind;

/// An action that records whether it has been run.
///
/// The flag is shared between clones of the same instance, so the event an
/// action was boxed into can be interrogated after dispatch.
#[derive(Debug, Clone, Default)]
pub struct RecordedAction {
    done: Arc<AtomicBool>,
}

impl RecordedAction {
    pub const TYPE_TAG: &'static str = "recorded";

    pub fn new() -> Self {
        Self::default()
    }

    /// True once `run` has been invoked.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub fn load(_data: &Value) -> Result<Box<dyn Action>, DecodeError> {
        Ok(Box::new(RecordedAction::new()))
    }
}

impl Action for RecordedAction {
    fn run(&self) -> bool {
        self.done.store(true, Ordering::SeqCst);
        true
    }

    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn save(&self) -> Value {
        Value::Null
    }

    fn clone_box(&self) -> Box<dyn Action> {
        Box::new(self.clone())
    }
}

/// An action carrying a small serializable payload, for exercising the wire
/// formats.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteAction {
    pub text: String,
}

impl NoteAction {
    pub const TYPE_TAG: &'static str = "note";

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load(data: &Value) -> Result<Box<dyn Action>, DecodeError> {
        match data.get("text").and_then(Value::as_str) {
            Some(text) => Ok(Box::new(NoteAction::new(text))),
            None => Err(DecodeError::Payload {
                kind: EventKind::Action,
                detail: "note action needs a 'text' field".to_string(),
            }),
        }
    }
}

impl Action for NoteAction {
    fn run(&self) -> bool {
        true
    }

    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn save(&self) -> Value {
        serde_json::json!({ "text": self.text })
    }

    fn clone_box(&self) -> Box<dyn Action> {
        Box::new(self.clone())
    }
}

/// Returns a registry with all fixture actions registered.
pub fn fixture_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(RecordedAction::TYPE_TAG, RecordedAction::load);
    registry.register(NoteAction::TYPE_TAG, NoteAction::load);
    registry
}
