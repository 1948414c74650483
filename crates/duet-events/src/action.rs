//! Actions: event payloads with side effects.
//!
//! An action knows how to run its own side effect and how to serialize
//! itself. Concrete action types are resolved at decode time through an
//! [`ActionRegistry`] keyed by a stable type tag, so episodes containing
//! actions can be loaded without any runtime reflection.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::DecodeError;

/// A serializable payload with a side effect.
///
/// The side effect runs exactly once per action instance, before the
/// corresponding event is issued in an episode.
pub trait Action: fmt::Debug + Send + Sync {
    /// Runs the action's side effect. Returns false if the effect did not
    /// apply.
    fn run(&self) -> bool;

    /// Stable tag identifying this action type on the wire.
    fn type_tag(&self) -> &'static str;

    /// Serializes the action's own state.
    fn save(&self) -> Value;

    /// Object-safe clone.
    fn clone_box(&self) -> Box<dyn Action>;
}

impl Clone for Box<dyn Action> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Wire envelope for an action payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAction {
    /// Registry tag of the concrete action type
    #[serde(rename = "type")]
    pub type_tag: String,
    /// The action's own serialized state
    pub data: Value,
}

impl SavedAction {
    pub fn from_action(action: &dyn Action) -> Self {
        Self {
            type_tag: action.type_tag().to_string(),
            data: action.save(),
        }
    }
}

/// Loader resolving a saved payload back into a concrete action.
pub type ActionLoader = fn(&Value) -> Result<Box<dyn Action>, DecodeError>;

/// Registry mapping stable type tags to action loaders.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    loaders: HashMap<String, ActionLoader>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loader under the given type tag, replacing any previous
    /// one.
    pub fn register(&mut self, type_tag: impl Into<String>, loader: ActionLoader) {
        self.loaders.insert(type_tag.into(), loader);
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.loaders.contains_key(type_tag)
    }

    /// Resolves a saved action through its registered loader.
    pub fn load(&self, saved: &SavedAction) -> Result<Box<dyn Action>, DecodeError> {
        let loader = self
            .loaders
            .get(&saved.type_tag)
            .ok_or_else(|| DecodeError::UnknownAction(saved.type_tag.clone()))?;
        loader(&saved.data)
    }
}
