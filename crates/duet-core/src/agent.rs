//! The participant contract.
//!
//! An agent is any of the two participants in an episode. The engine only
//! models identity and reaction: agents are addressed by an opaque id, and
//! the dispatchers deliver every appended event to the other participant
//! through [`Agent::handle_event`].

use std::sync::Arc;

use duet_events::{AgentId, Event};

use crate::episode::Episode;

/// A participant in a conversation.
pub trait Agent: Send + Sync {
    /// Opaque identity of this agent.
    fn id(&self) -> &AgentId;

    /// Optional human-friendly name, for logs only.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Reacts to an event delivered in an episode.
    ///
    /// Returning an empty vec means "no response". Implementations must not
    /// fail for a well-formed event; they match on the event body to tell
    /// utterances, actions and leaves apart.
    fn handle_event(&self, event: &Event, episode: &Episode) -> Vec<Event>;

    /// Notifies this agent that another agent started an episode with it.
    fn episode_started(&self, _episode: &Episode) {}
}

/// Shared handle to a participant.
///
/// Dispatchers hold handles in memory only; what enters the episode record
/// is always the agent's id.
pub type AgentHandle = Arc<dyn Agent>;
