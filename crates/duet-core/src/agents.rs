//! Built-in minimal agents.
//!
//! [`DummyAgent`] logs what it receives and never responds, expecting the
//! interaction to be commanded externally. [`EchoAgent`] answers every
//! utterance by echoing its content. Both double as the smallest possible
//! examples of the [`Agent`] contract.

use chrono::Utc;

use duet_events::{AgentId, Event, EventBody};

use crate::agent::Agent;
use crate::episode::Episode;

/// An agent that only logs new episodes and events.
#[derive(Debug, Clone)]
pub struct DummyAgent {
    id: AgentId,
    name: Option<String>,
}

impl DummyAgent {
    pub fn new(id: AgentId) -> Self {
        Self { id, name: None }
    }

    /// Creates a dummy agent with a random identity.
    pub fn with_random_id() -> Self {
        Self::new(AgentId::random())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Agent for DummyAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn handle_event(&self, event: &Event, _episode: &Episode) -> Vec<Event> {
        tracing::debug!("{} received: {}", self.id, event);
        Vec::new()
    }

    fn episode_started(&self, episode: &Episode) {
        tracing::info!("{} invited to episode {}", self.id, episode.id());
    }
}

/// An agent that reacts to utterances by echoing their content back.
#[derive(Debug, Clone)]
pub struct EchoAgent {
    id: AgentId,
}

impl EchoAgent {
    pub fn new(id: AgentId) -> Self {
        Self { id }
    }

    /// Creates an echo agent with a random identity.
    pub fn with_random_id() -> Self {
        Self::new(AgentId::random())
    }
}

impl Agent for EchoAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn handle_event(&self, event: &Event, _episode: &Episode) -> Vec<Event> {
        match event.body() {
            EventBody::Utterance(text) => {
                let reply = format!("You said '{}'", text);
                vec![Event::utterance(Utc::now(), self.id.clone(), reply)]
            }
            EventBody::Action(_) | EventBody::Leave => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aid(s: &str) -> AgentId {
        AgentId::new(s).unwrap()
    }

    #[test]
    fn test_dummy_agent_never_responds() {
        let dummy = DummyAgent::new(aid("dummy"));
        let episode = Episode::new(aid("a"), aid("dummy"));
        let event = Event::utterance(Utc::now(), aid("a"), "hi");
        assert!(dummy.handle_event(&event, &episode).is_empty());

        let event = Event::leave(Utc::now(), aid("a"));
        assert!(dummy.handle_event(&event, &episode).is_empty());
    }

    #[test]
    fn test_dummy_agent_name() {
        let anon = DummyAgent::with_random_id();
        assert!(anon.name().is_none());

        let named = DummyAgent::new(aid("dummy")).with_name("Dummy");
        assert_eq!(named.name(), Some("Dummy"));
    }

    #[test]
    fn test_random_ids_are_distinct() {
        let one = EchoAgent::with_random_id();
        let two = EchoAgent::with_random_id();
        assert_ne!(one.id(), two.id());
    }

    #[test]
    fn test_echo_agent_echoes_utterances() {
        let echo = EchoAgent::new(aid("echo"));
        let episode = Episode::new(aid("a"), aid("echo"));
        let event = Event::utterance(Utc::now(), aid("a"), "hi");

        let responses = echo.handle_event(&event, &episode);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].agent_id(), &aid("echo"));
        assert_eq!(
            responses[0].body(),
            &EventBody::Utterance("You said 'hi'".to_string())
        );
    }

    #[test]
    fn test_echo_agent_ignores_leaves() {
        let echo = EchoAgent::new(aid("echo"));
        let episode = Episode::new(aid("a"), aid("echo"));
        let event = Event::leave(Utc::now(), aid("a"));
        assert!(echo.handle_event(&event, &episode).is_empty());
    }
}
