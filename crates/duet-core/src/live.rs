//! Synchronous event dispatch.
//!
//! A [`LiveEpisode`] is an episode that is currently under way: new events
//! can be acted in it, and each appended event is delivered to the other
//! participant, whose response events are processed iteratively from a
//! queue. A hard cap bounds the response cascade a single external event
//! can trigger, so two automated participants cannot feed back into each
//! other indefinitely; once the cap is hit, remaining queued events are
//! still appended to preserve the record, they just stop being delivered.
//!
//! Dispatch is strictly sequential: the whole cascade for one
//! [`LiveEpisode::add_event`] call runs to completion before control
//! returns to the caller.

use std::collections::VecDeque;

use chrono::Utc;

use duet_events::{Action, AgentId, Event, EventBody};

use crate::agent::AgentHandle;
use crate::config::DispatchConfig;
use crate::episode::Episode;

/// Errors raised by the dispatchers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The emitted event's agent id matches neither registered participant.
    #[error("agent '{0}' is not a participant in this episode")]
    UnknownParticipant(AgentId),
    /// An episode needs two distinct participants.
    #[error("participants must be distinct, got '{0}' twice")]
    SameParticipant(AgentId),
}

/// Outcome of one [`LiveEpisode::add_event`] call.
///
/// Hitting the response cap is a bounded-degradation condition, not an
/// error; callers inspect `cap_reached` to tell a truncated cascade from a
/// completed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmitReport {
    /// Events appended to the episode by this call
    pub appended: usize,
    /// Events that were delivered to the other participant
    pub notified: usize,
    /// True if the response cascade hit the configured cap
    pub cap_reached: bool,
}

impl EmitReport {
    fn absorb(&mut self, other: EmitReport) {
        self.appended += other.appended;
        self.notified += other.notified;
        self.cap_reached |= other.cap_reached;
    }
}

/// An episode that is currently under way.
///
/// Holds the recorded [`Episode`] plus live handles to both participants;
/// the handles route notifications and are never persisted. The episode can
/// outlive the dispatcher via [`LiveEpisode::into_episode`].
pub struct LiveEpisode {
    episode: Episode,
    starter: AgentHandle,
    invited: AgentHandle,
    config: DispatchConfig,
}

impl LiveEpisode {
    /// Starts a conversation between two agents, notifying the invited one.
    ///
    /// Fails if both handles carry the same identity.
    pub fn new(starter: AgentHandle, invited: AgentHandle) -> Result<Self, DispatchError> {
        Self::with_config(starter, invited, DispatchConfig::default())
    }

    pub fn with_config(
        starter: AgentHandle,
        invited: AgentHandle,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        if starter.id() == invited.id() {
            return Err(DispatchError::SameParticipant(starter.id().clone()));
        }
        let episode = Episode::new(starter.id().clone(), invited.id().clone());
        invited.episode_started(&episode);
        Ok(Self {
            episode,
            starter,
            invited,
            config,
        })
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    /// Detaches the recorded episode from the live machinery.
    pub fn into_episode(self) -> Episode {
        self.episode
    }

    /// Retrieves the handle of a participating agent by id.
    pub fn agent_by_id(&self, agent_id: &AgentId) -> Option<&AgentHandle> {
        if agent_id == self.starter.id() {
            Some(&self.starter)
        } else if agent_id == self.invited.id() {
            Some(&self.invited)
        } else {
            None
        }
    }

    fn other_agent(&self, agent_id: &AgentId) -> Result<&AgentHandle, DispatchError> {
        if agent_id == self.starter.id() {
            Ok(&self.invited)
        } else if agent_id == self.invited.id() {
            Ok(&self.starter)
        } else {
            Err(DispatchError::UnknownParticipant(agent_id.clone()))
        }
    }

    /// Adds an event to the episode, delivering it to the other participant
    /// and absorbing response events until the queue drains or the response
    /// cap is reached.
    ///
    /// Each processed event is appended and marked acted (at the current
    /// time, unless the caller pre-set a timestamp) before the other
    /// participant is notified. An event issued by an unregistered agent
    /// fails the call and never enters the log.
    pub fn add_event(&mut self, event: Event) -> Result<EmitReport, DispatchError> {
        let mut pending = VecDeque::from([event]);
        let mut report = EmitReport::default();

        while let Some(mut event) = pending.pop_front() {
            // Resolve the recipient before touching the episode, so an
            // unknown issuer cannot leave a partial append behind.
            let recipient = self.other_agent(event.agent_id())?.clone();

            self.echo_event(&event);
            if event.acted_at().is_none() {
                event.mark_acted(None);
            }
            let delivered = event.clone();
            self.episode.append(event);
            report.appended += 1;

            if report.notified < self.config.max_event_responses {
                tracing::debug!("Notifying {}", recipient.id());
                let responses = recipient.handle_event(&delivered, &self.episode);
                report.notified += 1;
                pending.extend(responses);
            } else {
                if !report.cap_reached {
                    tracing::warn!(
                        "Response cap ({}) reached for a single event; {} further event(s) \
                         will be recorded without notification",
                        self.config.max_event_responses,
                        pending.len() + 1
                    );
                }
                report.cap_reached = true;
            }
        }

        Ok(report)
    }

    /// Issues a batch of events on behalf of a participant, running any
    /// action payloads before dispatch.
    pub fn act_events(&mut self, events: Vec<Event>) -> Result<EmitReport, DispatchError> {
        let mut total = EmitReport::default();
        for event in events {
            if let EventBody::Action(action) = event.body() {
                if !action.run() {
                    tracing::warn!(
                        "Action '{}' reported failure before being issued",
                        action.type_tag()
                    );
                }
            }
            total.absorb(self.add_event(event)?);
        }
        Ok(total)
    }

    /// Issues an utterance by the given participant, timestamped now.
    pub fn say(
        &mut self,
        agent_id: &AgentId,
        text: impl Into<String>,
    ) -> Result<EmitReport, DispatchError> {
        self.add_event(Event::utterance(Utc::now(), agent_id.clone(), text))
    }

    /// Runs an action and issues the corresponding event.
    pub fn do_action(
        &mut self,
        agent_id: &AgentId,
        action: Box<dyn Action>,
    ) -> Result<EmitReport, DispatchError> {
        self.act_events(vec![Event::action(Utc::now(), agent_id.clone(), action)])
    }

    /// Issues a leave event by the given participant.
    pub fn leave(&mut self, agent_id: &AgentId) -> Result<EmitReport, DispatchError> {
        self.add_event(Event::leave(Utc::now(), agent_id.clone()))
    }

    /// Echoes an appended event to the log stream.
    fn echo_event(&self, event: &Event) {
        tracing::info!("New event: {}", event);
    }
}
