//! Conversation episodes.
//!
//! An [`Episode`] is the ordered, append-only record of events exchanged
//! between two participants. A recorded episode is plain data: it can be
//! saved, loaded and compared, but new events only enter it through a
//! dispatcher (see [`LiveEpisode`](crate::LiveEpisode) and
//! [`AsyncLiveEpisode`](crate::AsyncLiveEpisode)).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use duet_events::timestamp::parse_timestamp;
use duet_events::{
    ActionRegistry, AgentId, DecodeError, Event, EventBody, EventKind, SavedEpisode,
};

/// Output format selector for [`Episode::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Standard,
    Compact,
}

/// The ordered record of one two-party conversation.
///
/// Event order is the causal delivery order, which is not necessarily
/// strict wall-clock order. Equality is structural over the id, creation
/// timestamp, participant ids and the event sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    id: String,
    timestamp: DateTime<Utc>,
    starter_id: AgentId,
    invited_id: AgentId,
    events: Vec<Event>,
}

impl Episode {
    /// Creates an empty episode between two participant identities.
    pub fn new(starter_id: AgentId, invited_id: AgentId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            starter_id,
            invited_id,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn starter_id(&self) -> &AgentId {
        &self.starter_id
    }

    pub fn invited_id(&self) -> &AgentId {
        &self.invited_id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Returns the most recent event, if any.
    pub fn last_event(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Returns the most recent event whose kind is one of `kinds`.
    ///
    /// An empty result is distinct from a Leave event, which matches even
    /// though it carries no payload.
    pub fn last_event_matching(&self, kinds: &[EventKind]) -> Option<&Event> {
        self.events.iter().rev().find(|e| kinds.contains(&e.kind()))
    }

    /// Saves the episode to a serializable envelope that [`Episode::load`]
    /// can restore.
    pub fn save(&self, format: SaveFormat) -> SavedEpisode {
        let standard = SavedEpisode::Standard {
            id: self.id.clone(),
            timestamp: self.timestamp.to_rfc3339(),
            starter_agent: self.starter_id.to_string(),
            invited_agents: vec![self.invited_id.to_string()],
            events: self.events.iter().map(Event::save).collect(),
        };
        match format {
            SaveFormat::Standard => standard,
            SaveFormat::Compact => standard.into_compact(),
        }
    }

    /// Loads an episode from a saved envelope, resolving action payloads
    /// through the registry. Compact input is first re-expanded to the
    /// standard format.
    pub fn load(saved: SavedEpisode, registry: &ActionRegistry) -> Result<Episode, DecodeError> {
        match saved.into_standard()? {
            SavedEpisode::Standard {
                id,
                timestamp,
                starter_agent,
                invited_agents,
                events,
            } => {
                let timestamp = parse_timestamp(&timestamp)
                    .map_err(|_| DecodeError::Timestamp(timestamp.clone()))?;
                let starter_id = AgentId::new(starter_agent)?;
                let invited_id = invited_agents
                    .into_iter()
                    .next()
                    .ok_or(DecodeError::Envelope(
                        "invited_agents must contain at least one id",
                    ))
                    .and_then(|id| Ok(AgentId::new(id)?))?;
                let events = events
                    .iter()
                    .map(|e| Event::load(e, registry))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Episode {
                    id,
                    timestamp,
                    starter_id,
                    invited_id,
                    events,
                })
            }
            SavedEpisode::Compact { .. } => {
                unreachable!("into_standard always yields the standard format")
            }
        }
    }
}

/// Returns the utterance payloads of an episode in order.
///
/// With `keep_holes`, non-utterance events yield `None` placeholders
/// instead of being skipped.
pub fn extract_utterances(episode: &Episode, keep_holes: bool) -> Vec<Option<String>> {
    let mut result = Vec::new();
    for event in episode.events() {
        match event.body() {
            EventBody::Utterance(text) => result.push(Some(text.clone())),
            _ if keep_holes => result.push(None),
            _ => {}
        }
    }
    result
}

/// Extracts the utterance pairs that read as one dialogue turn: both events
/// are utterances with non-empty payloads, issued by different agents, and
/// the second immediately follows the first.
///
/// Returns two lists of the same length, where each utterance in the first
/// has its response at the same index in the second. If an utterance has
/// more than one answer, only the first is included.
pub fn extract_utterance_pairs(episode: &Episode) -> (Vec<String>, Vec<String>) {
    let mut prompts = Vec::new();
    let mut replies = Vec::new();
    for pair in episode.events().windows(2) {
        let (EventBody::Utterance(first), EventBody::Utterance(second)) =
            (pair[0].body(), pair[1].body())
        else {
            continue;
        };
        if pair[0].agent_id() != pair[1].agent_id() && !first.is_empty() && !second.is_empty() {
            prompts.push(first.clone());
            replies.push(second.clone());
        }
    }
    (prompts, replies)
}
