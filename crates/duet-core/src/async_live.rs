//! Asynchronous event dispatch.
//!
//! [`AsyncLiveEpisode`] is the non-blocking variant of
//! [`LiveEpisode`](crate::LiveEpisode): adding an event appends and marks it
//! immediately, then hands notification of the other participant to the
//! tokio scheduler and returns without waiting for a result. Response
//! events re-enter the episode through the same path, fanning out further
//! tasks.
//!
//! Two disciplines the synchronous dispatcher gets for free are explicit
//! here:
//!
//! - appends are serialized through a single mutex, because concurrent
//!   notification tasks may respond at the same time;
//! - every externally added event carries a countdown budget that bounds
//!   its whole response cascade to the configured cap, the same discipline
//!   the synchronous dispatcher applies.
//!
//! Within one submitter's stream of events, append order equals call order;
//! interleaving across participants depends on task scheduling. A Leave
//! event ends a conversation logically, but notifications already scheduled
//! are not retracted.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use duet_events::{AgentId, Event};

use crate::agent::AgentHandle;
use crate::config::DispatchConfig;
use crate::episode::Episode;
use crate::live::DispatchError;

struct Shared {
    episode: Mutex<Episode>,
    starter: AgentHandle,
    invited: AgentHandle,
    config: DispatchConfig,
}

impl Shared {
    fn other_agent(&self, agent_id: &AgentId) -> Result<&AgentHandle, DispatchError> {
        if agent_id == self.starter.id() {
            Ok(&self.invited)
        } else if agent_id == self.invited.id() {
            Ok(&self.starter)
        } else {
            Err(DispatchError::UnknownParticipant(agent_id.clone()))
        }
    }
}

/// An episode under way with fire-and-forget event delivery.
///
/// Cloning yields another handle to the same conversation.
#[derive(Clone)]
pub struct AsyncLiveEpisode {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AsyncLiveEpisode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLiveEpisode").finish_non_exhaustive()
    }
}

impl AsyncLiveEpisode {
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
            shared: Arc::new(Shared {
                episode: Mutex::new(episode),
                starter,
                invited,
                config,
            }),
        })
    }

    /// Returns a point-in-time copy of the recorded episode.
    pub async fn snapshot(&self) -> Episode {
        self.shared.episode.lock().await.clone()
    }

    /// Recovers the episode once no other handles or in-flight tasks share
    /// the conversation. Returns `Err(self)` while it is still shared.
    pub fn try_into_episode(self) -> Result<Episode, AsyncLiveEpisode> {
        match Arc::try_unwrap(self.shared) {
            Ok(shared) => Ok(shared.episode.into_inner()),
            Err(shared) => Err(AsyncLiveEpisode { shared }),
        }
    }

    /// Adds an event: appends and marks it acted immediately, then
    /// schedules notification of the other participant and returns.
    ///
    /// The whole cascade triggered by this call shares one budget of
    /// `max_event_responses` notifications; events past the budget are
    /// recorded but not delivered.
    pub async fn add_event(&self, event: Event) -> Result<(), DispatchError> {
        let budget = Arc::new(AtomicUsize::new(self.shared.config.max_event_responses));
        submit(&self.shared, event, &budget).await
    }
}

/// Appends an event under the episode lock and, budget permitting, spawns
/// the notification task for the other participant.
async fn submit(
    shared: &Arc<Shared>,
    mut event: Event,
    budget: &Arc<AtomicUsize>,
) -> Result<(), DispatchError> {
    let recipient = shared.other_agent(event.agent_id())?.clone();

    tracing::info!("New event: {}", event);
    if event.acted_at().is_none() {
        event.mark_acted(None);
    }
    let delivered = event.clone();
    shared.episode.lock().await.append(event);

    // Take one notification from the cascade budget; once it runs out the
    // event stays recorded but is not delivered.
    let spent = budget.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    if spent.is_err() {
        tracing::warn!(
            "Response cap ({}) reached; {} recorded without notification",
            shared.config.max_event_responses,
            delivered
        );
        return Ok(());
    }

    tokio::spawn(notification_task(
        Arc::clone(shared),
        recipient,
        delivered,
        Arc::clone(budget),
    ));
    Ok(())
}

/// Delivers one event and feeds the responses back through [`submit`].
///
/// Boxed so the recursion through `tokio::spawn` has a nameable future
/// type.
fn notification_task(
    shared: Arc<Shared>,
    recipient: AgentHandle,
    event: Event,
    budget: Arc<AtomicUsize>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        tracing::debug!("Notifying {}", recipient.id());
        let episode = shared.episode.lock().await.clone();
        let responses = recipient.handle_event(&event, &episode);
        for response in responses {
            if let Err(err) = submit(&shared, response, &budget).await {
                tracing::warn!("Dropping response event: {}", err);
            }
        }
    })
}
