//! The duet conversation engine: two participants, one append-only log.
//!
//! An episode records a dialogue between exactly two agents as an ordered
//! sequence of typed events. The dispatchers govern how a newly issued
//! event reaches the other participant and how that participant's response
//! events re-enter the log, either synchronously ([`LiveEpisode`]) or
//! through the tokio scheduler ([`AsyncLiveEpisode`]).
//!
//! # Architecture
//!
//! ```text
//!            add_event          handle_event
//! agent A ─────────────▶ ┌──────────────┐ ─────────────▶ agent B
//!                        │  dispatcher  │ ◀──────────────────┘
//!                        └──────────────┘  response events
//!                               │ append (bounded cascade)
//!                               ▼
//!                           Episode ──save/load──▶ SavedEpisode
//!                                                  (standard/compact)
//! ```
//!
//! # Modules
//!
//! - [`episode`]: the recorded conversation log
//! - [`live`]: synchronous dispatch with a bounded response cascade
//! - [`async_live`]: fire-and-forget dispatch over tokio
//! - [`agent`]: the participant contract
//! - [`agents`]: built-in minimal agents
//! - [`config`]: TOML-loadable engine settings
//! - [`persistence`]: JSON file save/load for episodes

pub mod agent;
pub mod agents;
pub mod async_live;
pub mod config;
pub mod episode;
pub mod live;
pub mod persistence;

// Re-export the participant contract
pub use agent::{Agent, AgentHandle};

// Re-export built-in agents
pub use agents::{DummyAgent, EchoAgent};

// Re-export dispatchers
pub use async_live::AsyncLiveEpisode;
pub use live::{DispatchError, EmitReport, LiveEpisode};

// Re-export episode types
pub use episode::{extract_utterance_pairs, extract_utterances, Episode, SaveFormat};

// Re-export configuration
pub use config::{
    default_config_toml, ConfigError, DispatchConfig, EngineConfig, MAX_EVENT_RESPONSES,
};

// Re-export persistence helpers
pub use persistence::{load_episode, save_episode, PersistenceError};
