//! Garden Core - Gardening Simulation Engine
//!
//! Owns a player's garden (a fixed row of plots, coins, unlocked plants and
//! pets) and applies player commands, periodic growth ticks, and auto-water
//! sweeps to it. Profiles and achievements are tracked alongside, and every
//! aggregate is persisted as a JSON blob through a pluggable gateway.
//!
//! # Architecture
//!
//! - **Engine**: synchronous command surface over the [`state::GameState`]
//!   aggregate. Pure rules (growth, pets, achievements) come from
//!   `garden_logic`.
//! - **Session**: a tokio task that owns the engine and serializes commands
//!   and timers through one queue.
//! - **Persistence**: async key-value gateway; saves are fire-and-forget.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use garden_core::prelude::*;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let mut engine = GardenEngine::new(
//!     GardenConfig::default(),
//!     Arc::new(Catalog::standard()),
//!     clock.clone(),
//! );
//!
//! engine.plant(0, "tomato");
//! clock.advance_secs(30);
//! engine.tick();
//! let reward = engine.harvest(0);
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod offline;
pub mod persistence;
pub mod profile;
pub mod session;
pub mod state;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::GardenConfig;
    pub use crate::engine::{Command, CommandError, CommandOutcome, GardenEngine, HarvestReward};
    pub use crate::persistence::{FileGateway, MemoryGateway, PersistenceGateway};
    pub use crate::profile::{ProfileTracker, UserProfile};
    pub use crate::session::{GardenSession, SessionError};
    pub use crate::state::{GameState, Planting};
    pub use garden_logic::catalog::Catalog;
    pub use garden_logic::growth::Stage;
}
