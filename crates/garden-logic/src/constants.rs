//! Design constants shared by the engine, the harness, and tests.
//!
//! Values that a deployment may want to tune are mirrored as defaults in the
//! engine's configuration; these are the canonical design targets.

/// Fixed number of plots in a garden.
pub const PLOT_COUNT: usize = 6;

/// Coins a brand new garden starts with.
pub const STARTING_COINS: u64 = 50;

/// Plants every garden has unlocked from the start.
pub const STARTER_PLANTS: &[&str] = &["tomato", "carrot"];

/// Per-tick probability of weeds appearing on a growing plot.
pub const WEED_CHANCE_PER_TICK: f64 = 0.02;

/// Main tick period in milliseconds.
pub const TICK_PERIOD_MS: u64 = 1_000;

/// Auto-water sweep period in milliseconds.
pub const AUTO_WATER_PERIOD_MS: u64 = 30_000;

/// Offline gaps shorter than this are ignored on load.
pub const OFFLINE_MIN_ELAPSED_MS: u64 = 1_000;

/// Plot health bounds and gains.
pub const MAX_HEALTH: u8 = 100;
pub const WATER_HEALTH_GAIN: u8 = 10;
pub const WEED_HEALTH_GAIN: u8 = 5;

/// Id of the mythical plant tracked by the `giantBeanstalkUnlocked` stat.
pub const GIANT_BEANSTALK: &str = "giant_beanstalk";

/// Leaderboard points per rare plant found.
pub const RARE_PLANT_SCORE: u64 = 100;

/// Username length bounds (characters, after trimming).
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
