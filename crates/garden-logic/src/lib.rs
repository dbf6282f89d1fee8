//! Pure garden simulation logic.
//!
//! This crate contains all game logic that is independent of storage, timers,
//! or any runtime. Functions take plain data and return results, making them
//! unit-testable and reusable by the engine, the headless harness, and any
//! presentation layer.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`achievements`] | Profile statistics, stat deltas, achievement predicates |
//! | [`catalog`] | Plant and pet definitions, rarity, load-time validation |
//! | [`constants`] | Design constants (plot capacity, weed chance, health gains) |
//! | [`growth`] | Stage derivation from elapsed time, weed onset roll |
//! | [`leaderboard`] | Score formula and stable descending ranking |
//! | [`pets`] | Active-pet ability resolution into modifiers |

pub mod achievements;
pub mod catalog;
pub mod constants;
pub mod growth;
pub mod leaderboard;
pub mod pets;
