//! The per-player game state aggregate.
//!
//! Serialized as camelCase JSON with epoch-millisecond timestamps. A plot's
//! `stage` is a cached value; the authoritative inputs are `planted_at`, the
//! current time, and the active growth multiplier.

use garden_logic::catalog::Catalog;
use garden_logic::constants::MAX_HEALTH;
use garden_logic::growth::Stage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GardenConfig;

/// A plant growing in a plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planting {
    pub plant_id: String,
    pub planted_at: u64,
    pub stage: Stage,
    pub last_watered: u64,
    /// 0..=100. Raised by watering and weeding; never gates growth.
    pub health: u8,
    pub has_weeds: bool,
}

impl Planting {
    pub fn new(plant_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            plant_id: plant_id.into(),
            planted_at: now_ms,
            stage: Stage::Seed,
            last_watered: now_ms,
            health: MAX_HEALTH,
            has_weeds: false,
        }
    }

    pub fn water(&mut self, now_ms: u64, gain: u8) {
        self.last_watered = now_ms;
        self.heal(gain);
    }

    pub fn heal(&mut self, gain: u8) {
        self.health = self.health.saturating_add(gain).min(MAX_HEALTH);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub coins: u64,
    pub plots: Vec<Option<Planting>>,
    /// Unlocked plant ids in unlock order; always includes the starters.
    pub unlocked_plants: Vec<String>,
    #[serde(default)]
    pub unlocked_pets: Vec<String>,
    #[serde(default)]
    pub active_pet: Option<String>,
    #[serde(default)]
    pub rare_plants_discovered: u64,
    #[serde(default)]
    pub last_save_time: u64,
}

impl GameState {
    /// Fresh garden: starting coins, empty plots, starter plants.
    pub fn initial(config: &GardenConfig, catalog: &Catalog) -> Self {
        Self {
            coins: config.starting_coins,
            plots: vec![None; config.plot_count],
            unlocked_plants: catalog.starter_plants().to_vec(),
            unlocked_pets: Vec::new(),
            active_pet: None,
            rare_plants_discovered: 0,
            last_save_time: 0,
        }
    }

    pub fn is_plant_unlocked(&self, id: &str) -> bool {
        self.unlocked_plants.iter().any(|p| p == id)
    }

    pub fn is_pet_unlocked(&self, id: &str) -> bool {
        self.unlocked_pets.iter().any(|p| p == id)
    }

    pub fn occupied_plots(&self) -> usize {
        self.plots.iter().filter(|p| p.is_some()).count()
    }

    /// Bring a loaded state in line with the current catalog and plot count.
    ///
    /// Drops plantings and unlocks that reference ids the catalog no longer
    /// knows, resizes the plot array, restores the starter plants, and clears
    /// an active pet that is not unlocked.
    pub fn sanitize(&mut self, catalog: &Catalog, plot_count: usize) {
        for (index, slot) in self.plots.iter_mut().enumerate() {
            if let Some(planting) = slot {
                if catalog.plant(&planting.plant_id).is_err() {
                    warn!(plot = index, plant = %planting.plant_id, "dropping planting of unknown plant");
                    *slot = None;
                } else {
                    planting.health = planting.health.min(MAX_HEALTH);
                }
            }
        }
        if self.plots.len() != plot_count {
            warn!(
                found = self.plots.len(),
                expected = plot_count,
                "resizing plot array"
            );
            self.plots.resize(plot_count, None);
        }

        self.unlocked_plants.retain(|id| catalog.plant(id).is_ok());
        for starter in catalog.starter_plants() {
            if !self.is_plant_unlocked(starter) {
                self.unlocked_plants.push(starter.clone());
            }
        }
        dedup_in_order(&mut self.unlocked_plants);

        self.unlocked_pets.retain(|id| catalog.pet(id).is_ok());
        dedup_in_order(&mut self.unlocked_pets);

        if let Some(active) = &self.active_pet {
            if !self.is_pet_unlocked(active) {
                warn!(pet = %active, "clearing active pet that is not unlocked");
                self.active_pet = None;
            }
        }
    }
}

fn dedup_in_order(ids: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}
