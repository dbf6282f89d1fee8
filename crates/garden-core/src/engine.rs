//! Simulation engine - owns the game state and applies commands and ticks.
//!
//! Every command is a synchronous read-modify-write over the in-memory
//! [`GameState`]. Invalid commands are silent no-ops at the public surface:
//! each `try_*` method reports why it was rejected, and the matching plain
//! method logs the reason at debug level and leaves the state unchanged.

use std::sync::Arc;

use garden_logic::achievements::StatsDelta;
use garden_logic::catalog::{Catalog, CatalogError, PetDef};
use garden_logic::constants::{GIANT_BEANSTALK, WATER_HEALTH_GAIN, WEED_HEALTH_GAIN};
use garden_logic::growth::{derive_stage, roll_weeds, Stage};
use garden_logic::pets::{self, PetModifiers};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GardenConfig;
use crate::state::{GameState, Planting};

/// Why a command was not applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("plot {0} is out of range")]
    PlotOutOfRange(usize),
    #[error("plot {0} is empty")]
    PlotEmpty(usize),
    #[error("plot {0} is already planted")]
    PlotOccupied(usize),
    #[error("plot {0} is not ready to harvest")]
    NotReady(usize),
    #[error("plant {0} is not unlocked")]
    PlantLocked(String),
    #[error("{0} is already unlocked")]
    AlreadyUnlocked(String),
    #[error("need {needed} coins, have {available}")]
    InsufficientCoins { needed: u64, available: u64 },
    #[error("pet {0} is not unlocked")]
    PetNotUnlocked(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result of a successful harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReward {
    pub plot: usize,
    pub plant_id: String,
    pub coins: u64,
    /// The plant's rarity counts toward the rare-plant counter.
    pub notable: bool,
}

/// What a single tick changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub stages_advanced: usize,
    pub weeds_appeared: usize,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.stages_advanced > 0 || self.weeds_appeared > 0
    }
}

/// A command as issued by the presentation layer or a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Plant { plot: usize, plant_id: String },
    Water { plot: usize },
    RemoveWeeds { plot: usize },
    Harvest { plot: usize },
    UnlockPlant { plant_id: String },
    UnlockPet { pet_id: String },
    SetActivePet { pet_id: Option<String> },
    DiscoverRarePlant,
    Tick,
    AutoWater,
}

impl Command {
    /// Timer-driven commands, as opposed to player-issued ones.
    pub fn is_periodic(&self) -> bool {
        matches!(self, Command::Tick | Command::AutoWater)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// The command was invalid; state is unchanged.
    Rejected,
    Harvested(HarvestReward),
    /// Id of the plant found, or `None` when nothing turned up.
    Discovery(Option<String>),
    Ticked(TickReport),
    Watered(usize),
}

impl CommandOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, CommandOutcome::Rejected)
    }

    /// Whether the state may have changed and should be persisted.
    pub fn mutated(&self) -> bool {
        match self {
            CommandOutcome::Applied | CommandOutcome::Harvested(_) => true,
            CommandOutcome::Rejected => false,
            CommandOutcome::Discovery(found) => found.is_some(),
            CommandOutcome::Ticked(report) => report.changed(),
            CommandOutcome::Watered(n) => *n > 0,
        }
    }
}

/// Main simulation engine
pub struct GardenEngine {
    state: GameState,
    catalog: Arc<Catalog>,
    config: GardenConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    /// Stat deltas not yet mirrored into the profile.
    pending_stats: Vec<StatsDelta>,
    last_tick_at: Option<u64>,
    play_ms_carry: u64,
}

impl GardenEngine {
    /// Create an engine over a fresh garden.
    pub fn new(config: GardenConfig, catalog: Arc<Catalog>, clock: Arc<dyn Clock>) -> Self {
        let state = GameState::initial(&config, &catalog);
        Self::with_state(state, config, catalog, clock)
    }

    /// Create an engine over a previously saved garden.
    pub fn from_state(
        mut state: GameState,
        config: GardenConfig,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        state.sanitize(&catalog, config.plot_count);
        Self::with_state(state, config, catalog, clock)
    }

    fn with_state(
        state: GameState,
        config: GardenConfig,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "engine started with an invalid config");
        }
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state,
            catalog,
            config,
            clock,
            rng,
            pending_stats: Vec::new(),
            last_tick_at: None,
            play_ms_carry: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &GardenConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// The active pet's definition, if any.
    pub fn active_pet(&self) -> Option<&PetDef> {
        self.state
            .active_pet
            .as_deref()
            .and_then(|id| self.catalog.pet(id).ok())
    }

    pub fn modifiers(&self) -> PetModifiers {
        pets::resolve(self.active_pet())
    }

    /// Drain stat deltas produced since the last call.
    pub fn take_stat_deltas(&mut self) -> Vec<StatsDelta> {
        std::mem::take(&mut self.pending_stats)
    }

    /// Clone the state for saving, stamping the save time.
    pub fn snapshot_for_save(&mut self) -> GameState {
        self.state.last_save_time = self.clock.now_ms();
        self.state.clone()
    }

    fn planting(&self, plot: usize) -> Result<&Planting, CommandError> {
        self.state
            .plots
            .get(plot)
            .ok_or(CommandError::PlotOutOfRange(plot))?
            .as_ref()
            .ok_or(CommandError::PlotEmpty(plot))
    }

    fn planting_mut(&mut self, plot: usize) -> Result<&mut Planting, CommandError> {
        self.state
            .plots
            .get_mut(plot)
            .ok_or(CommandError::PlotOutOfRange(plot))?
            .as_mut()
            .ok_or(CommandError::PlotEmpty(plot))
    }

    fn charge(&mut self, cost: u64) -> Result<(), CommandError> {
        if self.state.coins < cost {
            return Err(CommandError::InsufficientCoins {
                needed: cost,
                available: self.state.coins,
            });
        }
        self.state.coins -= cost;
        Ok(())
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Plant an unlocked plant in an empty plot.
    pub fn try_plant(&mut self, plot: usize, plant_id: &str) -> Result<(), CommandError> {
        let slot = self
            .state
            .plots
            .get(plot)
            .ok_or(CommandError::PlotOutOfRange(plot))?;
        if slot.is_some() {
            return Err(CommandError::PlotOccupied(plot));
        }
        let plant = self.catalog.plant(plant_id)?;
        if !self.state.is_plant_unlocked(&plant.id) {
            return Err(CommandError::PlantLocked(plant.id.clone()));
        }

        let now = self.clock.now_ms();
        self.state.plots[plot] = Some(Planting::new(plant.id.clone(), now));
        let occupied = self.state.occupied_plots() as u64;
        self.pending_stats.push(StatsDelta::planted(occupied));
        debug!(plot, plant = plant_id, "planted");
        Ok(())
    }

    pub fn plant(&mut self, plot: usize, plant_id: &str) -> bool {
        swallow("plant", self.try_plant(plot, plant_id)).is_some()
    }

    /// Refresh `last_watered` and raise health.
    pub fn try_water(&mut self, plot: usize) -> Result<(), CommandError> {
        let now = self.clock.now_ms();
        self.planting_mut(plot)?.water(now, WATER_HEALTH_GAIN);
        Ok(())
    }

    pub fn water(&mut self, plot: usize) -> bool {
        swallow("water", self.try_water(plot)).is_some()
    }

    pub fn try_remove_weeds(&mut self, plot: usize) -> Result<(), CommandError> {
        let planting = self.planting_mut(plot)?;
        planting.has_weeds = false;
        planting.heal(WEED_HEALTH_GAIN);
        Ok(())
    }

    pub fn remove_weeds(&mut self, plot: usize) -> bool {
        swallow("remove_weeds", self.try_remove_weeds(plot)).is_some()
    }

    /// Empty a ready plot and credit its sale price.
    pub fn try_harvest(&mut self, plot: usize) -> Result<HarvestReward, CommandError> {
        let planting = self.planting(plot)?;
        if !planting.stage.is_ready() {
            return Err(CommandError::NotReady(plot));
        }
        let plant = self.catalog.plant(&planting.plant_id)?;

        let coins = pets::harvest_coins(plant.sell_price, self.modifiers().coin_multiplier);
        let notable = plant.rarity.is_notable();
        let plant_id = plant.id.clone();

        self.state.plots[plot] = None;
        self.state.coins += coins;
        self.pending_stats
            .push(StatsDelta::harvested(coins, self.state.coins));
        if notable {
            self.state.rare_plants_discovered += 1;
            self.pending_stats.push(StatsDelta::rare_found());
        }

        info!(plot, plant = %plant_id, coins, "harvested");
        Ok(HarvestReward {
            plot,
            plant_id,
            coins,
            notable,
        })
    }

    pub fn harvest(&mut self, plot: usize) -> Option<HarvestReward> {
        swallow("harvest", self.try_harvest(plot))
    }

    /// Deduct the unlock cost and unlock the plant, or do neither.
    pub fn try_unlock_plant(&mut self, plant_id: &str) -> Result<(), CommandError> {
        let plant = self.catalog.plant(plant_id)?;
        if self.state.is_plant_unlocked(&plant.id) {
            return Err(CommandError::AlreadyUnlocked(plant.id.clone()));
        }
        let (id, cost) = (plant.id.clone(), plant.unlock_cost);
        self.charge(cost)?;
        self.grant_plant(id);
        Ok(())
    }

    pub fn unlock_plant(&mut self, plant_id: &str) -> bool {
        swallow("unlock_plant", self.try_unlock_plant(plant_id)).is_some()
    }

    fn grant_plant(&mut self, id: String) {
        info!(plant = %id, coins = self.state.coins, "plant unlocked");
        self.pending_stats
            .push(StatsDelta::plant_unlocked(id == GIANT_BEANSTALK));
        self.state.unlocked_plants.push(id);
    }

    pub fn try_unlock_pet(&mut self, pet_id: &str) -> Result<(), CommandError> {
        let pet = self.catalog.pet(pet_id)?;
        if self.state.is_pet_unlocked(&pet.id) {
            return Err(CommandError::AlreadyUnlocked(pet.id.clone()));
        }
        let (id, cost) = (pet.id.clone(), pet.unlock_cost);
        self.charge(cost)?;
        info!(pet = %id, coins = self.state.coins, "pet unlocked");
        self.state.unlocked_pets.push(id);
        self.pending_stats.push(StatsDelta::pet_unlocked());
        Ok(())
    }

    pub fn unlock_pet(&mut self, pet_id: &str) -> bool {
        swallow("unlock_pet", self.try_unlock_pet(pet_id)).is_some()
    }

    /// Activate an unlocked pet, or deactivate with `None`.
    pub fn try_set_active_pet(&mut self, pet_id: Option<&str>) -> Result<(), CommandError> {
        let Some(pet_id) = pet_id else {
            self.state.active_pet = None;
            return Ok(());
        };
        let pet = self.catalog.pet(pet_id)?;
        if !self.state.is_pet_unlocked(&pet.id) {
            return Err(CommandError::PetNotUnlocked(pet.id.clone()));
        }
        self.state.active_pet = Some(pet.id.clone());
        Ok(())
    }

    pub fn set_active_pet(&mut self, pet_id: Option<&str>) -> bool {
        swallow("set_active_pet", self.try_set_active_pet(pet_id)).is_some()
    }

    /// Roll the active rare-finder's chance to unlock a random notable plant
    /// for free. Returns the plant found, if any.
    pub fn discover_rare_plant(&mut self) -> Option<String> {
        let modifiers = self.modifiers();
        if !modifiers.is_rare_finder() || !self.rng.gen_bool(modifiers.rare_find_chance.min(1.0)) {
            return None;
        }
        let pool: Vec<&str> = self
            .catalog
            .notable_plants()
            .filter(|p| !self.state.is_plant_unlocked(&p.id))
            .map(|p| p.id.as_str())
            .collect();
        let found = pool.choose(&mut self.rng)?.to_string();

        self.state.rare_plants_discovered += 1;
        self.pending_stats.push(StatsDelta::rare_found());
        self.grant_plant(found.clone());
        Some(found)
    }

    // ── Periodic sweeps ─────────────────────────────────────────────────

    /// Recompute every plot's stage and roll for weeds.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now_ms();
        let modifiers = self.modifiers();
        let mut report = TickReport::default();

        for planting in self.state.plots.iter_mut().flatten() {
            let Ok(plant) = self.catalog.plant(&planting.plant_id) else {
                continue;
            };
            let stage = derive_stage(
                planting.planted_at,
                now,
                plant.growth_time_secs,
                modifiers.growth_multiplier,
            );
            if stage != planting.stage {
                planting.stage = stage;
                report.stages_advanced += 1;
            }
            if stage != Stage::Ready
                && !planting.has_weeds
                && roll_weeds(&mut self.rng, modifiers.weed_prevention, self.config.weed_chance)
            {
                planting.has_weeds = true;
                report.weeds_appeared += 1;
            }
        }

        self.record_play_time(now);
        report
    }

    fn record_play_time(&mut self, now: u64) {
        if let Some(last) = self.last_tick_at {
            self.play_ms_carry += now.saturating_sub(last);
            let secs = self.play_ms_carry / 1000;
            if secs > 0 {
                self.play_ms_carry %= 1000;
                self.pending_stats.push(StatsDelta::play_time(secs));
            }
        }
        self.last_tick_at = Some(now);
    }

    /// Water every growing plot if the active pet auto-waters. Returns the
    /// number of plots watered.
    pub fn auto_water_sweep(&mut self) -> usize {
        if !self.modifiers().auto_water {
            return 0;
        }
        let now = self.clock.now_ms();
        let mut watered = 0;
        for planting in self.state.plots.iter_mut().flatten() {
            if !planting.stage.is_ready() {
                planting.water(now, WATER_HEALTH_GAIN);
                watered += 1;
            }
        }
        watered
    }

    /// Apply a queued command.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        let applied = |ok: bool| {
            if ok {
                CommandOutcome::Applied
            } else {
                CommandOutcome::Rejected
            }
        };
        match command {
            Command::Plant { plot, plant_id } => applied(self.plant(plot, &plant_id)),
            Command::Water { plot } => applied(self.water(plot)),
            Command::RemoveWeeds { plot } => applied(self.remove_weeds(plot)),
            Command::Harvest { plot } => self
                .harvest(plot)
                .map_or(CommandOutcome::Rejected, CommandOutcome::Harvested),
            Command::UnlockPlant { plant_id } => applied(self.unlock_plant(&plant_id)),
            Command::UnlockPet { pet_id } => applied(self.unlock_pet(&pet_id)),
            Command::SetActivePet { pet_id } => applied(self.set_active_pet(pet_id.as_deref())),
            Command::DiscoverRarePlant => CommandOutcome::Discovery(self.discover_rare_plant()),
            Command::Tick => CommandOutcome::Ticked(self.tick()),
            Command::AutoWater => CommandOutcome::Watered(self.auto_water_sweep()),
        }
    }
}

fn swallow<T>(command: &'static str, result: Result<T, CommandError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(command, error = %e, "command rejected");
            None
        }
    }
}
