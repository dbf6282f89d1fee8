//! Offline progress reconciliation.
//!
//! On load, every occupied plot's stage is fast-forwarded to the current
//! time using the growth multiplier of the pet that was active when the
//! garden was saved. Only stages move: weed rolls, health, and auto-water
//! are not simulated for the offline window.

use garden_logic::catalog::Catalog;
use garden_logic::growth::derive_stage;
use garden_logic::pets;
use tracing::info;

use crate::state::GameState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfflineReport {
    /// Time since the last save, or 0 when reconciliation was skipped.
    pub elapsed_ms: u64,
    pub plots_advanced: usize,
}

/// Fast-forward plot stages for the time elapsed since `last_save_time`.
pub fn reconcile(
    state: &mut GameState,
    catalog: &Catalog,
    now_ms: u64,
    min_elapsed_ms: u64,
) -> OfflineReport {
    let elapsed_ms = now_ms.saturating_sub(state.last_save_time);
    if elapsed_ms < min_elapsed_ms.max(1) {
        return OfflineReport::default();
    }

    let active_pet = state.active_pet.as_deref().and_then(|id| catalog.pet(id).ok());
    let growth_multiplier = pets::resolve(active_pet).growth_multiplier;

    let mut plots_advanced = 0;
    for planting in state.plots.iter_mut().flatten() {
        let Ok(plant) = catalog.plant(&planting.plant_id) else {
            continue;
        };
        let stage = derive_stage(
            planting.planted_at,
            now_ms,
            plant.growth_time_secs,
            growth_multiplier,
        );
        if stage > planting.stage {
            planting.stage = stage;
            plots_advanced += 1;
        }
    }

    info!(elapsed_ms, plots_advanced, "offline progress reconciled");
    OfflineReport {
        elapsed_ms,
        plots_advanced,
    }
}
