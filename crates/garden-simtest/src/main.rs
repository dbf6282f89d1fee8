//! Garden Headless Simulation Harness
//!
//! Validates the pure rules, the engine command surface, and an async session
//! end to end. Runs entirely in-process with a manual clock and an in-memory
//! gateway: no storage on disk, no UI.
//!
//! Usage:
//!   cargo run -p garden-simtest
//!   cargo run -p garden-simtest -- --verbose
//!   cargo run -p garden-simtest -- --config garden.json
//!   RUST_LOG=garden_core=debug cargo run -p garden-simtest

use std::sync::Arc;

use garden_core::clock::ManualClock;
use garden_core::config::GardenConfig;
use garden_core::engine::{Command, CommandError, CommandOutcome, GardenEngine};
use garden_core::offline;
use garden_core::persistence::{self, MemoryGateway};
use garden_core::session::GardenSession;
use garden_core::state::{GameState, Planting};
use garden_logic::achievements::{evaluate, fresh_achievements, ProfileStats, StatsDelta};
use garden_logic::catalog::{Catalog, Rarity};
use garden_logic::growth::{derive_stage, Stage};
use garden_logic::leaderboard;
use garden_logic::pets;
use tracing::info;
use tracing_subscriber::EnvFilter;

const T0: u64 = 1_700_000_000_000;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    let default_filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => match args.get(i + 1).map(GardenConfig::load) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                eprintln!("error: {e}");
                std::process::exit(2);
            }
            None => {
                eprintln!("error: --config needs a path");
                std::process::exit(2);
            }
        },
        None => GardenConfig::default(),
    };
    let config = match config.rng_seed {
        Some(_) => config,
        None => config.with_seed(42),
    };

    println!("=== Garden Simulation Harness ===\n");
    if verbose {
        if let Ok(json) = serde_json::to_string_pretty(&config) {
            println!("config: {json}\n");
        }
    }
    info!(plots = config.plot_count, "harness starting");

    let catalog = Arc::new(Catalog::standard());
    let mut results = Vec::new();

    // 1. Catalog tables
    results.extend(validate_catalog(&catalog));

    // 2. Growth model sweep
    results.extend(validate_growth(&catalog));

    // 3. Engine command surface
    results.extend(validate_commands(&config, &catalog));

    // 4. Pet abilities
    results.extend(validate_pets(&config, &catalog));

    // 5. Offline reconciliation
    results.extend(validate_offline(&config, &catalog));

    // 6. Achievements & leaderboard
    results.extend(validate_progression());

    // 7. Async session round trip
    results.extend(validate_session(&config, &catalog).await);

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn new_engine(config: &GardenConfig, catalog: &Arc<Catalog>) -> (GardenEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let engine = GardenEngine::new(config.clone(), catalog.clone(), clock.clone());
    (engine, clock)
}

/// Same config with weeds switched off so stage checks are deterministic.
fn weedless(config: &GardenConfig) -> GardenConfig {
    GardenConfig {
        weed_chance: 0.0,
        ..config.clone()
    }
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Catalog ---");
    let mut results = Vec::new();

    results.push(check(
        "catalog_plants",
        catalog.plants().len() >= 15,
        format!("{} plants, {} pets", catalog.plants().len(), catalog.pets().len()),
    ));

    let rarities = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythical,
    ];
    let missing: Vec<_> = rarities
        .iter()
        .filter(|r| !catalog.plants().iter().any(|p| p.rarity == **r))
        .collect();
    results.push(check(
        "catalog_all_rarities",
        missing.is_empty(),
        if missing.is_empty() {
            "every rarity has a plant".to_string()
        } else {
            format!("missing {:?}", missing)
        },
    ));

    let starters_free = catalog
        .starter_plants()
        .iter()
        .all(|id| catalog.plant(id).is_ok_and(|p| p.unlock_cost == 0));
    results.push(check(
        "catalog_starters",
        starters_free,
        format!("starters {:?}", catalog.starter_plants()),
    ));

    let notable = catalog.notable_plants().count();
    results.push(check(
        "catalog_notable_pool",
        notable > 0 && catalog.plant("giant_beanstalk").is_ok(),
        format!("{notable} notable plants"),
    ));

    let revalidated = Catalog::new(
        catalog.plants().to_vec(),
        catalog.pets().to_vec(),
        catalog.starter_plants().to_vec(),
    );
    results.push(check(
        "catalog_validates",
        revalidated.is_ok(),
        match revalidated {
            Ok(_) => "standard tables pass load-time validation".to_string(),
            Err(e) => e.to_string(),
        },
    ));

    results
}

// ── 2. Growth ───────────────────────────────────────────────────────────

fn validate_growth(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Growth Model ---");
    let mut results = Vec::new();

    let mut regressions = 0;
    let mut not_ready = 0;
    for plant in catalog.plants() {
        let duration_ms = (plant.growth_time_secs * 1000.0).ceil() as u64;
        let mut previous = Stage::Seed;
        for step in 0..=40 {
            let stage = derive_stage(T0, T0 + duration_ms * step / 32, plant.growth_time_secs, 1.0);
            if stage < previous {
                regressions += 1;
            }
            previous = stage;
        }
        if derive_stage(T0, T0 + duration_ms, plant.growth_time_secs, 1.0) != Stage::Ready {
            not_ready += 1;
        }
    }
    results.push(check(
        "growth_monotonic",
        regressions == 0,
        format!("{regressions} regressions across {} plants", catalog.plants().len()),
    ));
    results.push(check(
        "growth_ready_at_duration",
        not_ready == 0,
        format!("{not_ready} plants not ready at full duration"),
    ));

    let skewed = derive_stage(T0, T0 - 5_000, 30.0, 1.0);
    results.push(check(
        "growth_clock_skew",
        skewed == Stage::Seed,
        format!("now before plantedAt gives {:?}", skewed),
    ));

    results
}

// ── 3. Commands ─────────────────────────────────────────────────────────

fn validate_commands(config: &GardenConfig, catalog: &Arc<Catalog>) -> Vec<TestResult> {
    println!("--- Engine Commands ---");
    let mut results = Vec::new();
    let (mut engine, clock) = new_engine(&weedless(config), catalog);

    let before = engine.state().clone();
    let rejected = engine.harvest(0).is_none() && engine.state() == &before;
    results.push(check(
        "harvest_empty_noop",
        rejected,
        "harvest on an empty plot leaves state unchanged",
    ));

    engine.plant(0, "tomato");
    let occupied = engine.try_plant(0, "carrot");
    results.push(check(
        "plant_occupied_rejected",
        occupied == Err(CommandError::PlotOccupied(0)),
        format!("{:?}", occupied),
    ));

    clock.advance_secs(10);
    engine.tick();
    let early = engine.try_harvest(0);
    results.push(check(
        "harvest_not_ready",
        early == Err(CommandError::NotReady(0)),
        format!("{:?}", early),
    ));

    clock.advance_secs(20);
    engine.tick();
    let reward = engine.harvest(0);
    results.push(check(
        "harvest_ready",
        reward.as_ref().map(|r| r.coins) == Some(10) && engine.state().plots[0].is_none(),
        format!("{:?}, coins now {}", reward.map(|r| r.coins), engine.state().coins),
    ));

    let coins = engine.state().coins;
    let unaffordable = engine.try_unlock_plant("potato");
    let atomic = coins < 75
        && matches!(unaffordable, Err(CommandError::InsufficientCoins { .. }))
        && engine.state().coins == coins
        && !engine.state().is_plant_unlocked("potato");
    results.push(check(
        "unlock_atomic",
        atomic,
        format!("{} coins, potato costs 75", coins),
    ));

    let unlocked = engine.unlock_plant("lettuce") && !engine.unlock_plant("lettuce");
    let count = engine
        .state()
        .unlocked_plants
        .iter()
        .filter(|p| *p == "lettuce")
        .count();
    results.push(check(
        "unlock_idempotent",
        unlocked && count == 1 && engine.state().coins == coins - 40,
        format!("lettuce listed {count} time(s), {} coins left", engine.state().coins),
    ));

    let active = engine.set_active_pet(Some("unknown_id"));
    results.push(check(
        "unknown_pet_noop",
        !active && engine.state().active_pet.is_none(),
        "setting an unknown pet leaves activePet unchanged",
    ));

    let outcome = engine.apply(Command::Plant {
        plot: config.plot_count,
        plant_id: "tomato".into(),
    });
    results.push(check(
        "plot_out_of_range",
        outcome == CommandOutcome::Rejected,
        format!("{:?}", outcome),
    ));

    results
}

// ── 4. Pets ─────────────────────────────────────────────────────────────

/// An engine over a fresh garden with `pet` unlocked and active.
fn engine_with_pet(
    config: &GardenConfig,
    catalog: &Arc<Catalog>,
    pet: &str,
) -> (GardenEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let state = GameState {
        unlocked_pets: vec![pet.to_string()],
        active_pet: Some(pet.to_string()),
        ..GameState::initial(config, catalog)
    };
    let engine = GardenEngine::from_state(state, config.clone(), catalog.clone(), clock.clone());
    (engine, clock)
}

fn validate_pets(config: &GardenConfig, catalog: &Arc<Catalog>) -> Vec<TestResult> {
    println!("--- Pet Abilities ---");
    let mut results = Vec::new();

    let pig = pets::resolve(catalog.pet("golden_pig").ok());
    results.push(check(
        "coin_boost",
        pets::harvest_coins(100, pig.coin_multiplier) == 200,
        format!("sell 100 with x{} gives 200", pig.coin_multiplier),
    ));

    let (mut engine, clock) = engine_with_pet(&weedless(config), catalog, "hummingbird");
    engine.plant(0, "carrot"); // 45s at 0.5
    clock.advance_secs(23);
    engine.tick();
    let stage = engine.state().plots[0].as_ref().map(|p| p.stage);
    results.push(check(
        "growth_boost",
        stage == Some(Stage::Ready),
        format!("carrot after 23s with hummingbird: {:?}", stage),
    ));

    let weedy = GardenConfig {
        weed_chance: 1.0,
        ..config.clone()
    };
    let (mut engine, _) = engine_with_pet(&weedy, catalog, "ladybug");
    engine.plant(0, "tomato");
    let trials = 2_000;
    let mut weeded = 0;
    for _ in 0..trials {
        if engine.tick().weeds_appeared > 0 {
            weeded += 1;
            engine.remove_weeds(0);
        }
    }
    let rate = weeded as f64 / trials as f64;
    results.push(check(
        "weed_prevention",
        (0.15..0.25).contains(&rate),
        format!("weed rate {:.3} with 0.8 prevention (expected ~0.2)", rate),
    ));

    let (mut engine, clock) = engine_with_pet(&weedless(config), catalog, "frog");
    engine.plant(0, "carrot");
    clock.advance_secs(20);
    let watered = engine.auto_water_sweep();
    let last = engine.state().plots[0].as_ref().map(|p| p.last_watered);
    results.push(check(
        "auto_water",
        watered == 1 && last == Some(T0 + 20_000),
        format!("{watered} plot(s) watered"),
    ));

    let (mut engine, _) = engine_with_pet(config, catalog, "owl");
    let found: Vec<String> = (0..200).filter_map(|_| engine.discover_rare_plant()).collect();
    let all_notable = found
        .iter()
        .all(|id| catalog.plant(id).is_ok_and(|p| p.rarity.is_notable()));
    results.push(check(
        "rare_finder",
        !found.is_empty() && all_notable && engine.state().coins == config.starting_coins,
        format!("{} rare plant(s) found for free", found.len()),
    ));

    results
}

// ── 5. Offline ──────────────────────────────────────────────────────────

fn validate_offline(config: &GardenConfig, catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Offline Reconciliation ---");
    let mut results = Vec::new();

    let mut state = GameState::initial(config, catalog);
    if state.plots.len() < 2 {
        state.plots.resize(2, None);
    }
    state.plots[0] = Some(Planting::new("sunflower", T0));
    state.plots[1] = Some(Planting::new("giant_beanstalk", T0));
    state.last_save_time = T0;

    let report = offline::reconcile(&mut state, catalog, T0 + 3_600_000, config.offline_min_elapsed_ms);
    let sunflower = state.plots[0].as_ref().map(|p| p.stage);
    let beanstalk = state.plots[1].as_ref().map(|p| p.stage);
    results.push(check(
        "offline_hour",
        report.plots_advanced == 2
            && sunflower == Some(Stage::Ready)
            && beanstalk == Some(Stage::Growing),
        format!("sunflower {:?}, beanstalk {:?}", sunflower, beanstalk),
    ));

    let mut fresh = GameState::initial(config, catalog);
    fresh.plots[0] = Some(Planting::new("tomato", T0 - 60_000));
    fresh.last_save_time = T0;
    let just_under = T0 + config.offline_min_elapsed_ms.saturating_sub(1);
    let skipped = offline::reconcile(&mut fresh, catalog, just_under, config.offline_min_elapsed_ms);
    results.push(check(
        "offline_short_gap",
        skipped.elapsed_ms == 0
            && fresh.plots[0].as_ref().map(|p| p.stage) == Some(Stage::Seed),
        "gaps under the threshold are skipped",
    ));

    results
}

// ── 6. Progression ──────────────────────────────────────────────────────

fn validate_progression() -> Vec<TestResult> {
    println!("--- Achievements & Leaderboard ---");
    let mut results = Vec::new();

    let mut stats = ProfileStats::starting(2, 50);
    let mut records = fresh_achievements();
    evaluate(&mut records, &stats, T0);
    stats.apply(&StatsDelta::planted(1));
    let first = evaluate(&mut records, &stats, T0 + 1);
    stats.apply(&StatsDelta::planted(2));
    let second = evaluate(&mut records, &stats, T0 + 2);
    let stamp = records
        .iter()
        .find(|r| r.id == "first_seed")
        .and_then(|r| r.unlocked_at);
    results.push(check(
        "first_seed_once",
        first == vec!["first_seed"] && second.is_empty() && stamp == Some(T0 + 1),
        format!("unlocked at {:?}", stamp),
    ));

    let boards: Vec<ProfileStats> = [300, 500, 100]
        .into_iter()
        .map(|coins| {
            let mut s = ProfileStats::default();
            s.apply(&StatsDelta::harvested(coins, coins));
            s
        })
        .collect();
    let order: Vec<u64> = leaderboard::rank(&boards, |s| s)
        .into_iter()
        .map(leaderboard::score)
        .collect();
    results.push(check(
        "leaderboard_order",
        order == vec![500, 300, 100],
        format!("{:?}", order),
    ));

    results
}

// ── 7. Session ──────────────────────────────────────────────────────────

async fn validate_session(config: &GardenConfig, catalog: &Arc<Catalog>) -> Vec<TestResult> {
    println!("--- Session ---");
    let mut results = Vec::new();
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));

    let session = match GardenSession::start(
        weedless(config),
        catalog.clone(),
        gateway.clone(),
        clock.clone(),
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            results.push(check("session_start", false, e.to_string()));
            return results;
        }
    };

    let steps = async {
        session.create_profile("Harness", None).await?;
        session
            .execute(Command::Plant {
                plot: 0,
                plant_id: "tomato".into(),
            })
            .await?;
        clock.advance_secs(30);
        session.execute(Command::Tick).await?;
        let outcome = session.execute(Command::Harvest { plot: 0 }).await?;
        let profile = session.profile().await?;
        session.shutdown().await?;
        Ok::<_, garden_core::session::SessionError>((outcome, profile))
    };

    match steps.await {
        Ok((outcome, profile)) => {
            results.push(check(
                "session_harvest",
                matches!(outcome, CommandOutcome::Harvested(ref r) if r.coins == 10),
                format!("{:?}", outcome),
            ));
            let harvests = profile.map(|p| p.stats.total_harvests);
            results.push(check(
                "session_profile_stats",
                harvests == Some(1),
                format!("profile harvests {:?}", harvests),
            ));
        }
        Err(e) => results.push(check("session_round_trip", false, e.to_string())),
    }

    let saved = persistence::load_game_state(gateway.as_ref()).await;
    let coins = saved.as_ref().ok().and_then(|s| s.as_ref()).map(|s| s.coins);
    results.push(check(
        "session_saved",
        coins == Some(config.starting_coins + 10),
        format!("saved coins {:?}", coins),
    ));

    results
}
