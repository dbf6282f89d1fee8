//! Integration tests for the async session.
//!
//! Exercises: load → offline reconciliation → queued commands and timers →
//! stat mirroring into profiles → fire-and-forget saves → shutdown.
//!
//! Time is paused so interval timers only fire when the runtime is idle, and
//! the engine reads a manual clock, so every run is deterministic.

use std::sync::Arc;
use std::time::Duration;

use garden_core::config::GardenConfig;
use garden_core::engine::{Command, CommandOutcome};
use garden_core::persistence::{
    self, MemoryGateway, PersistenceGateway, ALL_PROFILES_KEY, GAME_STATE_KEY, PROFILE_KEY,
};
use garden_core::prelude::*;
use garden_core::session::{GardenSession, SessionError};
use garden_logic::growth::Stage;

const T0: u64 = 1_700_000_000_000;

// ── Helpers ────────────────────────────────────────────────────────────

fn config() -> GardenConfig {
    GardenConfig {
        weed_chance: 0.0,
        ..GardenConfig::default().with_seed(3)
    }
}

async fn start(
    gateway: Arc<MemoryGateway>,
    clock: Arc<ManualClock>,
) -> GardenSession {
    GardenSession::start(
        config(),
        Arc::new(Catalog::standard()),
        gateway,
        clock,
    )
    .await
    .unwrap()
}

fn plant(plot: usize, id: &str) -> Command {
    Command::Plant {
        plot,
        plant_id: id.into(),
    }
}

// ── Startup ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_fresh_start() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway, clock).await;

    let state = session.snapshot().await.unwrap();
    assert_eq!(state.coins, 50);
    assert_eq!(state.plots.len(), 6);
    assert_eq!(state.unlocked_plants, vec!["tomato", "carrot"]);
    assert_eq!(session.profile().await.unwrap(), None);
    assert_eq!(session.offline_report().plots_advanced, 0);
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_offline_progress_on_start() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut saved = GameState::initial(&config(), &Catalog::standard());
    saved.plots[0] = Some(Planting::new("potato", T0));
    saved.last_save_time = T0;
    persistence::save_game_state(gateway.as_ref(), &saved)
        .await
        .unwrap();

    let clock = Arc::new(ManualClock::new(T0 + 3_600_000));
    let session = start(gateway, clock).await;

    let report = session.offline_report();
    assert_eq!(report.elapsed_ms, 3_600_000);
    assert_eq!(report.plots_advanced, 1);
    let state = session.snapshot().await.unwrap();
    assert_eq!(state.plots[0].as_ref().unwrap().stage, Stage::Ready);
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_offline_growth_ignores_locked_active_pet() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut saved = GameState::initial(&config(), &Catalog::standard());
    saved.plots[0] = Some(Planting::new("watermelon", T0)); // 600s
    saved.active_pet = Some("hummingbird".into());
    saved.unlocked_pets.clear();
    saved.last_save_time = T0;
    persistence::save_game_state(gateway.as_ref(), &saved)
        .await
        .unwrap();

    let clock = Arc::new(ManualClock::new(T0 + 300_000));
    let session = start(gateway, clock).await;

    let state = session.snapshot().await.unwrap();
    assert_eq!(state.active_pet, None);
    assert_eq!(state.plots[0].as_ref().unwrap().stage, Stage::Growing);

    session.execute(Command::Tick).await.unwrap();
    let state = session.snapshot().await.unwrap();
    assert_eq!(state.plots[0].as_ref().unwrap().stage, Stage::Growing);
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_save_starts_fresh() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway
        .set(GAME_STATE_KEY, "{\"coins\":".into())
        .await
        .unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway, clock).await;
    assert_eq!(session.snapshot().await.unwrap().coins, 50);
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let result = GardenSession::start(
        GardenConfig {
            plot_count: 0,
            ..GardenConfig::default()
        },
        Arc::new(Catalog::standard()),
        Arc::new(MemoryGateway::new()),
        Arc::new(ManualClock::new(T0)),
    )
    .await;
    assert!(matches!(result, Err(SessionError::Config(_))));
}

// ── Commands and saves ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_commands_are_saved() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway.clone(), clock.clone()).await;

    assert_eq!(
        session.execute(plant(0, "tomato")).await.unwrap(),
        CommandOutcome::Applied
    );
    assert!(session
        .execute(plant(0, "carrot"))
        .await
        .unwrap()
        .is_rejected());

    clock.advance_secs(30);
    session.execute(Command::Tick).await.unwrap();
    match session.execute(Command::Harvest { plot: 0 }).await.unwrap() {
        CommandOutcome::Harvested(reward) => assert_eq!(reward.coins, 10),
        other => panic!("unexpected {other:?}"),
    }
    session.shutdown().await.unwrap();

    let saved = persistence::load_game_state(gateway.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.coins, 60);
    assert!(saved.plots[0].is_none());
    assert_eq!(saved.last_save_time, T0 + 30_000);
}

#[tokio::test(start_paused = true)]
async fn test_save_failure_keeps_memory_state() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway.clone(), clock).await;

    gateway.set_failing(true);
    session.execute(plant(2, "carrot")).await.unwrap();
    let state = session.snapshot().await.unwrap();
    assert_eq!(state.plots[2].as_ref().unwrap().plant_id, "carrot");
    session.shutdown().await.unwrap();

    gateway.set_failing(false);
    assert!(gateway.peek(GAME_STATE_KEY).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_closed_after_shutdown() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway, clock).await;
    session.shutdown().await.unwrap();

    assert!(matches!(
        session.execute(Command::Tick).await,
        Err(SessionError::Closed)
    ));
    assert!(matches!(session.snapshot().await, Err(SessionError::Closed)));
}

// ── Timers ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_tick_timer_advances_stages() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway, clock.clone()).await;

    session.execute(plant(0, "tomato")).await.unwrap();
    clock.advance_secs(30);
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let state = session.snapshot().await.unwrap();
    assert_eq!(state.plots[0].as_ref().unwrap().stage, Stage::Ready);
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_auto_water_timer() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut saved = GameState::initial(&config(), &Catalog::standard());
    saved.coins = 1_000;
    saved.last_save_time = T0;
    persistence::save_game_state(gateway.as_ref(), &saved)
        .await
        .unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway, clock.clone()).await;

    session
        .execute(Command::UnlockPet {
            pet_id: "frog".into(),
        })
        .await
        .unwrap();
    session
        .execute(Command::SetActivePet {
            pet_id: Some("frog".into()),
        })
        .await
        .unwrap();
    session.execute(plant(1, "carrot")).await.unwrap();

    clock.advance_secs(5);
    tokio::time::sleep(Duration::from_secs(31)).await;

    let state = session.snapshot().await.unwrap();
    assert_eq!(
        state.plots[1].as_ref().unwrap().last_watered,
        T0 + 5_000
    );
    session.shutdown().await.unwrap();
}

// ── Profiles ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_stats_flow_into_profile() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway.clone(), clock.clone()).await;

    let profile = session.create_profile("  Rosemary ", Some("🌻")).await.unwrap();
    assert_eq!(profile.username, "Rosemary");
    assert_eq!(profile.stats.plants_unlocked, 2);
    assert_eq!(profile.stats.highest_coin_balance, 50);

    session.execute(plant(0, "tomato")).await.unwrap();
    clock.advance_secs(30);
    session.execute(Command::Tick).await.unwrap();
    session
        .execute(Command::Harvest { plot: 0 })
        .await
        .unwrap();

    let profile = session.profile().await.unwrap().unwrap();
    assert_eq!(profile.stats.total_plants_grown, 1);
    assert_eq!(profile.stats.total_harvests, 1);
    assert_eq!(profile.stats.total_coins_earned, 10);
    assert_eq!(profile.stats.highest_coin_balance, 60);
    let unlocked: Vec<&str> = profile
        .achievements
        .iter()
        .filter(|a| a.unlocked)
        .map(|a| a.id.as_str())
        .collect();
    assert_eq!(unlocked, vec!["first_seed", "first_harvest"]);
    session.shutdown().await.unwrap();

    let stored: UserProfile =
        serde_json::from_str(&gateway.peek(PROFILE_KEY).unwrap()).unwrap();
    assert_eq!(stored.stats.total_harvests, 1);
    let all: Vec<UserProfile> =
        serde_json::from_str(&gateway.peek(ALL_PROFILES_KEY).unwrap()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, stored.id);
}

#[tokio::test(start_paused = true)]
async fn test_profile_management() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway.clone(), clock.clone()).await;

    assert!(matches!(
        session.create_profile("ab", None).await,
        Err(SessionError::Profile(_))
    ));

    let first = session.create_profile("Thyme", None).await.unwrap();
    clock.advance_ms(1);
    let second = session.create_profile("Chives", None).await.unwrap();
    assert_ne!(first.id, second.id);

    session.switch_profile(&first.id).await.unwrap();
    assert_eq!(
        session.profile().await.unwrap().unwrap().username,
        "Thyme"
    );

    session.delete_profile(&first.id).await.unwrap();
    assert_eq!(
        session.profile().await.unwrap().unwrap().username,
        "Chives"
    );
    assert_eq!(session.leaderboard().await.unwrap().len(), 1);

    session.clear_profile().await.unwrap();
    assert_eq!(session.profile().await.unwrap(), None);
    session.shutdown().await.unwrap();

    assert!(gateway.peek(PROFILE_KEY).is_none());
    let all: Vec<UserProfile> =
        serde_json::from_str(&gateway.peek(ALL_PROFILES_KEY).unwrap()).unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_profiles_survive_restart() {
    let gateway = Arc::new(MemoryGateway::new());
    let clock = Arc::new(ManualClock::new(T0));
    let session = start(gateway.clone(), clock.clone()).await;
    let created = session.create_profile("Lavender", None).await.unwrap();
    session.execute(plant(3, "carrot")).await.unwrap();
    session.shutdown().await.unwrap();

    let session = start(gateway, clock).await;
    let profile = session.profile().await.unwrap().unwrap();
    assert_eq!(profile.id, created.id);
    assert_eq!(profile.stats.total_plants_grown, 1);
    let state = session.snapshot().await.unwrap();
    assert_eq!(state.plots[3].as_ref().unwrap().plant_id, "carrot");
    session.shutdown().await.unwrap();
}
