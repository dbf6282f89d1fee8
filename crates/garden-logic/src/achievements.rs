//! Profile statistics and achievement predicates.
//!
//! Stats are cumulative: counters only grow, `highest_coin_balance` and
//! `peak_plots_planted` are running maxima, and `giant_beanstalk_unlocked`
//! is sticky. Each achievement reads exactly one stat and compares it to a
//! fixed target. Once an achievement unlocks it stays unlocked.

use serde::{Deserialize, Serialize};

/// Cumulative per-profile statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_plants_grown: u64,
    pub total_coins_earned: u64,
    pub plants_unlocked: u64,
    pub pets_unlocked: u64,
    pub rare_plants_found: u64,
    pub total_harvests: u64,
    pub highest_coin_balance: u64,
    /// Seconds of active play.
    pub play_time: u64,
    pub giant_beanstalk_unlocked: bool,
    /// Most plots occupied at the same time.
    #[serde(default)]
    pub peak_plots_planted: u64,
}

/// A partial stats update produced by one simulation event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub plants_grown: u64,
    pub coins_earned: u64,
    pub plants_unlocked: u64,
    pub pets_unlocked: u64,
    pub rare_plants_found: u64,
    pub harvests: u64,
    pub play_time: u64,
    /// Current coin balance, folded in as a running max.
    pub coin_balance: Option<u64>,
    /// Currently occupied plots, folded in as a running max.
    pub plots_planted: Option<u64>,
    pub giant_beanstalk_unlocked: bool,
}

impl StatsDelta {
    pub fn planted(occupied_plots: u64) -> Self {
        Self {
            plants_grown: 1,
            plots_planted: Some(occupied_plots),
            ..Self::default()
        }
    }

    pub fn harvested(coins: u64, balance: u64) -> Self {
        Self {
            harvests: 1,
            coins_earned: coins,
            coin_balance: Some(balance),
            ..Self::default()
        }
    }

    pub fn plant_unlocked(giant_beanstalk: bool) -> Self {
        Self {
            plants_unlocked: 1,
            giant_beanstalk_unlocked: giant_beanstalk,
            ..Self::default()
        }
    }

    pub fn pet_unlocked() -> Self {
        Self {
            pets_unlocked: 1,
            ..Self::default()
        }
    }

    pub fn rare_found() -> Self {
        Self {
            rare_plants_found: 1,
            ..Self::default()
        }
    }

    pub fn play_time(secs: u64) -> Self {
        Self {
            play_time: secs,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold another delta into this one.
    pub fn merge(&mut self, other: &StatsDelta) {
        self.plants_grown += other.plants_grown;
        self.coins_earned += other.coins_earned;
        self.plants_unlocked += other.plants_unlocked;
        self.pets_unlocked += other.pets_unlocked;
        self.rare_plants_found += other.rare_plants_found;
        self.harvests += other.harvests;
        self.play_time += other.play_time;
        self.coin_balance = max_opt(self.coin_balance, other.coin_balance);
        self.plots_planted = max_opt(self.plots_planted, other.plots_planted);
        self.giant_beanstalk_unlocked |= other.giant_beanstalk_unlocked;
    }
}

fn max_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

impl ProfileStats {
    /// Starting stats for a new profile.
    pub fn starting(starter_plants: u64, starting_coins: u64) -> Self {
        Self {
            plants_unlocked: starter_plants,
            highest_coin_balance: starting_coins,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, delta: &StatsDelta) {
        self.total_plants_grown += delta.plants_grown;
        self.total_coins_earned += delta.coins_earned;
        self.plants_unlocked += delta.plants_unlocked;
        self.pets_unlocked += delta.pets_unlocked;
        self.rare_plants_found += delta.rare_plants_found;
        self.total_harvests += delta.harvests;
        self.play_time += delta.play_time;
        if let Some(balance) = delta.coin_balance {
            self.highest_coin_balance = self.highest_coin_balance.max(balance);
        }
        if let Some(plots) = delta.plots_planted {
            self.peak_plots_planted = self.peak_plots_planted.max(plots);
        }
        self.giant_beanstalk_unlocked |= delta.giant_beanstalk_unlocked;
    }
}

/// The single stat an achievement watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    PlantsGrown,
    Harvests,
    PlantsUnlocked,
    HighestCoinBalance,
    PetsUnlocked,
    RarePlantsFound,
    GiantBeanstalk,
    CoinsEarned,
    PeakPlotsPlanted,
}

impl Metric {
    pub fn value(self, stats: &ProfileStats) -> u64 {
        match self {
            Metric::PlantsGrown => stats.total_plants_grown,
            Metric::Harvests => stats.total_harvests,
            Metric::PlantsUnlocked => stats.plants_unlocked,
            Metric::HighestCoinBalance => stats.highest_coin_balance,
            Metric::PetsUnlocked => stats.pets_unlocked,
            Metric::RarePlantsFound => stats.rare_plants_found,
            Metric::GiantBeanstalk => u64::from(stats.giant_beanstalk_unlocked),
            Metric::CoinsEarned => stats.total_coins_earned,
            Metric::PeakPlotsPlanted => stats.peak_plots_planted,
        }
    }
}

/// Static description of a single achievement.
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub metric: Metric,
    pub target: u64,
}

impl AchievementDef {
    /// Progress (capped at the target) and whether the threshold is met.
    pub fn check(&self, stats: &ProfileStats) -> (u64, bool) {
        let value = self.metric.value(stats);
        (value.min(self.target), value >= self.target)
    }
}

pub const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "first_seed",
        name: "First Seed",
        description: "Plant your first seed",
        metric: Metric::PlantsGrown,
        target: 1,
    },
    AchievementDef {
        id: "first_harvest",
        name: "First Harvest",
        description: "Harvest your first plant",
        metric: Metric::Harvests,
        target: 1,
    },
    AchievementDef {
        id: "plant_collector",
        name: "Plant Collector",
        description: "Unlock 5 different plants",
        metric: Metric::PlantsUnlocked,
        target: 5,
    },
    AchievementDef {
        id: "master_gardener",
        name: "Master Gardener",
        description: "Unlock 15 different plants",
        metric: Metric::PlantsUnlocked,
        target: 15,
    },
    AchievementDef {
        id: "coin_hoarder",
        name: "Coin Hoarder",
        description: "Accumulate 1000 coins",
        metric: Metric::HighestCoinBalance,
        target: 1_000,
    },
    AchievementDef {
        id: "harvest_master",
        name: "Harvest Master",
        description: "Harvest 50 plants",
        metric: Metric::Harvests,
        target: 50,
    },
    AchievementDef {
        id: "pet_lover",
        name: "Pet Lover",
        description: "Unlock 3 pets",
        metric: Metric::PetsUnlocked,
        target: 3,
    },
    AchievementDef {
        id: "rare_hunter",
        name: "Rare Hunter",
        description: "Find 5 rare plants",
        metric: Metric::RarePlantsFound,
        target: 5,
    },
    AchievementDef {
        id: "exotic_collector",
        name: "Exotic Collector",
        description: "Unlock 10 different plants",
        metric: Metric::PlantsUnlocked,
        target: 10,
    },
    AchievementDef {
        id: "beanstalk_legend",
        name: "Beanstalk Legend",
        description: "Unlock the Giant Beanstalk",
        metric: Metric::GiantBeanstalk,
        target: 1,
    },
    AchievementDef {
        id: "wealthy_gardener",
        name: "Wealthy Gardener",
        description: "Earn 5000 total coins",
        metric: Metric::CoinsEarned,
        target: 5_000,
    },
    AchievementDef {
        id: "full_garden",
        name: "Full Garden",
        description: "Have all plots planted at once",
        metric: Metric::PeakPlotsPlanted,
        target: 6,
    },
];

pub fn find_def(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|d| d.id == id)
}

/// Per-profile achievement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<u64>,
    #[serde(default)]
    pub progress: u64,
    #[serde(default)]
    pub target: u64,
}

impl From<&AchievementDef> for Achievement {
    fn from(def: &AchievementDef) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            unlocked: false,
            unlocked_at: None,
            progress: 0,
            target: def.target,
        }
    }
}

/// Fresh, all-locked records for every defined achievement.
pub fn fresh_achievements() -> Vec<Achievement> {
    ACHIEVEMENTS.iter().map(Achievement::from).collect()
}

/// Append records for any definitions missing from a stored list.
pub fn sync_definitions(records: &mut Vec<Achievement>) {
    for def in ACHIEVEMENTS {
        if !records.iter().any(|r| r.id == def.id) {
            records.push(Achievement::from(def));
        }
    }
}

/// Re-evaluate every locked achievement against `stats`.
///
/// Returns the ids that unlocked during this call. Records that are already
/// unlocked are left untouched, and records with no matching definition are
/// skipped.
pub fn evaluate(records: &mut [Achievement], stats: &ProfileStats, now_ms: u64) -> Vec<&'static str> {
    let mut newly_unlocked = Vec::new();
    for record in records.iter_mut().filter(|r| !r.unlocked) {
        let Some(def) = find_def(&record.id) else {
            continue;
        };
        let (progress, reached) = def.check(stats);
        record.progress = progress;
        record.target = def.target;
        if reached {
            record.unlocked = true;
            record.unlocked_at = Some(now_ms);
            newly_unlocked.push(def.id);
        }
    }
    newly_unlocked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<'a>(records: &'a [Achievement], id: &str) -> &'a Achievement {
        records.iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn test_catalog_ids_unique() {
        for (i, a) in ACHIEVEMENTS.iter().enumerate() {
            assert!(ACHIEVEMENTS[i + 1..].iter().all(|b| b.id != a.id), "{}", a.id);
        }
        assert_eq!(fresh_achievements().len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn test_first_seed_unlocks_once() {
        let mut stats = ProfileStats::starting(2, 50);
        let mut records = fresh_achievements();

        assert!(evaluate(&mut records, &stats, 1).is_empty());
        assert!(!record(&records, "first_seed").unlocked);

        stats.apply(&StatsDelta::planted(1));
        let unlocked = evaluate(&mut records, &stats, 2);
        assert!(unlocked.contains(&"first_seed"));
        assert_eq!(record(&records, "first_seed").unlocked_at, Some(2));

        stats.apply(&StatsDelta::planted(2));
        let unlocked = evaluate(&mut records, &stats, 3);
        assert!(!unlocked.contains(&"first_seed"));
        let first_seed = record(&records, "first_seed");
        assert!(first_seed.unlocked);
        assert_eq!(first_seed.unlocked_at, Some(2));
    }

    #[test]
    fn test_unlock_is_sticky() {
        let mut records = fresh_achievements();
        let mut stats = ProfileStats::default();
        stats.highest_coin_balance = 1_000;
        evaluate(&mut records, &stats, 10);
        assert!(record(&records, "coin_hoarder").unlocked);

        // A stats object that would no longer qualify leaves it unlocked.
        evaluate(&mut records, &ProfileStats::default(), 20);
        let hoarder = record(&records, "coin_hoarder");
        assert!(hoarder.unlocked);
        assert_eq!(hoarder.unlocked_at, Some(10));
    }

    #[test]
    fn test_progress_tracks_metric() {
        let mut records = fresh_achievements();
        let mut stats = ProfileStats::default();
        stats.total_harvests = 12;
        evaluate(&mut records, &stats, 0);
        let master = record(&records, "harvest_master");
        assert_eq!(master.progress, 12);
        assert_eq!(master.target, 50);
        assert!(!master.unlocked);
    }

    #[test]
    fn test_counters_add_and_maxima_hold() {
        let mut stats = ProfileStats::starting(2, 50);
        stats.apply(&StatsDelta::harvested(30, 80));
        stats.apply(&StatsDelta::harvested(20, 40));
        assert_eq!(stats.total_harvests, 2);
        assert_eq!(stats.total_coins_earned, 50);
        assert_eq!(stats.highest_coin_balance, 80);

        stats.apply(&StatsDelta::plant_unlocked(true));
        stats.apply(&StatsDelta::plant_unlocked(false));
        assert_eq!(stats.plants_unlocked, 4);
        assert!(stats.giant_beanstalk_unlocked);
    }

    #[test]
    fn test_merge_deltas() {
        let mut total = StatsDelta::planted(3);
        total.merge(&StatsDelta::planted(5));
        total.merge(&StatsDelta::harvested(10, 60));
        total.merge(&StatsDelta::play_time(4));
        assert_eq!(total.plants_grown, 2);
        assert_eq!(total.plots_planted, Some(5));
        assert_eq!(total.coin_balance, Some(60));
        assert_eq!(total.play_time, 4);
        assert!(!total.is_empty());
        assert!(StatsDelta::default().is_empty());
    }

    #[test]
    fn test_full_garden_uses_peak_plots() {
        let mut records = fresh_achievements();
        let mut stats = ProfileStats::default();
        stats.apply(&StatsDelta::planted(6));
        let unlocked = evaluate(&mut records, &stats, 5);
        assert!(unlocked.contains(&"full_garden"));
    }

    #[test]
    fn test_sync_definitions_appends_missing() {
        let mut records = vec![Achievement::from(&ACHIEVEMENTS[0])];
        sync_definitions(&mut records);
        assert_eq!(records.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn test_stats_json_shape() {
        let json = serde_json::to_value(ProfileStats::starting(2, 50)).unwrap();
        assert_eq!(json["plantsUnlocked"], 2);
        assert_eq!(json["highestCoinBalance"], 50);
        assert_eq!(json["giantBeanstalkUnlocked"], false);

        // Blobs written before peakPlotsPlanted existed still load.
        let legacy = r#"{"totalPlantsGrown":1,"totalCoinsEarned":0,"plantsUnlocked":2,
            "petsUnlocked":0,"rarePlantsFound":0,"totalHarvests":0,
            "highestCoinBalance":50,"playTime":0,"giantBeanstalkUnlocked":false}"#;
        let stats: ProfileStats = serde_json::from_str(legacy).unwrap();
        assert_eq!(stats.peak_plots_planted, 0);
    }
}
