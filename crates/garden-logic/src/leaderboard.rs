//! Local leaderboard scoring.

use crate::achievements::ProfileStats;
use crate::constants::RARE_PLANT_SCORE;

/// `total_coins_earned + rare_plants_found * 100`.
pub fn score(stats: &ProfileStats) -> u64 {
    stats
        .total_coins_earned
        .saturating_add(stats.rare_plants_found.saturating_mul(RARE_PLANT_SCORE))
}

/// Rank items by descending score. Ties keep their input order.
pub fn rank<'a, T>(items: &'a [T], stats_of: impl Fn(&T) -> &ProfileStats) -> Vec<&'a T> {
    let mut ranked: Vec<&T> = items.iter().collect();
    // sort_by_key is stable
    ranked.sort_by_key(|item| std::cmp::Reverse(score(stats_of(item))));
    ranked
}
