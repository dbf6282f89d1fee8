//! Pure growth model: stage derivation from elapsed time, and the weed roll.
//!
//! A planting's stage is never stored authoritatively: it is recomputed from
//! `planted_at`, the current time, the plant's base growth time, and the
//! active growth multiplier. Recomputing with the same inputs always yields
//! the same stage, and for a fixed multiplier the stage never regresses.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Discrete growth phase of a planting, in growth order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Seed,
    Sprout,
    Growing,
    Mature,
    Ready,
}

impl Stage {
    /// Map a growth progress fraction to a stage. Thresholds are checked
    /// high to low and the first match wins.
    pub fn from_progress(progress: f64) -> Self {
        if progress >= 1.0 {
            Stage::Ready
        } else if progress >= 0.75 {
            Stage::Mature
        } else if progress >= 0.5 {
            Stage::Growing
        } else if progress >= 0.25 {
            Stage::Sprout
        } else {
            Stage::Seed
        }
    }

    pub fn is_ready(self) -> bool {
        self == Stage::Ready
    }
}

/// Effective growth duration in seconds. The multiplier is a fraction of
/// normal time, so values below 1 speed growth up.
pub fn effective_duration_secs(base_growth_secs: f64, growth_multiplier: f64) -> f64 {
    base_growth_secs * growth_multiplier
}

/// Fraction of the effective growth duration elapsed since planting.
///
/// Timestamps are epoch milliseconds. A `now` earlier than `planted_at`
/// (clock skew) counts as zero elapsed time.
pub fn growth_progress(
    planted_at_ms: u64,
    now_ms: u64,
    base_growth_secs: f64,
    growth_multiplier: f64,
) -> f64 {
    let elapsed_secs = now_ms.saturating_sub(planted_at_ms) as f64 / 1000.0;
    let duration = effective_duration_secs(base_growth_secs, growth_multiplier);
    if duration <= 0.0 {
        return 1.0;
    }
    elapsed_secs / duration
}

/// Derive a planting's stage at `now_ms`.
pub fn derive_stage(
    planted_at_ms: u64,
    now_ms: u64,
    base_growth_secs: f64,
    growth_multiplier: f64,
) -> Stage {
    Stage::from_progress(growth_progress(
        planted_at_ms,
        now_ms,
        base_growth_secs,
        growth_multiplier,
    ))
}

/// One weed-onset roll for a single plot on a single tick.
///
/// The prevention roll is drawn first; if it suppresses the roll no weeds
/// can appear. Otherwise weeds appear with probability `weed_chance`.
pub fn roll_weeds(rng: &mut impl Rng, prevention_probability: f64, weed_chance: f64) -> bool {
    let prevention = probability(prevention_probability);
    if prevention > 0.0 && rng.gen_bool(prevention) {
        return false;
    }
    rng.gen_bool(probability(weed_chance))
}

/// Clamp to `[0, 1]`; NaN and infinities count as 0.
fn probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const T0: u64 = 1_700_000_000_000;

    fn at(secs: f64) -> u64 {
        T0 + (secs * 1000.0) as u64
    }

    #[test]
    fn test_thresholds() {
        let base = 600.0;
        assert_eq!(derive_stage(T0, at(0.0), base, 1.0), Stage::Seed);
        assert_eq!(derive_stage(T0, at(149.0), base, 1.0), Stage::Seed);
        assert_eq!(derive_stage(T0, at(150.0), base, 1.0), Stage::Sprout);
        assert_eq!(derive_stage(T0, at(300.0), base, 1.0), Stage::Growing);
        assert_eq!(derive_stage(T0, at(450.0), base, 1.0), Stage::Mature);
        assert_eq!(derive_stage(T0, at(599.0), base, 1.0), Stage::Mature);
        assert_eq!(derive_stage(T0, at(600.0), base, 1.0), Stage::Ready);
    }

    #[test]
    fn test_ready_at_or_after_duration() {
        for secs in [600.0, 601.0, 3_600.0, 1_000_000.0] {
            assert_eq!(derive_stage(T0, at(secs), 600.0, 1.0), Stage::Ready);
        }
    }

    #[test]
    fn test_multiplier_speeds_growth() {
        // 0.5 = half the normal time
        assert_eq!(derive_stage(T0, at(300.0), 600.0, 0.5), Stage::Ready);
        assert_eq!(derive_stage(T0, at(300.0), 600.0, 1.0), Stage::Growing);
    }

    #[test]
    fn test_monotonic_in_time() {
        let mut previous = Stage::Seed;
        for step in 0..=800 {
            let stage = derive_stage(T0, at(step as f64), 600.0, 0.75);
            assert!(stage >= previous, "regressed at {step}s");
            previous = stage;
        }
        assert_eq!(previous, Stage::Ready);
    }

    #[test]
    fn test_idempotent() {
        let a = derive_stage(T0, at(321.0), 600.0, 1.0);
        let b = derive_stage(T0, at(321.0), 600.0, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_clock_skew_is_seed() {
        assert_eq!(derive_stage(T0, T0 - 5_000, 600.0, 1.0), Stage::Seed);
        assert_eq!(growth_progress(T0, T0 - 5_000, 600.0, 1.0), 0.0);
    }

    #[test]
    fn test_weed_roll_full_prevention() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert!(!roll_weeds(&mut rng, 1.0, 1.0));
        }
    }

    #[test]
    fn test_weed_roll_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 20_000;
        let hits = (0..trials)
            .filter(|_| roll_weeds(&mut rng, 0.0, 0.02))
            .count();
        let rate = hits as f64 / trials as f64;
        assert!((0.01..0.03).contains(&rate), "rate {rate}");
    }

    #[test]
    fn test_weed_roll_partial_prevention() {
        let mut rng = StdRng::seed_from_u64(3);
        let trials = 20_000;
        let hits = (0..trials)
            .filter(|_| roll_weeds(&mut rng, 0.5, 0.2))
            .count();
        let rate = hits as f64 / trials as f64;
        // Expected 0.1
        assert!((0.07..0.13).contains(&rate), "rate {rate}");
    }

    #[test]
    fn test_non_finite_chance_never_weeds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            assert!(!roll_weeds(&mut rng, 0.0, f64::NAN));
            assert!(!roll_weeds(&mut rng, f64::NAN, f64::INFINITY));
        }
        // NaN prevention is ignored rather than suppressing the roll.
        assert!(roll_weeds(&mut rng, f64::NAN, 1.0));
    }
}
