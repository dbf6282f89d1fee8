//! Pet ability resolution.
//!
//! At most one pet is active per garden. Its ability contributes exactly one
//! modifier; every other modifier stays at its neutral value.

use serde::{Deserialize, Serialize};

use crate::catalog::{AbilityKind, PetDef};

/// Modifiers the simulation reads each tick or command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PetModifiers {
    /// Fraction of normal growth time.
    pub growth_multiplier: f64,
    pub coin_multiplier: f64,
    /// Probability a weed roll is suppressed.
    pub weed_prevention: f64,
    /// Probability a discovery attempt finds a rare plant.
    pub rare_find_chance: f64,
    pub auto_water: bool,
}

impl PetModifiers {
    pub const NEUTRAL: Self = Self {
        growth_multiplier: 1.0,
        coin_multiplier: 1.0,
        weed_prevention: 0.0,
        rare_find_chance: 0.0,
        auto_water: false,
    };

    pub fn is_rare_finder(&self) -> bool {
        self.rare_find_chance > 0.0
    }
}

impl Default for PetModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Resolve the active pet (if any) into simulation modifiers.
pub fn resolve(active: Option<&PetDef>) -> PetModifiers {
    let Some(pet) = active else {
        return PetModifiers::NEUTRAL;
    };
    let magnitude = pet.ability.magnitude;
    match pet.ability.kind {
        AbilityKind::GrowthBoost => PetModifiers {
            growth_multiplier: magnitude,
            ..PetModifiers::NEUTRAL
        },
        AbilityKind::CoinBoost => PetModifiers {
            coin_multiplier: magnitude,
            ..PetModifiers::NEUTRAL
        },
        AbilityKind::WeedPrevention => PetModifiers {
            weed_prevention: magnitude,
            ..PetModifiers::NEUTRAL
        },
        AbilityKind::RareFinder => PetModifiers {
            rare_find_chance: magnitude,
            ..PetModifiers::NEUTRAL
        },
        AbilityKind::AutoWater => PetModifiers {
            auto_water: true,
            ..PetModifiers::NEUTRAL
        },
    }
}

/// Coins credited for a harvest: `floor(sell_price * coin_multiplier)`.
pub fn harvest_coins(sell_price: u64, coin_multiplier: f64) -> u64 {
    (sell_price as f64 * coin_multiplier).floor().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, PetAbility};

    fn pet(kind: AbilityKind, magnitude: f64) -> PetDef {
        PetDef {
            id: "p".into(),
            name: "P".into(),
            ability: PetAbility { kind, magnitude },
            unlock_cost: 0,
        }
    }

    #[test]
    fn test_no_pet_is_neutral() {
        assert_eq!(resolve(None), PetModifiers::NEUTRAL);
        assert!(!resolve(None).is_rare_finder());
    }

    #[test]
    fn test_each_ability_sets_one_modifier() {
        let m = resolve(Some(&pet(AbilityKind::GrowthBoost, 0.5)));
        assert_eq!(m.growth_multiplier, 0.5);
        assert_eq!(m.coin_multiplier, 1.0);

        let m = resolve(Some(&pet(AbilityKind::CoinBoost, 2.0)));
        assert_eq!(m.coin_multiplier, 2.0);
        assert_eq!(m.growth_multiplier, 1.0);

        let m = resolve(Some(&pet(AbilityKind::WeedPrevention, 0.8)));
        assert_eq!(m.weed_prevention, 0.8);
        assert!(!m.auto_water);

        let m = resolve(Some(&pet(AbilityKind::AutoWater, 1.0)));
        assert!(m.auto_water);
        assert_eq!(m.weed_prevention, 0.0);

        let m = resolve(Some(&pet(AbilityKind::RareFinder, 0.25)));
        assert!(m.is_rare_finder());
        assert_eq!(m.rare_find_chance, 0.25);
    }

    #[test]
    fn test_standard_pets_resolve() {
        let catalog = Catalog::standard();
        let owl = catalog.pet("owl").unwrap();
        assert!(resolve(Some(owl)).is_rare_finder());
    }

    #[test]
    fn test_harvest_coins_floor() {
        assert_eq!(harvest_coins(100, 1.0), 100);
        assert_eq!(harvest_coins(100, 2.0), 200);
        assert_eq!(harvest_coins(15, 1.5), 22);
        assert_eq!(harvest_coins(0, 2.0), 0);
    }
}
