//! Static catalog of plants and pets.
//!
//! The catalog is closed reference data: every plant and pet the engine can
//! see is defined here (or in a JSON document with the same shape) and is
//! validated once when the catalog is built. Lookups by id return a
//! distinguishable [`CatalogError`] so callers can tell an unknown id apart
//! from other rejections, even when the public command surface swallows it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::STARTER_PLANTS;

/// Rarity tier of a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythical,
}

impl Rarity {
    /// Epic and above count toward the rare-plant counter and the
    /// rare-finder discovery pool.
    pub fn is_notable(self) -> bool {
        matches!(self, Rarity::Epic | Rarity::Legendary | Rarity::Mythical)
    }
}

/// The kind of effect a pet contributes while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Magnitude is the fraction of normal growth time (0.5 = twice as fast).
    GrowthBoost,
    /// Magnitude multiplies harvest coins.
    CoinBoost,
    /// Magnitude is the probability a weed roll is suppressed.
    WeedPrevention,
    /// Periodically waters every growing plot. Magnitude is unused.
    AutoWater,
    /// Magnitude is the probability a discovery attempt succeeds.
    RareFinder,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PetAbility {
    pub kind: AbilityKind,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub growth_time_secs: f64,
    pub sell_price: u64,
    pub unlock_cost: u64,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDef {
    pub id: String,
    pub name: String,
    pub ability: PetAbility,
    pub unlock_cost: u64,
}

/// Raw catalog document, as read from JSON before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    pub plants: Vec<PlantDef>,
    pub pets: Vec<PetDef>,
    pub starter_plants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("unknown plant id: {0}")]
    UnknownPlant(String),
    #[error("unknown pet id: {0}")]
    UnknownPet(String),
    #[error("duplicate plant id: {0}")]
    DuplicatePlant(String),
    #[error("duplicate pet id: {0}")]
    DuplicatePet(String),
    #[error("plant {id} has invalid growth time {secs}")]
    InvalidGrowthTime { id: String, secs: f64 },
    #[error("pet {id} has invalid {kind:?} magnitude {magnitude}")]
    InvalidAbility {
        id: String,
        kind: AbilityKind,
        magnitude: f64,
    },
    #[error("starter plant {0} is not in the catalog")]
    UnknownStarter(String),
    #[error("catalog document is malformed: {0}")]
    Malformed(String),
}

/// Validated, id-indexed plant and pet tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    plants: Vec<PlantDef>,
    pets: Vec<PetDef>,
    starter_plants: Vec<String>,
    plant_index: HashMap<String, usize>,
    pet_index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range values.
    pub fn new(
        plants: Vec<PlantDef>,
        pets: Vec<PetDef>,
        starter_plants: Vec<String>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(plants.len());
        for plant in &plants {
            if !(plant.growth_time_secs.is_finite() && plant.growth_time_secs > 0.0) {
                return Err(CatalogError::InvalidGrowthTime {
                    id: plant.id.clone(),
                    secs: plant.growth_time_secs,
                });
            }
            if !seen.insert(plant.id.as_str()) {
                return Err(CatalogError::DuplicatePlant(plant.id.clone()));
            }
        }
        if let Some(missing) = starter_plants.iter().find(|id| !seen.contains(id.as_str())) {
            return Err(CatalogError::UnknownStarter(missing.clone()));
        }

        let mut seen = HashSet::with_capacity(pets.len());
        for pet in &pets {
            validate_ability(pet)?;
            if !seen.insert(pet.id.as_str()) {
                return Err(CatalogError::DuplicatePet(pet.id.clone()));
            }
        }

        Ok(Self::assemble(plants, pets, starter_plants))
    }

    fn assemble(plants: Vec<PlantDef>, pets: Vec<PetDef>, starter_plants: Vec<String>) -> Self {
        let plant_index = plants
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let pet_index = pets
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self {
            plants,
            pets,
            starter_plants,
            plant_index,
            pet_index,
        }
    }

    pub fn from_data(data: CatalogData) -> Result<Self, CatalogError> {
        Self::new(data.plants, data.pets, data.starter_plants)
    }

    /// Parse and validate a JSON catalog document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::from_data(data)
    }

    /// The built-in game catalog.
    pub fn standard() -> Self {
        let plants = STANDARD_PLANTS
            .iter()
            .map(|&(id, name, description, secs, sell, cost, rarity)| PlantDef {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                growth_time_secs: secs,
                sell_price: sell,
                unlock_cost: cost,
                rarity,
            })
            .collect();
        let pets = STANDARD_PETS
            .iter()
            .map(|&(id, name, kind, magnitude, cost)| PetDef {
                id: id.to_string(),
                name: name.to_string(),
                ability: PetAbility { kind, magnitude },
                unlock_cost: cost,
            })
            .collect();
        let starters = STARTER_PLANTS.iter().map(|s| s.to_string()).collect();

        // Static tables; validity is covered by `standard_catalog_is_valid`.
        Self::assemble(plants, pets, starters)
    }

    pub fn plant(&self, id: &str) -> Result<&PlantDef, CatalogError> {
        self.plant_index
            .get(id)
            .map(|&i| &self.plants[i])
            .ok_or_else(|| CatalogError::UnknownPlant(id.to_string()))
    }

    pub fn pet(&self, id: &str) -> Result<&PetDef, CatalogError> {
        self.pet_index
            .get(id)
            .map(|&i| &self.pets[i])
            .ok_or_else(|| CatalogError::UnknownPet(id.to_string()))
    }

    pub fn plants(&self) -> &[PlantDef] {
        &self.plants
    }

    pub fn pets(&self) -> &[PetDef] {
        &self.pets
    }

    pub fn starter_plants(&self) -> &[String] {
        &self.starter_plants
    }

    /// Plants whose rarity counts as notable, in catalog order.
    pub fn notable_plants(&self) -> impl Iterator<Item = &PlantDef> {
        self.plants.iter().filter(|p| p.rarity.is_notable())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn validate_ability(pet: &PetDef) -> Result<(), CatalogError> {
    let m = pet.ability.magnitude;
    let ok = m.is_finite()
        && match pet.ability.kind {
            AbilityKind::GrowthBoost => m > 0.0 && m <= 1.0,
            AbilityKind::CoinBoost => m >= 1.0,
            AbilityKind::WeedPrevention | AbilityKind::RareFinder => (0.0..=1.0).contains(&m),
            AbilityKind::AutoWater => m >= 0.0,
        };
    if ok {
        Ok(())
    } else {
        Err(CatalogError::InvalidAbility {
            id: pet.id.clone(),
            kind: pet.ability.kind,
            magnitude: m,
        })
    }
}

// (id, name, description, growth secs, sell price, unlock cost, rarity)
type PlantRow = (&'static str, &'static str, &'static str, f64, u64, u64, Rarity);

const STANDARD_PLANTS: &[PlantRow] = &[
    ("tomato", "Tomato", "A juicy red classic", 30.0, 10, 0, Rarity::Common),
    ("carrot", "Carrot", "Crunchy and orange", 45.0, 15, 0, Rarity::Common),
    ("lettuce", "Lettuce", "Crisp leafy greens", 60.0, 20, 40, Rarity::Common),
    ("potato", "Potato", "Humble but dependable", 90.0, 28, 75, Rarity::Common),
    ("strawberry", "Strawberry", "Sweet summer berries", 120.0, 40, 120, Rarity::Uncommon),
    ("corn", "Corn", "Tall golden stalks", 180.0, 55, 200, Rarity::Uncommon),
    ("pumpkin", "Pumpkin", "Big, round, and orange", 300.0, 90, 350, Rarity::Uncommon),
    ("sunflower", "Sunflower", "Always facing the sun", 240.0, 75, 300, Rarity::Rare),
    ("blueberry", "Blueberry", "Tiny bursts of flavor", 360.0, 110, 500, Rarity::Rare),
    ("watermelon", "Watermelon", "Heavy and refreshing", 600.0, 180, 800, Rarity::Rare),
    ("dragon_fruit", "Dragon Fruit", "Vivid pink and exotic", 900.0, 300, 1_500, Rarity::Epic),
    ("golden_rose", "Golden Rose", "Petals that shine like metal", 1_200.0, 420, 2_500, Rarity::Epic),
    ("moonflower", "Moonflower", "Blooms only by moonlight", 1_800.0, 650, 4_000, Rarity::Legendary),
    ("crystal_lotus", "Crystal Lotus", "Glitters in still water", 2_400.0, 900, 6_000, Rarity::Legendary),
    ("phoenix_bloom", "Phoenix Bloom", "Rises again from its ashes", 3_600.0, 1_500, 10_000, Rarity::Legendary),
    ("starfruit_tree", "Starfruit Tree", "Fruit fallen from the sky", 5_400.0, 2_200, 15_000, Rarity::Mythical),
    ("giant_beanstalk", "Giant Beanstalk", "Grows past the clouds", 7_200.0, 5_000, 25_000, Rarity::Mythical),
];

// (id, name, ability, magnitude, unlock cost)
type PetRow = (&'static str, &'static str, AbilityKind, f64, u64);

const STANDARD_PETS: &[PetRow] = &[
    ("bunny", "Bunny", AbilityKind::GrowthBoost, 0.75, 150),
    ("hummingbird", "Hummingbird", AbilityKind::GrowthBoost, 0.5, 600),
    ("cat", "Lucky Cat", AbilityKind::CoinBoost, 1.5, 300),
    ("golden_pig", "Golden Pig", AbilityKind::CoinBoost, 2.0, 1_200),
    ("ladybug", "Ladybug", AbilityKind::WeedPrevention, 0.8, 200),
    ("frog", "Rain Frog", AbilityKind::AutoWater, 1.0, 250),
    ("fox", "Clever Fox", AbilityKind::RareFinder, 0.1, 800),
    ("owl", "Wise Owl", AbilityKind::RareFinder, 0.25, 2_000),
];
