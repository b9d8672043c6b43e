#![deny(warnings)]

//! Core domain models and invariants for Pocketpet.
//!
//! This crate defines serializable types used across the simulation with
//! clamping and validation helpers to guarantee basic invariants.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Upper bound for the satiation stat.
pub const SATIATION_MAX: i32 = 20;
/// Upper bound for the happiness stat.
pub const HAPPINESS_MAX: i32 = 20;
/// Upper bound for the health stat.
pub const HEALTH_MAX: i32 = 100;
/// Lower bound for the health stat. Sustained neglect bottoms out here;
/// the pet never dies.
pub const HEALTH_FLOOR: i32 = 1;
/// Minimum price of any catalog food in coins.
pub const PRICE_FLOOR: u32 = 5;

/// Unique identifier for a catalog food, e.g. "cheri", "oran".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FoodId(pub String);

/// Unique identifier for a species, e.g. "charmander".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub String);

/// A purchasable and feedable catalog item with fixed stat deltas and a
/// derived price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Food {
    /// Food identifier, unique within a loaded catalog.
    pub id: FoodId,
    /// Display label.
    pub label: String,
    /// Satiation gained when fed (> 0, derivation clamps to [2, 10]).
    pub satiation_delta: i32,
    /// Happiness gained when fed (> 0, derivation clamps to [1, 8]).
    pub happiness_delta: i32,
    /// Short message shown when the pet eats this.
    pub flavor_text: String,
    /// Sprite reference, opaque to the core.
    pub sprite: String,
    /// Derived price in coins (>= `PRICE_FLOOR`).
    pub price: u32,
}

/// An entry in the species catalog. `evolves_to == None` marks a final
/// evolutionary stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    /// Species identifier.
    pub id: SpeciesId,
    /// Display name.
    pub name: String,
    /// Sprite reference, opaque to the core.
    pub sprite: String,
    /// Next stage in the evolution chain, if any.
    pub evolves_to: Option<SpeciesId>,
}

/// The sole long-lived aggregate: one pet per save slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    /// Display name.
    pub name: String,
    /// Sprite reference, opaque to the core.
    pub sprite: String,
    /// Current species.
    pub species: SpeciesId,
    /// Health in [`HEALTH_FLOOR`, `HEALTH_MAX`].
    pub health: i32,
    /// Satiation in [0, `SATIATION_MAX`]; higher is fuller.
    pub satiation: i32,
    /// Happiness in [0, `HAPPINESS_MAX`].
    pub happiness: i32,
    /// Wallet in coins; debits are checked so this never underflows.
    pub money: u32,
    /// Owned food counts keyed by catalog id.
    pub inventory: BTreeMap<FoodId, u32>,
    /// How many times this pet has evolved.
    pub evolution_stage: u32,
    /// Consecutive ticks spent at exactly full health.
    pub full_health_streak: u32,
    /// Whether the current species has no further evolution.
    pub final_stage: bool,
    /// Cosmetic only; rolled once at creation.
    pub shiny: bool,
}

impl Pet {
    /// Re-clamp all bounded vitals to their declared ranges. Called after
    /// every mutation.
    pub fn clamp_vitals(&mut self) {
        self.health = self.health.clamp(HEALTH_FLOOR, HEALTH_MAX);
        self.satiation = self.satiation.clamp(0, SATIATION_MAX);
        self.happiness = self.happiness.clamp(0, HAPPINESS_MAX);
    }

    /// Current inventory count for a food id (absent entries count as 0).
    pub fn stock(&self, id: &FoodId) -> u32 {
        self.inventory.get(id).copied().unwrap_or(0)
    }
}

/// Game balance and economy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Satiation change per tick (negative: the pet gets hungrier).
    pub satiation_per_tick: i32,
    /// Happiness change per tick (negative: boredom).
    pub happiness_per_tick: i32,
    /// Satiation spent by one play action.
    pub satiation_cost_per_play: i32,
    /// Happiness gained by one play action.
    pub happiness_per_play: i32,
    /// Health lost on a neglected tick (satiation or happiness at zero).
    pub neglect_penalty: i32,
    /// Minimum satiation and happiness for good-care regeneration.
    pub care_floor: i32,
    /// Health regained per well-cared-for tick.
    pub regen_per_tick: i32,
    /// Seconds between automatic ticks.
    pub tick_seconds: u64,
    /// Coins a new pet starts with.
    pub starting_money: u32,
    /// Vitals a new pet starts with.
    pub starting_health: i32,
    /// Starting satiation (half of max).
    pub starting_satiation: i32,
    /// Starting happiness (half of max).
    pub starting_happiness: i32,
    /// Minimum health to qualify for the care reward.
    pub reward_health_min: i32,
    /// Minimum satiation to qualify for the care reward.
    pub reward_satiation_min: i32,
    /// Minimum happiness to qualify for the care reward.
    pub reward_happiness_min: i32,
    /// Coins paid when all three reward thresholds hold.
    pub reward_base: u32,
    /// Extra coins paid when the wellbeing score clears `bonus_score_min`.
    pub reward_bonus: u32,
    /// Wellbeing score (exclusive) above which the bonus is paid.
    /// Independent of the per-stat thresholds; no derived relationship.
    pub bonus_score_min: i32,
    /// Consecutive full-health ticks required before `evolve` succeeds.
    pub evolution_threshold: u32,
    /// Probability of the cosmetic shiny roll at creation.
    pub shiny_odds: f64,
    /// Seed for deterministic RNG (catalog sampling, shiny roll).
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            satiation_per_tick: -2,
            happiness_per_tick: -1,
            satiation_cost_per_play: 3,
            happiness_per_play: 5,
            neglect_penalty: 10,
            care_floor: 10,
            regen_per_tick: 5,
            tick_seconds: 10,
            starting_money: 100,
            starting_health: HEALTH_MAX,
            starting_satiation: SATIATION_MAX / 2,
            starting_happiness: HAPPINESS_MAX / 2,
            reward_health_min: 60,
            reward_satiation_min: 10,
            reward_happiness_min: 10,
            reward_base: 30,
            reward_bonus: 25,
            bonus_score_min: 65,
            evolution_threshold: 12,
            shiny_odds: 1.0 / 128.0,
            rng_seed: 42,
        }
    }
}

impl GameConfig {
    /// Build a fresh pet from the starting constants. Inventory seeding and
    /// the shiny roll are the caller's concern.
    pub fn new_pet(&self, name: impl Into<String>, species: SpeciesId, sprite: String) -> Pet {
        Pet {
            name: name.into(),
            sprite,
            species,
            health: self.starting_health,
            satiation: self.starting_satiation,
            happiness: self.starting_happiness,
            money: self.starting_money,
            inventory: BTreeMap::new(),
            evolution_stage: 0,
            full_health_streak: 0,
            final_stage: false,
            shiny: false,
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A bounded stat is outside its declared range.
    #[error("{name} = {value} is out of range [{min}, {max}]")]
    StatOutOfRange {
        /// Stat name.
        name: &'static str,
        /// Observed value.
        value: i32,
        /// Inclusive lower bound.
        min: i32,
        /// Inclusive upper bound.
        max: i32,
    },
    /// Food deltas must be strictly positive under the satiation-up
    /// convention.
    #[error("food {0} has a non-positive stat delta")]
    NonPositiveDelta(String),
    /// Price below the configured floor.
    #[error("price {0} is below the floor of {PRICE_FLOOR}")]
    PriceBelowFloor(u32),
    /// Identifiers must be non-empty.
    #[error("empty identifier")]
    EmptyId,
    /// Duplicate id within one catalog.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// An evolution link points at an id missing from the catalog.
    #[error("species link not found: {0}")]
    SpeciesNotFound(String),
    /// The evolution graph loops back on itself.
    #[error("species chain contains a cycle through: {0}")]
    SpeciesCycle(String),
}

/// Validate a catalog food entry.
pub fn validate_food(food: &Food) -> Result<(), ValidationError> {
    if food.id.0.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if food.satiation_delta <= 0 || food.happiness_delta <= 0 {
        return Err(ValidationError::NonPositiveDelta(food.id.0.clone()));
    }
    if food.price < PRICE_FLOOR {
        return Err(ValidationError::PriceBelowFloor(food.price));
    }
    Ok(())
}

/// Validate a whole food catalog, including id uniqueness.
pub fn validate_foods(foods: &[Food]) -> Result<(), ValidationError> {
    let mut seen: BTreeSet<&FoodId> = BTreeSet::new();
    for f in foods {
        validate_food(f)?;
        if !seen.insert(&f.id) {
            return Err(ValidationError::DuplicateId(f.id.0.clone()));
        }
    }
    Ok(())
}

/// Validate pet invariants: every bounded stat within its range.
pub fn validate_pet(pet: &Pet) -> Result<(), ValidationError> {
    if pet.name.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    check_range("health", pet.health, HEALTH_FLOOR, HEALTH_MAX)?;
    check_range("satiation", pet.satiation, 0, SATIATION_MAX)?;
    check_range("happiness", pet.happiness, 0, HAPPINESS_MAX)?;
    Ok(())
}

/// Validate a species catalog, including cross-references and cycles.
pub fn validate_species_graph(list: &[Species]) -> Result<(), ValidationError> {
    let mut ids: BTreeSet<&SpeciesId> = BTreeSet::new();
    for s in list {
        if s.id.0.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if !ids.insert(&s.id) {
            return Err(ValidationError::DuplicateId(s.id.0.clone()));
        }
    }
    for s in list {
        if let Some(next) = &s.evolves_to {
            if !ids.contains(next) {
                return Err(ValidationError::SpeciesNotFound(next.0.clone()));
            }
        }
    }
    // Walking forward from any node must terminate within the catalog size.
    for s in list {
        let mut cursor = s;
        let mut hops = 0usize;
        while let Some(next) = &cursor.evolves_to {
            hops += 1;
            if hops > list.len() {
                return Err(ValidationError::SpeciesCycle(s.id.0.clone()));
            }
            match list.iter().find(|c| &c.id == next) {
                Some(n) => cursor = n,
                None => break,
            }
        }
    }
    Ok(())
}

fn check_range(
    name: &'static str,
    value: i32,
    min: i32,
    max: i32,
) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::StatOutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn food(id: &str) -> Food {
        Food {
            id: FoodId(id.to_string()),
            label: "Oran".to_string(),
            satiation_delta: 8,
            happiness_delta: 2,
            flavor_text: "Nutritious!".to_string(),
            sprite: String::new(),
            price: 27,
        }
    }

    fn pet() -> Pet {
        let cfg = GameConfig::default();
        cfg.new_pet("Mochi", SpeciesId("charmander".to_string()), String::new())
    }

    #[test]
    fn serde_roundtrip_pet() {
        let mut p = pet();
        p.inventory.insert(FoodId("oran".into()), 3);
        let s = serde_json::to_string(&p).unwrap();
        let back: Pet = serde_json::from_str(&s).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn new_pet_uses_starting_constants() {
        let p = pet();
        assert_eq!(p.health, 100);
        assert_eq!(p.satiation, 10);
        assert_eq!(p.happiness, 10);
        assert_eq!(p.money, 100);
        assert!(p.inventory.is_empty());
        assert!(!p.final_stage);
        validate_pet(&p).unwrap();
    }

    #[test]
    fn clamp_floors_health_above_zero() {
        let mut p = pet();
        p.health = -40;
        p.satiation = 99;
        p.happiness = -3;
        p.clamp_vitals();
        assert_eq!(p.health, HEALTH_FLOOR);
        assert_eq!(p.satiation, SATIATION_MAX);
        assert_eq!(p.happiness, 0);
    }

    #[test]
    fn food_validation_rejects_cheap_or_inverted_entries() {
        let mut f = food("oran");
        f.price = 4;
        assert_eq!(
            validate_food(&f),
            Err(ValidationError::PriceBelowFloor(4))
        );
        let mut f = food("oran");
        f.satiation_delta = -8; // hunger-down convention is not accepted here
        assert!(matches!(
            validate_food(&f),
            Err(ValidationError::NonPositiveDelta(_))
        ));
    }

    #[test]
    fn duplicate_food_ids_are_rejected() {
        let foods = vec![food("oran"), food("oran")];
        assert_eq!(
            validate_foods(&foods),
            Err(ValidationError::DuplicateId("oran".to_string()))
        );
    }

    #[test]
    fn species_graph_checks_links_and_cycles() {
        let a = Species {
            id: SpeciesId("a".into()),
            name: "A".into(),
            sprite: String::new(),
            evolves_to: Some(SpeciesId("b".into())),
        };
        let b = Species {
            id: SpeciesId("b".into()),
            name: "B".into(),
            sprite: String::new(),
            evolves_to: None,
        };
        validate_species_graph(&[a.clone(), b.clone()]).unwrap();

        let dangling = vec![a.clone()];
        assert_eq!(
            validate_species_graph(&dangling),
            Err(ValidationError::SpeciesNotFound("b".to_string()))
        );

        let mut b2 = b;
        b2.evolves_to = Some(SpeciesId("a".into()));
        assert!(matches!(
            validate_species_graph(&[a, b2]),
            Err(ValidationError::SpeciesCycle(_))
        ));
    }

    proptest! {
        #[test]
        fn clamp_always_lands_in_bounds(h in -500i32..500, s in -500i32..500, f in -500i32..500) {
            let mut p = pet();
            p.health = h;
            p.satiation = s;
            p.happiness = f;
            p.clamp_vitals();
            prop_assert!((HEALTH_FLOOR..=HEALTH_MAX).contains(&p.health));
            prop_assert!((0..=SATIATION_MAX).contains(&p.satiation));
            prop_assert!((0..=HAPPINESS_MAX).contains(&p.happiness));
            prop_assert!(validate_pet(&p).is_ok());
        }
    }
}
