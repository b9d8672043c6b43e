#![deny(warnings)]

//! Economic models for Pocketpet: catalog pricing, the shopping cart,
//! checkout arithmetic, and the good-care reward.
//!
//! This module provides validated utilities for:
//! - Deriving food effects and a deterministic price from source attributes
//! - Cart totals and atomic purchase commits
//! - The wellbeing score and the passive income it gates

use pet_core::{Food, FoodId, GameConfig, Pet, HAPPINESS_MAX, HEALTH_MAX, PRICE_FLOOR, SATIATION_MAX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced by shop operations.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Checkout was attempted with no nonzero cart entries.
    #[error("the cart is empty")]
    EmptyCart,
    /// The wallet cannot cover the cart total; nothing is committed.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Cart total in coins.
        needed: u32,
        /// Wallet balance in coins.
        available: u32,
    },
}

/// Berry firmness tiers, used only as an internal price factor. The tier is
/// never shown to the user, only the resulting price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Firmness {
    /// Factor 0.95.
    VerySoft,
    /// Factor 1.00.
    Soft,
    /// Factor 1.10.
    Hard,
    /// Factor 1.20.
    VeryHard,
    /// Factor 1.30.
    SuperHard,
}

impl Firmness {
    /// Price factor for this tier; monotonically increasing with firmness.
    pub fn factor(self) -> f64 {
        match self {
            Firmness::VerySoft => 0.95,
            Firmness::Soft => 1.00,
            Firmness::Hard => 1.10,
            Firmness::VeryHard => 1.20,
            Firmness::SuperHard => 1.30,
        }
    }

    /// Parse the remote API's kebab-case tier name. Unknown names map to
    /// `None`; pricing treats that as the neutral factor.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "very-soft" => Some(Firmness::VerySoft),
            "soft" => Some(Firmness::Soft),
            "hard" => Some(Firmness::Hard),
            "very-hard" => Some(Firmness::VeryHard),
            "super-hard" => Some(Firmness::SuperHard),
            _ => None,
        }
    }
}

/// Growth factor from the source's growth time: `clamp(1 + t/50, 1.0, 1.5)`.
pub fn growth_factor(growth_time: i64) -> f64 {
    (1.0 + growth_time as f64 / 50.0).clamp(1.0, 1.5)
}

/// Satiation restored by a food, derived from berry size:
/// `clamp(round(size/30) + 2, 2, 10)`.
pub fn satiation_delta_from_size(size: i64) -> i32 {
    (((size as f64) / 30.0).round() as i32 + 2).clamp(2, 10)
}

/// Happiness granted by a food, derived from total flavor potency:
/// `clamp(round(potency/12), 1, 8)`.
pub fn happiness_delta_from_potency(total_potency: i64) -> i32 {
    (((total_potency as f64) / 12.0).round() as i32).clamp(1, 8)
}

/// Deterministic catalog price from effect deltas and source attributes,
/// applied once per entry at load time.
///
/// `price = max(floor, round((5 + sat*2 + hap*3) * firmness * growth))`.
///
/// Example:
/// let p = price(8, 2, None, 0);
/// assert_eq!(p, 27);
pub fn price(
    satiation_delta: i32,
    happiness_delta: i32,
    firmness: Option<Firmness>,
    growth_time: i64,
) -> u32 {
    let base = 5.0 + satiation_delta.unsigned_abs() as f64 * 2.0 + happiness_delta as f64 * 3.0;
    let f = firmness.map(Firmness::factor).unwrap_or(1.0);
    let g = growth_factor(growth_time);
    let raw = (base * f * g).round();
    (raw as u32).max(PRICE_FLOOR)
}

/// Ephemeral shopping cart keyed by catalog food id. Never persisted;
/// cleared on purchase or explicit reset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    quantities: BTreeMap<FoodId, u32>,
}

impl Cart {
    /// Empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the requested quantity for an id.
    pub fn add(&mut self, id: FoodId) {
        *self.quantities.entry(id).or_insert(0) += 1;
    }

    /// Decrement the requested quantity for an id, floored at zero.
    pub fn remove(&mut self, id: &FoodId) {
        if let Some(q) = self.quantities.get_mut(id) {
            *q = q.saturating_sub(1);
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.quantities.clear();
    }

    /// Requested quantity for an id (0 when absent).
    pub fn quantity(&self, id: &FoodId) -> u32 {
        self.quantities.get(id).copied().unwrap_or(0)
    }

    /// Entries with a nonzero quantity.
    pub fn nonzero_entries(&self) -> impl Iterator<Item = (&FoodId, u32)> {
        self.quantities.iter().filter(|(_, &q)| q > 0).map(|(id, &q)| (id, q))
    }

    /// True when no entry has a nonzero quantity.
    pub fn is_empty(&self) -> bool {
        self.nonzero_entries().next().is_none()
    }
}

/// One priced cart line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptLine {
    /// Catalog id.
    pub id: FoodId,
    /// Requested quantity (> 0).
    pub quantity: u32,
    /// Unit price in coins at pricing time.
    pub unit_price: u32,
    /// `unit_price * quantity`.
    pub subtotal: u32,
}

/// A fully priced cart, produced before the external purchase confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Priced nonzero cart lines.
    pub lines: Vec<ReceiptLine>,
    /// Sum of all subtotals.
    pub total: u32,
}

/// Price the nonzero cart entries against a price table.
///
/// Ids missing from the table contribute zero, matching the loaded-catalog
/// lookup; the engine rejects unknown ids before they reach the cart.
/// Fails with [`EconError::EmptyCart`] when nothing has a nonzero quantity.
pub fn price_cart(cart: &Cart, prices: &BTreeMap<FoodId, u32>) -> Result<Receipt, EconError> {
    let mut lines = Vec::new();
    let mut total: u32 = 0;
    for (id, quantity) in cart.nonzero_entries() {
        let unit_price = prices.get(id).copied().unwrap_or(0);
        let subtotal = unit_price.saturating_mul(quantity);
        total = total.saturating_add(subtotal);
        lines.push(ReceiptLine {
            id: id.clone(),
            quantity,
            unit_price,
            subtotal,
        });
    }
    if lines.is_empty() {
        return Err(EconError::EmptyCart);
    }
    Ok(Receipt { lines, total })
}

/// Commit a priced receipt into the pet: debit the wallet and credit each
/// purchased id. Atomic: on [`EconError::InsufficientFunds`] the pet is
/// untouched.
pub fn commit_purchase(pet: &mut Pet, receipt: &Receipt) -> Result<(), EconError> {
    let remaining = pet
        .money
        .checked_sub(receipt.total)
        .ok_or(EconError::InsufficientFunds {
            needed: receipt.total,
            available: pet.money,
        })?;
    pet.money = remaining;
    for line in &receipt.lines {
        *pet.inventory.entry(line.id.clone()).or_insert(0) += line.quantity;
    }
    Ok(())
}

/// Build a price table from a loaded food catalog.
pub fn price_table(foods: &[Food]) -> BTreeMap<FoodId, u32> {
    foods.iter().map(|f| (f.id.clone(), f.price)).collect()
}

/// Wellbeing score in [0, 100]: the unweighted average of normalized
/// health, satiation adequacy, and happiness, scaled and rounded.
///
/// Example:
/// assert_eq!(wellbeing_score(100, 20, 20), 100);
pub fn wellbeing_score(health: i32, satiation: i32, happiness: i32) -> i32 {
    let parts = [
        health as f64 / HEALTH_MAX as f64,
        satiation as f64 / SATIATION_MAX as f64,
        happiness as f64 / HAPPINESS_MAX as f64,
    ];
    let avg = parts.iter().sum::<f64>() / parts.len() as f64;
    (avg * 100.0).round() as i32
}

/// Passive income for good care, evaluated once per tick.
///
/// Pays `reward_base` when health, satiation, and happiness each clear
/// their thresholds simultaneously, plus `reward_bonus` when the wellbeing
/// score exceeds `bonus_score_min`. Returns `None` when any threshold
/// fails. Strictly additive; no cap.
pub fn care_reward(pet: &Pet, cfg: &GameConfig) -> Option<u32> {
    let qualified = pet.health >= cfg.reward_health_min
        && pet.satiation >= cfg.reward_satiation_min
        && pet.happiness >= cfg.reward_happiness_min;
    if !qualified {
        return None;
    }
    let mut payout = cfg.reward_base;
    if wellbeing_score(pet.health, pet.satiation, pet.happiness) > cfg.bonus_score_min {
        payout += cfg.reward_bonus;
    }
    Some(payout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_core::SpeciesId;
    use proptest::prelude::*;

    fn pet() -> Pet {
        GameConfig::default().new_pet("Mochi", SpeciesId("oddish".into()), String::new())
    }

    #[test]
    fn price_matches_fallback_catalog() {
        // 5 + 8*2 + 2*3 = 27 and 5 + 3*2 + 6*3 = 29 with neutral factors.
        assert_eq!(price(8, 2, None, 0), 27);
        assert_eq!(price(3, 6, None, 0), 29);
    }

    #[test]
    fn price_applies_firmness_and_growth() {
        let soft = price(8, 2, Some(Firmness::Soft), 0);
        let hard = price(8, 2, Some(Firmness::SuperHard), 0);
        assert_eq!(soft, 27);
        assert_eq!(hard, 35); // round(27 * 1.3)
        assert_eq!(price(8, 2, None, 100), 41); // growth capped at 1.5
    }

    #[test]
    fn effect_derivation_clamps() {
        assert_eq!(satiation_delta_from_size(20), 3);
        assert_eq!(satiation_delta_from_size(0), 2);
        assert_eq!(satiation_delta_from_size(10_000), 10);
        assert_eq!(happiness_delta_from_potency(0), 1);
        assert_eq!(happiness_delta_from_potency(24), 2);
        assert_eq!(happiness_delta_from_potency(500), 8);
    }

    #[test]
    fn cart_floors_at_zero_and_tracks_nonzero() {
        let mut cart = Cart::new();
        let id = FoodId("oran".into());
        cart.remove(&id);
        assert!(cart.is_empty());
        cart.add(id.clone());
        cart.add(id.clone());
        cart.remove(&id);
        assert_eq!(cart.quantity(&id), 1);
        cart.remove(&id);
        assert!(cart.is_empty());
    }

    #[test]
    fn empty_cart_refuses_to_price() {
        let cart = Cart::new();
        let prices = BTreeMap::new();
        assert_eq!(price_cart(&cart, &prices), Err(EconError::EmptyCart));
    }

    #[test]
    fn underfunded_checkout_leaves_everything_unchanged() {
        // Cart {itemA: 2}, price 27, wallet 50: rejected, state intact.
        let mut p = pet();
        p.money = 50;
        let id = FoodId("item-a".into());
        let mut cart = Cart::new();
        cart.add(id.clone());
        cart.add(id.clone());
        let prices = BTreeMap::from([(id.clone(), 27u32)]);
        let receipt = price_cart(&cart, &prices).unwrap();
        assert_eq!(receipt.total, 54);

        let before = p.clone();
        let err = commit_purchase(&mut p, &receipt).unwrap_err();
        assert_eq!(
            err,
            EconError::InsufficientFunds {
                needed: 54,
                available: 50
            }
        );
        assert_eq!(p, before);
        assert_eq!(cart.quantity(&id), 2);
    }

    #[test]
    fn successful_checkout_is_exact() {
        let mut p = pet();
        p.money = 100;
        let id = FoodId("oran".into());
        let mut cart = Cart::new();
        cart.add(id.clone());
        cart.add(id.clone());
        let prices = BTreeMap::from([(id.clone(), 27u32)]);
        let receipt = price_cart(&cart, &prices).unwrap();
        commit_purchase(&mut p, &receipt).unwrap();
        assert_eq!(p.money, 100 - 54);
        assert_eq!(p.stock(&id), 2);
    }

    #[test]
    fn reward_pays_at_exact_thresholds() {
        let cfg = GameConfig::default();
        let mut p = pet();
        p.health = cfg.reward_health_min;
        p.satiation = cfg.reward_satiation_min;
        p.happiness = cfg.reward_happiness_min;
        // score = round(avg(0.6, 0.5, 0.5) * 100) = 53: base only.
        assert_eq!(care_reward(&p, &cfg), Some(cfg.reward_base));
    }

    #[test]
    fn reward_withholds_one_below_any_threshold() {
        let cfg = GameConfig::default();
        for stat in 0..3 {
            let mut p = pet();
            p.health = cfg.reward_health_min;
            p.satiation = cfg.reward_satiation_min;
            p.happiness = cfg.reward_happiness_min;
            match stat {
                0 => p.health -= 1,
                1 => p.satiation -= 1,
                _ => p.happiness -= 1,
            }
            assert_eq!(care_reward(&p, &cfg), None);
        }
    }

    #[test]
    fn reward_bonus_requires_high_score() {
        let cfg = GameConfig::default();
        let mut p = pet();
        p.health = 100;
        p.satiation = 20;
        p.happiness = 20;
        assert_eq!(wellbeing_score(p.health, p.satiation, p.happiness), 100);
        assert_eq!(
            care_reward(&p, &cfg),
            Some(cfg.reward_base + cfg.reward_bonus)
        );
    }

    proptest! {
        #[test]
        fn price_is_deterministic_and_floored(
            sat in 2i32..=10,
            hap in 1i32..=8,
            tier in 0u8..6,
            growth in 0i64..200,
        ) {
            let firmness = match tier {
                0 => Some(Firmness::VerySoft),
                1 => Some(Firmness::Soft),
                2 => Some(Firmness::Hard),
                3 => Some(Firmness::VeryHard),
                4 => Some(Firmness::SuperHard),
                _ => None,
            };
            let p1 = price(sat, hap, firmness, growth);
            let p2 = price(sat, hap, firmness, growth);
            prop_assert_eq!(p1, p2);
            prop_assert!(p1 >= PRICE_FLOOR);
        }

        #[test]
        fn wellbeing_score_stays_normalized(
            h in pet_core::HEALTH_FLOOR..=HEALTH_MAX,
            s in 0i32..=SATIATION_MAX,
            f in 0i32..=HAPPINESS_MAX,
        ) {
            let score = wellbeing_score(h, s, f);
            prop_assert!((0..=100).contains(&score));
        }

        #[test]
        fn commit_never_overdraws(total_money in 0u32..200, qty in 1u32..5) {
            let mut p = pet();
            p.money = total_money;
            let id = FoodId("oran".into());
            let mut cart = Cart::new();
            for _ in 0..qty {
                cart.add(id.clone());
            }
            let prices = BTreeMap::from([(id.clone(), 27u32)]);
            let receipt = price_cart(&cart, &prices).unwrap();
            let before = p.money;
            match commit_purchase(&mut p, &receipt) {
                Ok(()) => prop_assert_eq!(p.money, before - receipt.total),
                Err(_) => prop_assert_eq!(p.money, before),
            }
        }
    }
}
