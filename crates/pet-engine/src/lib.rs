#![deny(warnings)]

//! Session runtime for Pocketpet: one engine object owning the pet, the
//! cart, the loaded catalogs, and the tick timer.
//!
//! The presentation layer drives this through an explicit command
//! interface, one method per user action; the engine knows nothing about
//! how actions are triggered. Every successful mutation is persisted
//! before it returns.

use catalog::CatalogProvider;
use pet_core::{Food, FoodId, GameConfig, Pet, SpeciesId, HEALTH_MAX};
use pet_econ::{care_reward, commit_purchase, price_cart, price_table, Cart, EconError, Receipt};
use persistence::{SaveStore, StoreError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

mod report;
mod timer;

pub use report::{StatSnapshot, TickEvent, TickReport};
pub use timer::TickTimer;

/// Errors surfaced by engine operations. All are locally recoverable: a
/// rejected action leaves the session untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Feeding was attempted with an empty or absent inventory entry.
    #[error("no stock of {0} in the inventory")]
    NoStock(String),
    /// The food id is not part of the loaded catalog.
    #[error("{0} is not in the current catalog")]
    UnknownFood(String),
    /// The operation needs a pet and none exists.
    #[error("no pet exists; create one first")]
    NoPet,
    /// Creation was attempted while the slot is occupied.
    #[error("a save already exists; delete it to start over")]
    SaveAlreadyExists,
    /// Cart or wallet rejection from the shop.
    #[error(transparent)]
    Shop(#[from] EconError),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A priced checkout awaiting external confirmation. Committing consumes
/// it; dropping it aborts the purchase with no effect.
#[derive(Clone, Debug)]
pub struct PendingPurchase {
    receipt: Receipt,
}

impl PendingPurchase {
    /// Cart total in coins.
    pub fn total(&self) -> u32 {
        self.receipt.total
    }

    /// Priced lines for the confirmation prompt.
    pub fn lines(&self) -> &[pet_econ::ReceiptLine] {
        &self.receipt.lines
    }
}

/// The engine/session object: constructed once, owns all mutable state,
/// and is handed by reference to whatever dispatches user actions and the
/// periodic tick.
pub struct Session {
    config: GameConfig,
    store: SaveStore,
    provider: CatalogProvider,
    foods: Vec<Food>,
    prices: BTreeMap<FoodId, u32>,
    species_names: Vec<String>,
    pet: Option<Pet>,
    cart: Cart,
    timer: TickTimer,
    rng: ChaCha8Rng,
}

impl Session {
    /// Load catalogs and the save slot, and wire up the timer. The timer
    /// starts armed when a pet already exists.
    pub fn open(
        config: GameConfig,
        store: SaveStore,
        provider: CatalogProvider,
    ) -> Result<Self, EngineError> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let foods = provider.load_foods(&mut rng);
        let prices = price_table(&foods);
        let species_names = provider.load_species_names();
        let pet = store.load_pet(&config)?;
        let mut timer = TickTimer::new(Duration::from_secs(config.tick_seconds));
        if pet.is_some() {
            timer.start(Instant::now());
        }
        if let Some(p) = &pet {
            info!(name = %p.name, health = p.health, "resumed existing save");
        }
        Ok(Self {
            config,
            store,
            provider,
            foods,
            prices,
            species_names,
            pet,
            cart: Cart::new(),
            timer,
            rng,
        })
    }

    /// The current pet, if one exists.
    pub fn pet(&self) -> Option<&Pet> {
        self.pet.as_ref()
    }

    /// The loaded food catalog.
    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    /// The selectable species names.
    pub fn species_names(&self) -> &[String] {
        &self.species_names
    }

    /// The current cart.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The active configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create the pet for this save slot. Fails with
    /// [`EngineError::SaveAlreadyExists`] when the slot is occupied. The
    /// new pet starts with one unit of every catalog food.
    pub fn create_pet(
        &mut self,
        name: Option<&str>,
        species_id: SpeciesId,
    ) -> Result<&Pet, EngineError> {
        if self.pet.is_some() || self.store.load_pet(&self.config)?.is_some() {
            return Err(EngineError::SaveAlreadyExists);
        }
        let species = self.provider.resolve_species(&species_id);
        let display_name = match name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => species.name.clone(),
        };
        let mut pet = self
            .config
            .new_pet(display_name, species.id.clone(), species.sprite.clone());
        pet.final_stage = species.evolves_to.is_none();
        pet.shiny = self.rng.gen_bool(self.config.shiny_odds);
        for food in &self.foods {
            pet.inventory.insert(food.id.clone(), 1);
        }
        self.store.save_pet(&pet)?;
        info!(name = %pet.name, species = %pet.species.0, shiny = pet.shiny, "a new pet is born");
        self.timer.start(Instant::now());
        Ok(&*self.pet.insert(pet))
    }

    /// Feed one unit of a food from the inventory. No mutation on error.
    pub fn feed(&mut self, id: &FoodId) -> Result<(), EngineError> {
        let pet = self.pet.as_mut().ok_or(EngineError::NoPet)?;
        if pet.stock(id) == 0 {
            return Err(EngineError::NoStock(id.0.clone()));
        }
        let food = self
            .foods
            .iter()
            .find(|f| &f.id == id)
            .ok_or_else(|| EngineError::UnknownFood(id.0.clone()))?;
        if let Some(count) = pet.inventory.get_mut(id) {
            *count -= 1;
        }
        pet.satiation += food.satiation_delta;
        pet.happiness += food.happiness_delta;
        pet.clamp_vitals();
        info!(food = %food.label, pet = %pet.name, "{}", food.flavor_text);
        self.persist()
    }

    /// Play with the pet: happiness up, satiation down.
    pub fn play(&mut self) -> Result<(), EngineError> {
        let cfg = &self.config;
        let pet = self.pet.as_mut().ok_or(EngineError::NoPet)?;
        pet.happiness += cfg.happiness_per_play;
        pet.satiation -= cfg.satiation_cost_per_play;
        pet.clamp_vitals();
        info!(pet = %pet.name, "played together");
        self.persist()
    }

    /// Apply one tick of time. Both the recurring timer and the explicit
    /// "let time pass" action land here, so the two paths behave
    /// identically. Each call is one discrete, consequential transition.
    pub fn advance_time(&mut self) -> Result<TickReport, EngineError> {
        let cfg = &self.config;
        let pet = self.pet.as_mut().ok_or(EngineError::NoPet)?;
        let before = StatSnapshot::of(pet);
        let mut events = Vec::new();

        pet.satiation += cfg.satiation_per_tick;
        pet.happiness += cfg.happiness_per_tick;
        pet.clamp_vitals();

        // One penalty per qualifying tick, even when both stats bottom out.
        if pet.satiation == 0 || pet.happiness == 0 {
            pet.health -= cfg.neglect_penalty;
            pet.clamp_vitals();
            events.push(TickEvent::Neglected);
            warn!(pet = %pet.name, health = pet.health, "neglect is taking its toll");
        }

        if pet.satiation >= cfg.care_floor
            && pet.happiness >= cfg.care_floor
            && pet.health < HEALTH_MAX
        {
            pet.health = (pet.health + cfg.regen_per_tick).min(HEALTH_MAX);
            events.push(TickEvent::Recovered);
            info!(pet = %pet.name, health = pet.health, "recovering under good care");
        }

        if !pet.final_stage {
            if pet.health == HEALTH_MAX {
                pet.full_health_streak += 1;
            } else if pet.full_health_streak > 0 {
                pet.full_health_streak = 0;
                events.push(TickEvent::StreakReset);
            }
        }

        if let Some(amount) = care_reward(pet, cfg) {
            pet.money += amount;
            events.push(TickEvent::RewardPaid { amount });
            info!(amount, balance = pet.money, "care reward paid");
        }

        let after = StatSnapshot::of(pet);
        self.persist()?;
        Ok(TickReport {
            before,
            after,
            events,
        })
    }

    /// Advance to the next evolutionary stage when the preconditions hold:
    /// not final, exactly full health, and a long enough streak. Returns
    /// whether an evolution happened; unmet preconditions and failed
    /// species lookups leave the pet unchanged.
    pub fn evolve(&mut self) -> Result<bool, EngineError> {
        let threshold = self.config.evolution_threshold;
        let Some(pet) = self.pet.as_mut() else {
            return Err(EngineError::NoPet);
        };
        if pet.final_stage || pet.health != HEALTH_MAX || pet.full_health_streak < threshold {
            return Ok(false);
        }
        let current = self.provider.resolve_species(&pet.species);
        let Some(next_id) = current.evolves_to else {
            return Ok(false);
        };
        let next = self.provider.resolve_species(&next_id);
        info!(from = %pet.species.0, to = %next.id.0, "evolving");
        pet.species = next.id;
        pet.name = next.name;
        pet.sprite = next.sprite;
        pet.evolution_stage += 1;
        pet.full_health_streak = 0;
        pet.final_stage = next.evolves_to.is_none();
        self.persist()?;
        Ok(true)
    }

    /// Stop the automatic tick.
    pub fn pause(&mut self) {
        self.timer.pause();
    }

    /// Restart the automatic tick from now.
    pub fn resume(&mut self) {
        self.timer.resume(Instant::now());
    }

    /// Whether the automatic tick is paused.
    pub fn is_paused(&self) -> bool {
        self.timer.is_paused()
    }

    /// Run one automatic tick if the timer is due. The explicit
    /// `advance_time` action does not consult the timer.
    pub fn poll_timer(&mut self, now: Instant) -> Result<Option<TickReport>, EngineError> {
        if self.pet.is_none() || !self.timer.poll(now) {
            return Ok(None);
        }
        self.advance_time().map(Some)
    }

    /// Put one more unit of a catalog food in the cart.
    pub fn add_to_cart(&mut self, id: &FoodId) -> Result<(), EngineError> {
        if !self.prices.contains_key(id) {
            return Err(EngineError::UnknownFood(id.0.clone()));
        }
        self.cart.add(id.clone());
        Ok(())
    }

    /// Take one unit of a food out of the cart (floored at zero).
    pub fn remove_from_cart(&mut self, id: &FoodId) {
        self.cart.remove(id);
    }

    /// Empty the cart without purchasing.
    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Price the cart and check the wallet, producing a pending purchase
    /// for the external confirmation step. The cart is not consumed.
    pub fn begin_checkout(&self) -> Result<PendingPurchase, EngineError> {
        let pet = self.pet.as_ref().ok_or(EngineError::NoPet)?;
        let receipt = price_cart(&self.cart, &self.prices)?;
        if pet.money < receipt.total {
            return Err(EngineError::Shop(EconError::InsufficientFunds {
                needed: receipt.total,
                available: pet.money,
            }));
        }
        Ok(PendingPurchase { receipt })
    }

    /// Commit a confirmed purchase: debit the wallet, credit the
    /// inventory, clear the whole cart.
    pub fn confirm_purchase(&mut self, pending: PendingPurchase) -> Result<(), EngineError> {
        let pet = self.pet.as_mut().ok_or(EngineError::NoPet)?;
        commit_purchase(pet, &pending.receipt)?;
        self.cart.clear();
        info!(total = pending.receipt.total, balance = pet.money, "purchase complete");
        self.persist()
    }

    /// Delete the save slot and forget the in-memory pet and cart.
    pub fn delete_save(&mut self) -> Result<(), EngineError> {
        self.store.delete_pet()?;
        self.pet = None;
        self.cart.clear();
        self.timer.pause();
        info!("save deleted");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), EngineError> {
        if let Some(pet) = &self.pet {
            self.store.save_pet(pet)?;
        }
        Ok(())
    }
}
