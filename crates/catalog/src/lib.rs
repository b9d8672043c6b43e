#![deny(warnings)]

//! Food and species catalogs for Pocketpet.
//!
//! Load order for both catalogs: fresh local cache, then the remote
//! source, then a built-in fallback table. A failing remote is degraded,
//! never surfaced as fatal.

use chrono::{Duration, Utc};
use pet_core::{Food, FoodId, Species, SpeciesId};
use pet_econ::{
    happiness_delta_from_potency, price, satiation_delta_from_size, Firmness,
};
use persistence::{CacheRecord, SaveStore, FOOD_CACHE_KEY, SPECIES_CACHE_KEY};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

mod remote;

pub use remote::{
    FetchError, HttpSource, NamedRef, OfflineSource, RawBerry, RawFlavor, RawItem, RemoteSource,
    BERRY_PAGE_LIMIT, DEFAULT_API_BASE, SPECIES_PAGE_LIMIT,
};

/// Foods fetched from the remote are sampled down to this many entries.
pub const FOOD_SAMPLE_SIZE: usize = 6;
/// Freshness window of the food cache.
pub const FOOD_CACHE_TTL_HOURS: i64 = 24;
/// Freshness window of the species-list cache.
pub const SPECIES_CACHE_TTL_DAYS: i64 = 7;

/// Capitalize the first letter of every word, keeping hyphens:
/// "cheri-berry" becomes "Cheri-Berry".
pub fn pretty_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Derive a catalog food from a berry and its linked item.
pub fn food_from_berry(berry: &RawBerry, item: &RawItem) -> Food {
    let total_potency: i64 = berry.flavors.iter().map(|f| f.potency).sum();
    let satiation_delta = satiation_delta_from_size(berry.size);
    let happiness_delta = happiness_delta_from_potency(total_potency);
    let firmness = berry
        .firmness
        .as_ref()
        .and_then(|f| Firmness::from_name(&f.name));
    Food {
        id: FoodId(berry.name.clone()),
        label: pretty_label(&berry.name),
        satiation_delta,
        happiness_delta,
        flavor_text: format!("Nutritious {}!", pretty_label(&item.name)),
        sprite: item.sprite(),
        price: price(satiation_delta, happiness_delta, firmness, berry.growth_time),
    }
}

/// Built-in food catalog used when both the cache and the remote fail.
/// Prices follow the pricing formula with neutral factors.
pub fn fallback_foods() -> Vec<Food> {
    let entry = |id: &str, sat: i32, hap: i32, text: &str| Food {
        id: FoodId(id.to_string()),
        label: pretty_label(id),
        satiation_delta: sat,
        happiness_delta: hap,
        flavor_text: text.to_string(),
        sprite: String::new(),
        price: price(sat, hap, None, 0),
    };
    vec![
        entry("oran", 8, 2, "A hearty Oran berry!"),
        entry("sitrus", 8, 2, "A filling Sitrus berry!"),
        entry("pecha", 3, 6, "A sweet Pecha berry!"),
    ]
}

/// Built-in three-stage species chain used when the remote is unavailable.
pub fn fallback_species() -> Vec<Species> {
    let entry = |id: &str, next: Option<&str>| Species {
        id: SpeciesId(id.to_string()),
        name: pretty_label(id),
        sprite: String::new(),
        evolves_to: next.map(|n| SpeciesId(n.to_string())),
    };
    vec![
        entry("charmander", Some("charmeleon")),
        entry("charmeleon", Some("charizard")),
        entry("charizard", None),
    ]
}

/// Catalog provider: owns the remote source and the cache store, and
/// hands the engine ready-to-use food lists and species entries.
pub struct CatalogProvider {
    source: Box<dyn RemoteSource>,
    store: SaveStore,
}

impl CatalogProvider {
    /// Provider over an arbitrary source (HTTP in the app, stubs in tests).
    pub fn new(source: Box<dyn RemoteSource>, store: SaveStore) -> Self {
        Self { source, store }
    }

    /// Load the food catalog: fresh cache, else remote (sampling
    /// `FOOD_SAMPLE_SIZE` berries with the provided RNG and refreshing the
    /// cache), else the built-in fallback. Never fails.
    pub fn load_foods(&self, rng: &mut ChaCha8Rng) -> Vec<Food> {
        let now = Utc::now();
        if let Some(rec) = self.store.load_cache::<Vec<Food>>(FOOD_CACHE_KEY) {
            if rec.is_fresh(Duration::hours(FOOD_CACHE_TTL_HOURS), now) && !rec.data.is_empty() {
                debug!(count = rec.data.len(), "using cached food catalog");
                return rec.data;
            }
        }

        match self.fetch_foods(rng) {
            Ok(foods) if !foods.is_empty() => {
                if let Err(e) = self
                    .store
                    .save_cache(FOOD_CACHE_KEY, &CacheRecord::fetched_now(foods.clone()))
                {
                    warn!(error = %e, "could not refresh the food cache");
                }
                info!(count = foods.len(), "loaded food catalog from the remote source");
                foods
            }
            Ok(_) => {
                warn!("remote returned an empty berry list; using the fallback catalog");
                fallback_foods()
            }
            Err(e) => {
                warn!(error = %e, "could not load berries; using the fallback catalog");
                fallback_foods()
            }
        }
    }

    fn fetch_foods(&self, rng: &mut ChaCha8Rng) -> Result<Vec<Food>, FetchError> {
        let names = self.source.berry_names()?;
        let picks: Vec<&String> = names
            .choose_multiple(rng, FOOD_SAMPLE_SIZE.min(names.len()))
            .collect();
        let mut foods = Vec::with_capacity(picks.len());
        for name in picks {
            let berry = self.source.berry(name)?;
            let item = self.source.item(&berry.item.url)?;
            foods.push(food_from_berry(&berry, &item));
        }
        Ok(foods)
    }

    /// Load the selectable species names: fresh cache, else remote
    /// (refreshing the cache), else the names of the fallback chain.
    pub fn load_species_names(&self) -> Vec<String> {
        let now = Utc::now();
        if let Some(rec) = self.store.load_cache::<Vec<String>>(SPECIES_CACHE_KEY) {
            if rec.is_fresh(Duration::days(SPECIES_CACHE_TTL_DAYS), now) && !rec.data.is_empty() {
                debug!(count = rec.data.len(), "using cached species list");
                return rec.data;
            }
        }

        match self.source.species_names() {
            Ok(names) if !names.is_empty() => {
                if let Err(e) = self
                    .store
                    .save_cache(SPECIES_CACHE_KEY, &CacheRecord::fetched_now(names.clone()))
                {
                    warn!(error = %e, "could not refresh the species cache");
                }
                names
            }
            Ok(_) | Err(_) => {
                warn!("could not load the species list; using the fallback chain");
                fallback_species().into_iter().map(|s| s.id.0).collect()
            }
        }
    }

    /// Resolve one species entry: sprite and forward evolution link from
    /// the remote, the fallback chain when the remote fails, and a bare
    /// final-stage entry when the species is unknown everywhere.
    pub fn resolve_species(&self, id: &SpeciesId) -> Species {
        let remote = self
            .source
            .sprite(&id.0)
            .and_then(|sprite| {
                let next = self.source.next_evolution(&id.0)?;
                Ok(Species {
                    id: id.clone(),
                    name: pretty_label(&id.0),
                    sprite,
                    evolves_to: next.map(SpeciesId),
                })
            });
        match remote {
            Ok(species) => species,
            Err(e) => {
                debug!(species = %id.0, error = %e, "resolving species locally");
                fallback_species()
                    .into_iter()
                    .find(|s| &s.id == id)
                    .unwrap_or(Species {
                        id: id.clone(),
                        name: pretty_label(&id.0),
                        sprite: String::new(),
                        evolves_to: None,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_core::{validate_foods, validate_species_graph};
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn scratch_store(tag: &str) -> SaveStore {
        let n = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
        SaveStore::new(std::env::temp_dir().join(format!(
            "pocketpet-catalog-{tag}-{}-{n}",
            std::process::id()
        )))
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    /// Serves a fixed berry table; everything else is offline.
    struct StubSource {
        berries: Vec<RawBerry>,
    }

    fn stub_berry(name: &str, size: i64, potency: i64, growth: i64) -> RawBerry {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "size": size,
            "growth_time": growth,
            "firmness": {"name": "soft", "url": ""},
            "flavors": [{"potency": potency}],
            "item": {"name": format!("{name}-berry"), "url": format!("stub://{name}")}
        }))
        .unwrap()
    }

    impl RemoteSource for StubSource {
        fn berry_names(&self) -> Result<Vec<String>, FetchError> {
            Ok(self.berries.iter().map(|b| b.name.clone()).collect())
        }

        fn berry(&self, name: &str) -> Result<RawBerry, FetchError> {
            self.berries
                .iter()
                .find(|b| b.name == name)
                .cloned()
                .ok_or(FetchError::Status(404))
        }

        fn item(&self, url: &str) -> Result<RawItem, FetchError> {
            let name = url.trim_start_matches("stub://");
            Ok(serde_json::from_value(serde_json::json!({
                "name": format!("{name}-berry"),
                "sprites": {"default": format!("stub://{name}.png")}
            }))
            .unwrap())
        }

        fn species_names(&self) -> Result<Vec<String>, FetchError> {
            Err(FetchError::Offline)
        }

        fn sprite(&self, _name: &str) -> Result<String, FetchError> {
            Err(FetchError::Offline)
        }

        fn next_evolution(&self, _name: &str) -> Result<Option<String>, FetchError> {
            Err(FetchError::Offline)
        }
    }

    #[test]
    fn pretty_label_capitalizes_each_word() {
        assert_eq!(pretty_label("cheri"), "Cheri");
        assert_eq!(pretty_label("cheri-berry"), "Cheri-Berry");
        assert_eq!(pretty_label("mt moon"), "Mt Moon");
        assert_eq!(pretty_label(""), "");
    }

    #[test]
    fn fallback_tables_are_valid() {
        validate_foods(&fallback_foods()).unwrap();
        validate_species_graph(&fallback_species()).unwrap();
        let prices: Vec<u32> = fallback_foods().iter().map(|f| f.price).collect();
        assert_eq!(prices, vec![27, 27, 29]);
    }

    #[test]
    fn berry_mapping_derives_effects_and_price() {
        let berry = stub_berry("cheri", 20, 10, 3);
        let item: RawItem = serde_json::from_value(serde_json::json!({
            "name": "cheri-berry",
            "sprites": {"default": "x.png"}
        }))
        .unwrap();
        let food = food_from_berry(&berry, &item);
        assert_eq!(food.id, FoodId("cheri".into()));
        assert_eq!(food.label, "Cheri");
        assert_eq!(food.satiation_delta, 3); // round(20/30) + 2
        assert_eq!(food.happiness_delta, 1); // round(10/12) floored at 1
        assert_eq!(food.flavor_text, "Nutritious Cheri-Berry!");
        // base = 5 + 6 + 3 = 14, soft (1.0) * growth 1.06 = 14.84
        assert_eq!(food.price, 15);
        pet_core::validate_food(&food).unwrap();
    }

    #[test]
    fn remote_failure_degrades_to_fallback() {
        let provider = CatalogProvider::new(Box::new(OfflineSource), scratch_store("offline"));
        let foods = provider.load_foods(&mut rng());
        assert_eq!(foods, fallback_foods());
        let names = provider.load_species_names();
        assert_eq!(names, vec!["charmander", "charmeleon", "charizard"]);
    }

    #[test]
    fn remote_load_samples_and_caches() {
        let berries = (0..10i64)
            .map(|i| stub_berry(&format!("berry{i}"), 20 + i, 12 * i, i))
            .collect();
        let store = scratch_store("sample");
        let provider = CatalogProvider::new(Box::new(StubSource { berries }), store.clone());

        let foods = provider.load_foods(&mut rng());
        assert_eq!(foods.len(), FOOD_SAMPLE_SIZE);
        validate_foods(&foods).unwrap();

        // Second load must come from the cache even with the source gone.
        let cached_provider = CatalogProvider::new(Box::new(OfflineSource), store);
        let again = cached_provider.load_foods(&mut rng());
        assert_eq!(again, foods);
    }

    #[test]
    fn stale_cache_is_refetched() {
        let store = scratch_store("stale");
        let expired = CacheRecord {
            fetched_at: Utc::now() - Duration::hours(FOOD_CACHE_TTL_HOURS + 1),
            data: fallback_foods(),
        };
        store.save_cache(FOOD_CACHE_KEY, &expired).unwrap();

        let berries = vec![stub_berry("fresh", 30, 24, 2)];
        let provider = CatalogProvider::new(Box::new(StubSource { berries }), store);
        let foods = provider.load_foods(&mut rng());
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0].id, FoodId("fresh".into()));
    }

    #[test]
    fn species_resolution_falls_back_to_the_builtin_chain() {
        let provider = CatalogProvider::new(Box::new(OfflineSource), scratch_store("species"));
        let charmander = provider.resolve_species(&SpeciesId("charmander".into()));
        assert_eq!(charmander.evolves_to, Some(SpeciesId("charmeleon".into())));

        let stranger = provider.resolve_species(&SpeciesId("mewtwo".into()));
        assert_eq!(stranger.name, "Mewtwo");
        assert_eq!(stranger.evolves_to, None);
    }
}
