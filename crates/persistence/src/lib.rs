#![deny(warnings)]

//! Persistence layer: the single versioned save slot and timestamped
//! catalog cache records, stored as JSON blobs on disk.
//!
//! The save slot holds at most one pet. Loading is forgiving: a missing
//! file means "no save", a corrupt blob is treated the same way after a
//! warning, and a well-formed blob from an older schema is migrated
//! field-by-field with documented defaults.

use chrono::{DateTime, Duration, Utc};
use pet_core::{GameConfig, Pet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Bump when the save structure changes incompatibly; the key below keeps
/// old blobs from colliding with new ones.
pub const SAVE_SCHEMA_VERSION: u32 = 3;

/// File name of the save slot, qualified by the schema version.
pub fn save_key() -> String {
    format!("pet_save_v{SAVE_SCHEMA_VERSION}.json")
}

/// Cache blob for the food catalog.
pub const FOOD_CACHE_KEY: &str = "berry_cache_v2.json";
/// Cache blob for the species list.
pub const SPECIES_CACHE_KEY: &str = "species_cache_v2.json";

/// Returns the default directory used for local saves and caches.
pub fn default_save_dir() -> &'static str {
    "./saves"
}

/// Errors from the store. Callers treat parse failures as "no data" at the
/// slot level; they are surfaced here so tests can distinguish them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The blob exists but cannot be decoded.
    #[error("unreadable save blob: {0}")]
    Parse(String),
}

/// A timestamped cached blob with a freshness window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// When the data was fetched.
    pub fetched_at: DateTime<Utc>,
    /// The cached payload.
    pub data: T,
}

impl<T> CacheRecord<T> {
    /// Wrap a payload fetched now.
    pub fn fetched_now(data: T) -> Self {
        Self {
            fetched_at: Utc::now(),
            data,
        }
    }

    /// Whether the record is still within its time-to-live at `now`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Durable key-value store over a directory of JSON blobs.
#[derive(Clone, Debug)]
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    /// Store rooted at `dir`; the directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the versioned save slot.
    pub fn save_path(&self) -> PathBuf {
        self.dir.join(save_key())
    }

    /// Load the pet, if a readable save exists.
    ///
    /// A corrupt blob is logged and reported as "no save present" so a bad
    /// disk state never blocks starting over. Missing fields are migrated
    /// to the documented defaults from `cfg`.
    pub fn load_pet(&self, cfg: &GameConfig) -> Result<Option<Pet>, StoreError> {
        let path = self.save_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match decode_pet(&raw, cfg) {
            Ok(pet) => Ok(Some(pet)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable save");
                Ok(None)
            }
        }
    }

    /// Write the pet atomically (temp file + rename) under the versioned key.
    pub fn save_pet(&self, pet: &Pet) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.save_path();
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(pet).map_err(|e| StoreError::Parse(e.to_string()))?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Remove the save slot. Idempotent: deleting a missing slot is fine.
    pub fn delete_pet(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.save_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a cache record. Freshness is the caller's concern; malformed
    /// blobs are a cache miss, never an error.
    pub fn load_cache<T: DeserializeOwned>(&self, key: &str) -> Option<CacheRecord<T>> {
        let path = self.dir.join(key);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed cache record");
                None
            }
        }
    }

    /// Write a cache record atomically.
    pub fn save_cache<T: Serialize>(
        &self,
        key: &str,
        record: &CacheRecord<T>,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(key);
        let tmp = path.with_extension("tmp");
        let data = serde_json::to_vec(record).map_err(|e| StoreError::Parse(e.to_string()))?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn decode_pet(raw: &str, cfg: &GameConfig) -> Result<Pet, StoreError> {
    let mut value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| StoreError::Parse(e.to_string()))?;
    migrate(&mut value, cfg);
    serde_json::from_value(value).map_err(|e| StoreError::Parse(e.to_string()))
}

/// Best-effort field-by-field migration of an older blob. Missing numeric
/// fields take the documented starting constants, a missing inventory
/// becomes empty, and the evolution fields reset to their initial state.
fn migrate(value: &mut serde_json::Value, cfg: &GameConfig) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    let number_defaults: [(&str, i64); 6] = [
        ("health", cfg.starting_health as i64),
        ("satiation", cfg.starting_satiation as i64),
        ("happiness", cfg.starting_happiness as i64),
        ("money", cfg.starting_money as i64),
        ("evolution_stage", 0),
        ("full_health_streak", 0),
    ];
    for (key, default) in number_defaults {
        if !obj.get(key).map(serde_json::Value::is_number).unwrap_or(false) {
            obj.insert(key.to_string(), serde_json::json!(default));
        }
    }
    if !obj.get("inventory").map(serde_json::Value::is_object).unwrap_or(false) {
        obj.insert("inventory".to_string(), serde_json::json!({}));
    }
    for key in ["final_stage", "shiny"] {
        if !obj.get(key).map(serde_json::Value::is_boolean).unwrap_or(false) {
            obj.insert(key.to_string(), serde_json::json!(false));
        }
    }
    if !obj.get("sprite").map(serde_json::Value::is_string).unwrap_or(false) {
        obj.insert("sprite".to_string(), serde_json::json!(""));
    }
    if !obj.contains_key("species") {
        obj.insert("species".to_string(), serde_json::json!("unknown"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_core::{FoodId, SpeciesId};
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn scratch_store(tag: &str) -> SaveStore {
        let n = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "pocketpet-persistence-{tag}-{}-{n}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        SaveStore::new(dir)
    }

    fn sample_pet(cfg: &GameConfig) -> Pet {
        let mut pet = cfg.new_pet("Bulbi", SpeciesId("bulbasaur".into()), "url".into());
        pet.inventory.insert(FoodId("oran".into()), 2);
        pet
    }

    #[test]
    fn save_key_is_schema_versioned() {
        assert_eq!(save_key(), "pet_save_v3.json");
    }

    #[test]
    fn roundtrip_through_the_slot() {
        let cfg = GameConfig::default();
        let store = scratch_store("roundtrip");
        assert!(store.load_pet(&cfg).unwrap().is_none());

        let pet = sample_pet(&cfg);
        store.save_pet(&pet).unwrap();
        let back = store.load_pet(&cfg).unwrap().unwrap();
        assert_eq!(back, pet);
    }

    #[test]
    fn corrupt_blob_reads_as_no_save() {
        let cfg = GameConfig::default();
        let store = scratch_store("corrupt");
        fs::create_dir_all(store.save_path().parent().unwrap()).unwrap();
        fs::write(store.save_path(), b"{not json").unwrap();
        assert!(store.load_pet(&cfg).unwrap().is_none());
    }

    #[test]
    fn older_blob_is_migrated_with_defaults() {
        let cfg = GameConfig::default();
        let store = scratch_store("migrate");
        fs::create_dir_all(store.save_path().parent().unwrap()).unwrap();
        // A v1-era blob: pre-economy, pre-evolution.
        let legacy = serde_json::json!({
            "name": "Eve",
            "health": 73,
            "satiation": 4,
            "happiness": 12
        });
        fs::write(store.save_path(), legacy.to_string()).unwrap();

        let pet = store.load_pet(&cfg).unwrap().unwrap();
        assert_eq!(pet.name, "Eve");
        assert_eq!(pet.health, 73);
        assert_eq!(pet.satiation, 4);
        assert_eq!(pet.money, cfg.starting_money);
        assert!(pet.inventory.is_empty());
        assert_eq!(pet.evolution_stage, 0);
        assert_eq!(pet.full_health_streak, 0);
        assert!(!pet.final_stage);
        assert!(!pet.shiny);
        assert_eq!(pet.species, SpeciesId("unknown".into()));
    }

    #[test]
    fn delete_is_idempotent() {
        let cfg = GameConfig::default();
        let store = scratch_store("delete");
        store.delete_pet().unwrap();
        store.save_pet(&sample_pet(&cfg)).unwrap();
        store.delete_pet().unwrap();
        store.delete_pet().unwrap();
        assert!(store.load_pet(&cfg).unwrap().is_none());
    }

    #[test]
    fn cache_records_expire_by_ttl() {
        let store = scratch_store("cache");
        let record = CacheRecord::fetched_now(vec!["cheri".to_string()]);
        store.save_cache(FOOD_CACHE_KEY, &record).unwrap();

        let loaded: CacheRecord<Vec<String>> = store.load_cache(FOOD_CACHE_KEY).unwrap();
        let now = Utc::now();
        assert!(loaded.is_fresh(Duration::hours(24), now));
        assert!(!loaded.is_fresh(Duration::hours(24), now + Duration::hours(25)));
        assert_eq!(loaded.data, record.data);
    }

    #[test]
    fn malformed_cache_is_a_miss() {
        let store = scratch_store("badcache");
        let dir = store.save_path().parent().unwrap().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SPECIES_CACHE_KEY), b"??").unwrap();
        let missing: Option<CacheRecord<Vec<String>>> = store.load_cache(SPECIES_CACHE_KEY);
        assert!(missing.is_none());
    }
}
