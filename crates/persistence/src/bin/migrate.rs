#![deny(warnings)]

//! Rewrite the save slot under the current schema: loads the blob with
//! field-by-field migration applied and writes it back out in full.

use persistence::{default_save_dir, save_key, SaveStore};
use pet_core::GameConfig;

fn main() -> anyhow::Result<()> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_save_dir().to_string());
    let store = SaveStore::new(dir.clone());
    let cfg = GameConfig::default();
    match store.load_pet(&cfg)? {
        Some(pet) => {
            store.save_pet(&pet)?;
            println!("Save migrated to {} in {}", save_key(), dir);
        }
        None => println!("No readable save in {dir}; nothing to migrate."),
    }
    Ok(())
}
