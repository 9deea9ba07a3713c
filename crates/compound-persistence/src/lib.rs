//! Persistencia SQLite del dominio de compuestos. Este crate expone el
//! repositorio Diesel que implementa `CompoundRepository`, el lector del
//! esquema anterior y la migración de almacén con puntero activo. La
//! implementación del repositorio está en `store.rs`.

mod legacy_schema;
mod legacy_store;
pub mod schema;
mod store;
mod store_migration;

pub use legacy_store::LegacySolutionStore;
pub use store::{new_from_env, DieselCompoundStore, SCHEMA_TOKEN_KEY};
pub use store_migration::{bootstrap, is_migration_necessary, migrate, open_active, store_dir_from_env,
                          DieselMigrationManager, ACTIVE_POINTER_FILE};
