use crate::legacy_store::LegacySolutionStore;
use crate::store::{DieselCompoundStore, SCHEMA_TOKEN_KEY};
use compound_domain::{Compound, CompoundRepository, Solution};
use compound_migration::{destination_model, MigrationEngine, MigrationError, MigrationManager, MigrationReport,
                         MigrationState, Result, SourceCompound, SourceSolution};
use diesel::prelude::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Archivo puntero dentro del directorio del almacén: su contenido es el
/// nombre del archivo SQLite activo. Cambiarlo es el punto de commit de
/// una migración.
pub const ACTIVE_POINTER_FILE: &str = "active_store";

const FRESH_STORE_FILE: &str = "compounds-v4.sqlite3";

/// Administrador de migración sobre SQLite: lee instantáneas del almacén
/// fuente y escribe el grafo destino en un archivo nuevo. El destino no
/// es visible hasta que el puntero activo lo nombre.
pub struct DieselMigrationManager {
  source: LegacySolutionStore,
  destination: DieselCompoundStore,
  source_file: String,
}

impl DieselMigrationManager {
  pub fn new(source: LegacySolutionStore, destination: DieselCompoundStore, source_file: String) -> Self {
    Self { source, destination, source_file }
  }
}

impl MigrationManager for DieselMigrationManager {
  fn source_compounds(&self) -> Result<Vec<SourceCompound>> {
    self.source.source_compounds()
  }

  fn source_solutions(&self) -> Result<Vec<SourceSolution>> {
    self.source.source_solutions()
  }

  fn write_compound(&mut self, compound: &Compound) -> Result<()> {
    self.destination
        .save_compound(compound.clone())
        .map_err(|e| MigrationError::Storage(e.to_string()))?;
    Ok(())
  }

  fn write_solution(&mut self, solution: &Solution) -> Result<()> {
    self.destination
        .save_solution(solution.clone())
        .map_err(|e| MigrationError::Storage(e.to_string()))?;
    Ok(())
  }

  fn commit(&mut self) -> Result<()> {
    self.destination
        .put_meta("migrated_from", &self.source_file)
        .map_err(|e| MigrationError::Storage(e.to_string()))
  }
}

fn read_pointer(dir: &Path) -> Result<Option<String>> {
  match std::fs::read_to_string(dir.join(ACTIVE_POINTER_FILE)) {
    Ok(contents) => Ok(Some(contents.trim().to_string())),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(MigrationError::Storage(format!("no se pudo leer el puntero activo: {}", e))),
  }
}

/// Reescribe el puntero activo de forma atómica: archivo temporal y
/// rename sobre el definitivo.
fn write_pointer(dir: &Path, file_name: &str) -> Result<()> {
  let tmp = dir.join(format!("{}.tmp", ACTIVE_POINTER_FILE));
  std::fs::write(&tmp, format!("{}\n", file_name))
    .map_err(|e| MigrationError::Storage(format!("no se pudo escribir el puntero: {}", e)))?;
  std::fs::rename(&tmp, dir.join(ACTIVE_POINTER_FILE))
    .map_err(|e| MigrationError::Storage(format!("no se pudo reemplazar el puntero: {}", e)))
}

/// Lee el token de versión registrado en un archivo de almacén sin
/// mutarlo: conexión directa, sin pool ni migraciones embebidas. Un
/// almacén del esquema anterior no tiene la tabla de metadatos y cuenta
/// como "sin token".
fn read_schema_token(path: &Path) -> Result<Option<String>> {
  use crate::schema::store_meta::dsl as meta_dsl;
  let url = path.to_string_lossy().to_string();
  let mut conn = SqliteConnection::establish(&url)
    .map_err(|e| MigrationError::Storage(format!("no se pudo abrir el almacén {}: {}", url, e)))?;
  let token = meta_dsl::store_meta.filter(meta_dsl::key.eq(SCHEMA_TOKEN_KEY))
                                  .select(meta_dsl::value)
                                  .first::<String>(&mut conn)
                                  .optional();
  Ok(token.unwrap_or(None))
}

/// Decide si el almacén activo del directorio necesita migrar al esquema
/// vigente. No muta el almacén; sin puntero activo no hay nada que
/// migrar (el primer `open_active` crea un almacén ya en v4).
pub fn is_migration_necessary(dir: &Path) -> Result<bool> {
  let source_file = match read_pointer(dir)? {
    Some(f) => f,
    None => return Ok(false),
  };
  let recorded = read_schema_token(&dir.join(source_file))?;
  Ok(compound_migration::is_migration_necessary(recorded.as_deref(), &destination_model()))
}

/// Migra el almacén activo al esquema vigente: materializa el grafo
/// destino en un archivo nuevo y sólo al confirmar reescribe el puntero
/// activo. Si algo falla, el archivo nuevo se descarta y el almacén
/// fuente queda intacto.
pub fn migrate(dir: &Path) -> Result<MigrationReport> {
  let source_file =
    read_pointer(dir)?.ok_or_else(|| MigrationError::Storage("no hay almacén activo que migrar".to_string()))?;
  let dest_file = format!("compounds-v4-{}.sqlite3", Uuid::new_v4());
  let dest_path = dir.join(&dest_file);

  let source = LegacySolutionStore::open(&dir.join(&source_file))?;
  let destination = DieselCompoundStore::new(&dest_path.to_string_lossy());
  let manager = DieselMigrationManager::new(source, destination, source_file.clone());

  match MigrationEngine::new(manager).run() {
    Ok(report) => {
      write_pointer(dir, &dest_file)?;
      log::info!("almacén migrado: {} -> {}", source_file, dest_file);
      Ok(report)
    }
    Err(e) => {
      let _ = std::fs::remove_file(&dest_path);
      Err(e)
    }
  }
}

/// Chequeo y migración de arranque en un solo paso. Devuelve el estado
/// explícito que la aplicación pasa hacia abajo: con `Failed` no debe
/// abrirse el almacén (relanzar reintenta).
pub fn bootstrap(dir: &Path) -> MigrationState {
  match is_migration_necessary(dir) {
    Ok(false) => MigrationState::NotNeeded,
    Ok(true) => match migrate(dir) {
      Ok(report) => MigrationState::Completed(report),
      Err(e) => MigrationState::Failed(e.to_string()),
    },
    Err(e) => MigrationState::Failed(e.to_string()),
  }
}

/// Abre el almacén activo del directorio, creando uno nuevo en el
/// esquema vigente si el directorio está vacío. Llamar después del
/// chequeo de migración del arranque.
pub fn open_active(dir: &Path) -> std::result::Result<DieselCompoundStore, compound_domain::DomainError> {
  use compound_domain::DomainError;
  std::fs::create_dir_all(dir).map_err(|e| DomainError::ExternalError(format!("no se pudo crear {}: {}",
                                                                              dir.display(),
                                                                              e)))?;
  let pointed = read_pointer(dir).map_err(|e| DomainError::ExternalError(e.to_string()))?;
  match pointed {
    Some(file) => Ok(DieselCompoundStore::new(&dir.join(file).to_string_lossy())),
    None => {
      let store = DieselCompoundStore::new(&dir.join(FRESH_STORE_FILE).to_string_lossy());
      write_pointer(dir, FRESH_STORE_FILE).map_err(|e| DomainError::ExternalError(e.to_string()))?;
      Ok(store)
    }
  }
}

/// Directorio del almacén según el entorno (`COMPOUND_STORE_DIR`), con
/// `./store` como default.
pub fn store_dir_from_env() -> PathBuf {
  dotenvy::dotenv().ok();
  std::env::var("COMPOUND_STORE_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./store"))
}
