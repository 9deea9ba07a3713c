use crate::legacy_schema::compounds::dsl as lc_dsl;
use crate::legacy_schema::solution_compounds::dsl as lsc_dsl;
use crate::legacy_schema::solutions::dsl as lsol_dsl;
use chrono::{DateTime, TimeZone, Utc};
use compound_migration::{MigrationError, Result, SourceCompound, SourceSolution};
use diesel::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Lector de sólo lectura del almacén del esquema anterior. Entrega
/// instantáneas primitivas: cada columna anulable llega como `Option` y
/// las decisiones sobre campos requeridos quedan en el motor.
pub struct LegacySolutionStore {
  conn: Mutex<SqliteConnection>,
}

#[derive(Debug, Queryable)]
struct LegacyCompoundRow {
  cid: String,
  name: Option<String>,
  formula: Option<String>,
  molecular_weight: Option<f64>,
  name_iupac: Option<String>,
  image: Option<Vec<u8>>,
  created_at_ts: Option<i64>,
}

#[derive(Debug, Queryable)]
struct LegacySolutionRow {
  id: String,
  name: Option<String>,
  created_at_ts: Option<i64>,
  amounts: Option<String>,
}

#[derive(Debug, Queryable)]
#[allow(dead_code)]
struct LegacyMemberRow {
  id: String,
  solution_id: String,
  compound_cid: String,
}

fn ts_to_datetime(ts: i64) -> Result<DateTime<Utc>> {
  Utc.timestamp_opt(ts, 0)
     .single()
     .ok_or_else(|| MigrationError::Storage(format!("timestamp inválido en el almacén fuente: {}", ts)))
}

fn compound_snapshot(row: LegacyCompoundRow) -> Result<SourceCompound> {
  let created_at = row.created_at_ts.map(ts_to_datetime).transpose()?;
  Ok(SourceCompound { id: row.cid.clone(),
                      cid: Some(row.cid),
                      name: row.name,
                      formula: row.formula,
                      molecular_weight: row.molecular_weight,
                      name_iupac: row.name_iupac,
                      image: row.image,
                      created_at })
}

impl LegacySolutionStore {
  pub fn open(path: &Path) -> Result<Self> {
    let url = path.to_string_lossy().to_string();
    let conn = SqliteConnection::establish(&url)
      .map_err(|e| MigrationError::Storage(format!("no se pudo abrir el almacén fuente {}: {}", url, e)))?;
    Ok(Self { conn: Mutex::new(conn) })
  }

  fn lock(&self) -> Result<MutexGuard<'_, SqliteConnection>> {
    self.conn
        .lock()
        .map_err(|e| MigrationError::Storage(format!("mutex poisoned: {:?}", e)))
  }

  pub fn source_compounds(&self) -> Result<Vec<SourceCompound>> {
    let mut conn = self.lock()?;
    let rows = lc_dsl::compounds.load::<LegacyCompoundRow>(&mut *conn)
                                .map_err(|e| MigrationError::Storage(format!("db: {}", e)))?;
    rows.into_iter().map(compound_snapshot).collect()
  }

  pub fn source_solutions(&self) -> Result<Vec<SourceSolution>> {
    let mut conn = self.lock()?;
    let rows = lsol_dsl::solutions.load::<LegacySolutionRow>(&mut *conn)
                                  .map_err(|e| MigrationError::Storage(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      // El diccionario de cantidades vive como JSON nombre→gramos. Una
      // columna NULL es una ausencia (el motor decide si es fatal); un
      // JSON que no parsea es corrupción del almacén.
      let amounts: Option<HashMap<String, f64>> = match &row.amounts {
        Some(raw) => {
          Some(serde_json::from_str(raw)
            .map_err(|e| MigrationError::Storage(format!("diccionario de cantidades corrupto en {}: {}", row.id, e)))?)
        }
        None => None,
      };

      let members = lsc_dsl::solution_compounds.filter(lsc_dsl::solution_id.eq(&row.id))
                                               .load::<LegacyMemberRow>(&mut *conn)
                                               .map_err(|e| MigrationError::Storage(format!("db: {}", e)))?;
      let mut compounds = Vec::with_capacity(members.len());
      for member in members {
        let compound = lc_dsl::compounds.filter(lc_dsl::cid.eq(&member.compound_cid))
                                        .first::<LegacyCompoundRow>(&mut *conn)
                                        .optional()
                                        .map_err(|e| MigrationError::Storage(format!("db: {}", e)))?
                                        .ok_or_else(|| {
                                          MigrationError::Storage(format!("la solución {} referencia el compuesto {} que \
                                                                           no existe en el almacén fuente",
                                                                          row.id, member.compound_cid))
                                        })?;
        compounds.push(compound_snapshot(compound)?);
      }

      let created_at = row.created_at_ts.map(ts_to_datetime).transpose()?;
      out.push(SourceSolution { id: row.id,
                                name: row.name,
                                created_at,
                                amounts,
                                compounds: Some(compounds) });
    }
    Ok(out)
  }
}
