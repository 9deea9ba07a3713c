use crate::schema;
use crate::schema::compound_tag_members::dsl as tm_dsl;
use crate::schema::compound_tags::dsl as tag_dsl;
use crate::schema::compounds::dsl as comp_dsl;
use crate::schema::solution_compounds::dsl as sc_dsl;
use crate::schema::solution_ingredients::dsl as si_dsl;
use crate::schema::solutions::dsl as sol_dsl;
use crate::schema::store_meta::dsl as meta_dsl;
use chrono::{DateTime, TimeZone, Utc};
use compound_domain::{Compound, CompoundRepository, CompoundTag, DomainError, Solution, SolutionIngredient};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;
use uuid::Uuid;
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
/// Clave de `store_meta` donde se registra el token de versión del
/// esquema con el que se creó el almacén.
pub const SCHEMA_TOKEN_KEY: &str = "schema_token";
type DbPool = Pool<ConnectionManager<SqliteConnection>>;
/// Repo Diesel/SQLite que implementa `CompoundRepository`.
pub struct DieselCompoundStore {
  pool: Arc<DbPool>,
}
impl DieselCompoundStore {
  pub fn new(database_url: &str) -> Self {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(4).build(manager).expect("no se pudo crear el pool de conexiones");
    let store = DieselCompoundStore { pool: Arc::new(pool) };
    if let Ok(mut c) = store.conn_raw() {
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
      let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
      let _ = c.run_pending_migrations(MIGRATIONS);
      store.record_schema_token(&mut c);
    }
    store
  }
  fn conn_raw(&self) -> std::result::Result<PooledConnection<ConnectionManager<SqliteConnection>>, r2d2::Error> {
    self.pool.get()
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>, DomainError> {
    self.conn_raw().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))
  }
  /// Registra el token de versión del esquema vigente si aún no existe.
  fn record_schema_token(&self, conn: &mut SqliteConnection) {
    let existing: Result<Option<String>, _> = meta_dsl::store_meta.filter(meta_dsl::key.eq(SCHEMA_TOKEN_KEY))
                                                                  .select(meta_dsl::value)
                                                                  .first::<String>(conn)
                                                                  .optional();
    if let Ok(None) = existing {
      let row = StoreMetaRow { key: SCHEMA_TOKEN_KEY.to_string(),
                               value: compound_migration::destination_model().version_token() };
      let _ = diesel::insert_into(meta_dsl::store_meta).values(&row).execute(conn);
    }
  }
  /// Token de versión registrado en este almacén, si existe. Un almacén
  /// del esquema anterior no tiene tabla de metadatos: eso también cuenta
  /// como "sin token".
  pub fn recorded_schema_token(&self) -> Result<Option<String>, DomainError> {
    let mut conn = self.conn()?;
    let token = meta_dsl::store_meta.filter(meta_dsl::key.eq(SCHEMA_TOKEN_KEY))
                                    .select(meta_dsl::value)
                                    .first::<String>(&mut conn)
                                    .optional();
    // la consulta falla si la tabla no existe: es un almacén sin token
    Ok(token.unwrap_or(None))
  }
  /// Escribe un valor arbitrario en los metadatos del almacén.
  pub fn put_meta(&self, key: &str, value: &str) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let _ = diesel::delete(meta_dsl::store_meta.filter(meta_dsl::key.eq(key))).execute(&mut conn);
    let row = StoreMetaRow { key: key.to_string(), value: value.to_string() };
    map_db_err(diesel::insert_into(meta_dsl::store_meta).values(&row).execute(&mut conn))?;
    Ok(())
  }
}
// Diesel row structs for the store tables
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::compounds)]
struct CompoundRow {
  pub cid: String,
  pub name: String,
  pub formula: String,
  pub molecular_weight: f64,
  pub name_iupac: String,
  pub image: Option<Vec<u8>>,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::solutions)]
struct SolutionRow {
  pub id: String,
  pub name: String,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::solution_ingredients)]
struct IngredientRow {
  pub id: String,
  pub solution_id: String,
  pub compound_ref: Option<String>,
  pub compound_name: String,
  pub compound_cid: String,
  pub amount: f64,
  pub unit: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::solution_compounds)]
struct SolutionCompoundRow {
  pub id: String,
  pub solution_id: String,
  pub compound_cid: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::compound_tags)]
struct TagRow {
  pub name: String,
  pub compound_count: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::compound_tag_members)]
struct TagMemberRow {
  pub id: String,
  pub tag_name: String,
  pub compound_cid: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::store_meta)]
struct StoreMetaRow {
  pub key: String,
  pub value: String,
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(|e| DomainError::ExternalError(format!("db: {}", e)))
}
fn ts_to_datetime(ts: i64) -> Result<DateTime<Utc>, DomainError> {
  Utc.timestamp_opt(ts, 0)
     .single()
     .ok_or_else(|| DomainError::ExternalError(format!("timestamp inválido: {}", ts)))
}
fn compound_from_row(r: CompoundRow) -> Result<Compound, DomainError> {
  Compound::from_parts(&r.cid,
                       &r.name,
                       &r.formula,
                       r.molecular_weight,
                       &r.name_iupac,
                       r.image,
                       ts_to_datetime(r.created_at_ts)?)
}
fn compound_to_row(c: &Compound) -> CompoundRow {
  CompoundRow { cid: c.cid().to_string(),
                name: c.name().to_string(),
                formula: c.formula().to_string(),
                molecular_weight: c.molecular_weight(),
                name_iupac: c.name_iupac().to_string(),
                image: c.image().map(|b| b.to_vec()),
                created_at_ts: c.created_at().timestamp() }
}
impl DieselCompoundStore {
  fn assemble_solution(&self, conn: &mut SqliteConnection, row: SolutionRow) -> Result<Solution, DomainError> {
    let solution_id = Uuid::parse_str(&row.id).map_err(|e| DomainError::ExternalError(format!("uuid inválido: {}", e)))?;
    let ing_rows = si_dsl::solution_ingredients.filter(si_dsl::solution_id.eq(&row.id))
                                               .load::<IngredientRow>(conn)
                                               .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let mut ingredients = Vec::with_capacity(ing_rows.len());
    for r in ing_rows {
      let id = Uuid::parse_str(&r.id).map_err(|e| DomainError::ExternalError(format!("uuid inválido: {}", e)))?;
      ingredients.push(SolutionIngredient::from_parts(id,
                                                      r.compound_ref,
                                                      r.compound_name,
                                                      r.compound_cid,
                                                      r.amount,
                                                      r.unit.parse()?,
                                                      solution_id));
    }
    let comp_rows = sc_dsl::solution_compounds.filter(sc_dsl::solution_id.eq(&row.id))
                                              .load::<SolutionCompoundRow>(conn)
                                              .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let compounds = comp_rows.into_iter().map(|r| r.compound_cid).collect();
    Solution::from_parts(solution_id, row.name, ts_to_datetime(row.created_at_ts)?, ingredients, compounds)
  }
}
impl CompoundRepository for DieselCompoundStore {
  fn save_compound(&self, compound: Compound) -> Result<String, DomainError> {
    let mut conn = self.conn()?;
    let row = compound_to_row(&compound);
    // Upsert: try insert, on conflict replace by delete+insert
    if diesel::insert_into(comp_dsl::compounds).values(&row).execute(&mut conn).is_err() {
      let _ = diesel::delete(comp_dsl::compounds.filter(comp_dsl::cid.eq(&row.cid))).execute(&mut conn);
      map_db_err(diesel::insert_into(comp_dsl::compounds).values(&row).execute(&mut conn))?;
    }
    Ok(row.cid)
  }
  fn get_compound(&self, cid: &str) -> Result<Option<Compound>, DomainError> {
    let mut conn = self.conn()?;
    let opt = comp_dsl::compounds.filter(comp_dsl::cid.eq(cid))
                                 .first::<CompoundRow>(&mut conn)
                                 .optional()
                                 .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    match opt {
      Some(r) => Ok(Some(compound_from_row(r)?)),
      None => Ok(None),
    }
  }
  fn list_compounds(&self) -> Result<Vec<Compound>, DomainError> {
    let mut conn = self.conn()?;
    let rows =
      comp_dsl::compounds.load::<CompoundRow>(&mut conn).map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
      out.push(compound_from_row(r)?);
    }
    Ok(out)
  }
  fn delete_compound(&self, cid: &str) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    // If the compound is referenced by any ingredient, do not delete.
    // La copia desnormalizada y la referencia cableada siempre llevan el
    // mismo cid, así que alcanza con consultar la copia.
    let referenced = si_dsl::solution_ingredients.filter(si_dsl::compound_cid.eq(cid))
                                                 .select(si_dsl::id)
                                                 .first::<String>(&mut conn)
                                                 .optional()
                                                 .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    if referenced.is_some() {
      return Err(DomainError::ValidationError(format!("No se puede eliminar el compuesto {}; pertenece a una solución",
                                                      cid)));
    }
    map_db_err(diesel::delete(comp_dsl::compounds.filter(comp_dsl::cid.eq(cid))).execute(&mut conn))?;
    let _ = diesel::delete(tm_dsl::compound_tag_members.filter(tm_dsl::compound_cid.eq(cid))).execute(&mut conn);
    Ok(())
  }
  fn save_solution(&self, mut solution: Solution) -> Result<Uuid, DomainError> {
    solution.normalize();
    let mut conn = self.conn()?;
    let id_s = solution.id().to_string();
    // Reemplazo completo de la fila, sus ingredientes y el conjunto derivado
    let _ = diesel::delete(si_dsl::solution_ingredients.filter(si_dsl::solution_id.eq(&id_s))).execute(&mut conn);
    let _ = diesel::delete(sc_dsl::solution_compounds.filter(sc_dsl::solution_id.eq(&id_s))).execute(&mut conn);
    let _ = diesel::delete(sol_dsl::solutions.filter(sol_dsl::id.eq(&id_s))).execute(&mut conn);
    let row = SolutionRow { id: id_s.clone(),
                            name: solution.name().to_string(),
                            created_at_ts: solution.created_at().timestamp() };
    map_db_err(diesel::insert_into(sol_dsl::solutions).values(&row).execute(&mut conn))?;
    for ing in solution.ingredients() {
      let ir = IngredientRow { id: ing.id().to_string(),
                               solution_id: id_s.clone(),
                               compound_ref: ing.compound().map(|s| s.to_string()),
                               compound_name: ing.compound_name().to_string(),
                               compound_cid: ing.compound_cid().to_string(),
                               amount: ing.amount(),
                               unit: ing.unit().to_string() };
      map_db_err(diesel::insert_into(si_dsl::solution_ingredients).values(&ir).execute(&mut conn))?;
    }
    for cid in solution.compounds() {
      let cr = SolutionCompoundRow { id: Uuid::new_v4().to_string(),
                                     solution_id: id_s.clone(),
                                     compound_cid: cid.clone() };
      map_db_err(diesel::insert_into(sc_dsl::solution_compounds).values(&cr).execute(&mut conn))?;
    }
    Ok(solution.id())
  }
  fn get_solution(&self, id: &Uuid) -> Result<Option<Solution>, DomainError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let opt = sol_dsl::solutions.filter(sol_dsl::id.eq(&id_s))
                                .first::<SolutionRow>(&mut conn)
                                .optional()
                                .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    match opt {
      Some(r) => Ok(Some(self.assemble_solution(&mut conn, r)?)),
      None => Ok(None),
    }
  }
  fn list_solutions(&self) -> Result<Vec<Solution>, DomainError> {
    let mut conn = self.conn()?;
    let rows =
      sol_dsl::solutions.load::<SolutionRow>(&mut conn).map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
      out.push(self.assemble_solution(&mut conn, r)?);
    }
    Ok(out)
  }
  fn delete_solution(&self, id: &Uuid) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    map_db_err(diesel::delete(si_dsl::solution_ingredients.filter(si_dsl::solution_id.eq(&id_s))).execute(&mut conn))?;
    map_db_err(diesel::delete(sc_dsl::solution_compounds.filter(sc_dsl::solution_id.eq(&id_s))).execute(&mut conn))?;
    map_db_err(diesel::delete(sol_dsl::solutions.filter(sol_dsl::id.eq(&id_s))).execute(&mut conn))?;
    Ok(())
  }
  fn save_tag(&self, tag: CompoundTag) -> Result<String, DomainError> {
    let mut conn = self.conn()?;
    let name_s = tag.name().to_string();
    let _ = diesel::delete(tm_dsl::compound_tag_members.filter(tm_dsl::tag_name.eq(&name_s))).execute(&mut conn);
    let _ = diesel::delete(tag_dsl::compound_tags.filter(tag_dsl::name.eq(&name_s))).execute(&mut conn);
    let row = TagRow { name: name_s.clone(), compound_count: tag.compound_count() };
    map_db_err(diesel::insert_into(tag_dsl::compound_tags).values(&row).execute(&mut conn))?;
    for cid in tag.members() {
      let mr = TagMemberRow { id: Uuid::new_v4().to_string(), tag_name: name_s.clone(), compound_cid: cid.clone() };
      map_db_err(diesel::insert_into(tm_dsl::compound_tag_members).values(&mr).execute(&mut conn))?;
    }
    Ok(name_s)
  }
  fn get_tag(&self, name: &str) -> Result<Option<CompoundTag>, DomainError> {
    let mut conn = self.conn()?;
    let opt = tag_dsl::compound_tags.filter(tag_dsl::name.eq(name))
                                    .first::<TagRow>(&mut conn)
                                    .optional()
                                    .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    match opt {
      Some(r) => {
        let members = tm_dsl::compound_tag_members.filter(tm_dsl::tag_name.eq(&r.name))
                                                  .load::<TagMemberRow>(&mut conn)
                                                  .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
        Ok(Some(CompoundTag::from_parts(&r.name, members.into_iter().map(|m| m.compound_cid).collect())?))
      }
      None => Ok(None),
    }
  }
  fn list_tags(&self) -> Result<Vec<CompoundTag>, DomainError> {
    let mut conn = self.conn()?;
    let rows = tag_dsl::compound_tags.load::<TagRow>(&mut conn)
                                     .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
      let members = tm_dsl::compound_tag_members.filter(tm_dsl::tag_name.eq(&r.name))
                                                .load::<TagMemberRow>(&mut conn)
                                                .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
      out.push(CompoundTag::from_parts(&r.name, members.into_iter().map(|m| m.compound_cid).collect())?);
    }
    Ok(out)
  }
  fn delete_tag(&self, name: &str) -> Result<(), DomainError> {
    let mut conn = self.conn()?;
    map_db_err(diesel::delete(tm_dsl::compound_tag_members.filter(tm_dsl::tag_name.eq(name))).execute(&mut conn))?;
    map_db_err(diesel::delete(tag_dsl::compound_tags.filter(tag_dsl::name.eq(name))).execute(&mut conn))?;
    Ok(())
  }
}
/// Crear el repo desde las variables de entorno (o default sqlite
/// in-memory compartida, útil en tests).
pub fn new_from_env() -> Result<DieselCompoundStore, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("COMPOUND_DB_URL").unwrap_or_else(|_| "file:compounddb?mode=memory&cache=shared".into());
  Ok(DieselCompoundStore::new(&url))
}
