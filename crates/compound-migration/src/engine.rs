// Archivo: engine.rs
// Propósito: implementar el motor de migración de esquema v3→v4 en dos
// pases sobre un `MigrationManager` inyectado.
//
// Nota: el motor corre de una sola vez, en un solo hilo y con acceso
// exclusivo a los almacenes; lo invoca el arranque de la aplicación
// cuando detecta un desfase de versión de esquema.
use crate::errors::{MigrationError, Result};
use crate::manager::MigrationManager;
use crate::model::ManagedModel;
use crate::source::{SourceCompound, SourceSolution};
use compound_domain::{Compound, Solution, SolutionIngredient, Unit};
use std::collections::HashMap;
use uuid::Uuid;

/// Nombre del mapeo 1:1 de compuestos. Corre siempre antes que el de
/// soluciones: el pase 2 resuelve referencias contra compuestos destino
/// ya materializados.
pub const COMPOUND_MAPPING: &str = "CompoundToCompound";
/// Nombre del mapeo de soluciones (dos pases).
pub const SOLUTION_MAPPING: &str = "SolutionToSolution";

/// Decide si hace falta migrar: compara el token registrado en el almacén
/// con el token del modelo destino. Un almacén sin token registrado (el
/// esquema anterior no lo escribía) siempre necesita migración. Función
/// pura: no toca el almacén.
pub fn is_migration_necessary(recorded: Option<&str>, destination: &ManagedModel) -> bool {
    match recorded {
        Some(token) => token != destination.version_token(),
        None => true,
    }
}

/// Resumen de una migración completada.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MigrationReport {
    pub compounds: usize,
    pub solutions: usize,
    pub ingredients: usize,
    pub skipped_compounds: usize,
}

/// Motor de migración en dos pases.
///
/// Pase 1 (`create_destination_instances`): por cada solución fuente crea
/// la solución destino con un ingrediente por compuesto referenciado,
/// copiando nombre y cid desnormalizados y resolviendo la cantidad por
/// nombre contra el diccionario del esquema anterior. Registra la
/// asociación fuente→destino antes de que corra el pase 2.
///
/// Pase 2 (`create_relationships`): por cada solución fuente busca su
/// destino por la asociación registrada, resuelve cada compuesto fuente a
/// su compuesto destino vía el mapeo de compuestos y cablea la referencia
/// del ingrediente cuyo par (nombre, cid) coincide. Los compuestos
/// emparejados forman el conjunto derivado de la solución destino.
///
/// Cualquier campo requerido ausente aborta la migración completa; nada
/// se confirma en el destino. Un compuesto sin ingrediente que le
/// corresponda se omite con un aviso (comportamiento heredado del esquema
/// anterior, donde la resolución por nombre ya era de mejor esfuerzo).
pub struct MigrationEngine<M>
    where M: MigrationManager
{
    manager: M,
    /// Asociaciones registradas: mapeo → (id de instancia fuente → id destino).
    associations: HashMap<String, HashMap<String, String>>,
    /// Compuestos destino materializados, por cid.
    dest_compounds: HashMap<String, Compound>,
    /// Soluciones destino en construcción, por id.
    dest_solutions: HashMap<Uuid, Solution>,
    skipped_compounds: usize,
}

fn require<T>(value: Option<T>, entity: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| MigrationError::MissingRequiredField { entity: entity.to_string(), field: field.to_string() })
}

impl<M> MigrationEngine<M> where M: MigrationManager
{
    pub fn new(manager: M) -> Self {
        Self { manager,
               associations: HashMap::new(),
               dest_compounds: HashMap::new(),
               dest_solutions: HashMap::new(),
               skipped_compounds: 0 }
    }

    /// Ejecuta la migración completa y confirma el destino. Si cualquier
    /// paso falla, el error se propaga sin confirmar y el almacén activo
    /// queda como estaba.
    pub fn run(mut self) -> Result<MigrationReport> {
        self.migrate_compounds()?;
        let sources = self.manager.source_solutions()?;
        for src in &sources {
            self.create_destination_instances(src)?;
        }
        for src in &sources {
            self.create_relationships(src)?;
        }
        let mut ingredients = 0;
        for solution in self.dest_solutions.values() {
            ingredients += solution.len();
            self.manager.write_solution(solution)?;
        }
        self.manager.commit()?;
        let report = MigrationReport { compounds: self.dest_compounds.len(),
                                       solutions: self.dest_solutions.len(),
                                       ingredients,
                                       skipped_compounds: self.skipped_compounds };
        log::info!("migración confirmada: {} compuestos, {} soluciones, {} ingredientes ({} compuestos omitidos)",
                   report.compounds,
                   report.solutions,
                   report.ingredients,
                   report.skipped_compounds);
        Ok(report)
    }

    fn associate(&mut self, mapping: &str, source_id: &str, dest_id: &str) {
        self.associations
            .entry(mapping.to_string())
            .or_default()
            .insert(source_id.to_string(), dest_id.to_string());
    }

    fn destination_of(&self, mapping: &str, source_id: &str) -> Result<&str> {
        self.associations
            .get(mapping)
            .and_then(|m| m.get(source_id))
            .map(|s| s.as_str())
            .ok_or_else(|| MigrationError::MissingAssociation { mapping: mapping.to_string(),
                                                                source_id: source_id.to_string() })
    }

    /// Mapeo 1:1 de compuestos: la identidad `cid` y los atributos pasan
    /// sin cambios de forma entre versiones del esquema.
    fn migrate_compounds(&mut self) -> Result<()> {
        let sources = self.manager.source_compounds()?;
        for src in &sources {
            let compound = Self::destination_compound(src)?;
            self.manager.write_compound(&compound)?;
            self.associate(COMPOUND_MAPPING, &src.id, compound.cid());
            self.dest_compounds.insert(compound.cid().to_string(), compound);
        }
        Ok(())
    }

    fn destination_compound(src: &SourceCompound) -> Result<Compound> {
        let cid = require(src.cid.as_deref(), "Compound", "cid")?;
        let name = require(src.name.as_deref(), "Compound", "name")?;
        // El modelo destino valida peso molecular positivo, así que su
        // ausencia en la fuente también es fatal.
        let weight = require(src.molecular_weight, "Compound", "molecular_weight")?;
        let created_at = src.created_at.unwrap_or_else(chrono::Utc::now);
        Ok(Compound::from_parts(cid,
                                name,
                                src.formula.as_deref().unwrap_or_default(),
                                weight,
                                src.name_iupac.as_deref().unwrap_or_default(),
                                src.image.clone(),
                                created_at)?)
    }

    /// Pase 1: crear instancias destino a partir de lecturas primitivas.
    fn create_destination_instances(&mut self, src: &SourceSolution) -> Result<()> {
        let name = require(src.name.as_deref(), "Solution", "name")?;
        let amounts = require(src.amounts.as_ref(), "Solution", "amount")?;
        let compounds = require(src.compounds.as_ref(), "Solution", "compounds")?;
        let created_at = src.created_at.unwrap_or_else(chrono::Utc::now);

        let mut dest = Solution::with_created_at(name, created_at)?;
        for sc in compounds {
            let c_name = require(sc.name.as_deref(), "Compound", "name")?;
            let c_cid = require(sc.cid.as_deref(), "Compound", "cid")?;
            // La cantidad se resuelve por nombre contra el diccionario del
            // esquema anterior. Si dos compuestos comparten nombre, ambos
            // reciben la cantidad que ese nombre indexa: ambigüedad
            // heredada, que se conserva tal cual. Un nombre sin entrada
            // deja la cantidad en su valor por defecto.
            let amount = match amounts.get(c_name) {
                Some(a) => *a,
                None => {
                    log::warn!("sin cantidad para '{}' en la solución '{}'", c_name, name);
                    f64::default()
                }
            };
            dest.add_ingredient(SolutionIngredient::detached(c_name, c_cid, amount, Unit::Gram, dest.id()));
        }
        self.associate(SOLUTION_MAPPING, &src.id, &dest.id().to_string());
        self.dest_solutions.insert(dest.id(), dest);
        Ok(())
    }

    /// Pase 2: cablear relaciones contra compuestos destino ya migrados.
    fn create_relationships(&mut self, src: &SourceSolution) -> Result<()> {
        let dest_id = self.destination_of(SOLUTION_MAPPING, &src.id)?;
        let dest_id = Uuid::parse_str(dest_id).map_err(|e| MigrationError::Storage(format!("id destino inválido: {}", e)))?;
        let compounds = require(src.compounds.as_ref(), "Solution", "compounds")?;

        // Resolver primero todos los compuestos destino; recién después
        // tomar la solución destino en préstamo mutable.
        let mut resolved = Vec::with_capacity(compounds.len());
        for sc in compounds {
            let dest_cid = self.destination_of(COMPOUND_MAPPING, &sc.id)?;
            let compound = self.dest_compounds
                               .get(dest_cid)
                               .cloned()
                               .ok_or_else(|| MigrationError::Storage(format!("compuesto destino {} no materializado",
                                                                              dest_cid)))?;
            resolved.push(compound);
        }

        let dest = self.dest_solutions
                       .get_mut(&dest_id)
                       .ok_or_else(|| MigrationError::Storage(format!("solución destino {} no materializada", dest_id)))?;
        let mut matched = Vec::new();
        let mut skipped = 0;
        for compound in &resolved {
            let mut hit = false;
            for ingredient in dest.ingredients_mut() {
                if ingredient.matches(compound) {
                    ingredient.wire(compound);
                    hit = true;
                }
            }
            if hit {
                matched.push(compound.cid().to_string());
            } else {
                log::warn!("compuesto {} sin ingrediente correspondiente en la solución {}; se omite", compound.cid(), dest_id);
                skipped += 1;
            }
        }
        dest.set_compounds(matched);
        self.skipped_compounds += skipped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{destination_model, source_model};

    #[test]
    fn necessary_when_no_token_recorded() {
        assert!(is_migration_necessary(None, &destination_model()));
    }

    #[test]
    fn necessary_when_tokens_differ() {
        let recorded = source_model().version_token();
        assert!(is_migration_necessary(Some(&recorded), &destination_model()));
    }

    #[test]
    fn not_necessary_when_token_matches() {
        let recorded = destination_model().version_token();
        assert!(!is_migration_necessary(Some(&recorded), &destination_model()));
    }

    #[test]
    fn necessity_check_is_idempotent() {
        let recorded = source_model().version_token();
        let first = is_migration_necessary(Some(&recorded), &destination_model());
        let second = is_migration_necessary(Some(&recorded), &destination_model());
        assert_eq!(first, second);
    }
}
