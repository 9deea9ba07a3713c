// Archivo: manager.rs
// Propósito: definir el trait `MigrationManager`, la abstracción inyectada
// en el motor. Describe el contrato que deben implementar los
// administradores concretos (SQLite, in-memory, etc.).
use crate::errors::Result;
use crate::source::{SourceCompound, SourceSolution};
use compound_domain::{Compound, Solution};

/// Contrato del administrador de migración: acceso de sólo lectura al
/// almacén fuente y escritura al destino.
///
/// Las escrituras van a un destino nuevo y no son visibles hasta
/// `commit`; si el motor aborta antes de confirmar, el almacén activo
/// queda intacto. Las instantáneas fuente usan la misma identidad de
/// instancia en `source_compounds` y dentro de `SourceSolution::compounds`.
pub trait MigrationManager {
    /// Enumera los compuestos del almacén fuente como lecturas primitivas.
    fn source_compounds(&self) -> Result<Vec<SourceCompound>>;

    /// Enumera las soluciones del almacén fuente como lecturas primitivas.
    fn source_solutions(&self) -> Result<Vec<SourceSolution>>;

    /// Materializa un compuesto en el almacén destino.
    fn write_compound(&mut self, compound: &Compound) -> Result<()>;

    /// Materializa una solución (con sus ingredientes) en el destino.
    fn write_solution(&mut self, solution: &Solution) -> Result<()>;

    /// Confirma la migración completa. Hasta aquí el destino es invisible
    /// para el resto de la aplicación.
    fn commit(&mut self) -> Result<()>;
}

// El motor toma el administrador por valor; este impl permite prestarle
// uno (`&mut mgr`) y conservarlo para inspección posterior.
impl<M: MigrationManager + ?Sized> MigrationManager for &mut M {
    fn source_compounds(&self) -> Result<Vec<SourceCompound>> {
        (**self).source_compounds()
    }

    fn source_solutions(&self) -> Result<Vec<SourceSolution>> {
        (**self).source_solutions()
    }

    fn write_compound(&mut self, compound: &Compound) -> Result<()> {
        (**self).write_compound(compound)
    }

    fn write_solution(&mut self, solution: &Solution) -> Result<()> {
        (**self).write_solution(solution)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }
}
