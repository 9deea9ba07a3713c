// Archivo: stubs.rs
// Propósito: implementación en memoria del `MigrationManager` para
// pruebas y wiring rápido. No es durable.
use crate::errors::Result;
use crate::manager::MigrationManager;
use crate::source::{SourceCompound, SourceSolution};
use compound_domain::{Compound, Solution};

/// Administrador de migración en memoria: sirve instantáneas fijas como
/// fuente y acumula las escrituras destino para que las pruebas las
/// inspeccionen.
pub struct InMemoryMigrationManager {
    source_compounds: Vec<SourceCompound>,
    source_solutions: Vec<SourceSolution>,
    pub written_compounds: Vec<Compound>,
    pub written_solutions: Vec<Solution>,
    pub committed: bool,
}

impl InMemoryMigrationManager {
    pub fn new(source_compounds: Vec<SourceCompound>, source_solutions: Vec<SourceSolution>) -> Self {
        Self { source_compounds,
               source_solutions,
               written_compounds: Vec::new(),
               written_solutions: Vec::new(),
               committed: false }
    }
}

impl MigrationManager for InMemoryMigrationManager {
    fn source_compounds(&self) -> Result<Vec<SourceCompound>> {
        Ok(self.source_compounds.clone())
    }

    fn source_solutions(&self) -> Result<Vec<SourceSolution>> {
        Ok(self.source_solutions.clone())
    }

    fn write_compound(&mut self, compound: &Compound) -> Result<()> {
        self.written_compounds.push(compound.clone());
        Ok(())
    }

    fn write_solution(&mut self, solution: &Solution) -> Result<()> {
        self.written_solutions.push(solution.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = true;
        Ok(())
    }
}
