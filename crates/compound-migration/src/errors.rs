// Archivo: errors.rs
// Propósito: definir los errores de la migración de esquema y el alias
// Result<T> usado por las APIs del crate.
use compound_domain::DomainError;
use thiserror::Error;

/// Errores de la migración de esquema.
///
/// - `MissingRequiredField`: una instancia fuente carece de un campo que
///   el destino necesita; aborta la migración completa.
/// - `MissingAssociation`: el pase 2 no encontró la asociación registrada
///   en el pase 1 (o el mapeo de compuestos no corrió antes).
/// - `Domain`: la instancia destino no supera las validaciones del dominio.
/// - `Storage`: error al acceder al almacenamiento fuente o destino.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Falta el campo requerido '{field}' en la entidad {entity}")]
    MissingRequiredField { entity: String, field: String },
    #[error("Asociación no registrada en el mapeo {mapping} para la instancia {source_id}")]
    MissingAssociation { mapping: String, source_id: String },
    #[error("Error de dominio: {0}")]
    Domain(String),
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    #[error("Otro: {0}")]
    Other(String),
}

impl From<DomainError> for MigrationError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e.to_string())
    }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, MigrationError>;
