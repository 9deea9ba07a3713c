// compound.rs
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compuesto químico tal como lo conoce la base remota: identidad `cid`
/// más propiedades descriptivas. La identidad es estable entre versiones
/// del esquema de almacenamiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
  cid: String,
  name: String,
  formula: String,
  molecular_weight: f64,
  name_iupac: String,
  image: Option<Vec<u8>>,
  created_at: DateTime<Utc>,
}

impl Compound {
  /// Crea un compuesto nuevo validando sus invariantes: `cid` y `name` no
  /// vacíos y peso molecular finito y positivo (gramos/mol). El peso se
  /// valida aquí porque las conversiones de unidades dividen por él.
  pub fn new(cid: &str,
             name: &str,
             formula: &str,
             molecular_weight: f64,
             name_iupac: &str)
             -> Result<Self, DomainError> {
    Self::from_parts(cid, name, formula, molecular_weight, name_iupac, None, Utc::now())
  }

  /// Reconstruye un compuesto desde valores ya persistidos (misma
  /// validación que `new`).
  pub fn from_parts(cid: &str,
                    name: &str,
                    formula: &str,
                    molecular_weight: f64,
                    name_iupac: &str,
                    image: Option<Vec<u8>>,
                    created_at: DateTime<Utc>)
                    -> Result<Self, DomainError> {
    if cid.trim().is_empty() {
      return Err(DomainError::ValidationError("El cid del compuesto no puede estar vacío".to_string()));
    }
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre del compuesto no puede estar vacío".to_string()));
    }
    if !molecular_weight.is_finite() || molecular_weight <= 0.0 {
      return Err(DomainError::ValidationError(format!("Peso molecular inválido para {}: {}", cid, molecular_weight)));
    }
    Ok(Self { cid: cid.trim().to_string(),
              name: name.to_string(),
              formula: formula.to_string(),
              molecular_weight,
              name_iupac: name_iupac.to_string(),
              image,
              created_at })
  }

  pub fn cid(&self) -> &str {
    &self.cid
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn formula(&self) -> &str {
    &self.formula
  }

  pub fn molecular_weight(&self) -> f64 {
    self.molecular_weight
  }

  pub fn name_iupac(&self) -> &str {
    &self.name_iupac
  }

  pub fn image(&self) -> Option<&[u8]> {
    self.image.as_deref()
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  /// Devuelve una copia con la imagen 2D adjunta.
  pub fn with_image(&self, image: Vec<u8>) -> Self {
    let mut new_compound = self.clone();
    new_compound.image = Some(image);
    new_compound
  }

  pub fn is_same(&self, other: &Compound) -> bool {
    self.cid == other.cid
  }
}

impl fmt::Display for Compound {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Compound(cid: {}, name: {}, formula: {}, MW: {})",
           self.cid, self.name, self.formula, self.molecular_weight)
  }
}
