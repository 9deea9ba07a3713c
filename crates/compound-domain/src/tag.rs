// tag.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Etiqueta de compuestos: relación muchos-a-muchos identificada por
/// nombre. El contador de compuestos se deriva de los miembros, así no
/// puede desincronizarse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundTag {
  name: String,
  members: Vec<String>,
}

impl CompoundTag {
  pub fn new(name: &str) -> Result<Self, DomainError> {
    Self::from_parts(name, Vec::new())
  }

  pub fn from_parts(name: &str, members: Vec<String>) -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre de la etiqueta no puede estar vacío".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    let members = members.into_iter().filter(|c| seen.insert(c.clone())).collect();
    Ok(Self { name: name.trim().to_string(), members })
  }

  /// Agrega un compuesto. Devuelve `false` si ya estaba etiquetado.
  pub fn tag(&mut self, cid: &str) -> bool {
    if self.contains(cid) {
      return false;
    }
    self.members.push(cid.to_string());
    true
  }

  /// Quita un compuesto. Devuelve `false` si no estaba etiquetado.
  pub fn untag(&mut self, cid: &str) -> bool {
    let before = self.members.len();
    self.members.retain(|c| c != cid);
    self.members.len() != before
  }

  pub fn contains(&self, cid: &str) -> bool {
    self.members.iter().any(|c| c == cid)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn members(&self) -> &[String] {
    &self.members
  }

  pub fn compound_count(&self) -> i64 {
    self.members.len() as i64
  }
}

impl fmt::Display for CompoundTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "CompoundTag(name: {}, compounds: {})", self.name, self.members.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tag_and_untag() -> Result<(), DomainError> {
    let mut t = CompoundTag::new("solvents")?;
    assert!(t.tag("962"));
    assert!(!t.tag("962"));
    assert_eq!(t.compound_count(), 1);
    assert!(t.untag("962"));
    assert!(!t.untag("962"));
    assert_eq!(t.compound_count(), 0);
    Ok(())
  }

  #[test]
  fn test_from_parts_dedupes() -> Result<(), DomainError> {
    let t = CompoundTag::from_parts("salts", vec!["5234".into(), "5234".into(), "962".into()])?;
    assert_eq!(t.compound_count(), 2);
    Ok(())
  }

  #[test]
  fn test_empty_name_rejected() {
    assert!(CompoundTag::new(" ").is_err());
  }
}
