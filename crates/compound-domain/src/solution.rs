// solution.rs
use crate::unit::convert;
use crate::{Compound, DomainError, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ingrediente de una solución: registra la cantidad y unidad de un
/// compuesto dentro de una solución concreta.
///
/// Guarda copias desnormalizadas del nombre y el cid del compuesto: el
/// nombre es la clave de resolución histórica y el cid desambigua cuando
/// dos compuestos comparten nombre. La referencia `compound` apunta al
/// compuesto del almacén; sólo está ausente en un ingrediente recién
/// creado de forma suelta, antes de cablear su relación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionIngredient {
  id: Uuid,
  compound: Option<String>,
  compound_name: String,
  compound_cid: String,
  amount: f64,
  unit: Unit,
  solution_id: Uuid,
}

impl SolutionIngredient {
  /// Crea un ingrediente ya cableado a un compuesto existente.
  pub fn new(compound: &Compound, amount: f64, unit: Unit, solution_id: Uuid) -> Result<Self, DomainError> {
    if !amount.is_finite() || amount < 0.0 {
      return Err(DomainError::ValidationError(format!("Cantidad inválida para {}: {}", compound.cid(), amount)));
    }
    Ok(Self { id: Uuid::new_v4(),
              compound: Some(compound.cid().to_string()),
              compound_name: compound.name().to_string(),
              compound_cid: compound.cid().to_string(),
              amount,
              unit,
              solution_id })
  }

  /// Crea un ingrediente suelto: con sus copias desnormalizadas pero sin
  /// la referencia al compuesto todavía establecida.
  pub fn detached(compound_name: &str, compound_cid: &str, amount: f64, unit: Unit, solution_id: Uuid) -> Self {
    Self { id: Uuid::new_v4(),
           compound: None,
           compound_name: compound_name.to_string(),
           compound_cid: compound_cid.to_string(),
           amount,
           unit,
           solution_id }
  }

  /// Reconstruye un ingrediente desde valores persistidos.
  pub fn from_parts(id: Uuid,
                    compound: Option<String>,
                    compound_name: String,
                    compound_cid: String,
                    amount: f64,
                    unit: Unit,
                    solution_id: Uuid)
                    -> Self {
    Self { id, compound, compound_name, compound_cid, amount, unit, solution_id }
  }

  /// Establece la referencia al compuesto del almacén.
  pub fn wire(&mut self, compound: &Compound) {
    self.compound = Some(compound.cid().to_string());
  }

  pub fn is_wired(&self) -> bool {
    self.compound.is_some()
  }

  /// Compara el par (nombre, cid) desnormalizado contra un compuesto.
  pub fn matches(&self, compound: &Compound) -> bool {
    self.compound_name == compound.name() && self.compound_cid == compound.cid()
  }

  /// Cantidad del ingrediente expresada en otra unidad.
  pub fn amount_in(&self, to: Unit, molecular_weight: f64) -> f64 {
    convert(self.amount, molecular_weight, self.unit, to)
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn compound(&self) -> Option<&str> {
    self.compound.as_deref()
  }

  pub fn compound_name(&self) -> &str {
    &self.compound_name
  }

  pub fn compound_cid(&self) -> &str {
    &self.compound_cid
  }

  pub fn amount(&self) -> f64 {
    self.amount
  }

  pub fn unit(&self) -> Unit {
    self.unit
  }

  pub fn solution_id(&self) -> Uuid {
    self.solution_id
  }

  pub(crate) fn set_solution_id(&mut self, solution_id: Uuid) {
    self.solution_id = solution_id;
  }
}

/// Mezcla con nombre de compuestos y cantidades. Los ingredientes no
/// tienen orden significativo; `compounds` es la relación secundaria
/// derivada (cids, sin duplicados) que facilita consultas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
  id: Uuid,
  name: String,
  created_at: DateTime<Utc>,
  ingredients: Vec<SolutionIngredient>,
  compounds: Vec<String>,
}

impl Solution {
  pub fn new(name: &str) -> Result<Self, DomainError> {
    Self::with_created_at(name, Utc::now())
  }

  /// Crea una solución con fecha explícita (por ejemplo al copiar valores
  /// de un almacén anterior).
  pub fn with_created_at(name: &str, created_at: DateTime<Utc>) -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre de la solución no puede estar vacío".to_string()));
    }
    Ok(Self { id: Uuid::new_v4(),
              name: name.to_string(),
              created_at,
              ingredients: Vec::new(),
              compounds: Vec::new() })
  }

  /// Reconstruye una solución desde valores persistidos.
  pub fn from_parts(id: Uuid,
                    name: String,
                    created_at: DateTime<Utc>,
                    ingredients: Vec<SolutionIngredient>,
                    compounds: Vec<String>)
                    -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre de la solución no puede estar vacío".to_string()));
    }
    Ok(Self { id, name, created_at, ingredients, compounds })
  }

  /// Agrega un ingrediente fijando su retro-referencia a esta solución.
  pub fn add_ingredient(&mut self, mut ingredient: SolutionIngredient) {
    ingredient.set_solution_id(self.id);
    self.ingredients.push(ingredient);
  }

  /// Fija la relación derivada `compounds` (deduplicada, conservando el
  /// primer orden de aparición).
  pub fn set_compounds(&mut self, cids: Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    self.compounds = cids.into_iter().filter(|c| seen.insert(c.clone())).collect();
  }

  /// Restablece la consistencia inversa: cada ingrediente retro-referencia
  /// esta solución y la relación derivada refleja las referencias
  /// cableadas de los ingredientes.
  pub fn normalize(&mut self) {
    let id = self.id;
    for ing in &mut self.ingredients {
      ing.set_solution_id(id);
    }
    let refs: Vec<String> = self.ingredients.iter().filter_map(|i| i.compound().map(|c| c.to_string())).collect();
    self.set_compounds(refs);
  }

  pub fn ingredient_named(&self, compound_name: &str) -> Option<&SolutionIngredient> {
    self.ingredients.iter().find(|i| i.compound_name() == compound_name)
  }

  pub fn contains_compound(&self, cid: &str) -> bool {
    self.compounds.iter().any(|c| c == cid)
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn ingredients(&self) -> &[SolutionIngredient] {
    &self.ingredients
  }

  pub fn ingredients_mut(&mut self) -> &mut [SolutionIngredient] {
    &mut self.ingredients
  }

  pub fn compounds(&self) -> &[String] {
    &self.compounds
  }

  pub fn len(&self) -> usize {
    self.ingredients.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ingredients.is_empty()
  }
}

impl fmt::Display for Solution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Solution(id: {}, name: {}, ingredients: {})", self.id, self.name, self.ingredients.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn water() -> Compound {
    Compound::new("962", "water", "H2O", 18.015, "oxidane").unwrap()
  }

  fn salt() -> Compound {
    Compound::new("5234", "sodium chloride", "NaCl", 58.44, "sodium chloride").unwrap()
  }

  #[test]
  fn test_solution_creation() -> Result<(), DomainError> {
    let mut s = Solution::new("salty water")?;
    s.add_ingredient(SolutionIngredient::new(&water(), 1.0, Unit::Gram, s.id())?);
    s.add_ingredient(SolutionIngredient::new(&salt(), 0.05, Unit::Gram, s.id())?);
    assert_eq!(s.len(), 2);
    for i in s.ingredients() {
      assert_eq!(i.solution_id(), s.id());
    }
    Ok(())
  }

  #[test]
  fn test_empty_name_rejected() {
    assert!(Solution::new("   ").is_err());
  }

  #[test]
  fn test_ingredient_matches_by_name_and_cid() -> Result<(), DomainError> {
    let w = water();
    let ing = SolutionIngredient::new(&w, 1.0, Unit::Gram, Uuid::new_v4())?;
    assert!(ing.matches(&w));
    assert!(!ing.matches(&salt()));
    Ok(())
  }

  #[test]
  fn test_detached_then_wired() {
    let w = water();
    let mut ing = SolutionIngredient::detached("water", "962", 1.0, Unit::Gram, Uuid::new_v4());
    assert!(!ing.is_wired());
    ing.wire(&w);
    assert_eq!(ing.compound(), Some("962"));
  }

  #[test]
  fn test_normalize_rebuilds_derived_set() -> Result<(), DomainError> {
    let mut s = Solution::new("mix")?;
    s.add_ingredient(SolutionIngredient::new(&water(), 1.0, Unit::Gram, s.id())?);
    s.add_ingredient(SolutionIngredient::new(&water(), 2.0, Unit::Milligram, s.id())?);
    s.add_ingredient(SolutionIngredient::detached("salt", "5234", 0.05, Unit::Gram, s.id()));
    s.normalize();
    // sólo referencias cableadas y sin duplicados
    assert_eq!(s.compounds(), &["962".to_string()]);
    Ok(())
  }

  #[test]
  fn test_amount_in_converts() -> Result<(), DomainError> {
    let ing = SolutionIngredient::new(&salt(), 1.0, Unit::Gram, Uuid::new_v4())?;
    let moles = ing.amount_in(Unit::Mole, 58.44);
    assert!((moles - 1.0 / 58.44).abs() < 1e-12);
    Ok(())
  }

  #[test]
  fn test_negative_amount_rejected() {
    assert!(SolutionIngredient::new(&water(), -0.5, Unit::Gram, Uuid::new_v4()).is_err());
  }
}
