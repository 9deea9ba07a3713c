use crate::{Compound, CompoundTag, DomainError, Solution};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Trait que define operaciones de persistencia para el dominio de
/// compuestos y soluciones.
pub trait CompoundRepository: Send + Sync {
  /// Guarda (o reemplaza) un compuesto y devuelve su `cid`.
  fn save_compound(&self, compound: Compound) -> Result<String, DomainError>;

  /// Obtiene un compuesto por su `cid`.
  fn get_compound(&self, cid: &str) -> Result<Option<Compound>, DomainError>;

  /// Lista todos los compuestos guardados.
  fn list_compounds(&self) -> Result<Vec<Compound>, DomainError>;

  /// Elimina un compuesto del repositorio. No permite eliminar si algún
  /// ingrediente de una solución lo referencia; en ese caso retorna
  /// ValidationError.
  fn delete_compound(&self, cid: &str) -> Result<(), DomainError>;

  /// Guarda una solución y devuelve su `Uuid`. El repositorio normaliza
  /// las relaciones inversas antes de persistir (retro-referencias de los
  /// ingredientes y conjunto derivado de compuestos).
  fn save_solution(&self, solution: Solution) -> Result<Uuid, DomainError>;

  /// Recupera una solución por su `Uuid`.
  fn get_solution(&self, id: &Uuid) -> Result<Option<Solution>, DomainError>;

  /// Lista todas las soluciones.
  fn list_solutions(&self) -> Result<Vec<Solution>, DomainError>;

  /// Elimina una solución y sus ingredientes.
  fn delete_solution(&self, id: &Uuid) -> Result<(), DomainError>;

  /// Guarda (o reemplaza) una etiqueta y devuelve su nombre.
  fn save_tag(&self, tag: CompoundTag) -> Result<String, DomainError>;

  /// Recupera una etiqueta por nombre.
  fn get_tag(&self, name: &str) -> Result<Option<CompoundTag>, DomainError>;

  /// Lista todas las etiquetas.
  fn list_tags(&self) -> Result<Vec<CompoundTag>, DomainError>;

  /// Elimina una etiqueta (sin tocar los compuestos etiquetados).
  fn delete_tag(&self, name: &str) -> Result<(), DomainError>;
}

/// Implementación en memoria para tests y desarrollo.
pub struct InMemoryCompoundRepository {
  compounds: Arc<Mutex<HashMap<String, Compound>>>,
  solutions: Arc<Mutex<HashMap<Uuid, Solution>>>,
  tags: Arc<Mutex<HashMap<String, CompoundTag>>>,
}

impl InMemoryCompoundRepository {
  pub fn new() -> Self {
    Self { compounds: Arc::new(Mutex::new(HashMap::new())),
           solutions: Arc::new(Mutex::new(HashMap::new())),
           tags: Arc::new(Mutex::new(HashMap::new())) }
  }

  // Helper to map poisoned mutex errors into DomainError
  fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
    m.lock()
     .map_err(|e| DomainError::ExternalError(format!("Mutex '{}' poisoned: {}", name, e)))
  }
}

impl CompoundRepository for InMemoryCompoundRepository {
  fn save_compound(&self, compound: Compound) -> Result<String, DomainError> {
    let key = compound.cid().to_string();
    let mut compounds = self.lock_map(&self.compounds, "compounds")?;
    compounds.insert(key.clone(), compound);
    Ok(key)
  }

  fn get_compound(&self, cid: &str) -> Result<Option<Compound>, DomainError> {
    let compounds = self.lock_map(&self.compounds, "compounds")?;
    Ok(compounds.get(cid).cloned())
  }

  fn list_compounds(&self) -> Result<Vec<Compound>, DomainError> {
    let compounds = self.lock_map(&self.compounds, "compounds")?;
    Ok(compounds.values().cloned().collect())
  }

  fn delete_compound(&self, cid: &str) -> Result<(), DomainError> {
    // Check solutions
    let solutions = self.lock_map(&self.solutions, "solutions")?;
    for (_id, sol) in solutions.iter() {
      if sol.ingredients().iter().any(|i| i.compound_cid() == cid) {
        return Err(DomainError::ValidationError(format!("No se puede eliminar el compuesto {}; pertenece a una solución",
                                                        cid)));
      }
    }
    drop(solutions);
    let mut compounds = self.lock_map(&self.compounds, "compounds")?;
    compounds.remove(cid);
    Ok(())
  }

  fn save_solution(&self, mut solution: Solution) -> Result<Uuid, DomainError> {
    solution.normalize();
    let id = solution.id();
    let mut solutions = self.lock_map(&self.solutions, "solutions")?;
    solutions.insert(id, solution);
    Ok(id)
  }

  fn get_solution(&self, id: &Uuid) -> Result<Option<Solution>, DomainError> {
    let solutions = self.lock_map(&self.solutions, "solutions")?;
    Ok(solutions.get(id).cloned())
  }

  fn list_solutions(&self) -> Result<Vec<Solution>, DomainError> {
    let solutions = self.lock_map(&self.solutions, "solutions")?;
    Ok(solutions.values().cloned().collect())
  }

  fn delete_solution(&self, id: &Uuid) -> Result<(), DomainError> {
    let mut solutions = self.lock_map(&self.solutions, "solutions")?;
    solutions.remove(id);
    Ok(())
  }

  fn save_tag(&self, tag: CompoundTag) -> Result<String, DomainError> {
    let key = tag.name().to_string();
    let mut tags = self.lock_map(&self.tags, "tags")?;
    tags.insert(key.clone(), tag);
    Ok(key)
  }

  fn get_tag(&self, name: &str) -> Result<Option<CompoundTag>, DomainError> {
    let tags = self.lock_map(&self.tags, "tags")?;
    Ok(tags.get(name).cloned())
  }

  fn list_tags(&self) -> Result<Vec<CompoundTag>, DomainError> {
    let tags = self.lock_map(&self.tags, "tags")?;
    Ok(tags.values().cloned().collect())
  }

  fn delete_tag(&self, name: &str) -> Result<(), DomainError> {
    let mut tags = self.lock_map(&self.tags, "tags")?;
    tags.remove(name);
    Ok(())
  }
}

impl Default for InMemoryCompoundRepository {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{SolutionIngredient, Unit};

  fn water() -> Compound {
    Compound::new("962", "water", "H2O", 18.015, "oxidane").unwrap()
  }

  #[test]
  fn save_and_get_compound() -> Result<(), DomainError> {
    let repo = InMemoryCompoundRepository::new();
    let key = repo.save_compound(water())?;
    let loaded = repo.get_compound(&key)?;
    assert!(loaded.is_some());
    assert_eq!(loaded.unwrap().cid(), "962");
    Ok(())
  }

  #[test]
  fn save_solution_normalizes_back_references() -> Result<(), DomainError> {
    let repo = InMemoryCompoundRepository::new();
    let w = water();
    repo.save_compound(w.clone())?;
    let mut s = Solution::new("agua pura")?;
    s.add_ingredient(SolutionIngredient::new(&w, 1.0, Unit::Gram, s.id())?);
    let id = repo.save_solution(s)?;
    let loaded = repo.get_solution(&id)?.unwrap();
    assert_eq!(loaded.compounds(), &["962".to_string()]);
    assert!(loaded.ingredients().iter().all(|i| i.solution_id() == id));
    Ok(())
  }

  #[test]
  fn delete_compound_in_solution_is_refused() -> Result<(), DomainError> {
    let repo = InMemoryCompoundRepository::new();
    let w = water();
    repo.save_compound(w.clone())?;
    let mut s = Solution::new("agua pura")?;
    s.add_ingredient(SolutionIngredient::new(&w, 1.0, Unit::Gram, s.id())?);
    let id = repo.save_solution(s)?;
    assert!(repo.delete_compound("962").is_err());
    repo.delete_solution(&id)?;
    repo.delete_compound("962")?;
    assert!(repo.get_compound("962")?.is_none());
    Ok(())
  }

  #[test]
  fn save_and_get_tag() -> Result<(), DomainError> {
    let repo = InMemoryCompoundRepository::new();
    let mut t = CompoundTag::new("solvents")?;
    t.tag("962");
    repo.save_tag(t)?;
    let loaded = repo.get_tag("solvents")?.unwrap();
    assert_eq!(loaded.compound_count(), 1);
    repo.delete_tag("solvents")?;
    assert!(repo.get_tag("solvents")?.is_none());
    Ok(())
  }

  #[test]
  fn mutex_poisoning_returns_error() {
    use std::thread;

    let repo = InMemoryCompoundRepository::new();

    // Poison the compounds mutex by panicking while holding the lock in
    // another thread
    let comp_arc = repo.compounds.clone();
    let handle = thread::spawn(move || {
      let _g = comp_arc.lock().unwrap();
      panic!("force poison");
    });
    let _ = handle.join();

    let res = repo.list_compounds();
    assert!(res.is_err());
    if let Err(e) = res {
      match e {
        DomainError::ExternalError(_) => (),
        other => panic!("expected ExternalError, got {:?}", other),
      }
    }
  }
}
