use chrono::{TimeZone, Utc};
use compound_domain::Unit;
use compound_migration::stubs::InMemoryMigrationManager;
use compound_migration::{MigrationEngine, MigrationError, SourceCompound, SourceSolution};
use std::collections::HashMap;

fn source_compound(id: &str, cid: &str, name: &str, weight: f64) -> SourceCompound {
  SourceCompound { id: id.to_string(),
                   cid: Some(cid.to_string()),
                   name: Some(name.to_string()),
                   formula: Some("X".to_string()),
                   molecular_weight: Some(weight),
                   name_iupac: Some(name.to_string()),
                   image: None,
                   created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()) }
}

fn water(id: &str) -> SourceCompound {
  source_compound(id, "962", "water", 18.015)
}

fn salt(id: &str) -> SourceCompound {
  source_compound(id, "5234", "sodium chloride", 58.44)
}

fn salty_water() -> (Vec<SourceCompound>, Vec<SourceSolution>) {
  let compounds = vec![water("c-water"), salt("c-salt")];
  let amounts: HashMap<String, f64> = [("water".to_string(), 1.0), ("sodium chloride".to_string(), 0.05)].into();
  let solution = SourceSolution { id: "s-1".to_string(),
                                  name: Some("salty water".to_string()),
                                  created_at: Some(Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()),
                                  amounts: Some(amounts),
                                  compounds: Some(vec![water("c-water"), salt("c-salt")]) };
  (compounds, vec![solution])
}

#[test]
fn salty_water_migrates_to_one_solution_with_two_ingredients() {
  let (compounds, solutions) = salty_water();
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  let report = MigrationEngine::new(&mut manager).run().unwrap();

  assert_eq!(report.compounds, 2);
  assert_eq!(report.solutions, 1);
  assert_eq!(report.ingredients, 2);
  assert_eq!(report.skipped_compounds, 0);
  assert!(manager.committed);

  assert_eq!(manager.written_solutions.len(), 1);
  let migrated = &manager.written_solutions[0];
  assert_eq!(migrated.name(), "salty water");
  assert_eq!(migrated.created_at(), Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap());
  assert_eq!(migrated.len(), 2);

  let w = migrated.ingredient_named("water").unwrap();
  assert_eq!(w.amount(), 1.0);
  assert_eq!(w.compound_cid(), "962");
  assert_eq!(w.compound(), Some("962"));
  assert_eq!(w.unit(), Unit::Gram);

  let s = migrated.ingredient_named("sodium chloride").unwrap();
  assert_eq!(s.amount(), 0.05);
  assert_eq!(s.compound_cid(), "5234");
  assert_eq!(s.compound(), Some("5234"));
  assert_eq!(s.unit(), Unit::Gram);
}

#[test]
fn counts_are_preserved_across_many_solutions() {
  // 3 soluciones con 1, 2 y 3 compuestos, diccionario completamente
  // indexado: deben salir 3 soluciones con los mismos conteos.
  let compounds: Vec<SourceCompound> =
    (0..3).map(|i| source_compound(&format!("c-{}", i), &format!("{}", 100 + i), &format!("comp-{}", i), 10.0 + i as f64))
          .collect();
  let mut solutions = Vec::new();
  for (n, k) in [(0usize, 1usize), (1, 2), (2, 3)] {
    let members: Vec<SourceCompound> = compounds.iter().take(k).cloned().collect();
    let amounts: HashMap<String, f64> =
      members.iter().map(|c| (c.name.clone().unwrap(), 0.5)).collect();
    solutions.push(SourceSolution { id: format!("s-{}", n),
                                    name: Some(format!("mix-{}", n)),
                                    created_at: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
                                    amounts: Some(amounts),
                                    compounds: Some(members) });
  }
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  let report = MigrationEngine::new(&mut manager).run().unwrap();

  assert_eq!(report.solutions, 3);
  assert_eq!(report.ingredients, 1 + 2 + 3);
  let mut sizes: Vec<usize> = manager.written_solutions.iter().map(|s| s.len()).collect();
  sizes.sort_unstable();
  assert_eq!(sizes, vec![1, 2, 3]);
}

#[test]
fn ingredient_fields_match_their_wired_compound() {
  let (compounds, solutions) = salty_water();
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  MigrationEngine::new(&mut manager).run().unwrap();

  let by_cid: HashMap<&str, &compound_domain::Compound> =
    manager.written_compounds.iter().map(|c| (c.cid(), c)).collect();
  for solution in &manager.written_solutions {
    for ing in solution.ingredients() {
      let compound = by_cid[ing.compound().expect("ingrediente sin cablear")];
      assert_eq!(ing.compound_name(), compound.name());
      assert_eq!(ing.compound_cid(), compound.cid());
    }
  }
}

#[test]
fn derived_compound_set_mirrors_ingredient_references() {
  let (compounds, solutions) = salty_water();
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  MigrationEngine::new(&mut manager).run().unwrap();

  // comparación como conjuntos: el orden de un set fuente no significa nada
  let migrated = &manager.written_solutions[0];
  let mut from_ingredients: Vec<&str> = migrated.ingredients().iter().filter_map(|i| i.compound()).collect();
  from_ingredients.sort_unstable();
  from_ingredients.dedup();
  let mut derived: Vec<&str> = migrated.compounds().iter().map(|c| c.as_str()).collect();
  derived.sort_unstable();
  assert_eq!(from_ingredients, derived);
}

#[test]
fn missing_solution_name_aborts_without_commit() {
  let (compounds, mut solutions) = salty_water();
  solutions[0].name = None;
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  let err = MigrationEngine::new(&mut manager).run().unwrap_err();
  match err {
    MigrationError::MissingRequiredField { entity, field } => {
      assert_eq!(entity, "Solution");
      assert_eq!(field, "name");
    }
    other => panic!("se esperaba MissingRequiredField, llegó {:?}", other),
  }
  assert!(!manager.committed);
  assert!(manager.written_solutions.is_empty());
}

#[test]
fn missing_amount_dictionary_aborts() {
  let (compounds, mut solutions) = salty_water();
  solutions[0].amounts = None;
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  let err = MigrationEngine::new(&mut manager).run().unwrap_err();
  assert!(matches!(err, MigrationError::MissingRequiredField { ref field, .. } if field == "amount"));
  assert!(!manager.committed);
}

#[test]
fn missing_compound_cid_aborts() {
  let (mut compounds, solutions) = salty_water();
  compounds[0].cid = None;
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  let err = MigrationEngine::new(&mut manager).run().unwrap_err();
  assert!(matches!(err, MigrationError::MissingRequiredField { ref field, .. } if field == "cid"));
  assert!(!manager.committed);
}

#[test]
fn unknown_amount_name_defaults_to_zero() {
  let (compounds, mut solutions) = salty_water();
  // el diccionario sólo indexa "water": el otro ingrediente queda en 0.0
  solutions[0].amounts = Some([("water".to_string(), 1.0)].into());
  let mut manager = InMemoryMigrationManager::new(compounds, solutions);
  MigrationEngine::new(&mut manager).run().unwrap();
  let migrated = &manager.written_solutions[0];
  assert_eq!(migrated.ingredient_named("sodium chloride").unwrap().amount(), 0.0);
  assert_eq!(migrated.ingredient_named("water").unwrap().amount(), 1.0);
}

#[test]
fn compound_without_matching_ingredient_is_skipped_not_fatal() {
  // el nombre embebido en la solución difiere del registrado en la lista
  // de compuestos (deriva del almacén): el par (nombre, cid) no empareja
  // y el compuesto se omite del conjunto derivado.
  let compounds = vec![water("c-water")];
  let mut drifted = water("c-water");
  drifted.name = Some("watr".to_string());
  let solution = SourceSolution { id: "s-1".to_string(),
                                  name: Some("typo mix".to_string()),
                                  created_at: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
                                  amounts: Some([("watr".to_string(), 2.0)].into()),
                                  compounds: Some(vec![drifted]) };
  let mut manager = InMemoryMigrationManager::new(compounds, vec![solution]);
  let report = MigrationEngine::new(&mut manager).run().unwrap();

  assert_eq!(report.skipped_compounds, 1);
  let migrated = &manager.written_solutions[0];
  assert_eq!(migrated.len(), 1);
  assert!(migrated.compounds().is_empty());
  assert!(!migrated.ingredients()[0].is_wired());
}

#[test]
fn duplicate_display_names_share_the_amount_keyed_by_that_name() {
  // ambigüedad heredada del esquema anterior: dos compuestos con el mismo
  // nombre reciben ambos la cantidad que ese nombre indexa.
  let a = source_compound("c-a", "111", "isomer", 20.0);
  let b = source_compound("c-b", "222", "isomer", 20.0);
  let solution = SourceSolution { id: "s-1".to_string(),
                                  name: Some("isomer mix".to_string()),
                                  created_at: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
                                  amounts: Some([("isomer".to_string(), 3.5)].into()),
                                  compounds: Some(vec![a.clone(), b.clone()]) };
  let mut manager = InMemoryMigrationManager::new(vec![a, b], vec![solution]);
  MigrationEngine::new(&mut manager).run().unwrap();

  let migrated = &manager.written_solutions[0];
  assert_eq!(migrated.len(), 2);
  for ing in migrated.ingredients() {
    assert_eq!(ing.amount(), 3.5);
    assert!(ing.is_wired());
  }
  let mut refs: Vec<&str> = migrated.compounds().iter().map(|c| c.as_str()).collect();
  refs.sort_unstable();
  assert_eq!(refs, vec!["111", "222"]);
}

#[test]
fn unregistered_compound_association_is_an_error() {
  // la solución referencia un compuesto que el mapeo de compuestos nunca
  // vio: asociación ausente, error fatal.
  let compounds = vec![water("c-water")];
  let solution = SourceSolution { id: "s-1".to_string(),
                                  name: Some("ghost mix".to_string()),
                                  created_at: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
                                  amounts: Some([("water".to_string(), 1.0)].into()),
                                  compounds: Some(vec![water("c-water"), salt("c-ghost")]) };
  let mut manager = InMemoryMigrationManager::new(compounds, vec![solution]);
  let err = MigrationEngine::new(&mut manager).run().unwrap_err();
  assert!(matches!(err, MigrationError::MissingAssociation { .. }));
  assert!(!manager.committed);
}
