// unit.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unidades soportadas para cantidades de un compuesto dentro de una
/// solución. Las variantes serializan con el nombre en minúsculas, que es
/// también la representación persistida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
  Gram,
  Milligram,
  Mole,
  Millimole,
}

impl Unit {
  pub const ALL: [Unit; 4] = [Unit::Gram, Unit::Milligram, Unit::Mole, Unit::Millimole];

  /// Unidades molares: su conversión a unidades de masa usa el peso
  /// molecular del compuesto.
  fn is_molar(self) -> bool {
    matches!(self, Unit::Mole | Unit::Millimole)
  }

  /// Factor a la unidad base de su clase (gramo o mol).
  fn scale(self) -> f64 {
    match self {
      Unit::Gram | Unit::Mole => 1.0,
      Unit::Milligram | Unit::Millimole => 1e-3,
    }
  }
}

/// Convierte `amount` expresado en `from` a la unidad `to`, usando el peso
/// molecular en gramos/mol. Función pura y total: no valida el peso; entre
/// dos unidades de la misma clase el peso no interviene, y al cruzar
/// masa↔molar un peso cero produce `inf`/`NaN` según la semántica de
/// flotantes. El llamador garantiza `molecular_weight > 0`.
pub fn convert(amount: f64, molecular_weight: f64, from: Unit, to: Unit) -> f64 {
  let base = amount * from.scale();
  let crossed = match (from.is_molar(), to.is_molar()) {
    (false, true) => base / molecular_weight,
    (true, false) => base * molecular_weight,
    _ => base,
  };
  crossed / to.scale()
}

impl fmt::Display for Unit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Unit::Gram => "gram",
      Unit::Milligram => "milligram",
      Unit::Mole => "mole",
      Unit::Millimole => "millimole",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for Unit {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "gram" => Ok(Unit::Gram),
      "milligram" => Ok(Unit::Milligram),
      "mole" => Ok(Unit::Mole),
      "millimole" => Ok(Unit::Millimole),
      other => Err(DomainError::ValidationError(format!("Unidad desconocida: {}", other))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const NACL: f64 = 58.44;

  fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
  }

  #[test]
  fn test_identity() {
    for u in Unit::ALL {
      assert!(close(convert(2.5, NACL, u, u), 2.5));
    }
  }

  #[test]
  fn test_gram_to_mole() {
    // 1 g de NaCl ≈ 0.01711... mol
    let moles = convert(1.0, NACL, Unit::Gram, Unit::Mole);
    assert!(close(moles, 1.0 / NACL));
    assert!((moles - 0.0171115).abs() < 1e-6);
  }

  #[test]
  fn test_milligram_to_millimole() {
    // mg → mmol también divide por el peso molecular
    assert!(close(convert(58.44, NACL, Unit::Milligram, Unit::Millimole), 1.0));
  }

  #[test]
  fn test_mole_to_milligram() {
    assert!(close(convert(1.0, NACL, Unit::Mole, Unit::Milligram), NACL * 1000.0));
  }

  #[test]
  fn test_mole_to_millimole_ignores_weight() {
    // entre unidades molares el peso no interviene
    assert!(close(convert(1.0, 0.0, Unit::Mole, Unit::Millimole), 1000.0));
  }

  #[test]
  fn test_round_trip_all_pairs() {
    for from in Unit::ALL {
      for to in Unit::ALL {
        let back = convert(convert(3.25, NACL, from, to), NACL, to, from);
        assert!(close(back, 3.25), "ida y vuelta {} -> {} dio {}", from, to, back);
      }
    }
  }

  #[test]
  fn test_zero_weight_crossing_is_not_finite() {
    assert!(!convert(1.0, 0.0, Unit::Gram, Unit::Mole).is_finite());
  }

  #[test]
  fn test_parse_round_trip() -> Result<(), DomainError> {
    for u in Unit::ALL {
      assert_eq!(u.to_string().parse::<Unit>()?, u);
    }
    assert!("pound".parse::<Unit>().is_err());
    Ok(())
  }
}
