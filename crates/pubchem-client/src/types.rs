// types.rs
use crate::ApiError;
use serde::Deserialize;
use std::collections::HashMap;

/// Propiedades de un compuesto tal como las publica la base remota.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundProperties {
  pub cid: String,
  pub title: String,
  pub formula: String,
  pub molecular_weight: f64,
  pub name_iupac: String,
}

/// Átomo de un confórmero: número atómico más coordenadas espaciales.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformerAtom {
  pub element: i64,
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

/// Geometría 3D de un confórmero de un compuesto.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformerGeometry {
  pub cid: String,
  pub conformer_id: String,
  pub atoms: Vec<ConformerAtom>,
}

// ---- Formas de cable de la API (subconjunto que consumimos) ----

#[derive(Debug, Deserialize)]
pub(crate) struct PropertyTableResponse {
  #[serde(rename = "PropertyTable")]
  pub property_table: PropertyTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PropertyTable {
  #[serde(rename = "Properties")]
  pub properties: Vec<PropertyRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PropertyRecord {
  #[serde(rename = "CID")]
  pub cid: i64,
  #[serde(rename = "Title", default)]
  pub title: String,
  #[serde(rename = "MolecularFormula", default)]
  pub molecular_formula: String,
  // La API publica el peso molecular como cadena
  #[serde(rename = "MolecularWeight", default)]
  pub molecular_weight: String,
  #[serde(rename = "IUPACName", default)]
  pub iupac_name: String,
}

impl CompoundProperties {
  pub(crate) fn from_record(record: PropertyRecord) -> Result<Self, ApiError> {
    let molecular_weight = record.molecular_weight
                                 .trim()
                                 .parse::<f64>()
                                 .map_err(|e| ApiError::UnableToParse(format!("MolecularWeight '{}': {}",
                                                                              record.molecular_weight, e)))?;
    Ok(Self { cid: record.cid.to_string(),
              title: record.title,
              formula: record.molecular_formula,
              molecular_weight,
              name_iupac: record.iupac_name })
  }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConformerResponse {
  #[serde(rename = "PC_Compounds")]
  pub compounds: Vec<PcCompound>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcCompound {
  pub id: PcCompoundId,
  pub atoms: PcAtoms,
  #[serde(default)]
  pub coords: Vec<PcCoords>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcCompoundId {
  pub id: PcCid,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcCid {
  pub cid: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcAtoms {
  pub aid: Vec<i64>,
  pub element: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcCoords {
  pub aid: Vec<i64>,
  #[serde(default)]
  pub conformers: Vec<PcConformer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcConformer {
  pub x: Vec<f64>,
  pub y: Vec<f64>,
  pub z: Vec<f64>,
  #[serde(default)]
  pub data: Vec<PcAnnotation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcAnnotation {
  pub urn: PcUrn,
  #[serde(default)]
  pub value: PcAnnotationValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PcUrn {
  #[serde(default)]
  pub label: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PcAnnotationValue {
  #[serde(default)]
  pub sval: Option<String>,
}

impl ConformerGeometry {
  /// Arma la geometría a partir de la forma de cable. Los átomos llegan
  /// en dos listas paralelas (`aid`, `element`) y las coordenadas en
  /// listas paralelas propias con su propio orden de `aid`; se alinean
  /// por `aid`. Cualquier desalineación es un error de decodificación.
  pub(crate) fn from_wire(response: ConformerResponse) -> Result<Self, ApiError> {
    let compound = response.compounds.into_iter().next().ok_or(ApiError::NoData)?;
    if compound.atoms.aid.len() != compound.atoms.element.len() {
      return Err(ApiError::UnableToParse("listas de átomos desalineadas".to_string()));
    }
    let elements: HashMap<i64, i64> =
      compound.atoms.aid.iter().copied().zip(compound.atoms.element.iter().copied()).collect();

    let coords = compound.coords
                         .into_iter()
                         .next()
                         .ok_or_else(|| ApiError::UnableToParse("respuesta sin coordenadas".to_string()))?;
    let conformer = coords.conformers
                          .into_iter()
                          .next()
                          .ok_or_else(|| ApiError::UnableToParse("respuesta sin confórmeros".to_string()))?;
    let n = coords.aid.len();
    if conformer.x.len() != n || conformer.y.len() != n || conformer.z.len() != n {
      return Err(ApiError::UnableToParse("coordenadas desalineadas".to_string()));
    }

    // El id del confórmero es la anotación cuya etiqueta es el literal
    // "Conformer"; sin ella queda la cadena vacía (no es un error).
    let conformer_id = conformer.data
                                .iter()
                                .find(|a| a.urn.label == "Conformer")
                                .and_then(|a| a.value.sval.clone())
                                .unwrap_or_default();

    let mut atoms = Vec::with_capacity(n);
    for (i, aid) in coords.aid.iter().enumerate() {
      let element = *elements.get(aid)
                             .ok_or_else(|| ApiError::UnableToParse(format!("aid {} sin elemento", aid)))?;
      atoms.push(ConformerAtom { element, x: conformer.x[i], y: conformer.y[i], z: conformer.z[i] });
    }
    Ok(Self { cid: compound.id.id.cid.to_string(), conformer_id, atoms })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const PROPERTIES_JSON: &str = r#"{
    "PropertyTable": {
      "Properties": [
        {
          "CID": 5234,
          "Title": "Sodium chloride",
          "MolecularFormula": "ClNa",
          "MolecularWeight": "58.44",
          "IUPACName": "sodium;chloride"
        }
      ]
    }
  }"#;

  const CONFORMER_JSON: &str = r#"{
    "PC_Compounds": [
      {
        "id": { "id": { "cid": 962 } },
        "atoms": { "aid": [1, 2, 3], "element": [8, 1, 1] },
        "coords": [
          {
            "aid": [1, 2, 3],
            "conformers": [
              {
                "x": [0.0, 0.2774, -0.2774],
                "y": [0.0, 0.8929, 0.8929],
                "z": [0.0, 0.2544, 0.2544],
                "data": [
                  { "urn": { "label": "Conformer" }, "value": { "sval": "000003C2-00000001" } }
                ]
              }
            ]
          }
        ]
      }
    ]
  }"#;

  #[test]
  fn decode_property_table() {
    let decoded: PropertyTableResponse = serde_json::from_str(PROPERTIES_JSON).unwrap();
    let props = CompoundProperties::from_record(decoded.property_table.properties.into_iter().next().unwrap()).unwrap();
    assert_eq!(props.cid, "5234");
    assert_eq!(props.title, "Sodium chloride");
    assert_eq!(props.formula, "ClNa");
    assert!((props.molecular_weight - 58.44).abs() < 1e-12);
    assert_eq!(props.name_iupac, "sodium;chloride");
  }

  #[test]
  fn unparseable_weight_is_reported() {
    let record = PropertyRecord { cid: 1,
                                  title: "x".into(),
                                  molecular_formula: "X".into(),
                                  molecular_weight: "n/a".into(),
                                  iupac_name: "x".into() };
    assert!(matches!(CompoundProperties::from_record(record), Err(ApiError::UnableToParse(_))));
  }

  #[test]
  fn decode_conformer_geometry() {
    let decoded: ConformerResponse = serde_json::from_str(CONFORMER_JSON).unwrap();
    let geometry = ConformerGeometry::from_wire(decoded).unwrap();
    assert_eq!(geometry.cid, "962");
    assert_eq!(geometry.conformer_id, "000003C2-00000001");
    assert_eq!(geometry.atoms.len(), 3);
    assert_eq!(geometry.atoms[0].element, 8);
    assert!((geometry.atoms[1].x - 0.2774).abs() < 1e-12);
  }

  #[test]
  fn missing_conformer_label_defaults_to_empty_id() {
    let decoded: ConformerResponse =
      serde_json::from_str(&CONFORMER_JSON.replace("\"Conformer\"", "\"Charge\"")).unwrap();
    let geometry = ConformerGeometry::from_wire(decoded).unwrap();
    assert_eq!(geometry.conformer_id, "");
  }

  #[test]
  fn misaligned_coordinates_fail_to_parse() {
    let broken = CONFORMER_JSON.replace("\"x\": [0.0, 0.2774, -0.2774]", "\"x\": [0.0]");
    let decoded: ConformerResponse = serde_json::from_str(&broken).unwrap();
    assert!(matches!(ConformerGeometry::from_wire(decoded), Err(ApiError::UnableToParse(_))));
  }

  #[test]
  fn empty_compound_list_is_no_data() {
    let decoded: ConformerResponse = serde_json::from_str(r#"{"PC_Compounds": []}"#).unwrap();
    assert!(matches!(ConformerGeometry::from_wire(decoded), Err(ApiError::NoData)));
  }
}
