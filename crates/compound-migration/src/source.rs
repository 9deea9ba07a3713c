// Archivo: source.rs
// Propósito: instantáneas primitivas del almacén fuente. Cada campo llega
// como `Option`: el motor decide cuáles son requeridos y cuáles admiten
// un valor por defecto.
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Instantánea primitiva de un compuesto fuente.
///
/// `id` es la identidad de la instancia dentro del almacén (la clave de
/// fila), y es la clave con la que se registran asociaciones
/// fuente→destino. Los demás campos son lecturas primitivas de atributos
/// y pueden estar ausentes en un almacén dañado.
#[derive(Debug, Clone)]
pub struct SourceCompound {
    pub id: String,
    pub cid: Option<String>,
    pub name: Option<String>,
    pub formula: Option<String>,
    pub molecular_weight: Option<f64>,
    pub name_iupac: Option<String>,
    pub image: Option<Vec<u8>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Instantánea primitiva de una solución fuente.
///
/// `amounts` es el diccionario desnormalizado nombre→gramos del esquema
/// anterior. `compounds` embebe las instantáneas de los compuestos
/// referenciados; sus `id` deben coincidir con los de la lista devuelta
/// por `MigrationManager::source_compounds`, porque el pase 2 resuelve
/// asociaciones con esas mismas claves.
#[derive(Debug, Clone)]
pub struct SourceSolution {
    pub id: String,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub amounts: Option<HashMap<String, f64>>,
    pub compounds: Option<Vec<SourceCompound>>,
}
