// Archivo: model.rs
// Propósito: declarar los modelos de esquema (entidades, atributos y
// relaciones) y derivar de ellos un token de versión por contenido.
use sha2::{Digest, Sha256};

/// Declaración de una entidad dentro de un modelo de esquema.
#[derive(Debug, Clone)]
pub struct EntityModel {
    pub name: String,
    pub attributes: Vec<String>,
    pub relationships: Vec<String>,
}

impl EntityModel {
    pub fn new(name: &str, attributes: &[&str], relationships: &[&str]) -> Self {
        Self { name: name.to_string(),
               attributes: attributes.iter().map(|s| s.to_string()).collect(),
               relationships: relationships.iter().map(|s| s.to_string()).collect() }
    }
}

/// Modelo de esquema completo: un conjunto de entidades con nombre.
///
/// El token de versión se calcula sobre la declaración canónica (nombres
/// ordenados), de modo que dos declaraciones equivalentes producen el
/// mismo token sin importar el orden en que se escribieron.
#[derive(Debug, Clone)]
pub struct ManagedModel {
    pub name: String,
    pub entities: Vec<EntityModel>,
}

impl ManagedModel {
    pub fn new(name: &str, entities: Vec<EntityModel>) -> Self {
        Self { name: name.to_string(), entities }
    }

    /// Token de versión por contenido: Sha256 de la declaración canónica.
    pub fn version_token(&self) -> String {
        let mut entities: Vec<&EntityModel> = self.entities.iter().collect();
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        let mut hasher = Sha256::new();
        for entity in entities {
            let mut attrs: Vec<&str> = entity.attributes.iter().map(|s| s.as_str()).collect();
            attrs.sort_unstable();
            let mut rels: Vec<&str> = entity.relationships.iter().map(|s| s.as_str()).collect();
            rels.sort_unstable();
            hasher.update(entity.name.as_bytes());
            hasher.update(b";attrs:");
            hasher.update(attrs.join(",").as_bytes());
            hasher.update(b";rels:");
            hasher.update(rels.join(",").as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Modelo del almacén anterior: la solución guarda el diccionario de
/// cantidades por nombre y un conjunto de compuestos.
pub fn source_model() -> ManagedModel {
    ManagedModel::new("compound-store-v3",
                      vec![EntityModel::new("Compound",
                                            &["cid", "name", "formula", "molecular_weight", "name_iupac", "image",
                                              "created_at"],
                                            &["solutions"]),
                           EntityModel::new("Solution", &["name", "created_at", "amounts"], &["compounds"]),
                           EntityModel::new("CompoundTag", &["name", "compound_count"], &["compounds"])])
}

/// Modelo del almacén vigente: la cantidad por compuesto vive en la
/// entidad de unión `SolutionIngredient`.
pub fn destination_model() -> ManagedModel {
    ManagedModel::new("compound-store-v4",
                      vec![EntityModel::new("Compound",
                                            &["cid", "name", "formula", "molecular_weight", "name_iupac", "image",
                                              "created_at"],
                                            &["solutions"]),
                           EntityModel::new("Solution", &["name", "created_at"], &["ingredients", "compounds"]),
                           EntityModel::new("SolutionIngredient",
                                            &["compound_name", "compound_cid", "amount", "unit"],
                                            &["compound", "solution"]),
                           EntityModel::new("CompoundTag", &["name", "compound_count"], &["compounds"])])
}
