//! Cliente del servicio REST público de química. Expone consultas
//! tipadas de propiedades, imagen 2D y confórmero 3D, y mapea toda falla
//! a la taxonomía `ApiError`.

mod client;
mod errors;
mod types;

pub use client::{IdentifierKind, PubChemClient};
pub use errors::ApiError;
pub use types::{CompoundProperties, ConformerAtom, ConformerGeometry};
