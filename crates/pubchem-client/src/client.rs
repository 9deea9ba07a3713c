// client.rs
use crate::types::{CompoundProperties, ConformerGeometry, ConformerResponse, PropertyTableResponse};
use crate::ApiError;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const PROPERTY_LIST: &str = "Title,MolecularFormula,MolecularWeight,IUPACName";

/// Clase de identificador con el que se consulta un compuesto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
  Name,
  Cid,
}

impl IdentifierKind {
  fn path_segment(self) -> &'static str {
    match self {
      IdentifierKind::Name => "name",
      IdentifierKind::Cid => "cid",
    }
  }
}

/// Cliente de la base remota de compuestos.
///
/// Cada llamada es independiente y sin estado compartido; la única
/// cancelación ejercida es el timeout fijo de 15 segundos por petición.
/// Quien pide imagen y confórmero en paralelo reconcilia los resultados
/// por su cuenta.
pub struct PubChemClient {
  http: reqwest::Client,
  base_url: String,
}

fn map_transport(e: reqwest::Error) -> ApiError {
  if e.is_timeout() {
    ApiError::TimeOut
  } else {
    ApiError::NoStatusCode
  }
}

/// Mapea el código de estado HTTP a la taxonomía del cliente. `None`
/// significa respuesta exitosa (2xx).
fn map_status(code: u16) -> Option<ApiError> {
  match code {
    200..=299 => None,
    400 => Some(ApiError::BadRequest),
    404 => Some(ApiError::NotFound),
    405 => Some(ApiError::NotAllowed),
    503 => Some(ApiError::ServerBusy),
    504 => Some(ApiError::TimeOut),
    other => Some(ApiError::Other(other)),
  }
}

impl PubChemClient {
  pub fn new() -> Self {
    Self::with_base_url(DEFAULT_BASE_URL)
  }

  /// Construye el cliente contra otra URL base (para pruebas).
  pub fn with_base_url(base_url: &str) -> Self {
    let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT)
                                         .build()
                                         .expect("no se pudo construir el cliente HTTP");
    Self { http, base_url: base_url.trim_end_matches('/').to_string() }
  }

  async fn get_bytes(&self, url: String) -> Result<Vec<u8>, ApiError> {
    log::debug!("GET {}", url);
    let response = self.http.get(&url).send().await.map_err(map_transport)?;
    let status = response.status().as_u16();
    if let Some(err) = map_status(status) {
      return Err(err);
    }
    let body = response.bytes().await.map_err(map_transport)?;
    if body.is_empty() {
      return Err(ApiError::NoData);
    }
    Ok(body.to_vec())
  }

  /// Consulta las propiedades de un compuesto por nombre o por cid.
  pub async fn fetch_properties(&self,
                                identifier: &str,
                                kind: IdentifierKind)
                                -> Result<CompoundProperties, ApiError> {
    let url = format!("{}/compound/{}/{}/property/{}/json",
                      self.base_url,
                      kind.path_segment(),
                      identifier,
                      PROPERTY_LIST);
    let body = self.get_bytes(url).await?;
    let decoded: PropertyTableResponse =
      serde_json::from_slice(&body).map_err(|e| ApiError::UnableToParse(e.to_string()))?;
    let record = decoded.property_table.properties.into_iter().next().ok_or(ApiError::NoData)?;
    CompoundProperties::from_record(record)
  }

  /// Descarga la imagen 2D renderizada del compuesto (bytes PNG crudos).
  pub async fn fetch_image(&self, cid: &str) -> Result<Vec<u8>, ApiError> {
    let url = format!("{}/compound/cid/{}/png", self.base_url, cid);
    self.get_bytes(url).await
  }

  /// Descarga la geometría 3D del primer confórmero registrado.
  pub async fn fetch_conformer(&self, cid: &str) -> Result<ConformerGeometry, ApiError> {
    let url = format!("{}/compound/cid/{}/JSON?record_type=3d", self.base_url, cid);
    let body = self.get_bytes(url).await?;
    let decoded: ConformerResponse =
      serde_json::from_slice(&body).map_err(|e| ApiError::UnableToParse(e.to_string()))?;
    ConformerGeometry::from_wire(decoded)
  }
}

impl Default for PubChemClient {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_map_to_typed_errors() {
    assert_eq!(map_status(200), None);
    assert_eq!(map_status(204), None);
    assert_eq!(map_status(400), Some(ApiError::BadRequest));
    assert_eq!(map_status(404), Some(ApiError::NotFound));
    assert_eq!(map_status(405), Some(ApiError::NotAllowed));
    assert_eq!(map_status(503), Some(ApiError::ServerBusy));
    assert_eq!(map_status(504), Some(ApiError::TimeOut));
    assert_eq!(map_status(418), Some(ApiError::Other(418)));
    assert_eq!(map_status(500), Some(ApiError::Other(500)));
  }

  #[test]
  fn unreachable_host_surfaces_as_no_status_code() {
    // puerto cerrado: falla de transporte sin respuesta HTTP
    let client = PubChemClient::with_base_url("http://127.0.0.1:1/rest/pug");
    let result = tokio_test::block_on(client.fetch_image("962"));
    assert!(matches!(result, Err(ApiError::NoStatusCode) | Err(ApiError::TimeOut)));
  }
}
