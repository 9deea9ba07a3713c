// errors.rs
use thiserror::Error;

/// Taxonomía de errores del cliente remoto. Toda falla (transporte,
/// estado HTTP, cuerpo vacío, decodificación) cruza la frontera del
/// cliente como un valor de este enum; nunca como un panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
  #[error("Solicitud incorrecta (400)")]
  BadRequest,
  #[error("No encontrado (404)")]
  NotFound,
  #[error("Método no permitido (405)")]
  NotAllowed,
  #[error("Servidor ocupado (503)")]
  ServerBusy,
  #[error("Tiempo de espera agotado")]
  TimeOut,
  #[error("Sin código de estado")]
  NoStatusCode,
  #[error("Respuesta sin datos")]
  NoData,
  #[error("No se pudo interpretar la respuesta: {0}")]
  UnableToParse(String),
  #[error("Error HTTP inesperado: {0}")]
  Other(u16),
}
