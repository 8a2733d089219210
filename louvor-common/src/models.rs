//! Typed domain models
//!
//! The document store itself is schemaless; these structs give the domain
//! layer a typed view of the records it reads and writes. Serialization
//! uses camelCase field names to match the persisted record layout, so a
//! collection written through a typed model stays readable by untyped
//! callers and vice versa.

use crate::store::Record;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A registered member of the application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: String,
    pub nome: String,
    pub email: String,
    pub senha_hash: String,
    pub senha_salt: String,
    /// Ministry the user belongs to, set when an invite PIN is redeemed
    pub ministerio_id: Option<String>,
    /// Role within the ministry, e.g. "ministro", "violao", "vocal"
    pub funcao: Option<String>,
    pub criado_em: DateTime<Utc>,
}

/// A worship ministry, owning a roster, schedules, and a song repertoire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ministerio {
    pub id: String,
    pub nome: String,
    pub igreja: Option<String>,
    /// User who created the ministry
    pub lider_id: String,
    /// Six-character uppercase alphanumeric invite PIN
    pub pin: String,
    pub criado_em: DateTime<Utc>,
}

/// One musician slot on a service schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participante {
    pub usuario_id: String,
    pub funcao: String,
}

/// A service schedule: who plays what on a given date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escala {
    pub id: String,
    pub ministerio_id: String,
    /// Service date, persisted as "YYYY-MM-DD"
    pub data: NaiveDate,
    /// Service name, e.g. "Culto de domingo"
    pub evento: String,
    #[serde(default)]
    pub participantes: Vec<Participante>,
    #[serde(default)]
    pub musica_ids: Vec<String>,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Utc>,
}

/// A song in a ministry's repertoire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Musica {
    pub id: String,
    pub ministerio_id: String,
    pub titulo: String,
    pub artista: Option<String>,
    /// Musical key, e.g. "G", "Em"
    pub tom: Option<String>,
    pub bpm: Option<u32>,
    pub link_youtube: Option<String>,
    pub link_cifra: Option<String>,
    /// Whether the song has been promoted into the shared pool
    #[serde(default)]
    pub compartilhada: bool,
    /// Date on which the song becomes eligible for promotion
    pub compartilhar_em: NaiveDate,
    pub criado_em: DateTime<Utc>,
}

/// Serialize a typed model into a store record
pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        _ => Err(Error::Internal(
            "value did not serialize to a JSON object".to_string(),
        )),
    }
}

/// Deserialize a store record into a typed model
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Deserialize a batch of records, skipping any that do not fit the model
///
/// Records the store returns may predate the current model shape; a record
/// that fails to deserialize is logged and skipped rather than failing the
/// whole listing.
pub fn from_records<T: DeserializeOwned>(records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match from_record(record) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}
