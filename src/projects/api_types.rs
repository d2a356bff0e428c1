//! Mapping from raw store documents to [`ProjectRecord`]s.
//!
//! Documents are edited by hand in the Firestore console, so every field is
//! read leniently: a missing or ill-typed field falls back to its default
//! without rejecting the rest of the document.
//!
//! Defaults:
//! - list fields become an empty list
//! - optional scalars become `None` (blank strings count as missing)
//! - name, hook and enrollment link become an empty string

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use super::types::{ProjectList, ProjectRecord, ProjectStatus};
use crate::store::Document;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProject {
  #[serde(deserialize_with = "lenient")]
  nombre: Option<String>,
  #[serde(rename = "tituloClickbait", deserialize_with = "lenient")]
  titulo_clickbait: Option<String>,
  #[serde(deserialize_with = "lenient_list")]
  tecnologias: Vec<String>,
  #[serde(rename = "enlaceInscripcion", deserialize_with = "lenient")]
  enlace_inscripcion: Option<String>,
  #[serde(deserialize_with = "lenient")]
  complejidad: Option<String>,
  #[serde(deserialize_with = "lenient")]
  origen: Option<String>,
  #[serde(deserialize_with = "lenient")]
  motivacion: Option<String>,
  #[serde(deserialize_with = "lenient_list")]
  objetivos: Vec<String>,
  #[serde(deserialize_with = "lenient")]
  descripcion: Option<String>,
  #[serde(rename = "conceptosAprender", deserialize_with = "lenient_list")]
  conceptos_aprender: Vec<String>,
  #[serde(deserialize_with = "lenient_list")]
  imagenes: Vec<String>,
  #[serde(rename = "ultimaActualizacion", deserialize_with = "lenient")]
  ultima_actualizacion: Option<String>,
  #[serde(deserialize_with = "lenient")]
  emoji: Option<String>,
  #[serde(rename = "teamSize", deserialize_with = "lenient_count")]
  team_size: Option<u32>,
  #[serde(deserialize_with = "lenient")]
  duration: Option<String>,
  #[serde(deserialize_with = "lenient_status")]
  status: Option<ProjectStatus>,
  // Older documents used English field names
  #[serde(deserialize_with = "lenient")]
  title: Option<String>,
  #[serde(deserialize_with = "lenient_list")]
  technologies: Vec<String>,
  #[serde(deserialize_with = "lenient")]
  description: Option<String>,
}

impl RawProject {
  fn into_record(self, id: String) -> ProjectRecord {
    ProjectRecord {
      id,
      name: non_blank(self.nombre)
        .or_else(|| non_blank(self.title))
        .unwrap_or_default(),
      hook: self.titulo_clickbait.unwrap_or_default(),
      technologies: if self.tecnologias.is_empty() {
        self.technologies
      } else {
        self.tecnologias
      },
      enrollment_url: self.enlace_inscripcion.unwrap_or_default(),
      complexity: non_blank(self.complejidad),
      origin: non_blank(self.origen),
      motivation: non_blank(self.motivacion),
      objectives: self.objetivos,
      description: non_blank(self.descripcion).or_else(|| non_blank(self.description)),
      concepts: self.conceptos_aprender,
      images: self.imagenes,
      last_updated: non_blank(self.ultima_actualizacion),
      emoji: non_blank(self.emoji),
      team_size: self.team_size,
      duration: non_blank(self.duration),
      status: self.status,
    }
  }
}

/// Map one document to a record. Never fails.
pub fn into_record(document: Document) -> ProjectRecord {
  let raw = match serde_json::from_value::<RawProject>(Value::Object(document.fields)) {
    Ok(raw) => raw,
    Err(err) => {
      warn!(id = %document.id, error = %err, "unreadable project document, using defaults");
      RawProject::default()
    }
  };
  raw.into_record(document.id)
}

/// Map a batch of documents, keeping their order.
pub fn into_project_list(documents: Vec<Document>) -> ProjectList {
  documents.into_iter().map(into_record).collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.trim().is_empty())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let value = Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).ok())
}

/// Accepts a list of strings or a single comma-separated string.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let items = match Value::deserialize(deserializer)? {
    Value::Array(values) => values
      .into_iter()
      .filter_map(|value| match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
      })
      .filter(|s| !s.is_empty())
      .collect(),
    Value::String(s) => s
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
      .collect(),
    _ => Vec::new(),
  };
  Ok(items)
}

/// Accepts a non-negative integer or a numeric string.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
  D: Deserializer<'de>,
{
  let count = match Value::deserialize(deserializer)? {
    Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  };
  Ok(count)
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<ProjectStatus>, D::Error>
where
  D: Deserializer<'de>,
{
  let status = match Value::deserialize(deserializer)? {
    Value::String(s) => match s.trim().to_lowercase().as_str() {
      "recruiting" => Some(ProjectStatus::Recruiting),
      "active" => Some(ProjectStatus::Active),
      "completed" => Some(ProjectStatus::Completed),
      _ => None,
    },
    _ => None,
  };
  Ok(status)
}
