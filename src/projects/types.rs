use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared, immutable project catalog as handed to consumers.
pub type ProjectList = Arc<[ProjectRecord]>;

/// Lifecycle stage of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
  Recruiting,
  Active,
  Completed,
}

impl fmt::Display for ProjectStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      ProjectStatus::Recruiting => "recruiting",
      ProjectStatus::Active => "active",
      ProjectStatus::Completed => "completed",
    };
    f.write_str(label)
  }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
  pub id: String,
  pub name: String,
  /// Short attention-grabbing tagline
  pub hook: String,
  /// In source order; the first tag is the headline technology
  pub technologies: Vec<String>,
  pub enrollment_url: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub complexity: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub origin: Option<String>,
  /// Markdown
  #[serde(skip_serializing_if = "Option::is_none")]
  pub motivation: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub objectives: Vec<String>,
  /// Markdown
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub concepts: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub images: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_updated: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub emoji: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub team_size: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ProjectStatus>,
}

impl ProjectRecord {
  /// The emphasized technology, if any.
  pub fn lead_technology(&self) -> Option<&str> {
    self.technologies.first().map(String::as_str)
  }
}
