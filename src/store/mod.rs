//! Remote document store abstraction.
//!
//! The project cache only needs two capabilities from the backend: list
//! every document of a collection, and subscribe to snapshots of it.

mod api_types;
mod firestore;

use color_eyre::Result;
use serde_json::{Map, Value};
use std::future::Future;
use tokio::sync::mpsc;

pub use firestore::FirestoreClient;

/// One document with its fields decoded into plain JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
  /// Document id (last segment of the resource name)
  pub id: String,
  pub fields: Map<String, Value>,
  /// Server-side modification time, if reported
  pub update_time: Option<String>,
}

impl Document {
  pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
    Self {
      id: id.into(),
      fields,
      update_time: None,
    }
  }
}

/// Stream of collection snapshots. An `Err` ends the stream.
///
/// Dropping the receiver tears the underlying subscription down.
pub type UpdateReceiver = mpsc::UnboundedReceiver<Result<Vec<Document>>>;

/// Backend capable of serving a collection of documents.
pub trait DocumentStore: Send + Sync + 'static {
  /// Fetch every document of `collection` once.
  fn fetch_all(&self, collection: &str) -> impl Future<Output = Result<Vec<Document>>> + Send;

  /// Open a push channel of snapshots for `collection`.
  fn subscribe(&self, collection: &str) -> Result<UpdateReceiver>;
}
