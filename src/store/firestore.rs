//! Firestore REST client.

use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use super::api_types::ApiListResponse;
use super::{Document, DocumentStore, UpdateReceiver};
use crate::config::FirestoreConfig;

/// Firestore client using the public REST API.
#[derive(Clone)]
pub struct FirestoreClient {
  http: reqwest::Client,
  /// `.../projects/{id}/databases/(default)/documents/`
  documents_url: Url,
  api_key: Option<String>,
  page_size: u32,
  poll_interval: Duration,
}

impl FirestoreClient {
  pub fn new(config: &FirestoreConfig, api_key: Option<String>) -> Result<Self> {
    let base = Url::parse(&with_trailing_slash(config.base_url()))
      .map_err(|e| eyre!("Invalid Firestore base URL {}: {}", config.base_url(), e))?;

    let documents_url = base
      .join(&format!(
        "projects/{}/databases/(default)/documents/",
        config.project_id
      ))
      .map_err(|e| eyre!("Invalid Firestore project id {}: {}", config.project_id, e))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("spark-projects/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      documents_url,
      api_key,
      page_size: config.page_size(),
      poll_interval: config.poll_interval(),
    })
  }

  /// URL of one page of `collection`.
  fn page_url(&self, collection: &str, page_token: Option<&str>) -> Result<Url> {
    let mut url = self
      .documents_url
      .join(collection)
      .map_err(|e| eyre!("Invalid collection name {}: {}", collection, e))?;

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("pageSize", &self.page_size.to_string());
      if let Some(token) = page_token {
        query.append_pair("pageToken", token);
      }
      if let Some(key) = &self.api_key {
        query.append_pair("key", key);
      }
    }

    Ok(url)
  }

  /// List every document of a collection, following page tokens.
  pub async fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
      let url = self.page_url(collection, page_token.as_deref())?;

      let response = self
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| eyre!("Failed to list collection {}: {}", collection, e))?
        .error_for_status()
        .map_err(|e| eyre!("Firestore rejected listing {}: {}", collection, e))?;

      let page: ApiListResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse documents of {}: {}", collection, e))?;

      documents.extend(page.documents.into_iter().map(|d| d.into_document()));

      match page.next_page_token {
        Some(token) if !token.is_empty() => page_token = Some(token),
        _ => break,
      }
    }

    debug!(collection, count = documents.len(), "listed documents");
    Ok(documents)
  }
}

impl DocumentStore for FirestoreClient {
  async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>> {
    self.list_documents(collection).await
  }

  fn subscribe(&self, collection: &str) -> Result<UpdateReceiver> {
    let runtime = Handle::try_current()
      .map_err(|e| eyre!("Cannot subscribe to {} outside a Tokio runtime: {}", collection, e))?;

    let (tx, rx) = mpsc::unbounded_channel();
    let client = self.clone();
    let collection = collection.to_string();
    info!(
      collection = %collection,
      interval_secs = client.poll_interval.as_secs(),
      "starting snapshot polling"
    );
    let interval = client.poll_interval;
    runtime.spawn(poll_snapshots(client, collection, interval, tx));

    Ok(rx)
  }
}

/// Poll `collection` and push a snapshot whenever it changes.
///
/// The first snapshot is always pushed. A failed poll is pushed as `Err`
/// and ends the stream, as does dropping the receiver.
async fn poll_snapshots<S: DocumentStore>(
  store: S,
  collection: String,
  interval: Duration,
  tx: mpsc::UnboundedSender<Result<Vec<Document>>>,
) {
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  let mut last_seen: Option<Vec<(String, Option<String>)>> = None;

  loop {
    tokio::select! {
      _ = tx.closed() => {
        debug!(collection = %collection, "snapshot receiver dropped, polling stopped");
        break;
      }
      _ = ticker.tick() => {}
    }

    match store.fetch_all(&collection).await {
      Ok(documents) => {
        let current = fingerprint(&documents);
        if last_seen.as_ref() == Some(&current) {
          continue;
        }
        last_seen = Some(current);
        if tx.send(Ok(documents)).is_err() {
          break;
        }
      }
      Err(err) => {
        warn!(collection = %collection, error = %err, "polling failed, closing snapshot stream");
        let _ = tx.send(Err(err));
        break;
      }
    }
  }
}

/// Identity of a snapshot: which documents exist and when each last changed.
fn fingerprint(documents: &[Document]) -> Vec<(String, Option<String>)> {
  documents
    .iter()
    .map(|d| (d.id.clone(), d.update_time.clone()))
    .collect()
}

fn with_trailing_slash(url: &str) -> String {
  if url.ends_with('/') {
    url.to_string()
  } else {
    format!("{}/", url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  const TICK: Duration = Duration::from_millis(10);

  /// Replays a fixed sequence of poll results, then repeats the last snapshot.
  #[derive(Clone, Default)]
  struct ScriptedStore {
    script: Arc<Mutex<VecDeque<Result<Vec<Document>>>>>,
    last: Arc<Mutex<Vec<Document>>>,
    calls: Arc<AtomicUsize>,
  }

  impl ScriptedStore {
    fn new(script: Vec<Result<Vec<Document>>>) -> Self {
      Self {
        script: Arc::new(Mutex::new(script.into())),
        ..Self::default()
      }
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl DocumentStore for ScriptedStore {
    async fn fetch_all(&self, _collection: &str) -> Result<Vec<Document>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      match self.script.lock().unwrap().pop_front() {
        Some(Ok(documents)) => {
          *self.last.lock().unwrap() = documents.clone();
          Ok(documents)
        }
        Some(Err(err)) => Err(err),
        None => Ok(self.last.lock().unwrap().clone()),
      }
    }

    fn subscribe(&self, _collection: &str) -> Result<UpdateReceiver> {
      Err(eyre!("scripted store has no push channel"))
    }
  }

  fn snapshot(docs: &[(&str, &str)]) -> Vec<Document> {
    docs
      .iter()
      .map(|(id, updated)| {
        let mut doc = Document::new(*id, Default::default());
        doc.update_time = Some(updated.to_string());
        doc
      })
      .collect()
  }

  fn start_polling(store: ScriptedStore) -> (UpdateReceiver, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(poll_snapshots(store, "proyectos".to_string(), TICK, tx));
    (rx, handle)
  }

  async fn next(rx: &mut UpdateReceiver) -> Option<Result<Vec<Document>>> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
      .await
      .expect("no snapshot within timeout")
  }

  fn config(base_url: Option<&str>) -> FirestoreConfig {
    FirestoreConfig {
      project_id: "proyectos-iniciativa-spark".to_string(),
      base_url: base_url.map(String::from),
      page_size: Some(50),
      poll_interval_secs: None,
    }
  }

  #[test]
  fn test_page_url_default_base() {
    let client = FirestoreClient::new(&config(None), None).unwrap();
    let url = client.page_url("proyectos", None).unwrap();

    assert_eq!(
      url.as_str(),
      "https://firestore.googleapis.com/v1/projects/proyectos-iniciativa-spark/databases/(default)/documents/proyectos?pageSize=50"
    );
  }

  #[test]
  fn test_page_url_with_token_and_key() {
    let client = FirestoreClient::new(&config(None), Some("secret".to_string())).unwrap();
    let url = client.page_url("proyectos", Some("abc")).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert_eq!(
      pairs,
      vec![
        ("pageSize".to_string(), "50".to_string()),
        ("pageToken".to_string(), "abc".to_string()),
        ("key".to_string(), "secret".to_string()),
      ]
    );
  }

  #[test]
  fn test_emulator_base_without_trailing_slash() {
    let client = FirestoreClient::new(&config(Some("http://localhost:8080/v1")), None).unwrap();
    let url = client.page_url("proyectos", None).unwrap();

    assert!(url
      .as_str()
      .starts_with("http://localhost:8080/v1/projects/proyectos-iniciativa-spark/"));
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(FirestoreClient::new(&config(Some("not a url")), None).is_err());
  }

  #[test]
  fn test_fingerprint_tracks_update_time() {
    let mut doc = Document::new("a", Default::default());
    doc.update_time = Some("t1".to_string());
    let before = fingerprint(&[doc.clone()]);
    doc.update_time = Some("t2".to_string());

    assert_ne!(before, fingerprint(&[doc]));
  }

  #[tokio::test]
  async fn test_polling_pushes_first_snapshot_even_if_empty() {
    let store = ScriptedStore::new(vec![Ok(Vec::new())]);
    let (mut rx, _handle) = start_polling(store);

    let first = next(&mut rx).await.unwrap().unwrap();
    assert!(first.is_empty());
  }

  #[tokio::test]
  async fn test_polling_skips_unchanged_snapshots() {
    let store = ScriptedStore::new(vec![
      Ok(snapshot(&[("a", "t1")])),
      Ok(snapshot(&[("a", "t1")])),
      Ok(snapshot(&[("a", "t1")])),
      Ok(snapshot(&[("a", "t2"), ("b", "t1")])),
    ]);
    let (mut rx, _handle) = start_polling(store.clone());

    let first = next(&mut rx).await.unwrap().unwrap();
    assert_eq!(first, snapshot(&[("a", "t1")]));

    let second = next(&mut rx).await.unwrap().unwrap();
    assert_eq!(second, snapshot(&[("a", "t2"), ("b", "t1")]));
    assert!(store.calls() >= 4);

    // The script is exhausted; the same snapshot keeps coming back
    tokio::time::sleep(TICK * 5).await;
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_polling_error_ends_stream() {
    let store = ScriptedStore::new(vec![
      Ok(snapshot(&[("a", "t1")])),
      Err(eyre!("permission denied")),
      Ok(snapshot(&[("a", "t2")])),
    ]);
    let (mut rx, handle) = start_polling(store.clone());

    assert!(next(&mut rx).await.unwrap().is_ok());
    let err = next(&mut rx).await.unwrap().unwrap_err();
    assert!(err.to_string().contains("permission denied"));
    assert!(next(&mut rx).await.is_none());

    handle.await.unwrap();
    assert_eq!(store.calls(), 2);
  }

  #[tokio::test]
  async fn test_polling_stops_when_receiver_dropped() {
    let store = ScriptedStore::new(vec![Ok(snapshot(&[("a", "t1")]))]);
    let (mut rx, handle) = start_polling(store);

    next(&mut rx).await.unwrap().unwrap();
    drop(rx);

    tokio::time::timeout(Duration::from_secs(2), handle)
      .await
      .expect("polling kept running")
      .unwrap();
  }

  /// Answer one request per page and return the request lines seen.
  async fn serve_pages(listener: TcpListener, pages: Vec<String>) -> Vec<String> {
    let mut requests = Vec::new();
    for body in pages {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = vec![0u8; 8192];
      let n = socket.read(&mut buf).await.unwrap();
      let request = String::from_utf8_lossy(&buf[..n]);
      requests.push(request.lines().next().unwrap_or_default().to_string());

      let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      let _ = socket.shutdown().await;
    }
    requests
  }

  #[tokio::test]
  async fn test_list_documents_follows_page_tokens() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/v1", listener.local_addr().unwrap());

    let prefix = "projects/proyectos-iniciativa-spark/databases/(default)/documents/proyectos";
    let first_page = serde_json::json!({
      "documents": [
        { "name": format!("{}/1", prefix), "fields": { "nombre": { "stringValue": "Uno" } }, "updateTime": "t1" },
        { "name": format!("{}/2", prefix), "fields": { "nombre": { "stringValue": "Dos" } } }
      ],
      "nextPageToken": "page-2"
    });
    let second_page = serde_json::json!({
      "documents": [
        { "name": format!("{}/3", prefix), "fields": { "nombre": { "stringValue": "Tres" } } }
      ]
    });
    let server = tokio::spawn(serve_pages(
      listener,
      vec![first_page.to_string(), second_page.to_string()],
    ));

    let client = FirestoreClient::new(&config(Some(&base)), None).unwrap();
    let documents = client.list_documents("proyectos").await.unwrap();

    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(documents[0].fields["nombre"], "Uno");
    assert_eq!(documents[0].update_time.as_deref(), Some("t1"));

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains("pageToken"));
    assert!(requests[1].contains("pageToken=page-2"));
  }

  #[test]
  fn test_subscribe_requires_runtime() {
    let client = FirestoreClient::new(&config(None), None).unwrap();
    assert!(client.subscribe("proyectos").is_err());
  }
}
