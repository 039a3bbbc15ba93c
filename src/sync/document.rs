//! Per-user remote document storage.
//!
//! Documents live at `users/<uid>/<collection>/<doc>` and are plain JSON
//! values. Two backends are provided: an in-process map and a REST client.

use super::error::RemoteError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Document collections under a user container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Profile,
    Targets,
    RunLogs,
    Achievements,
    RaceGoal,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Profile => "profile",
            Collection::Targets => "targets",
            Collection::RunLogs => "runLogs",
            Collection::Achievements => "achievements",
            Collection::RaceGoal => "raceGoal",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of the single document in singleton collections.
pub const CURRENT_DOC: &str = "current";

/// Location of one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    pub user_id: String,
    pub collection: Collection,
    pub doc_id: String,
}

impl DocumentPath {
    pub fn new(user_id: impl Into<String>, collection: Collection, doc_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            collection,
            doc_id: doc_id.into(),
        }
    }

    /// Path of the `current` document of a singleton collection.
    pub fn current(user_id: impl Into<String>, collection: Collection) -> Self {
        Self::new(user_id, collection, CURRENT_DOC)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/{}/{}", self.user_id, self.collection, self.doc_id)
    }
}

/// Remote document store.
///
/// `put` replaces the whole document. `delete` of a missing document succeeds.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, path: &DocumentPath, document: Value) -> Result<(), RemoteError>;

    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, RemoteError>;

    /// All documents of a collection as `(doc id, document)` pairs.
    async fn list(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<(String, Value)>, RemoteError>;

    async fn delete(&self, path: &DocumentPath) -> Result<(), RemoteError>;
}

// ========== In-memory store ==========

/// In-process document store.
///
/// Used offline and in tests. [`MemoryDocumentStore::set_failure`] makes every
/// call fail until cleared.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<DocumentPath, Value>>,
    failure: Mutex<Option<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every following call with `message`, or stop failing with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = message.map(str::to_string);
    }

    /// Synchronous read for inspection.
    pub fn document(&self, path: &DocumentPath) -> Option<Value> {
        self.lock().get(path).cloned()
    }

    /// Number of stored documents across all users.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<DocumentPath, Value>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> Result<(), RemoteError> {
        match self.failure.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(message) => Err(RemoteError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, path: &DocumentPath, document: Value) -> Result<(), RemoteError> {
        self.check_failure()?;
        self.lock().insert(path.clone(), document);
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, RemoteError> {
        self.check_failure()?;
        Ok(self.lock().get(path).cloned())
    }

    async fn list(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<(String, Value)>, RemoteError> {
        self.check_failure()?;
        Ok(self
            .lock()
            .iter()
            .filter(|(path, _)| path.user_id == user_id && path.collection == collection)
            .map(|(path, doc)| (path.doc_id.clone(), doc.clone()))
            .collect())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), RemoteError> {
        self.check_failure()?;
        self.lock().remove(path);
        Ok(())
    }
}

// ========== HTTP store ==========

/// REST document store.
///
/// - `PUT {base}/users/{uid}/{collection}/{doc}` with the JSON body
/// - `GET {base}/users/{uid}/{collection}/{doc}`, 404 meaning absent
/// - `GET {base}/users/{uid}/{collection}` returning an object of id to document
/// - `DELETE {base}/users/{uid}/{collection}/{doc}`, 404 accepted
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl {
                url: base_url.to_string(),
                reason: "cannot be a base".to_string(),
            });
        }

        let client = Client::builder().build()?;

        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("users").extend(segments);
        }
        url
    }

    fn document_url(&self, path: &DocumentPath) -> Url {
        self.url(&[path.user_id.as_str(), path.collection.as_str(), path.doc_id.as_str()])
    }
}

fn status_error(status: StatusCode, path: impl fmt::Display) -> RemoteError {
    RemoteError::Status {
        status: status.as_u16(),
        path: path.to_string(),
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn put(&self, path: &DocumentPath, document: Value) -> Result<(), RemoteError> {
        let resp = self
            .client
            .put(self.document_url(path))
            .json(&document)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp.status(), path));
        }

        tracing::debug!("PUT {}", path);
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, RemoteError> {
        let resp = self.client.get(self.document_url(path)).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp.json().await?)),
            status => Err(status_error(status, path)),
        }
    }

    async fn list(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<(String, Value)>, RemoteError> {
        let resp = self
            .client
            .get(self.url(&[user_id, collection.as_str()]))
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                let documents: Map<String, Value> = resp.json().await?;
                Ok(documents.into_iter().collect())
            }
            status => Err(status_error(status, format!("users/{}/{}", user_id, collection))),
        }
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), RemoteError> {
        let resp = self.client.delete(self.document_url(path)).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => {
                tracing::debug!("DELETE {}", path);
                Ok(())
            }
            status => Err(status_error(status, path)),
        }
    }
}
