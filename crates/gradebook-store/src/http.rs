//! Remote document API store.
//!
//! Speaks JSON over HTTP:
//!
//! | call            | request                                   |
//! |-----------------|-------------------------------------------|
//! | `list_by_owner` | `GET /evaluations?owner_id=<id>`          |
//! | `list_all`      | `GET /evaluations`                        |
//! | `get`           | `GET /evaluations/{id}`                   |
//! | `insert`        | `POST /evaluations`                       |
//! | `update`        | `PUT /evaluations/{id}`, `If-Match: <version>` |
//! | `delete`        | `DELETE /evaluations/{id}`                |
//!
//! `POST` and `PUT` answer with the stored record; the server owns the
//! version bump on `PUT`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::IF_MATCH;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::instrument;

use gradebook_core::error::StoreError;
use gradebook_core::model::EvaluationRecord;
use gradebook_core::traits::EvaluationStore;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An `EvaluationStore` backed by a remote document API.
pub struct HttpStore {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/evaluations", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/evaluations/{id}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Unavailable(format!("request timed out after {}s", self.timeout_secs))
            } else if e.is_connect() {
                StoreError::Unavailable(format!("store not reachable at {}", self.base_url))
            } else {
                StoreError::Unavailable(e.to_string())
            }
        })
    }

    async fn rejected(response: Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status, %message, "store rejected request");
        StoreError::Rejected { status, message }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Corrupt(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl EvaluationStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        let response = self
            .send(self.client.post(self.collection_url()).json(&record))
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::AlreadyExists(record.id)),
            s if s.is_success() => Self::parse(response).await,
            _ => Err(Self::rejected(response).await),
        }
    }

    #[instrument(skip(self, record), fields(id = %record.id, version = record.version))]
    async fn update(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        let request = self
            .client
            .put(self.record_url(&record.id))
            .header(IF_MATCH, record.version.to_string())
            .json(&record);
        let response = self.send(request).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(record.id)),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Err(StoreError::Conflict {
                id: record.id,
                expected: record.version,
            }),
            s if s.is_success() => Self::parse(response).await,
            _ => Err(Self::rejected(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError> {
        let response = self.send(self.client.get(self.record_url(id))).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Self::parse(response).await.map(Some),
            _ => Err(Self::rejected(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self.send(self.client.delete(self.record_url(id))).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            s if s.is_success() => Ok(()),
            _ => Err(Self::rejected(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
        let mut url = Url::parse(&self.collection_url())
            .map_err(|e| StoreError::Unavailable(format!("invalid store URL: {e}")))?;
        url.query_pairs_mut().append_pair("owner_id", owner_id);

        let response = self.send(self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Self::parse(response).await
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        let response = self.send(self.client.get(self.collection_url())).await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gradebook_core::model::EvaluationPolicy;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: &str, version: u64) -> EvaluationRecord {
        EvaluationRecord {
            id: id.into(),
            owner_id: "student-1".into(),
            author_id: None,
            timestamp: Utc::now(),
            subject_name: "Math".into(),
            student_name: "Ana".into(),
            policy: EvaluationPolicy::TasksOnly,
            result_text: String::new(),
            average: 8.0,
            tasks: vec![],
            exam_scores: vec![],
            task_weight_fraction: None,
            version,
        }
    }

    fn store(server: &MockServer, api_key: Option<&str>) -> HttpStore {
        HttpStore::new(&server.uri(), api_key.map(String::from), Some(5)).unwrap()
    }

    #[tokio::test]
    async fn list_by_owner_sends_query_and_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/evaluations"))
            .and(query_param("owner_id", "student-1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(vec![record("a", 1), record("b", 2)]),
            )
            .mount(&server)
            .await;

        let records = store(&server, Some("secret"))
            .list_by_owner("student-1")
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].version, 2);
    }

    #[tokio::test]
    async fn get_missing_record_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/evaluations/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(store(&server, None).get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_conflict_is_already_exists() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/evaluations"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let err = store(&server, None).insert(record("a", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "a"));
    }

    #[tokio::test]
    async fn update_sends_if_match_and_returns_stored_record() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/evaluations/a"))
            .and(header("if-match", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record("a", 4)))
            .mount(&server)
            .await;

        let saved = store(&server, None).update(record("a", 3)).await.unwrap();
        assert_eq!(saved.version, 4);
    }

    #[tokio::test]
    async fn precondition_failed_is_conflict() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/evaluations/a"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let err = store(&server, None).update(record("a", 3)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/evaluations/a"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = store(&server, None).delete("a").await.unwrap_err();
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_corrupt() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/evaluations"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = store(&server, None).list_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let store = HttpStore::new(&uri, None, Some(1)).unwrap();
        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
