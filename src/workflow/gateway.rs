//! I/O seams for the distribution form and the controller that drives them.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use thiserror::Error;
use tower::{Service, ServiceExt};

use super::{DistributionForm, Effect, Event, Notice};
use crate::types::{BookDistribution, ClassRoster, DistributionInput, SchoolLevel};
use crate::{distribution, loaders};

pub const DISTRIBUTION_PATH: &str = "/api/books/distribution";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Where the form gets the classes of a level from.
#[async_trait]
pub trait ClassSource: Send + Sync {
    async fn classes_for_level(&self, level: SchoolLevel) -> Result<Vec<ClassRoster>, GatewayError>;
}

/// Where a finished batch goes.
#[async_trait]
pub trait DistributionSink: Send + Sync {
    async fn submit(&self, batch: Vec<DistributionInput>) -> Result<Vec<BookDistribution>, GatewayError>;
}

/// In-process gateway straight over the pool.
#[derive(Clone)]
pub struct PoolGateway {
    pool: SqlitePool,
}

impl PoolGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClassSource for PoolGateway {
    async fn classes_for_level(&self, level: SchoolLevel) -> Result<Vec<ClassRoster>, GatewayError> {
        Ok(loaders::classes_by_level(&self.pool, level).await)
    }
}

#[async_trait]
impl DistributionSink for PoolGateway {
    async fn submit(&self, batch: Vec<DistributionInput>) -> Result<Vec<BookDistribution>, GatewayError> {
        distribution::reconcile(&self.pool, &batch).await.map_err(|e| GatewayError::Rejected(e.to_string()))
    }
}

/// Talks JSON to the HTTP API through any tower service, e.g. the axum router.
#[derive(Clone)]
pub struct HttpGateway<S> {
    service: S,
}

impl<S> HttpGateway<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: std::fmt::Display,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    async fn send(&self, request: Request<Body>) -> Result<Vec<u8>, GatewayError> {
        let response =
            self.service.clone().oneshot(request).await.map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?
            .to_bytes();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl<S> ClassSource for HttpGateway<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: std::fmt::Display,
{
    async fn classes_for_level(&self, level: SchoolLevel) -> Result<Vec<ClassRoster>, GatewayError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("/api/levels/{}/classes", level))
            .body(Body::empty())?;
        let bytes = self.send(request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl<S> DistributionSink for HttpGateway<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: std::fmt::Display,
{
    async fn submit(&self, batch: Vec<DistributionInput>) -> Result<Vec<BookDistribution>, GatewayError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(DISTRIBUTION_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&batch)?))?;
        let bytes = self.send(request).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Owns a [`DistributionForm`] and runs the effects its transitions ask for.
pub struct DistributionController<S, K> {
    source: S,
    sink: K,
    form: DistributionForm,
    notices: Vec<Notice>,
}

impl<S: ClassSource, K: DistributionSink> DistributionController<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self { source, sink, form: DistributionForm::new(), notices: Vec::new() }
    }

    pub fn form(&self) -> &DistributionForm {
        &self.form
    }

    /// Notices raised since the last call, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Applies `event` and keeps going until no effect is pending.
    pub async fn dispatch(&mut self, event: Event) {
        let mut pending = Some(event);
        while let Some(event) = pending.take() {
            let transition = std::mem::take(&mut self.form).apply(event);
            self.form = transition.state;
            self.notices.extend(transition.notices);

            pending = match transition.effect {
                Effect::None => None,
                Effect::FetchClasses(level) => Some(match self.source.classes_for_level(level).await {
                    Ok(classes) => Event::ClassesLoaded { level, classes },
                    Err(e) => {
                        tracing::warn!(%level, error = %e, "Loading classes failed");
                        Event::ClassesFailed { level }
                    }
                }),
                Effect::Submit(batch) => {
                    let size = batch.len();
                    Some(match self.sink.submit(batch).await {
                        Ok(rows) => {
                            tracing::info!(submitted = size, persisted = rows.len(), "Distribution batch accepted");
                            Event::SubmitSucceeded
                        }
                        Err(e) => {
                            tracing::warn!(submitted = size, error = %e, "Distribution batch rejected");
                            Event::SubmitFailed
                        }
                    })
                }
            };
        }
    }

    pub async fn choose_level(&mut self, level: SchoolLevel) {
        self.dispatch(Event::LevelChosen(level)).await
    }

    pub async fn choose_class(&mut self, class_id: &str) {
        self.dispatch(Event::ClassChosen(class_id.to_string())).await
    }

    pub async fn toggle_book(&mut self, book_id: &str) {
        self.dispatch(Event::BookToggled(book_id.to_string())).await
    }

    pub async fn toggle_cell(&mut self, student_id: &str, book_id: &str) {
        self.dispatch(Event::CellToggled { student_id: student_id.to_string(), book_id: book_id.to_string() })
            .await
    }

    pub async fn mark_all_received(&mut self) {
        self.dispatch(Event::MarkAllReceived).await
    }

    pub async fn submit(&mut self) {
        self.dispatch(Event::SubmitStarted).await
    }
}
