use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::store::{Document, StoreError, StudentStore};
use crate::config::AppConfig;
use crate::filter::{Filter, FilterError, PaginationMeta};
use crate::models::validate::{body_object, merge_patch, validate_student, ValidationError};
use crate::models::{Student, STUDENT_FIELDS};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Student not found with id of {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One page of list results.
#[derive(Debug, Clone, Serialize)]
pub struct StudentPage {
    pub count: usize,
    pub pagination: PaginationMeta,
    pub data: Vec<Document>,
}

/// Query execution and mutation guard over a `StudentStore`.
#[derive(Clone)]
pub struct StudentRepository {
    store: Arc<dyn StudentStore>,
    config: Arc<AppConfig>,
}

impl StudentRepository {
    pub fn new(store: Arc<dyn StudentStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn StudentStore> {
        &self.store
    }

    /// Compile the raw query string, count the matching records and fetch
    /// the requested page. Nothing is written.
    pub async fn list(&self, raw_query: Option<&str>) -> Result<StudentPage, RepositoryError> {
        let filter = Filter::from_query(raw_query, STUDENT_FIELDS, &self.config.query)?;
        let pagination = filter.pagination();

        let total = self
            .timed("count", self.store.count(filter.predicate()))
            .await?;
        let data = self
            .timed(
                "find",
                self.store.find(
                    filter.predicate(),
                    filter.projection(),
                    filter.order(),
                    pagination.skip(),
                    pagination.take(),
                ),
            )
            .await?;

        Ok(StudentPage {
            count: data.len(),
            pagination: pagination.metadata(total),
            data,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Student, RepositoryError> {
        self.lookup(id).await
    }

    pub async fn create(&self, body: Value) -> Result<Student, RepositoryError> {
        let doc = body_object(body)?;
        let student = Student::create(validate_student(&doc)?);
        let created = self.timed("insert", self.store.insert(student)).await?;
        tracing::info!(id = %created.id, student_id = %created.student_id, "created student");
        Ok(created)
    }

    /// Lookup, merge the patch over the stored record, re-validate the
    /// whole record, then write it back.
    pub async fn update(&self, id: &str, body: Value) -> Result<Student, RepositoryError> {
        let current = self.lookup(id).await?;
        self.apply_update(current, body).await
    }

    /// Second half of `update` for callers that already hold the record.
    pub async fn apply_update(&self, current: Student, body: Value) -> Result<Student, RepositoryError> {
        let patch = body_object(body)?;
        let merged = merge_patch(&current, patch)?;
        let draft = validate_student(&merged)?;

        let id = current.id;
        let updated = self
            .timed("update", self.store.update_by_id(id, current.with_draft(draft)))
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => RepositoryError::NotFound(id.to_string()),
                other => RepositoryError::Store(other),
            })?;
        tracing::info!(id = %updated.id, "updated student");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let current = self.lookup(id).await?;
        self.timed("delete", self.store.delete_by_id(current.id))
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => RepositoryError::NotFound(id.to_string()),
                other => RepositoryError::Store(other),
            })?;
        tracing::info!(id = %current.id, "deleted student");
        Ok(())
    }

    /// A malformed id can never match a record, so it is reported as not found.
    async fn lookup(&self, id: &str) -> Result<Student, RepositoryError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Err(RepositoryError::NotFound(id.to_string()));
        };
        self.timed("find_by_id", self.store.find_by_id(uuid))
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed().as_millis() as u64;

        let database = &self.config.database;
        if database.enable_slow_query_warning && elapsed > database.slow_query_threshold_ms {
            tracing::warn!("Slow store call {}: {}ms", operation, elapsed);
        }
        if let Err(e) = &result {
            tracing::debug!("store call {} failed: {}", operation, e);
        }
        result
    }
}
