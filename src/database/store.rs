use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{FilterOrderInfo, FilterPredicate, Projection};
use crate::models::Student;

/// A (possibly projected) record as returned by list queries.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Duplicate value for unique field '{field}'")]
    Conflict { field: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Persistence collaborator for student records.
///
/// `find` and `count` take the same predicate so pagination totals stay
/// consistent with the page contents.
#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn count(&self, predicate: &FilterPredicate) -> Result<u64, StoreError>;

    async fn find(
        &self,
        predicate: &FilterPredicate,
        projection: &Projection,
        order: &[FilterOrderInfo],
        skip: u64,
        take: u64,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>, StoreError>;

    /// Fails with `Conflict` when `studentId` or `email` is already taken.
    async fn insert(&self, student: Student) -> Result<Student, StoreError>;

    async fn update_by_id(&self, id: Uuid, student: Student) -> Result<Student, StoreError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Keep `id` plus the requested top-level fields. An empty projection keeps everything.
pub fn project(mut doc: Document, projection: &Projection) -> Document {
    if projection.is_all() {
        return doc;
    }
    let mut out = Document::new();
    if let Some(id) = doc.remove("id") {
        out.insert("id".to_string(), id);
    }
    for field in &projection.fields {
        if let Some(value) = doc.remove(field) {
            out.insert(field.clone(), value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_always_keeps_id() {
        let Value::Object(doc) = json!({ "id": "1", "firstName": "Ada", "email": "a@b.io" }) else {
            unreachable!()
        };
        let projected = project(doc.clone(), &Projection { fields: vec!["email".into()] });
        assert_eq!(Value::Object(projected), json!({ "id": "1", "email": "a@b.io" }));
        assert_eq!(project(doc.clone(), &Projection::default()), doc);
    }

    #[test]
    fn projection_skips_absent_fields() {
        let Value::Object(doc) = json!({ "id": "1" }) else { unreachable!() };
        let projected = project(doc, &Projection { fields: vec!["gpa".into()] });
        assert_eq!(Value::Object(projected), json!({ "id": "1" }));
    }
}
