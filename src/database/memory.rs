use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{project, Document, StoreError, StudentStore};
use crate::filter::filter_where::parse_timestamp;
use crate::filter::{
    FieldKind, FilterOp, FilterOrderInfo, FilterPredicate, FilterValue, FilterWhereInfo,
    Projection, Scalar, SortDirection,
};
use crate::models::Student;

/// Process-local store. Writes hold the lock across the uniqueness check
/// and the mutation, so `studentId`/`email` uniqueness is exact.
#[derive(Debug, Default)]
pub struct MemoryStudentStore {
    students: RwLock<Vec<Student>>,
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_students(students: Vec<Student>) -> Self {
        Self {
            students: RwLock::new(students),
        }
    }

    async fn documents(&self, predicate: &FilterPredicate) -> Result<Vec<Document>, StoreError> {
        let students = self.students.read().await;
        let mut out = Vec::new();
        for student in students.iter() {
            let doc = to_document(student)?;
            if matches(&doc, predicate) {
                out.push(doc);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn count(&self, predicate: &FilterPredicate) -> Result<u64, StoreError> {
        Ok(self.documents(predicate).await?.len() as u64)
    }

    async fn find(
        &self,
        predicate: &FilterPredicate,
        projection: &Projection,
        order: &[FilterOrderInfo],
        skip: u64,
        take: u64,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.documents(predicate).await?;
        docs.sort_by(|a, b| compare_documents(a, b, order));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        Ok(docs
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| project(doc, projection))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        let students = self.students.read().await;
        Ok(students.iter().find(|s| s.id == id).cloned())
    }

    async fn insert(&self, student: Student) -> Result<Student, StoreError> {
        let mut students = self.students.write().await;
        if let Some(field) = unique_conflict(&students, &student) {
            return Err(StoreError::Conflict { field: field.to_string() });
        }
        students.push(student.clone());
        Ok(student)
    }

    async fn update_by_id(&self, id: Uuid, student: Student) -> Result<Student, StoreError> {
        let mut students = self.students.write().await;
        if let Some(field) = unique_conflict(&students, &student) {
            return Err(StoreError::Conflict { field: field.to_string() });
        }
        let slot = students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound(id))?;
        *slot = student.clone();
        Ok(student)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        let mut students = self.students.write().await;
        let index = students
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::NotFound(id))?;
        students.remove(index);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn to_document(student: &Student) -> Result<Document, StoreError> {
    match serde_json::to_value(student)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Query(format!("student serialized to {}", other))),
    }
}

/// Unique field already held by another record.
fn unique_conflict(students: &[Student], candidate: &Student) -> Option<&'static str> {
    let others = || students.iter().filter(|s| s.id != candidate.id);
    if others().any(|s| s.student_id == candidate.student_id) {
        return Some("studentId");
    }
    if others().any(|s| s.email == candidate.email) {
        return Some("email");
    }
    None
}

/// Resolve a possibly dotted column; JSON null counts as absent.
fn lookup<'a>(doc: &'a Document, column: &str) -> Option<&'a Value> {
    let mut parts = column.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current).filter(|v| !v.is_null())
}

fn matches(doc: &Document, predicate: &FilterPredicate) -> bool {
    predicate.conditions.iter().all(|c| matches_condition(doc, c))
}

fn matches_condition(doc: &Document, condition: &FilterWhereInfo) -> bool {
    let Some(value) = lookup(doc, &condition.column) else {
        return false;
    };

    match (&condition.operator, &condition.data) {
        (_, FilterValue::Literal(literal)) => value == literal,
        (FilterOp::In, FilterValue::List(items)) => {
            items.iter().any(|item| scalar_eq(value, item, condition.kind))
        }
        (FilterOp::Eq, FilterValue::Scalar(scalar)) => scalar_eq(value, scalar, condition.kind),
        (op, FilterValue::Scalar(scalar)) => match compare_scalar(value, scalar) {
            Some(ordering) => match op {
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Gte => ordering != Ordering::Less,
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Lte => ordering != Ordering::Greater,
                _ => false,
            },
            None => false,
        },
        _ => false,
    }
}

/// List fields match when any element equals the scalar.
fn scalar_eq(value: &Value, scalar: &Scalar, kind: FieldKind) -> bool {
    match (kind, value) {
        (FieldKind::TextList, Value::Array(items)) => items
            .iter()
            .any(|item| compare_scalar(item, scalar) == Some(Ordering::Equal)),
        _ => compare_scalar(value, scalar) == Some(Ordering::Equal),
    }
}

fn compare_scalar(value: &Value, scalar: &Scalar) -> Option<Ordering> {
    match scalar {
        Scalar::Text(text) => Some(value.as_str()?.cmp(text.as_str())),
        Scalar::Integer(i) => Some(value.as_i64()?.cmp(i)),
        Scalar::Number(n) => value.as_f64()?.partial_cmp(n),
        Scalar::Timestamp(t) => Some(parse_timestamp(value.as_str()?)?.cmp(t)),
    }
}

fn compare_documents(a: &Document, b: &Document, order: &[FilterOrderInfo]) -> Ordering {
    for info in order {
        let ordering = compare_values(lookup(a, &info.column), lookup(b, &info.column), info.kind);
        let ordering = match info.sort {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    compare_values(lookup(a, "id"), lookup(b, "id"), FieldKind::Text)
}

/// Absent values sort before present ones.
fn compare_values(a: Option<&Value>, b: Option<&Value>, kind: FieldKind) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let ordering = match kind {
                FieldKind::Integer | FieldKind::Number => {
                    a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
                }
                FieldKind::Timestamp => a
                    .as_str()
                    .and_then(parse_timestamp)
                    .zip(b.as_str().and_then(parse_timestamp))
                    .map(|(a, b)| a.cmp(&b)),
                _ => a.as_str().zip(b.as_str()).map(|(a, b)| a.cmp(b)),
            };
            ordering.unwrap_or(Ordering::Equal)
        }
    }
}
