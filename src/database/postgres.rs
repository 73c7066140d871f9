use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::store::{Document, StoreError, StudentStore};
use crate::filter::filter_where::parse_timestamp;
use crate::filter::{
    FieldKind, FilterOp, FilterOrderInfo, FilterPredicate, FilterValue, FilterWhereInfo,
    Projection, Scalar,
};
use crate::models::student::STUDENTS;
use crate::models::Student;

/// Unique index names, mapped back to the field they guard.
pub const UNIQUE_INDEXES: [(&str, &str); 2] = [
    ("students_student_id_unique", "studentId"),
    ("students_email_unique", "email"),
];

/// A typed bind parameter for generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Number(f64),
    Timestamp(DateTime<Utc>),
    TextArray(Vec<String>),
    Json(Value),
}

impl From<&Scalar> for SqlParam {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => SqlParam::Text(s.clone()),
            Scalar::Integer(i) => SqlParam::Integer(*i),
            Scalar::Number(n) => SqlParam::Number(*n),
            Scalar::Timestamp(t) => SqlParam::Timestamp(*t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Builds parameterised SQL for list queries over the students table.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    pub fn select(
        predicate: &FilterPredicate,
        projection: &Projection,
        order: &[FilterOrderInfo],
        skip: u64,
        take: u64,
    ) -> SqlResult {
        let mut builder = Self::default();
        let where_clause = builder.where_clause(predicate);
        let order_clause = Self::order_clause(order);
        let limit = builder.param(SqlParam::Integer(clamp_i64(take)));
        let offset = builder.param(SqlParam::Integer(clamp_i64(skip)));

        let query = format!(
            "SELECT json_strip_nulls(row_to_json(t)) AS doc FROM (SELECT {} FROM \"{}\"{}{} LIMIT {} OFFSET {}) t",
            Self::select_list(projection),
            STUDENTS,
            where_clause,
            order_clause,
            limit,
            offset
        );
        SqlResult { query, params: builder.params }
    }

    pub fn count(predicate: &FilterPredicate) -> SqlResult {
        let mut builder = Self::default();
        let where_clause = builder.where_clause(predicate);
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\"{}", STUDENTS, where_clause);
        SqlResult { query, params: builder.params }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn select_list(projection: &Projection) -> String {
        if projection.is_all() {
            return "*".to_string();
        }
        std::iter::once("id")
            .chain(projection.fields.iter().map(String::as_str).filter(|f| *f != "id"))
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn where_clause(&mut self, predicate: &FilterPredicate) -> String {
        if predicate.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = predicate
            .conditions
            .iter()
            .map(|c| self.condition(c))
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    fn condition(&mut self, info: &FilterWhereInfo) -> String {
        let column = column_expr(&info.column);
        match (&info.operator, &info.data) {
            (_, FilterValue::Literal(value)) => {
                format!("to_jsonb({}) = {}::jsonb", column, self.param(SqlParam::Json(value.clone())))
            }
            (FilterOp::In, FilterValue::List(items)) if info.kind == FieldKind::TextList => {
                let values = items.iter().map(scalar_text).collect();
                format!("{} && {}::text[]", column, self.param(SqlParam::TextArray(values)))
            }
            (FilterOp::In, FilterValue::List(items)) => {
                if items.is_empty() {
                    return "1=0".to_string();
                }
                let params: Vec<String> = items.iter().map(|item| self.param(item.into())).collect();
                format!("{} IN ({})", text_collated(&column, info.kind), params.join(", "))
            }
            (FilterOp::Eq, FilterValue::Scalar(scalar)) if info.kind == FieldKind::TextList => {
                format!("{} = ANY({})", self.param(scalar.into()), column)
            }
            (op, FilterValue::Scalar(scalar)) => {
                let sql_op = match op {
                    FilterOp::Gt => ">",
                    FilterOp::Gte => ">=",
                    FilterOp::Lt => "<",
                    FilterOp::Lte => "<=",
                    _ => "=",
                };
                format!("{} {} {}", text_collated(&column, info.kind), sql_op, self.param(scalar.into()))
            }
            (_, FilterValue::List(_)) => "1=0".to_string(),
        }
    }

    fn order_clause(order: &[FilterOrderInfo]) -> String {
        let mut parts: Vec<String> = order
            .iter()
            .map(|o| format!("{} {}", text_collated(&column_expr(&o.column), o.kind), o.sort.to_sql()))
            .collect();
        parts.push("\"id\" ASC".to_string());
        format!(" ORDER BY {}", parts.join(", "))
    }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn scalar_text(scalar: &Scalar) -> String {
    match scalar.to_json() {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `address.city` reads the JSONB member as text; `id` compares as text.
fn column_expr(column: &str) -> String {
    match column.split_once('.') {
        Some((object, member)) => format!(
            "({}->>'{}')",
            quote_identifier(object),
            member.replace('\'', "''")
        ),
        None if column == "id" => "\"id\"::text".to_string(),
        None => quote_identifier(column),
    }
}

/// Text compares bytewise so ordering matches the in-memory store.
fn text_collated(column: &str, kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => format!("{} COLLATE \"C\"", column),
        _ => column.to_string(),
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

fn bind_param(q: PgQuery<'_>, param: SqlParam) -> PgQuery<'_> {
    match param {
        SqlParam::Text(s) => q.bind(s),
        SqlParam::Integer(i) => q.bind(i),
        SqlParam::Number(n) => q.bind(n),
        SqlParam::Timestamp(t) => q.bind(t),
        SqlParam::TextArray(items) => q.bind(items),
        SqlParam::Json(v) => q.bind(Json(v)),
    }
}

/// Postgres-backed store. Uniqueness is enforced by the table's unique indexes.
#[derive(Debug, Clone)]
pub struct PgStudentStore {
    pool: PgPool,
}

impl PgStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Binds the client-writable columns in table order.
    fn bind_writable(q: PgQuery<'_>, student: Student) -> PgQuery<'_> {
        q.bind(student.student_id)
            .bind(student.first_name)
            .bind(student.last_name)
            .bind(student.email)
            .bind(student.course)
            .bind(student.enrollment_year)
            .bind(student.gpa)
            .bind(student.status.as_str())
            .bind(student.phone)
            .bind(student.address.map(Json))
            .bind(student.emergency_contact.map(Json))
            .bind(student.skills)
            .bind(student.notes)
    }
}

const INSERT_SQL: &str = r#"INSERT INTO "students" ("id", "createdAt", "studentId", "firstName", "lastName", "email", "course", "enrollmentYear", "gpa", "status", "phone", "address", "emergencyContact", "skills", "notes") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#;

const UPDATE_SQL: &str = r#"UPDATE "students" SET "studentId" = $2, "firstName" = $3, "lastName" = $4, "email" = $5, "course" = $6, "enrollmentYear" = $7, "gpa" = $8, "status" = $9, "phone" = $10, "address" = $11, "emergencyContact" = $12, "skills" = $13, "notes" = $14 WHERE "id" = $1"#;

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn count(&self, predicate: &FilterPredicate) -> Result<u64, StoreError> {
        let sql = SqlBuilder::count(predicate);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn find(
        &self,
        predicate: &FilterPredicate,
        projection: &Projection,
        order: &[FilterOrderInfo],
        skip: u64,
        take: u64,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = SqlBuilder::select(predicate, projection, order, skip, take);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let doc: Value = row.try_get("doc")?;
                into_document(doc)
            })
            .collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        let row = sqlx::query(
            r#"SELECT row_to_json(t) AS doc FROM (SELECT * FROM "students" WHERE "id" = $1) t"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let doc: Value = row.try_get("doc")?;
                Ok(Some(serde_json::from_value(doc)?))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, student: Student) -> Result<Student, StoreError> {
        let q = sqlx::query(INSERT_SQL).bind(student.id).bind(student.created_at);
        let q = Self::bind_writable(q, student.clone());
        q.execute(&self.pool).await.map_err(map_unique_violation)?;
        Ok(student)
    }

    async fn update_by_id(&self, id: Uuid, student: Student) -> Result<Student, StoreError> {
        let q = Self::bind_writable(sqlx::query(UPDATE_SQL).bind(id), student.clone());
        let result = q.execute(&self.pool).await.map_err(map_unique_violation)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(student)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(r#"DELETE FROM "students" WHERE "id" = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = db_err
                .constraint()
                .and_then(|c| UNIQUE_INDEXES.iter().find(|(name, _)| *name == c))
                .map(|(_, field)| field.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return StoreError::Conflict { field };
        }
    }
    StoreError::Sqlx(err)
}

/// `row_to_json` renders timestamps with an explicit offset; re-emit them
/// the way `Student` serializes so both stores return identical text.
fn into_document(doc: Value) -> Result<Document, StoreError> {
    let Value::Object(mut doc) = doc else {
        return Err(StoreError::Query("row_to_json returned a non-object".to_string()));
    };
    if let Some(Value::String(raw)) = doc.get("createdAt") {
        if let Some(t) = parse_timestamp(raw) {
            doc.insert(
                "createdAt".to_string(),
                Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
    }
    Ok(doc)
}
