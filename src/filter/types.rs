use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators a store adapter must be able to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,
    #[serde(rename = "$in")] In,
}

impl FilterOp {
    /// Map a translated (`$`-prefixed) operator key to its operator.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            _ => return None,
        })
    }
}

/// Storage kind of a resource field; drives value coercion and which
/// operators make sense for the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Timestamp,
    TextList,
    Object,
}

impl FieldKind {
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, FieldKind::TextList | FieldKind::Object)
    }
}

/// One entry of a resource's field catalog.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Wire name; dotted for nested object members (`address.city`).
    pub name: &'static str,
    pub kind: FieldKind,
    pub filterable: bool,
    pub sortable: bool,
    pub selectable: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            filterable: true,
            sortable: kind.is_scalar(),
            selectable: true,
        }
    }

    /// Member of an object field: filterable and sortable, not selectable on its own.
    pub const fn nested(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            filterable: true,
            sortable: true,
            selectable: false,
        }
    }
}

pub fn lookup_field<'a>(fields: &'a [FieldDef], name: &str) -> Option<&'a FieldDef> {
    fields.iter().find(|f| f.name == name)
}

/// A typed value coerced from query text according to the field kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Integer(i) => Value::from(*i),
            Scalar::Number(n) => Value::from(*n),
            Scalar::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    /// Uncoerced structure compared by exact equality (unknown operator
    /// objects, repeated plain values).
    Literal(Value),
}

/// A single `field op value` triple of the predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub kind: FieldKind,
    pub operator: FilterOp,
    pub data: FilterValue,
}

/// Store-agnostic conjunction of conditions; empty matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPredicate {
    pub conditions: Vec<FilterWhereInfo>,
}

impl FilterPredicate {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC NULLS FIRST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub kind: FieldKind,
    pub sort: SortDirection,
}

/// Fields to return; empty means the whole record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub fields: Vec<String>,
}

impl Projection {
    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }
}
