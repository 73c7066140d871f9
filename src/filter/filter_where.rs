use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use super::error::FilterError;
use super::params::{Param, ParamMap};
use super::types::{
    lookup_field, FieldDef, FieldKind, FilterOp, FilterPredicate, FilterValue, FilterWhereInfo,
    Scalar,
};

pub struct FilterWhere;

impl FilterWhere {
    /// Build the predicate from operator-translated filter candidates.
    ///
    /// Field names must be filterable members of `fields`. Plain values
    /// become equality, `$`-operator maps become one condition per
    /// operator, and maps without operators are compared literally.
    pub fn build(candidates: ParamMap, fields: &[FieldDef]) -> Result<FilterPredicate, FilterError> {
        let mut conditions = Vec::new();
        for (key, value) in candidates {
            if key.starts_with('$') {
                return Err(FilterError::malformed(format!(
                    "operator '{}' must follow a field name",
                    key
                )));
            }
            let field = lookup_field(fields, &key)
                .filter(|f| f.filterable)
                .ok_or_else(|| FilterError::UnknownField(key.clone()))?;
            Self::parse_field_condition(field, value, &mut conditions)?;
        }
        Ok(FilterPredicate { conditions })
    }

    fn parse_field_condition(
        field: &FieldDef,
        value: Param,
        out: &mut Vec<FilterWhereInfo>,
    ) -> Result<(), FilterError> {
        match value {
            Param::Text(text) => out.push(Self::equality(field, &text)?),
            Param::List(_) => out.push(Self::info(field, FilterOp::Eq, FilterValue::Literal(value.to_json()))),
            Param::Map(map) => {
                let operator_keys = map.keys().filter(|k| k.starts_with('$')).count();
                if operator_keys == 0 {
                    // Unknown operators stay as a literal object comparison
                    let literal = Param::Map(map).to_json();
                    out.push(Self::info(field, FilterOp::Eq, FilterValue::Literal(literal)));
                } else if operator_keys != map.len() {
                    return Err(FilterError::malformed(format!(
                        "'{}' mixes operators with plain keys",
                        field.name
                    )));
                } else {
                    for (op_key, op_value) in map {
                        let operator = FilterOp::from_key(&op_key).ok_or_else(|| {
                            FilterError::UnsupportedOperator {
                                field: field.name.to_string(),
                                operator: op_key.clone(),
                            }
                        })?;
                        out.push(Self::operator_condition(field, operator, op_value)?);
                    }
                }
            }
        }
        Ok(())
    }

    fn equality(field: &FieldDef, text: &str) -> Result<FilterWhereInfo, FilterError> {
        let data = match field.kind {
            FieldKind::Object => FilterValue::Literal(Value::String(text.to_string())),
            _ => FilterValue::Scalar(coerce(field, text)?),
        };
        Ok(Self::info(field, FilterOp::Eq, data))
    }

    fn operator_condition(
        field: &FieldDef,
        operator: FilterOp,
        value: Param,
    ) -> Result<FilterWhereInfo, FilterError> {
        let unsupported = || FilterError::UnsupportedOperator {
            field: field.name.to_string(),
            operator: format!("{:?}", operator).to_lowercase(),
        };

        match operator {
            FilterOp::Eq => match value {
                Param::Text(text) => Self::equality(field, &text),
                other => Ok(Self::info(field, operator, FilterValue::Literal(other.to_json()))),
            },
            FilterOp::In => {
                if field.kind == FieldKind::Object {
                    return Err(unsupported());
                }
                let items = match value {
                    Param::Text(text) => vec![text],
                    Param::List(items) => items,
                    Param::Map(_) => {
                        return Err(FilterError::invalid_value(field.name, "expected a list of values"))
                    }
                };
                let values = items
                    .iter()
                    .map(|item| coerce(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::info(field, operator, FilterValue::List(values)))
            }
            _ => {
                if !field.kind.is_scalar() {
                    return Err(unsupported());
                }
                let Param::Text(text) = value else {
                    return Err(FilterError::invalid_value(field.name, "expected a single value"));
                };
                Ok(Self::info(field, operator, FilterValue::Scalar(coerce(field, &text)?)))
            }
        }
    }

    fn info(field: &FieldDef, operator: FilterOp, data: FilterValue) -> FilterWhereInfo {
        FilterWhereInfo {
            column: field.name.to_string(),
            kind: field.kind,
            operator,
            data,
        }
    }
}

/// Coerce query text to the field's scalar type. List fields compare
/// against their text elements.
pub fn coerce(field: &FieldDef, text: &str) -> Result<Scalar, FilterError> {
    let invalid = || FilterError::invalid_value(field.name, text);
    let trimmed = text.trim();

    Ok(match field.kind {
        FieldKind::Text | FieldKind::TextList | FieldKind::Object => Scalar::Text(text.to_string()),
        FieldKind::Integer => match trimmed.parse::<i64>() {
            Ok(i) => Scalar::Integer(i),
            Err(_) => {
                let n: f64 = trimmed.parse().map_err(|_| invalid())?;
                // i64::MAX as f64 is 2^63, outside the range
                if n.fract() != 0.0 || !(n >= i64::MIN as f64 && n < i64::MAX as f64) {
                    return Err(invalid());
                }
                Scalar::Integer(n as i64)
            }
        },
        FieldKind::Number => {
            let n: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !n.is_finite() {
                return Err(invalid());
            }
            Scalar::Number(n)
        }
        FieldKind::Timestamp => Scalar::Timestamp(parse_timestamp(trimmed).ok_or_else(invalid)?),
    })
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}
