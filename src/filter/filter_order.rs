use super::error::FilterError;
use super::types::{lookup_field, FieldDef, FieldKind, FilterOrderInfo, SortDirection};

/// Field used when the client does not ask for an order.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `sort=-enrollmentYear,firstName`. A leading `-` sorts
    /// descending; left-to-right order is tie-break priority.
    pub fn parse(sort: Option<&str>, fields: &[FieldDef]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out: Vec<FilterOrderInfo> = Vec::new();
        for part in sort.unwrap_or_default().split(',') {
            let trimmed = part.trim();
            let (name, sort) = match trimmed.strip_prefix('-') {
                Some(rest) => (rest.trim(), SortDirection::Desc),
                None => (trimmed, SortDirection::Asc),
            };
            if name.is_empty() || out.iter().any(|o| o.column == name) {
                continue;
            }
            let field = lookup_field(fields, name)
                .filter(|f| f.sortable)
                .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
            out.push(FilterOrderInfo {
                column: field.name.to_string(),
                kind: field.kind,
                sort,
            });
        }

        if out.is_empty() {
            out.push(Self::default_order(fields));
        }
        Ok(out)
    }

    fn default_order(fields: &[FieldDef]) -> FilterOrderInfo {
        let kind = lookup_field(fields, DEFAULT_SORT_FIELD)
            .map(|f| f.kind)
            .unwrap_or(FieldKind::Timestamp);
        FilterOrderInfo {
            column: DEFAULT_SORT_FIELD.to_string(),
            kind,
            sort: SortDirection::Desc,
        }
    }
}
