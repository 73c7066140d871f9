use super::error::FilterError;
use super::types::{lookup_field, FieldDef, Projection};

pub struct FilterSelect;

impl FilterSelect {
    /// Parse `select=firstName,lastName` into an ordered, de-duplicated
    /// projection. Absent or blank input selects every field.
    pub fn parse(select: Option<&str>, fields: &[FieldDef]) -> Result<Projection, FilterError> {
        let mut out: Vec<String> = Vec::new();
        for part in select.unwrap_or_default().split(',') {
            let name = part.trim();
            if name.is_empty() || out.iter().any(|f| f == name) {
                continue;
            }
            lookup_field(fields, name)
                .filter(|f| f.selectable)
                .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
            out.push(name.to_string());
        }
        Ok(Projection { fields: out })
    }
}
