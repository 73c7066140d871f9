use super::error::FilterError;
use super::params::{Param, ParamMap};

/// Short operator names accepted in bracket syntax (`gpa[gte]=3.5`).
pub const OPERATOR_TOKENS: [&str; 5] = ["gt", "gte", "lt", "lte", "in"];

/// Rewrite operator keys at any depth to their `$`-prefixed form.
///
/// Only whole keys are rewritten: `gte` becomes `$gte` but `gtex`, `ingest`
/// or `status` are left alone, and values are never touched. Keys that
/// already carry the `$` prefix are rejected so clients cannot reach
/// operators the translator does not emit.
pub fn translate_operators(params: ParamMap) -> Result<ParamMap, FilterError> {
    translate_map(params)
}

fn translate_map(map: ParamMap) -> Result<ParamMap, FilterError> {
    let mut out = ParamMap::new();
    for (key, value) in map {
        if key.starts_with('$') {
            return Err(FilterError::malformed(format!("'{}' is not a valid parameter name", key)));
        }
        let key = if OPERATOR_TOKENS.contains(&key.as_str()) {
            format!("${}", key)
        } else {
            key
        };
        let value = match value {
            Param::Map(inner) => Param::Map(translate_map(inner)?),
            other => other,
        };
        out.insert(key, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::params::QueryParams;

    fn translate(raw: &str) -> Result<ParamMap, FilterError> {
        let (filters, _) = QueryParams::parse(raw, 4)?.split_reserved()?;
        translate_operators(filters)
    }

    #[test]
    fn prefixes_every_operator_token() {
        let out = translate("gpa[gt]=1&gpa[gte]=2&gpa[lt]=3&gpa[lte]=4&status[in]=Active").unwrap();
        let Some(Param::Map(gpa)) = out.get("gpa") else { panic!() };
        for op in ["$gt", "$gte", "$lt", "$lte"] {
            assert!(gpa.contains_key(op), "missing {}", op);
        }
        let Some(Param::Map(status)) = out.get("status") else { panic!() };
        assert_eq!(status.get("$in"), Some(&Param::Text("Active".into())));
    }

    #[test]
    fn leaves_longer_tokens_and_values_alone() {
        let out = translate("address[inbox]=x&notes[gtx]=gt&ingest=lte").unwrap();
        let Some(Param::Map(address)) = out.get("address") else { panic!() };
        assert!(address.contains_key("inbox"));
        let Some(Param::Map(notes)) = out.get("notes") else { panic!() };
        assert_eq!(notes.get("gtx"), Some(&Param::Text("gt".into())));
        assert_eq!(out.get("ingest"), Some(&Param::Text("lte".into())));
    }

    #[test]
    fn rewrites_top_level_tokens_too() {
        let out = translate("in=1").unwrap();
        assert!(out.contains_key("$in"));
        assert!(!out.contains_key("in"));
    }

    #[test]
    fn rewrites_at_depth() {
        let out = translate("address[city][in]=Paris").unwrap();
        let Some(Param::Map(address)) = out.get("address") else { panic!() };
        let Some(Param::Map(city)) = address.get("city") else { panic!() };
        assert!(city.contains_key("$in"));
    }

    #[test]
    fn rejects_client_supplied_dollar_keys() {
        assert!(matches!(translate("gpa[$gt]=1"), Err(FilterError::MalformedFilter(_))));
        assert!(matches!(translate("$where=1"), Err(FilterError::MalformedFilter(_))));
    }
}
