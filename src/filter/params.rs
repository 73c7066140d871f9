use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::error::FilterError;

/// Query keys that steer the query instead of filtering it.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// A query parameter value after bracket expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    List(Vec<String>),
    Map(ParamMap),
}

pub type ParamMap = BTreeMap<String, Param>;

impl Param {
    pub fn to_json(&self) -> Value {
        match self {
            Param::Text(s) => Value::String(s.clone()),
            Param::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Param::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

/// `select`, `sort`, `page` and `limit`, pulled out of the filter candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservedParams {
    pub select: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Parsed query string, e.g. `gpa[gte]=3.5&status=Active&sort=-gpa`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: ParamMap,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Append,
}

impl QueryParams {
    /// Expand `application/x-www-form-urlencoded` pairs into a tree.
    /// `a[b]=1` nests, `a[]=1` and repeated keys collect into a list.
    pub fn parse(raw: &str, max_depth: usize) -> Result<Self, FilterError> {
        let mut params = ParamMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            let (base, segments) = parse_key(&key)?;
            if segments.len() > max_depth {
                return Err(FilterError::malformed(format!(
                    "'{}' is nested deeper than {} level(s)",
                    key, max_depth
                )));
            }
            insert(&mut params, base, &segments, value.into_owned(), &key)?;
        }
        Ok(Self { params })
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.get(key)
    }

    /// Partition into filter candidates and reserved directives. Matching
    /// is exact and case-sensitive.
    pub fn split_reserved(mut self) -> Result<(ParamMap, ReservedParams), FilterError> {
        let select = take_reserved(&mut self.params, "select")?.map(|v| v.join(","));
        let sort = take_reserved(&mut self.params, "sort")?.map(|v| v.join(","));
        let page = take_reserved(&mut self.params, "page")?.and_then(|v| v.into_iter().next());
        let limit = take_reserved(&mut self.params, "limit")?.and_then(|v| v.into_iter().next());

        Ok((self.params, ReservedParams { select, sort, page, limit }))
    }
}

fn take_reserved(params: &mut ParamMap, key: &str) -> Result<Option<Vec<String>>, FilterError> {
    match params.remove(key) {
        None => Ok(None),
        Some(Param::Text(s)) => Ok(Some(vec![s])),
        Some(Param::List(items)) => Ok(Some(items)),
        Some(Param::Map(_)) => Err(FilterError::malformed(format!(
            "'{}' does not accept nested parameters",
            key
        ))),
    }
}

fn parse_key(key: &str) -> Result<(String, Vec<Segment>), FilterError> {
    let Some(open) = key.find('[') else {
        if key.contains(']') {
            return Err(FilterError::malformed(format!("unbalanced ']' in '{}'", key)));
        }
        return Ok((key.to_string(), vec![]));
    };

    let base = &key[..open];
    if base.is_empty() || base.contains(']') {
        return Err(FilterError::malformed(format!("missing field name in '{}'", key)));
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(|| {
            FilterError::malformed(format!("unexpected text after ']' in '{}'", key))
        })?;
        let close = inner
            .find(']')
            .ok_or_else(|| FilterError::malformed(format!("unclosed '[' in '{}'", key)))?;
        let name = &inner[..close];
        if name.contains('[') {
            return Err(FilterError::malformed(format!("unclosed '[' in '{}'", key)));
        }
        segments.push(if name.is_empty() {
            Segment::Append
        } else {
            Segment::Key(name.to_string())
        });
        rest = &inner[close + 1..];
    }

    if segments[..segments.len() - 1].contains(&Segment::Append) {
        return Err(FilterError::malformed(format!("'[]' must be the last segment in '{}'", key)));
    }

    Ok((base.to_string(), segments))
}

fn insert(
    map: &mut ParamMap,
    key: String,
    segments: &[Segment],
    value: String,
    full_key: &str,
) -> Result<(), FilterError> {
    let conflict = || {
        FilterError::malformed(format!(
            "'{}' mixes a plain value with nested parameters",
            full_key
        ))
    };

    match segments.split_first() {
        Some((Segment::Key(next), rest)) => {
            let entry = map.entry(key).or_insert_with(|| Param::Map(ParamMap::new()));
            match entry {
                Param::Map(inner) => insert(inner, next.clone(), rest, value, full_key),
                _ => Err(conflict()),
            }
        }
        leaf => {
            let append = matches!(leaf, Some((Segment::Append, _)));
            match map.get_mut(&key) {
                None if append => {
                    map.insert(key, Param::List(vec![value]));
                }
                None => {
                    map.insert(key, Param::Text(value));
                }
                Some(slot @ Param::Text(_)) => {
                    if let Param::Text(first) = std::mem::replace(slot, Param::List(vec![])) {
                        *slot = Param::List(vec![first, value]);
                    }
                }
                Some(Param::List(items)) => items.push(value),
                Some(Param::Map(_)) => return Err(conflict()),
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<QueryParams, FilterError> {
        QueryParams::parse(raw, 4)
    }

    #[test]
    fn parses_plain_and_bracketed_keys() {
        let params = parse("status=Active&gpa[gte]=3.5&gpa[lte]=4").unwrap();
        assert_eq!(params.get("status"), Some(&Param::Text("Active".into())));

        let Some(Param::Map(gpa)) = params.get("gpa") else { panic!("gpa should be nested") };
        assert_eq!(gpa.get("gte"), Some(&Param::Text("3.5".into())));
        assert_eq!(gpa.get("lte"), Some(&Param::Text("4".into())));
    }

    #[test]
    fn decodes_percent_encoded_brackets() {
        let params = parse("gpa%5Bgt%5D=2&course=Computer+Science").unwrap();
        assert!(matches!(params.get("gpa"), Some(Param::Map(_))));
        assert_eq!(params.get("course"), Some(&Param::Text("Computer Science".into())));
    }

    #[test]
    fn repeated_and_appended_keys_become_lists() {
        let params = parse("status[in]=Active&status[in]=Graduated&skills[]=rust").unwrap();
        let Some(Param::Map(status)) = params.get("status") else { panic!() };
        assert_eq!(
            status.get("in"),
            Some(&Param::List(vec!["Active".into(), "Graduated".into()]))
        );
        assert_eq!(params.get("skills"), Some(&Param::List(vec!["rust".into()])));
    }

    #[test]
    fn rejects_malformed_brackets() {
        for raw in ["gpa[gte=3", "gpa]=3", "[gt]=3", "gpa[gt]x=3", "a[][b]=1", "a[b[c]]=1"] {
            assert!(
                matches!(parse(raw), Err(FilterError::MalformedFilter(_))),
                "expected malformed for {}",
                raw
            );
        }
    }

    #[test]
    fn rejects_conflicting_shapes() {
        assert!(parse("gpa=3&gpa[gt]=2").is_err());
        assert!(parse("gpa[gt]=2&gpa=3").is_err());
    }

    #[test]
    fn enforces_nesting_depth() {
        assert!(QueryParams::parse("a[b][c]=1", 2).is_ok());
        assert!(QueryParams::parse("a[b][c][d]=1", 2).is_err());
    }

    #[test]
    fn splits_reserved_keys_exactly() {
        let params = parse("select=firstName&sort=-gpa&page=2&limit=5&Page=9&course=CS").unwrap();
        let (filters, reserved) = params.split_reserved().unwrap();

        assert_eq!(reserved.select.as_deref(), Some("firstName"));
        assert_eq!(reserved.sort.as_deref(), Some("-gpa"));
        assert_eq!(reserved.page.as_deref(), Some("2"));
        assert_eq!(reserved.limit.as_deref(), Some("5"));
        for key in RESERVED_KEYS {
            assert!(!filters.contains_key(key));
        }
        assert!(filters.contains_key("Page"));
        assert!(filters.contains_key("course"));
    }

    #[test]
    fn repeated_reserved_values_are_joined_or_first_wins() {
        let (_, reserved) = parse("select=firstName&select=email&page=3&page=7")
            .unwrap()
            .split_reserved()
            .unwrap();
        assert_eq!(reserved.select.as_deref(), Some("firstName,email"));
        assert_eq!(reserved.page.as_deref(), Some("3"));
    }

    #[test]
    fn nested_reserved_key_is_malformed() {
        let params = parse("sort[gpa]=1").unwrap();
        assert!(matches!(params.split_reserved(), Err(FilterError::MalformedFilter(_))));
    }
}
