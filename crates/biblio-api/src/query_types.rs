//! Custom query parameter types with lenient parsing.
//!
//! The graph endpoint is deliberately forgiving about its query string: a
//! malformed limit falls back to the default instead of failing the
//! request, and boolean toggles follow a presence contract rather than
//! strict parsing. These wrappers keep that leniency out of the handlers.

use serde::{Deserialize, Deserializer};

/// A display toggle with the graph endpoint's wire contract: the literal
/// string `"false"` disables the feature, any other value enables it.
///
/// This truthiness coercion is the endpoint's documented wire contract,
/// not a validation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenientBool(pub bool);

impl LenientBool {
    pub fn into_inner(self) -> bool {
        self.0
    }
}

impl<'de> Deserialize<'de> for LenientBool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(LenientBool(s != "false"))
    }
}

/// A limit parameter that silently normalizes malformed input.
///
/// `?limit=abc` and `?limit=` both behave like an absent parameter; range
/// clamping happens downstream in `biblio_core::clamp_graph_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenientLimit(pub Option<i64>);

impl LenientLimit {
    pub fn into_inner(self) -> Option<i64> {
        self.0
    }
}

impl<'de> Deserialize<'de> for LenientLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(LenientLimit(s.trim().parse::<i64>().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Params {
        flag: Option<LenientBool>,
        limit: Option<LenientLimit>,
    }

    fn parse(query: &str) -> Params {
        use axum::extract::Query;
        use axum::http::Uri;
        let uri: Uri = format!("http://localhost/?{}", query).parse().unwrap();
        Query::<Params>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_literal_false_disables() {
        let params = parse("flag=false");
        assert_eq!(params.flag, Some(LenientBool(false)));
    }

    #[test]
    fn test_any_other_value_enables() {
        for query in ["flag=true", "flag=1", "flag=0", "flag=no", "flag="] {
            let params = parse(query);
            assert_eq!(params.flag, Some(LenientBool(true)), "query: {}", query);
        }
    }

    #[test]
    fn test_absent_flag_is_none() {
        let params = parse("");
        assert_eq!(params.flag, None);
    }

    #[test]
    fn test_valid_limit_parses() {
        let params = parse("limit=250");
        assert_eq!(params.limit, Some(LenientLimit(Some(250))));
    }

    #[test]
    fn test_invalid_limit_normalizes_to_none() {
        for query in ["limit=abc", "limit=", "limit=12.5"] {
            let params = parse(query);
            assert_eq!(params.limit, Some(LenientLimit(None)), "query: {}", query);
        }
    }
}
