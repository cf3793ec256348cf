//! Request parameters parsed from the url query string.
//!
//! The query is kept as an ordered multi-map: every `key=value` pair is retained, only the
//! first value of a key is visible through [`Lookup`], and [`QueryParams::total`] counts every
//! supplied value. The dispatcher relies on the difference between the two to reject repeated
//! keys.
//!
//! Parsing is strict: a `%` that does not start a two digit hex escape, or an escape that
//! decodes to invalid UTF-8, rejects the whole query.

use crate::param::Lookup;
use http::Uri;
use percent_encoding::percent_decode_str;
use std::str::Utf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid percent escape at offset {offset}")]
    InvalidEscape { offset: usize },

    #[error("query decodes to invalid utf-8: {source}")]
    InvalidUtf8 {
        #[from]
        source: Utf8Error,
    },

    #[error("malformed query: {source}")]
    Malformed {
        #[from]
        source: serde_urlencoded::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        validate(query)?;
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)?;
        Ok(Self { pairs })
    }

    /// Parses the query of `uri`, a uri without query has no params.
    pub fn from_uri(uri: &Uri) -> Result<Self, QueryError> {
        match uri.query() {
            Some(query) => Self::parse(query),
            None => Ok(Self::default()),
        }
    }

    /// The first value supplied for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value supplied for `key`, in order.
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// The number of supplied values, counting repeated keys once per value.
    pub fn total(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn validate(query: &str) -> Result<(), QueryError> {
    let bytes = query.as_bytes();
    for (offset, _) in query.match_indices('%') {
        let escaped = bytes.get(offset + 1..offset + 3).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !escaped {
            return Err(QueryError::InvalidEscape { offset });
        }
    }

    for component in query.split(['&', '=']) {
        percent_decode_str(component).decode_utf8()?;
    }
    Ok(())
}

impl Lookup for QueryParams {
    #[inline]
    fn lookup(&self, name: &str) -> Option<&str> {
        self.first(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryError, QueryParams};
    use crate::param::Lookup;
    use http::Uri;

    #[test]
    fn parse_single() {
        let params = QueryParams::parse("name=Gopher").unwrap();
        assert_eq!(params.total(), 1);
        assert_eq!(params.lookup("name"), Some("Gopher"));
        assert_eq!(params.lookup("other"), None);
    }

    #[test]
    fn repeated_key_counts_every_value() {
        let params = QueryParams::parse("name=Gopher&name=Ferris").unwrap();
        assert_eq!(params.total(), 2);
        assert_eq!(params.first("name"), Some("Gopher"));
        assert_eq!(params.all("name").collect::<Vec<_>>(), vec!["Gopher", "Ferris"]);
    }

    #[test]
    fn decodes_values() {
        let params = QueryParams::parse("name=Go%27pher&greeting=hello+world").unwrap();
        assert_eq!(params.first("name"), Some("Go'pher"));
        assert_eq!(params.first("greeting"), Some("hello world"));
    }

    #[test]
    fn uri_without_query() {
        let uri: Uri = "http://host/Greeting".parse().unwrap();
        let params = QueryParams::from_uri(&uri).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.total(), 0);
    }

    #[test]
    fn key_without_value() {
        let uri: Uri = "/Echo?name".parse().unwrap();
        let params = QueryParams::from_uri(&uri).unwrap();
        assert_eq!(params.first("name"), Some(""));
    }

    #[test]
    fn invalid_escape_is_rejected() {
        assert!(matches!(QueryParams::parse("name=%zz"), Err(QueryError::InvalidEscape { offset: 5 })));
        assert!(matches!(QueryParams::parse("name=Gopher%"), Err(QueryError::InvalidEscape { offset: 11 })));
        assert!(matches!(QueryParams::parse("na%2=x"), Err(QueryError::InvalidEscape { offset: 2 })));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(QueryParams::parse("name=%FF"), Err(QueryError::InvalidUtf8 { .. })));
        assert!(matches!(QueryParams::parse("%C3=x"), Err(QueryError::InvalidUtf8 { .. })));
    }

    #[test]
    fn multibyte_escape_is_decoded() {
        let params = QueryParams::parse("name=G%C3%B6pher").unwrap();
        assert_eq!(params.first("name"), Some("Göpher"));
    }
}
