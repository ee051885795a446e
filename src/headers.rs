//! Header normalization.

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use indexmap::IndexMap;

use crate::error::FetchError;
use crate::types::Accept;

/// Header input in any of the supported representations.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderInit {
    Map(HeaderMap),
    Pairs(Vec<(String, String)>),
    Record(IndexMap<String, String>),
}

impl From<HeaderMap> for HeaderInit {
    fn from(map: HeaderMap) -> Self {
        HeaderInit::Map(map)
    }
}

impl From<Vec<(String, String)>> for HeaderInit {
    fn from(pairs: Vec<(String, String)>) -> Self {
        HeaderInit::Pairs(pairs)
    }
}

impl From<IndexMap<String, String>> for HeaderInit {
    fn from(record: IndexMap<String, String>) -> Self {
        HeaderInit::Record(record)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeaderInit {
    fn from(pairs: [(&str, &str); N]) -> Self {
        HeaderInit::Pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Build the canonical header container.
///
/// Repeated names in pair form are appended, not overwritten.
///
/// # Errors
///
/// Returns `FetchError::InvalidHeader` for names or values that are not
/// valid HTTP.
pub fn build_header_map(init: Option<HeaderInit>) -> Result<HeaderMap, FetchError> {
    match init {
        None => Ok(HeaderMap::new()),
        Some(HeaderInit::Map(map)) => Ok(map),
        Some(HeaderInit::Pairs(pairs)) => {
            let mut map = HeaderMap::with_capacity(pairs.len());
            for (name, value) in &pairs {
                let (name, value) = parse_header(name, value)?;
                map.append(name, value);
            }
            Ok(map)
        }
        Some(HeaderInit::Record(record)) => {
            let mut map = HeaderMap::with_capacity(record.len());
            for (name, value) in &record {
                let (name, value) = parse_header(name, value)?;
                map.insert(name, value);
            }
            Ok(map)
        }
    }
}

/// Set the `Accept` header from an accept option, replacing any prior value.
pub fn apply_accept(headers: &mut HeaderMap, accept: &Accept) -> Result<(), FetchError> {
    let raw = accept.header_value();
    let value = HeaderValue::from_str(&raw).map_err(|e| FetchError::InvalidHeader {
        name: ACCEPT.to_string(),
        message: e.to_string(),
    })?;
    headers.insert(ACCEPT, value);
    Ok(())
}

/// Parse a `Name: value` line, as given on the command line.
pub fn parse_header_line(line: &str) -> Result<(String, String), FetchError> {
    let (name, value) = line.split_once(':').ok_or_else(|| FetchError::InvalidHeader {
        name: line.to_string(),
        message: "expected 'Name: value'".into(),
    })?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), FetchError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok((header_name, header_value))
}
