use crate::error::{MexError, MexResult, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;

/// Read a response body, failing as soon as it grows past `limit` bytes
pub(crate) async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(TransportError::TooLarge { limit });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(TransportError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

pub(crate) fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// `charset` parameter of a Content-Type value, lowercased
pub(crate) fn charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Some(value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

/// Decode a body using the declared charset; UTF-8 when none is declared
pub(crate) fn decode(bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, TransportError> {
    let charset = content_type.and_then(charset);
    let text = match charset.as_deref() {
        None | Some("utf-8") | Some("utf8") => {
            String::from_utf8(bytes).map_err(|_| TransportError::Decode("UTF-8".to_string()))?
        }
        Some("us-ascii") | Some("ascii") => {
            if !bytes.is_ascii() {
                return Err(TransportError::Decode("US-ASCII".to_string()));
            }
            String::from_utf8(bytes).map_err(|_| TransportError::Decode("US-ASCII".to_string()))?
        }
        Some("iso-8859-1") | Some("latin1") | Some("l1") => {
            bytes.iter().map(|&b| b as char).collect()
        }
        Some(other) => return Err(TransportError::UnsupportedCharset(other.to_string())),
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

pub(crate) fn header_map(headers: &HashMap<String, String>) -> MexResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = key
            .parse::<HeaderName>()
            .map_err(|e| MexError::Config(format!("invalid header name '{}': {}", key, e)))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| MexError::Config(format!("invalid value for header '{}': {}", key, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}
