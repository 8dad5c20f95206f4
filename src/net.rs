pub mod client;
pub mod server;

use crate::{
    error::{EnvokeError, Result},
    options::SerializerOptions,
    types::{Argument, CallContext},
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH},
    StatusCode,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const INTERFACE_MARKER: char = 'I';
const FALLBACK_FAILURE_MESSAGE: &str = "Service call failed";

/// `IWeather` -> `Weather`. Names without the marker come back unchanged.
pub fn service_name(interface: &str) -> &str {
    let mut chars = interface.chars();
    match (chars.next(), chars.next()) {
        (Some(INTERFACE_MARKER), Some(next)) if next.is_uppercase() => {
            &interface[INTERFACE_MARKER.len_utf8()..]
        }
        _ => interface,
    }
}

/// Literal join; segments are not escaped.
pub fn resource_url(service_url: &str, service: &str, method: &str) -> String {
    format!("{service_url}/{service}/{method}")
}

/// Server route for a method, the path half of [`resource_url`].
pub fn route_path(service: &str, method: &str) -> String {
    format!("/{service}/{method}")
}

/// Builds the request body: parameter name to value, in declared order, skipping nulls.
pub fn encode_envelope(arguments: &[Argument], serializer: &SerializerOptions) -> Map<String, Value> {
    arguments
        .iter()
        .filter(|arg| !arg.value.is_null())
        .map(|arg| (serializer.wire_name(&arg.name), arg.value.clone()))
        .collect()
}

/// Inbound headers (minus `Content-Length`) with `overlay` on top.
///
/// Background calls get `overlay` only.
pub fn outgoing_headers(context: CallContext<'_>, overlay: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(inbound) = context.inbound_headers() {
        for (name, value) in inbound {
            if *name != CONTENT_LENGTH {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    for (name, value) in overlay {
        let header_name =
            HeaderName::try_from(name.as_str()).map_err(|_| EnvokeError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| EnvokeError::InvalidHeader(name.clone()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Flattens headers for recording; repeated names are joined with `", "`.
pub fn record_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_owned(), joined)
        })
        .collect()
}

/// Response body if non-blank, else the reason phrase, else a fixed message.
///
/// `reason` is the phrase the server sent; the status's canonical phrase stands in when it is absent.
pub fn failure_message(status: StatusCode, reason: Option<&str>, body: &str) -> String {
    if !body.trim().is_empty() {
        return body.to_owned();
    }
    match reason.filter(|reason| !reason.trim().is_empty()).or(status.canonical_reason()) {
        Some(reason) => reason.to_owned(),
        None => FALLBACK_FAILURE_MESSAGE.to_owned(),
    }
}
