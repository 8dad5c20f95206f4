use crate::error::{EnvokeError, Result};
use reqwest::{header::HeaderMap, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared return type of a remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    /// No return value; the response body is ignored.
    Unit,
    /// The response body is JSON decoded into the caller's type.
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

/// One call on a remote interface, as produced by a client stub.
#[derive(Debug, Clone)]
pub struct Invocation {
    interface: String,
    method: String,
    arguments: Vec<Argument>,
    return_type: ReturnType,
    return_value: Option<Value>,
}

impl Invocation {
    pub fn new(interface: impl Into<String>, method: impl Into<String>, return_type: ReturnType) -> Self {
        Self {
            interface: interface.into(),
            method: method.into(),
            arguments: Vec::new(),
            return_type,
            return_value: None,
        }
    }

    /// Appends an argument. `None` and other values serializing to `null` are kept
    /// here but never sent.
    pub fn arg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(EnvokeError::encode)?;
        self.push_arg(name, value);
        Ok(self)
    }

    pub fn push_arg(&mut self, name: &str, value: Value) {
        self.arguments.push(Argument {
            name: name.to_owned(),
            value,
        });
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    pub(crate) fn set_return_value(&mut self, value: Value) {
        self.return_value = Some(value);
    }

    /// Decodes the return value slot. An unset slot decodes as `null`.
    pub fn take_return<R: DeserializeOwned>(&mut self) -> Result<R> {
        let value = self.return_value.take().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(EnvokeError::decode)
    }
}

/// Whether a dispatch runs on behalf of an inbound request.
#[derive(Debug, Clone, Copy, Default)]
pub enum CallContext<'a> {
    #[default]
    Background,
    Inbound(&'a HeaderMap),
}

impl<'a> CallContext<'a> {
    pub fn is_background_job(&self) -> bool {
        matches!(self, CallContext::Background)
    }

    pub fn inbound_headers(&self) -> Option<&'a HeaderMap> {
        match *self {
            CallContext::Background => None,
            CallContext::Inbound(headers) => Some(headers),
        }
    }
}

impl<'a> From<Option<&'a HeaderMap>> for CallContext<'a> {
    fn from(headers: Option<&'a HeaderMap>) -> Self {
        headers.map_or(CallContext::Background, CallContext::Inbound)
    }
}

/// Record of one outbound call. Fully populated before it is returned.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub(crate) service: String,
    pub(crate) method: String,
    pub(crate) service_url: String,
    pub(crate) success: bool,
    pub(crate) status: Option<StatusCode>,
    pub(crate) elapsed_ms: u64,
    pub(crate) error: Option<EnvokeError>,
    pub(crate) request_body: String,
    pub(crate) request_headers: BTreeMap<String, String>,
    pub(crate) response_body: String,
}

impl DispatchResult {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// `None` when no response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn error(&self) -> Option<&EnvokeError> {
        self.error.as_ref()
    }

    pub fn request_body(&self) -> &str {
        &self.request_body
    }

    pub fn request_headers(&self) -> &BTreeMap<String, String> {
        &self.request_headers
    }

    pub fn response_body(&self) -> &str {
        &self.response_body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedRequest {
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedResponse {
    pub status: u16,
    pub body: String,
}

/// Record of one inbound request as it passed through the interceptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterceptResult {
    pub elapsed_ms: u64,
    pub request: CapturedRequest,
    pub response: CapturedResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn null_arguments_are_kept_on_the_descriptor() {
        let invocation = Invocation::new("IWeather", "GetForecast", ReturnType::Json)
            .arg("city", "Paris")
            .unwrap()
            .arg("days", &None::<u32>)
            .unwrap();
        let names: Vec<_> = invocation.arguments().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["city", "days"]);
        assert_eq!(invocation.arguments()[1].value, Value::Null);
    }

    #[test]
    fn unset_return_value_decodes_as_unit() {
        let mut invocation = Invocation::new("IWeather", "Reset", ReturnType::Unit);
        let () = invocation.take_return().unwrap();
        assert_eq!(invocation.take_return::<Option<u8>>().unwrap(), None);
    }

    #[test]
    fn return_value_decodes_into_type() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Forecast {
            high: i32,
        }

        let mut invocation = Invocation::new("IWeather", "GetForecast", ReturnType::Json);
        invocation.set_return_value(serde_json::json!({ "high": 21 }));
        assert_eq!(invocation.take_return::<Forecast>().unwrap(), Forecast { high: 21 });
    }

    #[test]
    fn call_context() {
        let headers = HeaderMap::new();
        assert!(CallContext::default().is_background_job());
        assert!(!CallContext::Inbound(&headers).is_background_job());
        assert!(CallContext::from(None::<&HeaderMap>).inbound_headers().is_none());
    }
}
