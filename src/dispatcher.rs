use crate::{
    error::{EnvokeError, Result},
    net::{self, client::HttpClient},
    options::{DispatchOptions, SerializerOptions},
    settings::Configuration,
    types::{CallContext, DispatchResult, Invocation, ReturnType},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};

/// Turns [`Invocation`]s into HTTP POSTs against configured base URLs.
///
/// Cheap to clone; clones share the configuration and the HTTP connection pool.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<dyn Configuration>,
    http: HttpClient,
    options: Arc<DispatchOptions>,
}

impl Dispatcher {
    pub fn new(config: impl Configuration + 'static) -> Self {
        Self {
            config: Arc::new(config),
            http: HttpClient::default(),
            options: Arc::new(DispatchOptions::default()),
        }
    }

    /// Default options for [`dispatch`](Self::dispatch) and [`call`](Self::call).
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = HttpClient::new(client);
        self
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub async fn dispatch(
        &self,
        invocation: &mut Invocation,
        context: CallContext<'_>,
    ) -> Result<DispatchResult> {
        self.dispatch_with(invocation, &self.options, context).await
    }

    /// Sends `invocation` and fills its return value slot on success.
    ///
    /// Remote failures come back as `Err` unless `options.raise_on_error` is
    /// false, in which case they are reported on the result. Missing
    /// configuration, bad headers and decode failures always come back as `Err`.
    pub async fn dispatch_with(
        &self,
        invocation: &mut Invocation,
        options: &DispatchOptions,
        context: CallContext<'_>,
    ) -> Result<DispatchResult> {
        let service = net::service_name(invocation.interface()).to_owned();
        let key = format!("{}:{}", options.url_prefix, service);
        let service_url = self
            .config
            .get(&key)
            .ok_or(EnvokeError::ConfigurationMissing { key })?;

        let envelope = net::encode_envelope(invocation.arguments(), &options.serializer);
        let request_body = serde_json::to_string(&envelope).map_err(EnvokeError::encode)?;
        let url = net::resource_url(&service_url, &service, invocation.method());
        let headers = net::outgoing_headers(context, &options.headers)?;
        let request_headers = net::record_headers(&headers);

        let started = Instant::now();
        let response = self
            .http
            .post_json(&url, headers, request_body.clone(), options.timeout)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut result = DispatchResult {
            service,
            method: invocation.method().to_owned(),
            service_url,
            success: false,
            status: None,
            elapsed_ms,
            error: None,
            request_body,
            request_headers,
            response_body: String::new(),
        };

        let failure = match response {
            Ok(response) => {
                result.status = Some(response.status);
                result.success = response.status.is_success();
                result.response_body = response.body;
                if result.success {
                    None
                } else {
                    let message = net::failure_message(
                        response.status,
                        response.reason.as_deref(),
                        &result.response_body,
                    );
                    Some(EnvokeError::remote(message, response.status))
                }
            }
            Err(e) => Some(EnvokeError::transport(e)),
        };

        debug!(
            service = %result.service,
            method = %result.method,
            status = ?result.status,
            elapsed_ms = result.elapsed_ms,
            "dispatched {}",
            url
        );

        match failure {
            None => {
                let value = decode_return(invocation.return_type(), &result.response_body, &options.serializer)?;
                invocation.set_return_value(value);
                Ok(result)
            }
            Some(error) => {
                warn!("{} {}/{} failed: {}", url, result.service, result.method, error);
                result.error = Some(error.clone());
                if options.raise_on_error || !error.is_reportable() {
                    Err(error)
                } else {
                    Ok(result)
                }
            }
        }
    }

    /// Dispatches with the default options and decodes the return value as `R`.
    ///
    /// Any failure comes back as `Err`, whatever `raise_on_error` says.
    pub async fn call<R: DeserializeOwned>(
        &self,
        mut invocation: Invocation,
        context: CallContext<'_>,
    ) -> Result<R> {
        let result = self.dispatch(&mut invocation, context).await?;
        if let Some(error) = result.error {
            return Err(error);
        }
        invocation.take_return()
    }
}

fn decode_return(return_type: ReturnType, body: &str, serializer: &SerializerOptions) -> Result<Value> {
    match return_type {
        ReturnType::Unit => Ok(Value::Null),
        ReturnType::Json if body.trim().is_empty() => Ok(Value::Null),
        ReturnType::Json => {
            let value = serde_json::from_str(body).map_err(EnvokeError::decode)?;
            Ok(serializer.naming.read_keys(value))
        }
    }
}
