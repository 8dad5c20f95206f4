use crate::{error::BindError, net, options::SerializerOptions};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use std::{
    any::{type_name, Any},
    collections::HashMap,
    convert::Infallible,
    sync::Arc,
};
use tracing::warn;

type BoundValue = Arc<dyn Any + Send + Sync>;
type DecodeFn = fn(&str) -> Result<BoundValue, serde_json::Error>;

fn decode_as<T>(raw: &str) -> Result<BoundValue, serde_json::Error>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let value: T = serde_json::from_str(raw)?;
    Ok(Arc::new(value))
}

/// One expected parameter of a handler.
#[derive(Clone)]
pub struct Parameter {
    name: String,
    type_name: &'static str,
    decode: DecodeFn,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

/// The ordered parameter list of one handler, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct MethodBinding {
    parameters: Vec<Parameter>,
}

impl MethodBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param<T>(mut self, name: &str) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.parameters.push(Parameter {
            name: name.to_owned(),
            type_name: type_name::<T>(),
            decode: decode_as::<T>,
        });
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

/// Maps route paths (`/{Service}/{Method}`) to their bindings.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    routes: HashMap<String, MethodBinding>,
    serializer: SerializerOptions,
}

impl BindingTable {
    pub fn new(serializer: SerializerOptions) -> Self {
        Self {
            routes: HashMap::new(),
            serializer,
        }
    }

    pub fn insert(&mut self, service: &str, method: &str, binding: MethodBinding) {
        self.routes.insert(net::route_path(service, method), binding);
    }

    pub fn lookup(&self, path: &str) -> Option<&MethodBinding> {
        self.routes.get(path)
    }

    pub fn serializer(&self) -> &SerializerOptions {
        &self.serializer
    }

    /// Changes the wire naming for every binding, including ones already inserted.
    pub fn set_serializer(&mut self, serializer: SerializerOptions) {
        self.serializer = serializer;
    }
}

/// Raw JSON text per parameter name, left on the request by the interceptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(pub HashMap<String, String>);

impl RawParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decoded handler arguments. A parameter that was not in the body is unset.
#[derive(Clone, Default)]
pub struct BoundArgs {
    values: HashMap<String, BoundValue>,
}

impl BoundArgs {
    /// `None` if the parameter is unset or was bound as another type.
    pub fn get<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.get_ref::<T>(name).cloned()
    }

    pub fn get_ref<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref::<T>()
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for BoundArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BoundArgs {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<BoundArgs>().cloned().unwrap_or_default())
    }
}

/// Decodes every stashed parameter of `binding`. The first failure aborts.
pub fn bind_arguments(binding: &MethodBinding, raw: &RawParams) -> Result<BoundArgs, BindError> {
    let mut values = HashMap::new();
    for parameter in &binding.parameters {
        let Some(text) = raw.get(&parameter.name) else {
            continue;
        };
        let value = (parameter.decode)(text).map_err(|source| BindError::Parameter {
            name: parameter.name.clone(),
            source,
        })?;
        values.insert(parameter.name.clone(), value);
    }
    Ok(BoundArgs { values })
}

pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Route middleware: turns [`RawParams`] into [`BoundArgs`] before the handler runs.
pub async fn bind(State(table): State<Arc<BindingTable>>, mut request: Request, next: Next) -> Response {
    let raw = request.extensions_mut().remove::<RawParams>().unwrap_or_default();
    if !is_json(request.headers()) {
        return next.run(request).await;
    }
    let Some(binding) = table.lookup(request.uri().path()) else {
        return next.run(request).await;
    };

    match bind_arguments(binding, &raw) {
        Ok(args) => {
            request.extensions_mut().insert(args);
            next.run(request).await
        }
        Err(e) => {
            warn!("rejecting {}: {}", request.uri().path(), e);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn binding() -> MethodBinding {
        MethodBinding::new()
            .param::<i64>("id")
            .param::<String>("name")
            .param::<bool>("unused")
    }

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        RawParams(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn binds_present_parameters_only() {
        let args = bind_arguments(&binding(), &raw(&[("id", "7"), ("name", "\"Ann\"")])).unwrap();
        assert_eq!(args.get::<i64>("id"), Some(7));
        assert_eq!(args.get::<String>("name").as_deref(), Some("Ann"));
        assert!(!args.is_set("unused"));
        assert_eq!(args.get::<bool>("unused"), None);
        assert_eq!(args.get::<String>("id"), None);
    }

    #[test]
    fn decode_failure_names_the_parameter() {
        let err = bind_arguments(&binding(), &raw(&[("id", "\"not-a-number\"")])).unwrap_err();
        match err {
            BindError::Parameter { name, .. } => assert_eq!(name, "id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn json_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    async fn echo_id(args: BoundArgs) -> String {
        format!("{:?}", args.get::<i64>("id"))
    }

    fn router(params: RawParams) -> Router {
        let mut table = BindingTable::default();
        table.insert("Users", "Get", binding());
        Router::new()
            .route("/Users/Get", post(echo_id))
            .route_layer(from_fn_with_state(Arc::new(table), bind))
            .layer(axum::Extension(params))
    }

    fn request(content_type: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/Users/Get")
            .header(CONTENT_TYPE, content_type)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn middleware_binds_before_handler() {
        let response = router(raw(&[("id", "7")]))
            .oneshot(request("application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Some(7)");
    }

    #[tokio::test]
    async fn middleware_rejects_bad_parameter() {
        let response = router(raw(&[("id", "\"not-a-number\"")]))
            .oneshot(request("application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "Invalid JSON format");
        assert!(body["details"].as_str().unwrap().contains("id"));
    }

    #[tokio::test]
    async fn middleware_skips_non_json_requests() {
        let response = router(raw(&[("id", "\"not-a-number\"")]))
            .oneshot(request("text/plain"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "None");
    }
}
