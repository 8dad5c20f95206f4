use crate::{
    binder::{self, BindingTable, MethodBinding},
    interceptor,
    net::route_path,
    options::SerializerOptions,
};
use axum::{handler::Handler, middleware::from_fn_with_state, routing::post, Router};
use std::{io, net::Ipv4Addr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

/// Hosts handlers at `POST /{Service}/{Method}` behind the interceptor and binder.
#[derive(Default)]
pub struct Server {
    router: Router,
    bindings: BindingTable,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_serializer(mut self, serializer: SerializerOptions) -> Self {
        self.bindings.set_serializer(serializer);
        self
    }

    pub fn method<H, T>(mut self, service: &str, method: &str, binding: MethodBinding, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.router = self.router.route(&route_path(service, method), post(handler));
        self.bindings.insert(service, method, binding);
        self
    }

    pub fn into_router(self) -> Router {
        let bindings = Arc::new(self.bindings);
        self.router
            .route_layer(from_fn_with_state(bindings.clone(), binder::bind))
            .route_layer(from_fn_with_state(bindings, interceptor::intercept_middleware))
    }

    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("serving on {}", addr);
        }
        axum::serve(listener, self.into_router()).await
    }

    pub async fn serve_tcp(self, port: u16) -> io::Result<()> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        self.serve(listener).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binder::BoundArgs, naming::NamingConvention, types::InterceptResult};
    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::StatusCode,
    };
    use tower::ServiceExt;

    async fn greet(args: BoundArgs) -> String {
        let name = args.get::<String>("name").unwrap_or_else(|| "stranger".into());
        let times = args.get::<u32>("times").unwrap_or(1);
        format!("hello {name}").repeat(times as usize)
    }

    fn router() -> Router {
        Server::new()
            .method(
                "Greeter",
                "Greet",
                MethodBinding::new().param::<String>("name").param::<u32>("times"),
                greet,
            )
            .into_router()
    }

    fn post_json(uri: &str, body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn binds_and_intercepts() {
        let response = router()
            .oneshot(post_json("/Greeter/Greet", r#"{"name": "Ann"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let record = response.extensions().get::<InterceptResult>().cloned().unwrap();
        assert_eq!(record.request.body, r#"{"name": "Ann"}"#);
        assert_eq!(record.response.body, "hello Ann");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello Ann");
    }

    #[tokio::test]
    async fn serializer_applies_to_methods_registered_before_it() {
        async fn greet_first(args: BoundArgs) -> String {
            format!("hello {:?}", args.get::<String>("first_name"))
        }

        let router = Server::new()
            .method(
                "Greeter",
                "Greet",
                MethodBinding::new().param::<String>("first_name"),
                greet_first,
            )
            .with_serializer(SerializerOptions {
                naming: NamingConvention::Preserve,
            })
            .into_router();

        let response = router
            .oneshot(post_json("/Greeter/Greet", r#"{"first_name": "Ann"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"hello Some("Ann")"#);
    }

    #[tokio::test]
    async fn bad_parameter_is_a_client_error() {
        let response = router()
            .oneshot(post_json("/Greeter/Greet", r#"{"times": "twice"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let record = response.extensions().get::<InterceptResult>().cloned().unwrap();
        assert_eq!(record.response.status, 400);
        assert!(record.response.body.contains("Invalid JSON format"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = router()
            .oneshot(post_json("/Greeter/Nope", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
