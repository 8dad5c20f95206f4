//! JSON-over-HTTP calls between services.
//!
//! The client half turns an [`Invocation`] into `POST {base}/{Service}/{Method}`
//! with the arguments in a JSON object keyed by parameter name. The server half
//! ([`Server`]) captures inbound requests and binds the same object back onto
//! handler parameters.

mod macros;

pub mod binder;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod naming;
pub mod net;
pub mod options;
pub mod settings;
pub mod types;

pub use binder::{BindingTable, BoundArgs, MethodBinding, RawParams};
pub use dispatcher::Dispatcher;
pub use error::{BindError, EnvokeError, ErrorKind};
pub use interceptor::intercept;
pub use naming::NamingConvention;
pub use net::server::Server;
pub use options::{DispatchOptions, SerializerOptions};
pub use reqwest::header::HeaderMap;
pub use settings::{load_settings, Configuration, StaticConfig};
pub use types::{
    Argument, CallContext, CapturedRequest, CapturedResponse, DispatchResult, InterceptResult,
    Invocation, ReturnType,
};
