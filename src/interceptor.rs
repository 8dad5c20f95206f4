//! Server-side capture of each request/response pair.
//!
//! [`intercept`] stashes per-parameter JSON for the [binder](crate::binder),
//! buffers whatever the next stage writes, and hands the same bytes back as the
//! response body.

use crate::{
    binder::{BindingTable, RawParams},
    error::BindError,
    net,
    types::InterceptResult,
};
use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::{future::Future, panic::AssertUnwindSafe, sync::Arc, time::Instant};
use tracing::{debug, warn};

pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Buffer and clock for one next-stage run. Writes into the record when dropped.
struct ResponseCapture<'a> {
    record: &'a mut InterceptResult,
    buffer: BytesMut,
    started: Instant,
}

impl<'a> ResponseCapture<'a> {
    fn begin(record: &'a mut InterceptResult) -> Self {
        Self {
            record,
            buffer: BytesMut::new(),
            started: Instant::now(),
        }
    }

    fn write(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn contents(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer)
    }

    fn status(&mut self, status: StatusCode) {
        self.record.response.status = status.as_u16();
    }
}

impl Drop for ResponseCapture<'_> {
    fn drop(&mut self) {
        self.record.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.record.response.body = String::from_utf8_lossy(&self.buffer).into_owned();
    }
}

/// Picks out the expected parameters present in `body`, as raw JSON text.
fn stash_parameters(table: &BindingTable, path: &str, body: &Value) -> Option<RawParams> {
    let object = body.as_object()?;
    let binding = table.lookup(path)?;
    let serializer = table.serializer();
    let raw = binding
        .parameters()
        .iter()
        .filter_map(|parameter| {
            let value = object.get(&serializer.wire_name(parameter.name()))?;
            Some((parameter.name().to_owned(), value.to_string()))
        })
        .collect();
    Some(RawParams(raw))
}

/// Runs `next` on `request` and records what went in and came out.
///
/// The returned response carries exactly the bytes that were captured.
pub async fn intercept<F, Fut>(table: &BindingTable, request: Request, next: F) -> (Response, InterceptResult)
where
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Response>,
{
    let mut record = InterceptResult::default();
    let (mut parts, body) = request.into_parts();
    record.request.headers = net::record_headers(&parts.headers);

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return reject(record, BindError::BodyRead(e.to_string())).await,
    };
    record.request.body = String::from_utf8_lossy(&bytes).into_owned();

    if !bytes.is_empty() {
        let parsed: Value = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => return reject(record, BindError::Malformed(e)).await,
        };
        if let Some(raw) = stash_parameters(table, parts.uri.path(), &parsed) {
            parts.extensions.insert(raw);
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = {
        let mut capture = ResponseCapture::begin(&mut record);
        let response = match AssertUnwindSafe(next(request)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                warn!("next stage panicked");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
        relay(&mut capture, response).await
    };

    (response, record)
}

/// Buffers `response` into `capture` and rebuilds it around the buffered bytes.
async fn relay(capture: &mut ResponseCapture<'_>, response: Response) -> Response {
    capture.status(response.status());

    let (mut parts, body) = response.into_parts();
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => capture.write(&chunk),
            Err(e) => {
                warn!("response body failed after {} bytes: {}", capture.buffer.len(), e);
                break;
            }
        }
    }
    parts.headers.remove(CONTENT_LENGTH);
    let delivered = capture.contents();
    Response::from_parts(parts, Body::from(delivered))
}

async fn reject(mut record: InterceptResult, error: BindError) -> (Response, InterceptResult) {
    warn!("rejecting request body: {}", error);
    let response = {
        let mut capture = ResponseCapture::begin(&mut record);
        relay(&mut capture, error.into_response()).await
    };
    (response, record)
}

/// [`intercept`] as route middleware. The record rides along in the response extensions.
pub async fn intercept_middleware(
    State(table): State<Arc<BindingTable>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let (mut response, record) = intercept(&table, request, |request| next.run(request)).await;
    debug!(
        status = record.response.status,
        elapsed_ms = record.elapsed_ms,
        "{} {}",
        method,
        uri
    );
    response.extensions_mut().insert(record);
    response
}
