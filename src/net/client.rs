use hyper::ext::ReasonPhrase;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use std::time::Duration;

const APPLICATION_JSON: &str = "application/json";

/// What came back from one POST.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    /// Only set when the server sent a non-canonical phrase.
    pub reason: Option<String>,
    pub body: String,
}

/// The HTTP half of a dispatch. Pooling is left to reqwest.
#[derive(Debug, Clone, Default)]
pub(crate) struct HttpClient(reqwest::Client);

impl HttpClient {
    pub(crate) fn new(client: reqwest::Client) -> Self {
        Self(client)
    }

    pub(crate) async fn post_json(
        &self,
        url: &str,
        mut headers: HeaderMap,
        body: String,
        timeout: Duration,
    ) -> Result<RawResponse, reqwest::Error> {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        let response = self
            .0
            .post(url)
            .headers(headers)
            .body(body)
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned());
        let body = response.text().await?;
        Ok(RawResponse { status, reason, body })
    }
}
