use crate::client::backends::{BackendError, BackendResult};
use crate::client::datastream::Datastream;
use crate::client::HttpClientConfig;
use crate::Result;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Hook called with human readable status messages during long operations
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Query parameters, sent in order and without percent-encoding.
///
/// Values that are plain strings rather than query expressions must go
/// through [`encode_value`] first.
pub type Params<'a> = &'a [(&'a str, String)];

/// Percent-encode a plain query value so `&`, `#`, `+` and the like reach
/// the server as part of the value
#[must_use]
pub fn encode_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Authenticated transport shared by the repository backends.
///
/// Every request a backend makes goes through one of the primitives here,
/// which decide what counts as a successful response.
pub struct RequestBase {
    client: Client,
    base_url: String,
    progress: Option<ProgressCallback>,
}

impl RequestBase {
    /// Create a transport rooted at `base_url`, sending `api_key` as a bearer
    /// token when one is given
    pub fn new(base_url: &str, api_key: Option<&str>, http: &HttpClientConfig) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| crate::Error::invalid("base_url", format!("'{base_url}': {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| crate::Error::invalid("api_key", format!("not a valid header value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(http.timeout())
            .connect_timeout(http.connect_timeout())
            .user_agent(&http.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            progress: None,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install or remove the progress hook
    pub fn set_progress(&mut self, progress: Option<ProgressCallback>) {
        self.progress = progress;
    }

    /// Pass a message to the progress hook, if one is installed
    pub fn report_progress(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress(message);
        }
    }

    /// Build the full request URL.
    ///
    /// The query string is assembled by hand because search queries carry a
    /// Solr expression (`packageType:dmpt`) that has to reach the server as
    /// written. Characters that cannot appear in a URL at all, such as
    /// spaces, are still escaped by the URL parser inside reqwest.
    #[must_use]
    pub fn url(&self, path: &str, params: Option<Params<'_>>) -> String {
        let mut url = self.base_url.clone();
        if !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(path);

        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let query = params
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }

        url
    }

    pub async fn get(&self, path: &str, params: Option<Params<'_>>) -> BackendResult<Value> {
        let url = self.url(path, params);
        let request = self.client.request(Method::GET, &url);
        Self::unwrap_body(&url, Self::send(&url, request).await?).await
    }

    pub async fn post(
        &self,
        path: &str,
        payload: &Value,
        params: Option<Params<'_>>,
    ) -> BackendResult<Value> {
        let url = self.url(path, params);
        let request = self.client.request(Method::POST, &url).json(payload);

        let result = match Self::send(&url, request).await {
            Ok(response) => Self::unwrap_body(&url, response).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            let body = payload.to_string();
            warn!(
                "POST {} failed: {} (payload: {})",
                url,
                e,
                body.chars().take(40).collect::<String>()
            );
        }
        result
    }

    /// POST a raw byte payload as `application/octet-stream`
    pub async fn post_bytes(
        &self,
        path: &str,
        payload: Vec<u8>,
        params: Option<Params<'_>>,
    ) -> BackendResult<Value> {
        let url = self.url(path, params);
        debug!("Uploading {} bytes to {}", payload.len(), url);
        let request = self
            .client
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload);
        Self::unwrap_body(&url, Self::send(&url, request).await?).await
    }

    /// DELETE, optionally with a JSON body
    pub async fn delete(&self, path: &str, payload: Option<&Value>) -> BackendResult<Value> {
        let url = self.url(path, None);
        let mut request = self.client.request(Method::DELETE, &url);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        Self::unwrap_body(&url, Self::send(&url, request).await?).await
    }

    /// GET without buffering the body
    pub async fn get_stream(&self, path: &str, params: Option<Params<'_>>) -> BackendResult<Datastream> {
        let url = self.url(path, params);
        let request = self.client.request(Method::GET, &url);
        let response = Self::send(&url, request).await?;
        Self::check_status(&url, response).await.map(Datastream::from_response)
    }

    async fn send(url: &str, request: RequestBuilder) -> BackendResult<Response> {
        debug!("Request: {}", url);
        request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            BackendError::from(e)
        })
    }

    async fn check_status(url: &str, response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!("{} returned HTTP {}", url, status);
        Err(BackendError::Status {
            code: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }

    /// Turn a response into its payload: empty bodies become `null` and
    /// bodies that are not JSON are returned as a JSON string
    async fn unwrap_body(url: &str, response: Response) -> BackendResult<Value> {
        let response = Self::check_status(url, response).await?;
        let text = response.text().await.map_err(BackendError::from)?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

impl fmt::Debug for RequestBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBase")
            .field("base_url", &self.base_url)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}
