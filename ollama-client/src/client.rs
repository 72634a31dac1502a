//! Ollama API client.

use futures::stream;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::abortable::AbortableStream;
use crate::config::{ClientConfig, DEFAULT_HOST, DEFAULT_WEB_HOST, format_host};
use crate::error::{ClientError, Result, map_http_status};
use crate::records::{StreamFrame, StreamRecord};
use crate::registry::ActiveCalls;
use crate::types::*;

/// Client for the Ollama HTTP API.
///
/// Every streaming endpoint has a buffered twin: `chat` returns one
/// [`ChatResponse`], `chat_stream` returns an [`AbortableStream`] of them.
/// Streams are tracked per client so [`abort_all`](Self::abort_all) can cancel
/// them together.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use ollama_client::{ChatRequest, Message, Ollama};
///
/// # async fn run() -> ollama_client::Result<()> {
/// let client = Ollama::new();
/// let mut stream = client
///     .chat_stream(ChatRequest::new("llama3.2", vec![Message::user("Hi")]))
///     .await?;
/// while let Some(part) = stream.next().await {
///     print!("{}", part?.message.content);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Ollama {
    host: String,
    web_host: String,
    headers: HeaderMap,
    http: reqwest::Client,
    active: ActiveCalls,
}

impl Ollama {
    /// Create a client for the default local server.
    #[must_use]
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ollama-client-rs/", env!("CARGO_PKG_VERSION"))),
        );
        Self {
            host: DEFAULT_HOST.into(),
            web_host: DEFAULT_WEB_HOST.into(),
            headers,
            http: reqwest::Client::new(),
            active: ActiveCalls::new(),
        }
    }

    /// Create a client from explicit configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            host: format_host(&config.host)?,
            web_host: config.web_host.trim_end_matches('/').to_string(),
            headers: config.header_map()?,
            http: reqwest::Client::new(),
            active: ActiveCalls::new(),
        })
    }

    /// Create a client configured from `OLLAMA_HOST` and `OLLAMA_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env())
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, TLS roots).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// The normalized server address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Number of streams currently in flight.
    pub fn active_streams(&self) -> usize {
        self.active.len()
    }

    /// Abort every stream this client has open. Returns how many were aborted.
    ///
    /// Consumers of those streams see them end without an error.
    pub fn abort_all(&self) -> usize {
        let count = self.active.abort_all();
        tracing::debug!(count, "aborted all active streams");
        count
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{endpoint}", self.host)
    }

    // ─── Chat / generate ─────────────────────────────────────────────────────

    /// Chat, waiting for the whole reply.
    pub async fn chat(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        request.stream = false;
        self.post("chat", &request).await
    }

    /// Chat, streaming the reply as it is generated.
    pub async fn chat_stream(&self, mut request: ChatRequest) -> Result<AbortableStream<ChatResponse>> {
        request.stream = true;
        self.post_stream("chat", &request).await
    }

    /// Complete a prompt, waiting for the whole reply.
    pub async fn generate(&self, mut request: GenerateRequest) -> Result<GenerateResponse> {
        request.stream = false;
        self.post("generate", &request).await
    }

    /// Complete a prompt, streaming the reply.
    pub async fn generate_stream(
        &self,
        mut request: GenerateRequest,
    ) -> Result<AbortableStream<GenerateResponse>> {
        request.stream = true;
        self.post_stream("generate", &request).await
    }

    // ─── Model management ────────────────────────────────────────────────────

    /// Pull a model and return the final status.
    pub async fn pull(&self, mut request: PullRequest) -> Result<ProgressResponse> {
        request.stream = false;
        self.post("pull", &request).await
    }

    /// Pull a model, streaming download progress.
    pub async fn pull_stream(
        &self,
        mut request: PullRequest,
    ) -> Result<AbortableStream<ProgressResponse>> {
        request.stream = true;
        self.post_stream("pull", &request).await
    }

    /// Push a model and return the final status.
    pub async fn push(&self, mut request: PushRequest) -> Result<ProgressResponse> {
        request.stream = false;
        self.post("push", &request).await
    }

    /// Push a model, streaming upload progress.
    pub async fn push_stream(
        &self,
        mut request: PushRequest,
    ) -> Result<AbortableStream<ProgressResponse>> {
        request.stream = true;
        self.post_stream("push", &request).await
    }

    /// Create a model and return the final status.
    pub async fn create(&self, mut request: CreateRequest) -> Result<ProgressResponse> {
        request.stream = false;
        self.post("create", &request).await
    }

    /// Create a model, streaming progress.
    pub async fn create_stream(
        &self,
        mut request: CreateRequest,
    ) -> Result<AbortableStream<ProgressResponse>> {
        request.stream = true;
        self.post_stream("create", &request).await
    }

    /// Delete a model.
    pub async fn delete(&self, request: DeleteRequest) -> Result<StatusResponse> {
        let url = self.url("delete");
        tracing::debug!(url = %url, model = %request.model, "deleting model");
        self.send(self.http.delete(&url).json(&request)).await?;
        Ok(StatusResponse::success())
    }

    /// Copy a model under a new name.
    pub async fn copy(&self, request: CopyRequest) -> Result<StatusResponse> {
        let url = self.url("copy");
        tracing::debug!(url = %url, source = %request.source, "copying model");
        self.send(self.http.post(&url).json(&request)).await?;
        Ok(StatusResponse::success())
    }

    /// List models available on the server.
    pub async fn list(&self) -> Result<ListResponse> {
        self.get("tags").await
    }

    /// List models currently loaded in memory.
    pub async fn ps(&self) -> Result<ListResponse> {
        self.get("ps").await
    }

    /// Show model metadata.
    pub async fn show(&self, request: ShowRequest) -> Result<ShowResponse> {
        self.post("show", &request).await
    }

    // ─── Embeddings / misc ───────────────────────────────────────────────────

    /// Embed one or more inputs.
    pub async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse> {
        self.post("embed", &request).await
    }

    /// Embed a single prompt with the legacy endpoint.
    pub async fn embeddings(&self, request: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        self.post("embeddings", &request).await
    }

    /// Server version.
    pub async fn version(&self) -> Result<VersionResponse> {
        self.get("version").await
    }

    // ─── Web ─────────────────────────────────────────────────────────────────

    /// Search the web through the hosted API. Requires an API key.
    ///
    /// An empty query fails with [`ClientError::InvalidRequest`] without
    /// sending anything.
    pub async fn web_search(&self, request: WebSearchRequest) -> Result<WebSearchResponse> {
        if request.query.is_empty() {
            return Err(ClientError::InvalidRequest("query is required".into()));
        }
        let url = format!("{}/api/web_search", self.web_host);
        tracing::debug!(url = %url, max_results = ?request.max_results, "sending web search");
        self.post_json(&url, &request).await
    }

    /// Fetch one page through the hosted API. Requires an API key.
    ///
    /// An empty URL fails with [`ClientError::InvalidRequest`] without
    /// sending anything.
    pub async fn web_fetch(&self, request: WebFetchRequest) -> Result<WebFetchResponse> {
        if request.url.is_empty() {
            return Err(ClientError::InvalidRequest("url is required".into()));
        }
        let url = format!("{}/api/web_fetch", self.web_host);
        tracing::debug!(url = %url, target = %request.url, "sending web fetch");
        self.post_json(&url, &request).await
    }

    // ─── Transport ───────────────────────────────────────────────────────────

    /// Send a request and map non-success statuses to errors.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.headers(self.headers.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(status = %status, error = %e, "failed to read error response body");
                    return Err(ClientError::Network(e));
                }
            };
            return Err(map_http_status(status, &body));
        }
        Ok(response)
    }

    async fn get<R: DeserializeOwned>(&self, endpoint: &'static str) -> Result<R> {
        let url = self.url(endpoint);
        tracing::debug!(url = %url, "sending request to Ollama");
        let response = self.send(self.http.get(&url)).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Buffered path: the whole body is one JSON document.
    async fn post<B, R>(&self, endpoint: &'static str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        let body = serde_json::to_value(body)?;
        tracing::debug!(url = %url, model = %body["model"], stream = false, "sending request to Ollama");
        self.post_json(&url, &body).await
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(self.http.post(url).json(body)).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Streaming path: the body is NDJSON, handed back as an [`AbortableStream`].
    ///
    /// The call is registered before the request is sent, so `abort_all`
    /// also cancels requests still waiting for response headers.
    async fn post_stream<B, R>(&self, endpoint: &'static str, body: &B) -> Result<AbortableStream<R>>
    where
        B: Serialize + ?Sized,
        R: StreamRecord,
    {
        let url = self.url(endpoint);
        let body = serde_json::to_value(body)?;
        let token = CancellationToken::new();
        let id = self.active.register(endpoint, token.clone());
        let registration = self.active.guard(id);

        tracing::debug!(
            url = %url,
            model = %body["model"],
            call = %id,
            stream = true,
            "sending streaming request to Ollama"
        );

        // Any early return or drop of this future unregisters through the guard.
        let request = self.http.post(&url).json(&body);
        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                let empty = stream::empty::<Result<StreamFrame<R>>>();
                let cleanup = registration.into_cleanup();
                return Ok(AbortableStream::new(empty, token.clone(), cleanup));
            }
            response = self.send(request) => response?,
        };
        if response.content_length() == Some(0) {
            return Err(ClientError::MissingBody);
        }

        Ok(AbortableStream::from_ndjson(
            response.bytes_stream(),
            token,
            registration.into_cleanup(),
        ))
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_is_set() {
        let client = Ollama::new();
        assert_eq!(client.host(), DEFAULT_HOST);
    }

    #[test]
    fn config_host_is_normalized() {
        let client = Ollama::with_config(ClientConfig::default().host("gpu-box")).unwrap();
        assert_eq!(client.host(), "http://gpu-box:11434");
    }

    #[test]
    fn invalid_host_is_rejected() {
        let err = Ollama::with_config(ClientConfig::default().host("http://")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidHost(_)));
    }

    #[test]
    fn url_includes_api_prefix() {
        let client = Ollama::with_config(ClientConfig::default().host(":9999")).unwrap();
        assert_eq!(client.url("chat"), "http://127.0.0.1:9999/api/chat");
    }

    #[test]
    fn web_host_trailing_slash_is_dropped() {
        let client =
            Ollama::with_config(ClientConfig::default().web_host("http://127.0.0.1:9/")).unwrap();
        assert_eq!(client.web_host, "http://127.0.0.1:9");
        assert_eq!(Ollama::new().web_host, DEFAULT_WEB_HOST);
    }

    #[tokio::test]
    async fn empty_web_search_query_is_rejected_locally() {
        let err = Ollama::new()
            .web_search(WebSearchRequest::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(m) if m == "query is required"));
    }

    #[tokio::test]
    async fn empty_web_fetch_url_is_rejected_locally() {
        let err = Ollama::new()
            .web_fetch(WebFetchRequest::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(m) if m == "url is required"));
    }

    #[test]
    fn default_impl_matches_new() {
        let client = Ollama::default();
        assert_eq!(client.host(), DEFAULT_HOST);
        assert_eq!(client.active_streams(), 0);
    }

    #[test]
    fn abort_all_with_nothing_open() {
        assert_eq!(Ollama::new().abort_all(), 0);
    }
}
