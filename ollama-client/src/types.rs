//! Ollama HTTP API request/response types.
//!
//! Notes on the wire format:
//! - Every endpoint lives under `/api/` on the configured host
//! - Streaming endpoints answer with NDJSON, one record per line
//! - Chat and generate records end with `done: true`; pull, push and create
//!   progress records end with `status: "success"`
//! - Tool call arguments are JSON objects (not strings)
//! - Timing fields are nanoseconds

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::records::StreamRecord;

/// Encode raw image bytes as the base64 string the `images` fields expect.
pub fn encode_image(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ─── Chat ────────────────────────────────────────────────────────────────────

/// `/api/chat` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "llama3.2").
    pub model: String,
    /// Conversation history, oldest first.
    pub messages: Vec<Message>,
    /// Set by the client: `chat` sends `false`, `chat_stream` sends `true`.
    pub stream: bool,
    /// `"json"` or a JSON schema constraining the output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    /// How long to keep the model loaded in memory (e.g. "5m", "0").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Tools available to the model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    /// Ask thinking-capable models to return their reasoning separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    /// Sampling and runtime options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

impl ChatRequest {
    /// Create a chat request for `model` with the given history.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Declare tools the model may call.
    #[must_use]
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Set sampling options.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Enable or disable separate thinking output.
    #[must_use]
    pub fn think(mut self, think: bool) -> Self {
        self.think = Some(think);
        self
    }

    /// Constrain the output format.
    #[must_use]
    pub fn format(mut self, format: serde_json::Value) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the `keep_alive` duration.
    #[must_use]
    pub fn keep_alive(mut self, duration: impl Into<String>) -> Self {
        self.keep_alive = Some(duration.into());
        self
    }
}

/// A chat message, used both in requests and in response records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant", or "tool".
    #[serde(default)]
    pub role: String,
    /// Message text content.
    #[serde(default)]
    pub content: String,
    /// Reasoning text from thinking-capable models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Base64-encoded images (see [`encode_image`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// Tool calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Name of the tool whose result this message carries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    /// A tool result message for `tool_name`.
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::with_role("tool", content)
        }
    }

    /// Attach base64-encoded images.
    #[must_use]
    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }
}

/// A tool call in a chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// The function being called.
    pub function: FunctionCall,
}

/// A function call within a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call.
    pub name: String,
    /// Arguments as a JSON object.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Tool definition offered to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// The type of tool (always "function").
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The function definition.
    pub function: ToolFunction,
}

impl Tool {
    /// A function tool with a JSON Schema for its parameters.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".into(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function definition within a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolFunction {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// JSON Schema for the function parameters.
    pub parameters: serde_json::Value,
}

/// Sampling and runtime options. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Options {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    /// Context window size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    /// Top-p (nucleus sampling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Minimum probability relative to the most likely token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Penalty applied to repeated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f64>,
    /// Penalty for tokens already present in the output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Penalty scaled by how often a token has appeared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Stop sequences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Number of CPU threads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
}

/// One `/api/chat` record: a streamed fragment, or the whole buffered reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponse {
    /// Model that generated the response.
    #[serde(default)]
    pub model: String,
    /// RFC 3339 creation timestamp.
    #[serde(default)]
    pub created_at: String,
    /// The assistant's message fragment.
    #[serde(default)]
    pub message: Message,
    /// Whether this is the final record.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped (e.g. "stop", "length").
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Status line, when the server reports one instead of `done`.
    #[serde(default)]
    pub status: Option<String>,
    /// Total time spent generating the response.
    #[serde(default)]
    pub total_duration: Option<u64>,
    /// Time spent loading the model.
    #[serde(default)]
    pub load_duration: Option<u64>,
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Time spent evaluating the prompt.
    #[serde(default)]
    pub prompt_eval_duration: Option<u64>,
    /// Number of tokens generated.
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Time spent generating tokens.
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

impl StreamRecord for ChatResponse {
    fn is_terminal(&self) -> bool {
        self.done || self.status.as_deref() == Some("success")
    }
}

// ─── Generate ────────────────────────────────────────────────────────────────

/// `/api/generate` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateRequest {
    /// Model identifier.
    pub model: String,
    /// Prompt text.
    pub prompt: String,
    /// Set by the client.
    pub stream: bool,
    /// Text after the model response (fill-in-the-middle).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// System prompt override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Prompt template override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Context returned by a previous generate call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
    /// Bypass templating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,
    /// `"json"` or a JSON schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    /// Base64-encoded images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// How long to keep the model loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Separate thinking output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    /// Sampling and runtime options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

impl GenerateRequest {
    /// Create a generate request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// One `/api/generate` record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateResponse {
    /// Model that generated the response.
    #[serde(default)]
    pub model: String,
    /// RFC 3339 creation timestamp.
    #[serde(default)]
    pub created_at: String,
    /// Generated text fragment.
    #[serde(default)]
    pub response: String,
    /// Reasoning fragment.
    #[serde(default)]
    pub thinking: Option<String>,
    /// Whether this is the final record.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped.
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Status line, when the server reports one instead of `done`.
    #[serde(default)]
    pub status: Option<String>,
    /// Conversation context to pass to the next call.
    #[serde(default)]
    pub context: Option<Vec<i64>>,
    /// Total time spent generating the response.
    #[serde(default)]
    pub total_duration: Option<u64>,
    /// Time spent loading the model.
    #[serde(default)]
    pub load_duration: Option<u64>,
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Time spent evaluating the prompt.
    #[serde(default)]
    pub prompt_eval_duration: Option<u64>,
    /// Number of tokens generated.
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Time spent generating tokens.
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

impl StreamRecord for GenerateResponse {
    fn is_terminal(&self) -> bool {
        self.done || self.status.as_deref() == Some("success")
    }
}

// ─── Model management ────────────────────────────────────────────────────────

/// `/api/pull` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullRequest {
    /// Model to pull.
    #[serde(rename = "name")]
    pub model: String,
    /// Allow registries without verified TLS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Set by the client.
    pub stream: bool,
}

/// `/api/push` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushRequest {
    /// Model to push, as `namespace/model:tag`.
    #[serde(rename = "name")]
    pub model: String,
    /// Allow registries without verified TLS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Set by the client.
    pub stream: bool,
}

/// `/api/create` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRequest {
    /// Name of the model to create.
    pub model: String,
    /// Existing model to derive from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Quantization level (e.g. "q4_K_M").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantize: Option<String>,
    /// Prompt template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Model license text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Default parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
    /// Set by the client.
    pub stream: bool,
}

/// Progress record streamed by pull, push and create.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressResponse {
    /// Human-readable status; `"success"` ends the stream.
    #[serde(default)]
    pub status: String,
    /// Digest of the layer being transferred.
    #[serde(default)]
    pub digest: Option<String>,
    /// Total bytes of the current layer.
    #[serde(default)]
    pub total: Option<u64>,
    /// Bytes transferred so far.
    #[serde(default)]
    pub completed: Option<u64>,
}

impl StreamRecord for ProgressResponse {
    fn is_terminal(&self) -> bool {
        self.status == "success"
    }
}

/// `/api/delete` request body.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteRequest {
    /// Model to delete.
    #[serde(rename = "name")]
    pub model: String,
}

/// `/api/copy` request body.
#[derive(Debug, Clone, Serialize)]
pub struct CopyRequest {
    /// Existing model name.
    pub source: String,
    /// New model name.
    pub destination: String,
}

/// Result of operations that answer with a bare status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusResponse {
    /// `"success"` when the operation completed.
    pub status: String,
}

impl StatusResponse {
    pub(crate) fn success() -> Self {
        Self {
            status: "success".into(),
        }
    }
}

/// `/api/show` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShowRequest {
    /// Model to describe.
    pub model: String,
    /// Override the returned system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Override the returned template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Include full tokenizer data in `model_info`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

/// `/api/show` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowResponse {
    /// License text.
    #[serde(default)]
    pub license: String,
    /// Modelfile source.
    #[serde(default)]
    pub modelfile: String,
    /// Parameter lines from the Modelfile.
    #[serde(default)]
    pub parameters: String,
    /// Prompt template.
    #[serde(default)]
    pub template: String,
    /// System prompt.
    #[serde(default)]
    pub system: String,
    /// Format and family details.
    #[serde(default)]
    pub details: ModelDetails,
    /// Messages baked into the model.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Last modification timestamp.
    #[serde(default)]
    pub modified_at: String,
    /// Architecture metadata.
    #[serde(default)]
    pub model_info: serde_json::Map<String, serde_json::Value>,
    /// Features the model supports (e.g. "completion", "tools").
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Format and family details of a model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelDetails {
    /// Model this one was derived from.
    #[serde(default)]
    pub parent_model: String,
    /// Weight file format (e.g. "gguf").
    #[serde(default)]
    pub format: String,
    /// Model family.
    #[serde(default)]
    pub family: String,
    /// All families the model belongs to.
    #[serde(default)]
    pub families: Option<Vec<String>>,
    /// Parameter count label (e.g. "8B").
    #[serde(default)]
    pub parameter_size: String,
    /// Quantization level.
    #[serde(default)]
    pub quantization_level: String,
}

/// Entry of `/api/tags` and `/api/ps`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelResponse {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Model identifier.
    #[serde(default)]
    pub model: String,
    /// Last modification timestamp.
    #[serde(default)]
    pub modified_at: Option<String>,
    /// Size on disk in bytes.
    #[serde(default)]
    pub size: u64,
    /// Content digest.
    #[serde(default)]
    pub digest: String,
    /// Format and family details.
    #[serde(default)]
    pub details: ModelDetails,
    /// When a running model will be unloaded (`/api/ps` only).
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Bytes of VRAM in use (`/api/ps` only).
    #[serde(default)]
    pub size_vram: Option<u64>,
}

/// `/api/tags` and `/api/ps` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListResponse {
    /// Models known to (or loaded by) the server.
    #[serde(default)]
    pub models: Vec<ModelResponse>,
}

// ─── Embeddings ──────────────────────────────────────────────────────────────

/// Single or batched embedding input.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EmbedInput {
    /// One text.
    Single(String),
    /// Several texts embedded in one call.
    Batch(Vec<String>),
}

/// `/api/embed` request body.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Embedding model.
    pub model: String,
    /// Text(s) to embed.
    pub input: EmbedInput,
    /// Truncate inputs longer than the context window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
    /// Output dimensions, for models that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// How long to keep the model loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Runtime options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

/// `/api/embed` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedResponse {
    /// Model that produced the embeddings.
    #[serde(default)]
    pub model: String,
    /// One vector per input.
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
    /// Total time spent.
    #[serde(default)]
    pub total_duration: Option<u64>,
    /// Time spent loading the model.
    #[serde(default)]
    pub load_duration: Option<u64>,
    /// Number of input tokens.
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
}

/// Legacy `/api/embeddings` request body.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingsRequest {
    /// Embedding model.
    pub model: String,
    /// Text to embed.
    pub prompt: String,
    /// How long to keep the model loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Runtime options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

/// Legacy `/api/embeddings` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingsResponse {
    /// The embedding vector.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

// ─── Web ─────────────────────────────────────────────────────────────────────

/// `/api/web_search` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebSearchRequest {
    /// Search query. Must not be empty.
    pub query: String,
    /// Maximum number of results to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

impl WebSearchRequest {
    /// Search for `query` with the server's default result count.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
        }
    }

    /// Cap the number of results.
    #[must_use]
    pub fn max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }
}

/// One hit of a web search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebSearchResult {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Extracted page content.
    #[serde(default)]
    pub content: String,
}

/// `/api/web_search` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSearchResponse {
    /// Results in ranked order.
    #[serde(default)]
    pub results: Vec<WebSearchResult>,
}

/// `/api/web_fetch` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebFetchRequest {
    /// Page to fetch. Must not be empty.
    pub url: String,
}

impl WebFetchRequest {
    /// Fetch `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// `/api/web_fetch` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebFetchResponse {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Extracted page content.
    #[serde(default)]
    pub content: String,
    /// Links found on the page.
    #[serde(default)]
    pub links: Vec<String>,
}

/// `/api/version` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    /// Server version string.
    pub version: String,
}
