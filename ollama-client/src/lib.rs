#![deny(missing_docs)]
//! Client for the Ollama HTTP API with cancellable NDJSON streaming.
//!
//! Each endpoint that can stream comes in two forms: a buffered call that
//! returns one decoded response, and a `_stream` call that returns an
//! [`AbortableStream`] of records as the server produces them.
//!
//! # Streaming pipeline
//!
//! - [`lines()`]: reassembles arbitrary byte chunks into lines, carrying split
//!   UTF-8 sequences across chunk boundaries
//! - [`records()`]: decodes each line, skipping malformed ones with a warning
//! - [`AbortableStream`]: detects the terminal record, surfaces error records,
//!   and supports cooperative cancellation with exactly-once cleanup
//! - [`ActiveCalls`]: the per-client set of live streams behind
//!   [`Ollama::abort_all`]
//!
//! ```no_run
//! use futures::StreamExt;
//! use ollama_client::{ChatRequest, Message, Ollama};
//!
//! # async fn run() -> ollama_client::Result<()> {
//! let client = Ollama::new();
//! let mut stream = client
//!     .chat_stream(ChatRequest::new("llama3.2", vec![Message::user("Why is the sky blue?")]))
//!     .await?;
//!
//! while let Some(part) = stream.next().await {
//!     let part = part?;
//!     print!("{}", part.message.content);
//!     if part.message.content.contains("purple") {
//!         stream.abort();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod abortable;
pub mod client;
pub mod config;
pub mod error;
pub mod lines;
pub mod records;
pub mod registry;
pub mod types;

pub use abortable::{AbortHandle, AbortableStream, StreamState};
pub use client::Ollama;
pub use config::{ClientConfig, format_host};
pub use error::{ClientError, Result};
pub use lines::{LineAssembler, lines};
pub use records::{StreamFrame, StreamRecord, parse_line, records};
pub use registry::{ActiveCalls, CallId};
pub use types::*;
