//! Tests against a real Ollama server.
//!
//! Run with a server listening on `OLLAMA_HOST` (default `127.0.0.1:11434`)
//! and the model pulled:
//! ```bash
//! ollama pull llama3.2 && cargo test --test live_server -- --ignored
//! ```

use futures::StreamExt;
use ollama_client::{ChatRequest, Message, Ollama, Options, StreamState};

fn client() -> Ollama {
    Ollama::from_env().expect("OLLAMA_HOST is a valid host")
}

#[tokio::test]
#[ignore]
async fn live_version() {
    let version = client().version().await.expect("server reachable");
    assert!(!version.version.is_empty());
}

#[tokio::test]
#[ignore]
async fn live_chat_stream_completes() {
    let client = client();
    let request = ChatRequest::new("llama3.2", vec![Message::user("Say hello in one word.")])
        .options(Options {
            num_predict: Some(16),
            ..Default::default()
        });

    let mut stream = client.chat_stream(request).await.expect("stream opens");
    let mut text = String::new();
    while let Some(part) = stream.next().await {
        text.push_str(&part.expect("no stream error").message.content);
    }

    assert!(!text.is_empty());
    assert_eq!(stream.state(), StreamState::Completed);
    assert_eq!(client.active_streams(), 0);
}

#[tokio::test]
#[ignore]
async fn live_abort_after_first_fragment() {
    let client = client();
    let request = ChatRequest::new(
        "llama3.2",
        vec![Message::user("Count slowly from one to one hundred.")],
    );

    let mut stream = client.chat_stream(request).await.expect("stream opens");
    stream
        .next()
        .await
        .expect("at least one fragment")
        .expect("no stream error");
    stream.abort();

    assert!(stream.next().await.is_none());
    assert_eq!(stream.state(), StreamState::Aborted);
    assert_eq!(client.active_streams(), 0);
}
