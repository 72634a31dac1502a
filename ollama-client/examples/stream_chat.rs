//! Stream a chat reply and abort it if it runs too long.
//!
//! Make sure Ollama is running locally and run:
//!   RUST_LOG=ollama_client=debug cargo run --example stream_chat

use std::io::Write;
use std::time::Duration;

use futures::StreamExt;
use ollama_client::{ChatRequest, Message, Ollama, StreamState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Ollama::from_env()?;
    let request = ChatRequest::new(
        "llama3.2",
        vec![
            Message::system("Answer in at most three sentences."),
            Message::user("Why is the sky blue?"),
        ],
    );

    let mut stream = client.chat_stream(request).await?;

    let handle = stream.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.abort();
    });

    let mut stdout = std::io::stdout();
    while let Some(part) = stream.next().await {
        let part = part?;
        if let Some(thinking) = &part.message.thinking {
            write!(stdout, "\x1b[2m{thinking}\x1b[0m")?;
        }
        write!(stdout, "{}", part.message.content)?;
        stdout.flush()?;
        if part.done {
            println!();
            println!(
                "Tokens: {} in / {} out",
                part.prompt_eval_count.unwrap_or_default(),
                part.eval_count.unwrap_or_default()
            );
        }
    }

    if stream.state() == StreamState::Aborted {
        println!("\n(aborted after 10s)");
    }
    Ok(())
}
