//! Reassembles an HTTP body delivered in arbitrary byte chunks into lines.
//!
//! Chunk boundaries carry no meaning: a chunk may end in the middle of a line,
//! in the middle of a multi-byte UTF-8 character, or right on a newline.
//! [`LineAssembler`] holds the undelimited tail and any incomplete UTF-8
//! sequence until the next chunk arrives. [`lines`] drives it from a byte
//! stream and stops reading as soon as the cancellation token fires.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

/// Incremental UTF-8 decoder and line splitter for one response body.
#[derive(Debug, Default)]
pub struct LineAssembler {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    partial: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    buffer: String,
}

impl LineAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, in order.
    ///
    /// Returned lines exclude the `\n` delimiter. Consecutive newlines yield
    /// empty lines. After this returns, the internal buffer holds no newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.decode(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.buffer, tail);
        complete.pop();
        complete.split('\n').map(str::to_string).collect()
    }

    /// Bytes and characters held back waiting for more input.
    pub fn pending_len(&self) -> usize {
        self.partial.len() + self.buffer.len()
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, invalid) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &invalid[len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for the next chunk.
                            self.partial = invalid.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Turn a byte stream into a stream of complete lines.
///
/// The token is checked at every read; once it fires the body is dropped and
/// the stream ends. A transport error is yielded once and ends the stream. An
/// unterminated trailing line is discarded.
pub fn lines<S, E>(
    byte_stream: S,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    async_stream::stream! {
        let mut assembler = LineAssembler::new();
        let mut byte_stream = std::pin::pin!(byte_stream);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("stream cancelled, closing body");
                    break;
                }
                next = byte_stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for line in assembler.push(&chunk) {
                        yield Ok(line);
                    }
                }
                Some(Err(e)) => {
                    yield Err(e.into());
                    break;
                }
                None => {
                    if assembler.pending_len() > 0 {
                        tracing::debug!(
                            pending = assembler.pending_len(),
                            "discarding unterminated trailing line"
                        );
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_multiple_lines() {
        let mut asm = LineAssembler::new();
        let lines = asm.push(b"{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert_eq!(asm.pending_len(), 0);
    }

    #[test]
    fn line_split_across_chunks() {
        let mut asm = LineAssembler::new();
        assert!(asm.push(b"{\"mess").is_empty());
        assert!(asm.push(b"age\":\"hi\"").is_empty());
        assert_eq!(asm.push(b"}\n{\"x"), vec![r#"{"message":"hi"}"#]);
        assert_eq!(asm.pending_len(), 3);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let text = "你好\n";
        let bytes = text.as_bytes();
        let mut asm = LineAssembler::new();
        // "你" is three bytes; split after the first.
        assert!(asm.push(&bytes[..1]).is_empty());
        assert!(asm.push(&bytes[1..4]).is_empty());
        assert_eq!(asm.push(&bytes[4..]), vec!["你好"]);
    }

    #[test]
    fn byte_at_a_time() {
        let payload = "héllo\nwörld\n🦀\n";
        let mut asm = LineAssembler::new();
        let mut out = Vec::new();
        for b in payload.as_bytes() {
            out.extend(asm.push(std::slice::from_ref(b)));
        }
        assert_eq!(out, vec!["héllo", "wörld", "🦀"]);
    }

    #[test]
    fn empty_chunk_emits_nothing() {
        let mut asm = LineAssembler::new();
        assert!(asm.push(b"").is_empty());
        asm.push(b"abc");
        assert!(asm.push(b"").is_empty());
        assert_eq!(asm.pending_len(), 3);
    }

    #[test]
    fn consecutive_newlines_yield_empty_lines() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"a\n\n\nb\n"), vec!["a", "", "", "b"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"a\xffb\n"), vec!["a\u{FFFD}b"]);
    }

    #[tokio::test]
    async fn stream_discards_unterminated_tail() {
        let chunks: Vec<std::result::Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"one\ntw")),
            Ok(Bytes::from_static(b"o\nthree")),
        ];
        let out: Vec<String> = lines(futures::stream::iter(chunks), CancellationToken::new())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(out, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn stream_yields_transport_error_and_stops() {
        let chunks: Vec<std::result::Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"one\n")),
            Err(ClientError::MissingBody),
            Ok(Bytes::from_static(b"two\n")),
        ];
        let out: Vec<Result<String>> =
            lines(futures::stream::iter(chunks), CancellationToken::new())
                .collect()
                .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "one");
        assert!(matches!(out[1], Err(ClientError::MissingBody)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_reading() {
        let token = CancellationToken::new();
        token.cancel();
        let chunks: Vec<std::result::Result<Bytes, ClientError>> =
            vec![Ok(Bytes::from_static(b"one\n"))];
        let out: Vec<Result<String>> = lines(futures::stream::iter(chunks), token)
            .collect()
            .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn cancel_wakes_pending_read() {
        let token = CancellationToken::new();
        let stream = lines(
            futures::stream::pending::<std::result::Result<Bytes, ClientError>>(),
            token.clone(),
        );
        let canceller = tokio::spawn(async move {
            tokio::task::yield_now().await;
            token.cancel();
        });
        let out: Vec<Result<String>> = stream.collect().await;
        assert!(out.is_empty());
        canceller.await.unwrap();
    }
}
