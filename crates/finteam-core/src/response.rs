use crate::error::FinteamError;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// One piece of a dispatched response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseChunk {
    /// Answer text, in order. Concatenating all of them yields the answer.
    Content(String),
    /// Emitted only by agents configured to show their tool calls.
    ToolCall {
        agent: String,
        tool: String,
        arguments: String,
    },
}

impl ResponseChunk {
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Content(text) => Some(text),
            Self::ToolCall { .. } => None,
        }
    }
}

/// Finite, non-restartable, cancellable sequence of response chunks.
///
/// Consume it incrementally as a [`Stream`], or eagerly with
/// [`ResponseStream::collect_text`]. Dropping or cancelling it stops the
/// producer at its next emit.
pub struct ResponseStream {
    rx: UnboundedReceiver<Result<ResponseChunk, FinteamError>>,
    cancelled: bool,
}

impl ResponseStream {
    pub fn channel() -> (ChunkSink, Self) {
        let (tx, rx) = mpsc::unbounded();
        (
            ChunkSink {
                tx,
                forward_content: true,
            },
            Self {
                rx,
                cancelled: false,
            },
        )
    }

    /// Stream over chunks that are already known.
    pub fn from_chunks(chunks: impl IntoIterator<Item = ResponseChunk>) -> Self {
        let (sink, stream) = Self::channel();
        for chunk in chunks {
            let _ = sink.emit(chunk);
        }
        stream
    }

    /// Stops the stream. Chunks not yet consumed are discarded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Buffers every content chunk into one string. The first error ends
    /// collection.
    pub async fn collect_text(mut self) -> Result<String, FinteamError> {
        let mut text = String::new();
        while let Some(item) = self.next().await {
            if let ResponseChunk::Content(delta) = item? {
                text.push_str(&delta);
            }
        }
        Ok(text)
    }

    pub async fn collect_chunks(mut self) -> Result<Vec<ResponseChunk>, FinteamError> {
        let mut chunks = Vec::new();
        while let Some(item) = self.next().await {
            chunks.push(item?);
        }
        Ok(chunks)
    }
}

impl Stream for ResponseStream {
    type Item = Result<ResponseChunk, FinteamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        self.rx.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Producer half of a [`ResponseStream`].
#[derive(Clone)]
pub struct ChunkSink {
    tx: UnboundedSender<Result<ResponseChunk, FinteamError>>,
    forward_content: bool,
}

impl ChunkSink {
    /// Fails with [`FinteamError::Cancelled`] once the consumer is gone.
    pub fn emit(&self, chunk: ResponseChunk) -> Result<(), FinteamError> {
        if !self.forward_content && matches!(chunk, ResponseChunk::Content(_)) {
            return self.check_open();
        }
        self.tx
            .unbounded_send(Ok(chunk))
            .map_err(|_| FinteamError::Cancelled)
    }

    /// Ends the stream with an error item.
    pub fn fail(&self, error: FinteamError) {
        let _ = self.tx.unbounded_send(Err(error));
    }

    pub fn check_open(&self) -> Result<(), FinteamError> {
        if self.tx.is_closed() {
            Err(FinteamError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// A sink that passes tool-call chunks through but drops content.
    /// Member agents write to one of these so only the leader's answer
    /// reaches the caller.
    pub fn tool_calls_only(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            forward_content: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_text_skips_tool_calls() {
        let stream = ResponseStream::from_chunks(vec![
            ResponseChunk::ToolCall {
                agent: "Web Agent".into(),
                tool: "duckduckgo_search".into(),
                arguments: "{}".into(),
            },
            ResponseChunk::Content("Hello".into()),
            ResponseChunk::Content(" world".into()),
        ]);
        assert_eq!(stream.collect_text().await.unwrap(), "Hello world");
    }

    #[tokio::test]
    async fn test_error_item_ends_collection() {
        let (sink, stream) = ResponseStream::channel();
        sink.emit(ResponseChunk::Content("partial".into())).unwrap();
        sink.fail(FinteamError::Llm("boom".into()));
        drop(sink);
        let err = stream.collect_text().await.unwrap_err();
        assert!(matches!(err, FinteamError::Llm(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn test_cancel_stops_producer() {
        let (sink, mut stream) = ResponseStream::channel();
        sink.emit(ResponseChunk::Content("a".into())).unwrap();
        stream.cancel();

        assert!(stream.next().await.is_none());
        assert!(matches!(
            sink.emit(ResponseChunk::Content("b".into())),
            Err(FinteamError::Cancelled)
        ));
        assert!(sink.check_open().is_err());
    }

    #[tokio::test]
    async fn test_tool_calls_only_sink_drops_content() {
        let (sink, stream) = ResponseStream::channel();
        let member = sink.tool_calls_only();
        member.emit(ResponseChunk::Content("hidden".into())).unwrap();
        member
            .emit(ResponseChunk::ToolCall {
                agent: "Finance Agent".into(),
                tool: "get_current_stock_price".into(),
                arguments: r#"{"symbol":"NVDA"}"#.into(),
            })
            .unwrap();
        sink.emit(ResponseChunk::Content("shown".into())).unwrap();
        drop((sink, member));

        let chunks = stream.collect_chunks().await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(matches!(chunks[0], ResponseChunk::ToolCall { .. }));
        assert_eq!(chunks[1].content(), Some("shown"));
    }
}
