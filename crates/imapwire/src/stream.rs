//! Incremental response stream driver.
//!
//! [`ResponseStream`] pulls bytes from an async transport, assembles lines
//! across arbitrary chunk boundaries, collects buffered literals, and hands
//! streamed body literals to the caller through a bounded channel so that a
//! slow consumer pushes back on the producer.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::trace;

use crate::decode::{MailboxDecoder, NoopDecoder};
use crate::parser::expr::{LiteralQueue, LITERAL_PLACEHOLDER};
use crate::parser::response::types::{TaggedReply, TextCode, UntaggedReply};
use crate::parser::response::{
    body_literal_suffix, literal_suffix, parse_line, prefix, LinePrefix, LiteralSuffix, Reply,
};
use crate::{Error, Result};

/// Body chunks buffered ahead of the consumer before the producer suspends.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// One parsed item from the response stream.
#[derive(Debug)]
pub enum Event {
    /// Terminal reply to a command.
    Tagged(TaggedReply),
    /// Server data or status not tied to a command.
    Untagged(UntaggedReply),
    /// Command continuation request.
    Continuation {
        /// Optional bracketed code.
        code: Option<TextCode>,
        /// Free text after the marker, when present.
        text: Option<String>,
    },
    /// A streamed `BODY[section]` literal. Emitted before any of its bytes
    /// are delivered; drain the [`BodyReader`] while continuing to poll
    /// [`ResponseStream::next_event`].
    Body {
        /// Which message and section the bytes belong to.
        meta: BodyMeta,
        /// Receiving side of the body byte channel.
        reader: BodyReader,
    },
    /// A line matching no known shape, passed through verbatim.
    Other(String),
}

impl From<Reply> for Event {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Tagged(tagged) => Self::Tagged(tagged),
            Reply::Untagged(untagged) => Self::Untagged(untagged),
            Reply::Continuation { code, text } => Self::Continuation { code, text },
            Reply::Other(line) => Self::Other(line),
        }
    }
}

/// Identifies a streamed body literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyMeta {
    /// Message sequence number from the line prefix.
    pub seqno: u32,
    /// Section name from inside `BODY[...]`.
    pub section: String,
    /// Declared octet count.
    pub size: usize,
}

/// Receiving half of a streamed body literal.
///
/// Bytes are pushed by [`ResponseStream::next_event`] as they arrive off the
/// wire; the channel is bounded, so leaving chunks unread eventually suspends
/// the stream until they are consumed.
#[derive(Debug)]
pub struct BodyReader {
    rx: mpsc::Receiver<Result<Bytes>>,
}

impl BodyReader {
    /// Receives the next chunk. `None` means the body is complete.
    pub async fn chunk(&mut self) -> Option<Result<Bytes>> {
        self.rx.recv().await
    }

    /// Drains the body into one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LiteralUnderrun`] if the transport closed before the
    /// declared byte count arrived.
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.rx.recv().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

enum Pending {
    /// Accumulating line text.
    Line,
    /// Collecting a buffered literal destined for the queue.
    Buffered {
        remaining: usize,
        collected: Vec<u8>,
    },
    /// Forwarding a streamed body literal to its reader.
    Body {
        remaining: usize,
        tx: mpsc::Sender<Result<Bytes>>,
    },
}

/// Incremental parser over an async byte source.
///
/// Chunk boundaries carry no meaning: a line, a literal declaration, or a
/// body may arrive split at any byte and the produced events are identical.
pub struct ResponseStream<S, D = NoopDecoder> {
    reader: S,
    decoder: D,
    buf: BytesMut,
    line: String,
    literals: LiteralQueue,
    pending: Pending,
    eof: bool,
}

impl<S> ResponseStream<S>
where
    S: AsyncRead + Unpin,
{
    /// Creates a stream that leaves mailbox names unmodified.
    pub fn new(reader: S) -> Self {
        Self::with_decoder(reader, NoopDecoder)
    }
}

impl<S, D> ResponseStream<S, D>
where
    S: AsyncRead + Unpin,
    D: MailboxDecoder,
{
    /// Creates a stream that routes mailbox names through `decoder`.
    pub fn with_decoder(reader: S, decoder: D) -> Self {
        Self {
            reader,
            decoder,
            buf: BytesMut::with_capacity(8 * 1024),
            line: String::new(),
            literals: LiteralQueue::new(),
            pending: Pending::Line,
            eof: false,
        }
    }

    /// Returns the next event, or `None` once the transport is exhausted.
    ///
    /// While a body literal is in flight this call also pumps its bytes into
    /// the matching [`BodyReader`]; it suspends when the reader's channel is
    /// full.
    ///
    /// # Errors
    ///
    /// I/O errors from the transport, [`Error::LiteralUnderrun`] when it
    /// closes mid-literal, and parse errors for lines whose declared shape
    /// does not hold together.
    pub async fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            match std::mem::replace(&mut self.pending, Pending::Line) {
                Pending::Line => {}
                Pending::Buffered {
                    mut remaining,
                    mut collected,
                } => {
                    let take = remaining.min(self.buf.len());
                    collected.extend_from_slice(&self.buf.split_to(take));
                    remaining -= take;
                    if remaining > 0 {
                        if self.eof {
                            return Err(Error::LiteralUnderrun { missing: remaining });
                        }
                        self.pending = Pending::Buffered {
                            remaining,
                            collected,
                        };
                        self.fill().await?;
                        continue;
                    }
                    self.literals.push_back(collected);
                }
                Pending::Body { mut remaining, tx } => {
                    let take = remaining.min(self.buf.len());
                    if take > 0 {
                        let chunk = self.buf.split_to(take).freeze();
                        remaining -= take;
                        // A dropped reader skips delivery but the bytes are
                        // still consumed to keep the stream in sync
                        let _ = tx.send(Ok(chunk)).await;
                    }
                    if remaining > 0 {
                        if self.eof {
                            let _ = tx
                                .send(Err(Error::LiteralUnderrun { missing: remaining }))
                                .await;
                            return Err(Error::LiteralUnderrun { missing: remaining });
                        }
                        self.pending = Pending::Body { remaining, tx };
                        self.fill().await?;
                        continue;
                    }
                    // tx drops here, signalling end of body data
                }
            }

            if let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
                let raw = self.buf.split_to(idx + 1);
                self.line.push_str(&String::from_utf8_lossy(&raw[..idx]));
                let line = std::mem::take(&mut self.line);
                let trimmed = line.trim();
                trace!(line = trimmed, "response line");
                if let Some(event) = self.classify(trimmed)? {
                    return Ok(Some(event));
                }
                continue;
            }

            self.line.push_str(&String::from_utf8_lossy(&self.buf));
            self.buf.clear();
            if self.eof {
                if !self.line.trim().is_empty() {
                    trace!(partial = self.line.as_str(), "dropping unterminated line");
                }
                return Ok(None);
            }
            self.fill().await?;
        }
    }

    /// Classifies a completed line, either producing an event or switching
    /// into a literal-collection state.
    fn classify(&mut self, line: &str) -> Result<Option<Event>> {
        match prefix(line) {
            LinePrefix::Untagged => {
                if let Some(body) = body_literal_suffix(line) {
                    // The line prefix stays buffered; whatever follows the
                    // body completes it on a later iteration
                    self.line = line[..body.truncate_at].to_string();
                    let (tx, rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
                    if body.size > 0 {
                        self.pending = Pending::Body {
                            remaining: body.size,
                            tx,
                        };
                    }
                    return Ok(Some(Event::Body {
                        meta: BodyMeta {
                            seqno: body.seqno,
                            section: body.section,
                            size: body.size,
                        },
                        reader: BodyReader { rx },
                    }));
                }
                if let Some(lit) = literal_suffix(line) {
                    self.begin_buffered(line, lit);
                    return Ok(None);
                }
            }
            LinePrefix::Tagged => {
                if let Some(lit) = literal_suffix(line) {
                    self.begin_buffered(line, lit);
                    return Ok(None);
                }
            }
            LinePrefix::Continuation | LinePrefix::Other => {}
        }

        let reply = parse_line(line, &mut self.literals, &self.decoder)?;
        Ok(Some(Event::from(reply)))
    }

    /// Replaces the trailing `{n}` with a placeholder and starts collecting
    /// the declared bytes.
    fn begin_buffered(&mut self, line: &str, lit: LiteralSuffix) {
        let mut kept = line[..lit.truncate_at].to_string();
        kept.push(LITERAL_PLACEHOLDER);
        self.line = kept;
        if lit.size == 0 {
            self.literals.push_back(Vec::new());
        } else {
            self.pending = Pending::Buffered {
                remaining: lit.size,
                collected: Vec::with_capacity(lit.size),
            };
        }
    }

    async fn fill(&mut self) -> Result<()> {
        if self.eof {
            return Ok(());
        }
        let n = self.reader.read_buf(&mut self.buf).await?;
        if n == 0 {
            self.eof = true;
        }
        Ok(())
    }
}
