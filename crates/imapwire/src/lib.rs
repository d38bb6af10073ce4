//! # imapwire
//!
//! An incremental parser for IMAP server responses (RFC 3501).
//!
//! Bytes go in as they arrive off the socket, typed events come out. Chunk
//! boundaries carry no meaning: a response line, a literal declaration, or a
//! megabyte of body data may be split at any byte and the produced events
//! are identical.
//!
//! ## Features
//!
//! - **Line classification**: tagged replies, untagged data, continuation
//!   requests, and a verbatim pass-through for anything unrecognized
//! - **Literals, both ways**: ordinary `{n}` literals are buffered and
//!   substituted into the line; `BODY[section] {n}` literals on FETCH lines
//!   stream through a bounded channel so large bodies never sit in memory
//! - **Semantic builders**: FETCH attribute maps, ENVELOPE with RFC 2822
//!   address groups, BODYSTRUCTURE trees with dotted part ids, STATUS,
//!   NAMESPACE, LIST/LSUB, and bracketed text codes
//! - **Header parsing**: RFC 2822 header blocks with folded lines
//!
//! ## Quick Start
//!
//! ```ignore
//! use imapwire::{Event, ResponseStream, UntaggedReply};
//!
//! #[tokio::main]
//! async fn main() -> imapwire::Result<()> {
//!     let socket = tokio::net::TcpStream::connect("imap.example.com:143").await?;
//!     let mut stream = ResponseStream::new(socket);
//!
//!     while let Some(event) = stream.next_event().await? {
//!         match event {
//!             Event::Untagged(UntaggedReply::Exists(n)) => println!("{n} messages"),
//!             Event::Body { meta, reader } => {
//!                 let bytes = reader.collect().await?;
//!                 println!("BODY[{}] for #{}: {} bytes", meta.section, meta.seqno, bytes.len());
//!             }
//!             Event::Tagged(reply) => println!("command {} finished: {:?}", reply.tag, reply.status),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: the expression grammar and semantic builders
//! - [`header`]: RFC 2822 header block parsing
//! - [`decode`]: mailbox name decoding hook

#![forbid(unsafe_code)]

pub mod decode;
mod error;
pub mod header;
pub mod parser;
mod stream;

pub use decode::{MailboxDecoder, NoopDecoder};
pub use error::{Error, Result};
pub use header::{parse_header, HeaderMap};
pub use parser::expr::{parse_expr, BracketMode, LiteralQueue, Value, LITERAL_PLACEHOLDER};
pub use parser::response::types::{
    Address, AddressEntry, BodyPart, BodyStructure, Condition, Disposition, Envelope,
    FetchAttributes, FetchValue, ListEntry, MultipartBody, Namespace, NamespaceSet, PartExtra,
    StatusReply, TaggedReply, TextCode, UntaggedReply,
};
pub use parser::response::Reply;
pub use stream::{BodyMeta, BodyReader, Event, ResponseStream};
