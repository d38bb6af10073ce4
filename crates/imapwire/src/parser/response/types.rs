//! Typed response structures produced by the semantic builders.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::parser::expr::Value;

/// Result condition of a tagged reply or an untagged condition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Success.
    Ok,
    /// Operational failure.
    No,
    /// Protocol-level error.
    Bad,
    /// Server is closing the connection.
    Bye,
    /// Connection was pre-authenticated.
    PreAuth,
}

/// Optional bracketed code carried by reply text, e.g. `[READ-WRITE]` or
/// `[UIDVALIDITY 5]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCode {
    /// A bare token.
    Word(String),
    /// A key followed by one or more values, e.g. `[UIDNEXT 4]` or
    /// `[CAPABILITY IMAP4rev1 IDLE]`.
    Pair {
        /// The leading key token.
        key: String,
        /// Everything after the key, in order.
        values: Vec<Value>,
    },
}

/// The terminal reply to a client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedReply {
    /// The numeric portion of the `A<digits>` command tag.
    pub tag: u32,
    /// Result condition.
    pub status: Condition,
    /// Optional bracketed code.
    pub code: Option<TextCode>,
    /// Human-readable text.
    pub text: String,
}

/// Server-initiated data, not correlated to a specific command.
#[derive(Debug, Clone, PartialEq)]
pub enum UntaggedReply {
    /// OK/NO/BAD/BYE/PREAUTH status line.
    Condition {
        /// Which condition.
        status: Condition,
        /// Optional bracketed code.
        code: Option<TextCode>,
        /// Free text, when present.
        text: Option<String>,
    },
    /// `* <n> EXISTS` message count.
    Exists(u32),
    /// `* <n> RECENT` count.
    Recent(u32),
    /// `* <n> EXPUNGE` removal notice.
    Expunge(u32),
    /// `* <n> FETCH (...)` attribute data.
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Parsed attribute map.
        attrs: FetchAttributes,
    },
    /// `* FLAGS (...)` applicable flags.
    Flags(Vec<String>),
    /// `* CAPABILITY ...` tokens.
    Capability(Vec<String>),
    /// `* SEARCH ...` matching sequence numbers or UIDs.
    Search(Vec<u64>),
    /// `* SORT ...` ordered sequence numbers or UIDs.
    Sort(Vec<u64>),
    /// `* LIST ...` mailbox entry.
    List(ListEntry),
    /// `* LSUB ...` subscribed mailbox entry.
    Lsub(ListEntry),
    /// `* STATUS ...` mailbox counters.
    MailboxStatus(StatusReply),
    /// `* NAMESPACE ...` triple.
    Namespace(NamespaceSet),
}

/// One LIST or LSUB entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Name attributes, e.g. `\HasNoChildren`.
    pub flags: Vec<String>,
    /// Hierarchy delimiter, absent when the mailbox is flat.
    pub delimiter: Option<String>,
    /// Decoded mailbox name.
    pub mailbox: String,
}

/// STATUS response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReply {
    /// Decoded mailbox name.
    pub mailbox: String,
    /// Attribute map, keys lowercased.
    pub attrs: HashMap<String, Value>,
}

/// One namespace with its prefix and delimiter.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    /// Mailbox name prefix.
    pub prefix: String,
    /// Hierarchy delimiter.
    pub delimiter: Option<String>,
    /// Extension key/value pairs trailing the record, when present.
    pub extensions: Option<HashMap<String, Value>>,
}

/// The NAMESPACE triple.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamespaceSet {
    /// Personal namespaces.
    pub personal: Option<Vec<Namespace>>,
    /// Other users' namespaces.
    pub other: Option<Vec<Namespace>>,
    /// Shared namespaces.
    pub shared: Option<Vec<Namespace>>,
}

/// Parsed FETCH attribute map.
///
/// Keys are lowercased; server order is preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchAttributes {
    entries: Vec<(String, FetchValue)>,
}

impl FetchAttributes {
    pub(crate) fn push(&mut self, key: String, value: FetchValue) {
        self.entries.push((key, value));
    }

    /// Looks up an attribute by its lowercased key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FetchValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Returns the parsed ENVELOPE, if fetched.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        match self.get("envelope") {
            Some(FetchValue::Envelope(env)) => Some(env),
            _ => None,
        }
    }

    /// Returns the parsed INTERNALDATE, if fetched.
    #[must_use]
    pub fn internal_date(&self) -> Option<DateTime<FixedOffset>> {
        match self.get("internaldate") {
            Some(FetchValue::InternalDate(date)) => Some(*date),
            _ => None,
        }
    }

    /// Returns the parsed BODY or BODYSTRUCTURE tree, if fetched.
    #[must_use]
    pub fn body_structure(&self) -> Option<&BodyStructure> {
        self.entries.iter().find_map(|(k, v)| match v {
            FetchValue::BodyStructure(body) if k == "body" || k == "bodystructure" => Some(body),
            _ => None,
        })
    }

    /// Returns the UID, if fetched.
    #[must_use]
    pub fn uid(&self) -> Option<u64> {
        match self.get("uid") {
            Some(FetchValue::Value(value)) => value.as_number(),
            _ => None,
        }
    }

    /// Iterates entries in server order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FetchValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no attributes were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One FETCH attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchValue {
    /// Parsed ENVELOPE.
    Envelope(Box<Envelope>),
    /// Parsed INTERNALDATE.
    InternalDate(DateTime<FixedOffset>),
    /// Parsed BODY/BODYSTRUCTURE tree.
    BodyStructure(BodyStructure),
    /// Any other attribute, passed through as parsed.
    Value(Value),
}

/// Message header summary returned by FETCH.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header, verbatim.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Option<Vec<AddressEntry>>,
    /// Sender addresses.
    pub sender: Option<Vec<AddressEntry>>,
    /// Reply-To addresses.
    pub reply_to: Option<Vec<AddressEntry>>,
    /// To addresses.
    pub to: Option<Vec<AddressEntry>>,
    /// Cc addresses.
    pub cc: Option<Vec<AddressEntry>>,
    /// Bcc addresses.
    pub bcc: Option<Vec<AddressEntry>>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// One entry in an envelope address list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressEntry {
    /// A plain address.
    Address(Address),
    /// An RFC 2822 address group.
    Group {
        /// Display name of the group.
        name: Option<String>,
        /// Addresses inside the group.
        members: Vec<Address>,
    },
}

/// A single email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl Address {
    /// Returns `mailbox@host` when both parts are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// A MIME structure description, single- or multi-part.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyStructure {
    /// Terminal part.
    Part(Box<BodyPart>),
    /// Composite part with ordered children.
    Multipart(Box<MultipartBody>),
}

impl BodyStructure {
    /// Returns the dotted part id usable in `BODY[<id>]` fetches, when this
    /// node is a terminal part.
    #[must_use]
    pub fn part_id(&self) -> Option<&str> {
        match self {
            Self::Part(part) => Some(&part.part_id),
            Self::Multipart(_) => None,
        }
    }
}

/// A terminal MIME part.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    /// Dotted path id; `"1"` for a root single part.
    pub part_id: String,
    /// Media type, lowercased.
    pub media_type: String,
    /// Media subtype, lowercased; absent for malformed type-only stubs.
    pub subtype: Option<String>,
    /// Body parameters, keys lowercased.
    pub params: Option<HashMap<String, String>>,
    /// Content-ID.
    pub id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Content-Transfer-Encoding.
    pub encoding: Option<String>,
    /// Size in octets.
    pub size: Option<u64>,
    /// Nested envelope, only for `message/rfc822`.
    pub envelope: Option<Box<Envelope>>,
    /// Nested body, only for `message/rfc822`.
    pub body: Option<Box<BodyStructure>>,
    /// Line count, for `text/*` and `message/rfc822`.
    pub lines: Option<u64>,
    /// Body MD5.
    pub md5: Option<String>,
    /// Shared optional trailing fields.
    pub extra: PartExtra,
}

/// A composite MIME part.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartBody {
    /// Multipart subtype, lowercased (e.g. `alternative`).
    pub subtype: String,
    /// Body parameters, keys lowercased.
    pub params: Option<HashMap<String, String>>,
    /// Child parts, in order.
    pub parts: Vec<BodyStructure>,
    /// Shared optional trailing fields.
    pub extra: PartExtra,
}

/// Optional trailing extension fields shared by all body nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartExtra {
    /// Content-Disposition.
    pub disposition: Option<Disposition>,
    /// Content language; a bare string is normalized to a one-element list.
    pub language: Option<Vec<String>>,
    /// Content location URI.
    pub location: Option<String>,
    /// Opaque later-RFC extension data, unparsed.
    pub extensions: Option<Value>,
}

/// Content-Disposition of a body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Disposition type, e.g. `attachment`.
    pub kind: String,
    /// Disposition parameters, keys lowercased.
    pub params: Option<HashMap<String, String>>,
}
