//! Mailbox name decoding collaborator.
//!
//! IMAP mailbox names on the wire use modified UTF-7 (RFC 3501 §5.1.3).
//! The parser does not implement that algorithm itself; it routes every
//! mailbox name it extracts (LIST/LSUB/STATUS) through a [`MailboxDecoder`]
//! supplied by the caller.

/// Decodes wire-format mailbox names into display text.
///
/// Implemented for any `Fn(&str) -> String`, so a plain closure works:
///
/// ```
/// use imapwire::MailboxDecoder;
///
/// let decoder = |raw: &str| raw.to_ascii_uppercase();
/// assert_eq!(decoder.decode("inbox"), "INBOX");
/// ```
pub trait MailboxDecoder {
    /// Decodes a raw mailbox name.
    fn decode(&self, raw: &str) -> String;
}

impl<F> MailboxDecoder for F
where
    F: Fn(&str) -> String,
{
    fn decode(&self, raw: &str) -> String {
        self(raw)
    }
}

/// Pass-through decoder that returns mailbox names unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDecoder;

impl MailboxDecoder for NoopDecoder {
    fn decode(&self, raw: &str) -> String {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_decoder() {
        assert_eq!(NoopDecoder.decode("INBOX.Entw&APw-rfe"), "INBOX.Entw&APw-rfe");
    }

    #[test]
    fn test_closure_decoder() {
        let decoder = |raw: &str| raw.replace("&APw-", "\u{fc}");
        assert_eq!(decoder.decode("Entw&APw-rfe"), "Entw\u{fc}rfe");
    }
}
