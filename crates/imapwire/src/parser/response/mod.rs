//! Line classification and semantic dispatch.
//!
//! A line arrives here complete: CRLF-trimmed, with any buffered literals
//! already collected into the queue and a placeholder standing where each
//! declaration was. This module decides what kind of reply the line is and
//! routes it to the matching builder.

pub(crate) mod fetch;
pub(crate) mod helpers;
pub mod types;

use crate::parser::expr::{parse_expr, BracketMode, LiteralQueue, Value, LITERAL_PLACEHOLDER};
use crate::parser::response::types::{Condition, TaggedReply, TextCode, UntaggedReply};
use crate::{Error, MailboxDecoder, Result};

/// A fully classified response line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
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
    /// A line matching no known shape, passed through verbatim.
    Other(String),
}

/// Which line family the leading bytes announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinePrefix {
    Untagged,
    Tagged,
    Continuation,
    Other,
}

/// Classifies a line by its prefix: `* `, `A<digits> `, or `+ `.
pub(crate) fn prefix(line: &str) -> LinePrefix {
    if line.starts_with("* ") {
        return LinePrefix::Untagged;
    }
    if line.starts_with("+ ") || line == "+" {
        return LinePrefix::Continuation;
    }
    if let Some(rest) = line.strip_prefix('A') {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && rest.as_bytes().get(digits) == Some(&b' ') {
            return LinePrefix::Tagged;
        }
    }
    LinePrefix::Other
}

/// A trailing `{n}` literal declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LiteralSuffix {
    /// Byte offset where the ` {n}` suffix begins.
    pub(crate) truncate_at: usize,
    /// Declared octet count.
    pub(crate) size: usize,
}

/// Detects a `{n}` declaration at the end of the line.
pub(crate) fn literal_suffix(line: &str) -> Option<LiteralSuffix> {
    let inner = line.strip_suffix('}')?;
    let open = inner.rfind('{')?;
    let digits = &inner[open + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(LiteralSuffix {
        truncate_at: open,
        size: digits.parse().ok()?,
    })
}

/// A `BODY[section] {n}` declaration ending an untagged FETCH line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BodyLiteralSuffix {
    /// Byte offset of the case-insensitive `BODY[` match; the line keeps
    /// everything before it while the body bytes stream.
    pub(crate) truncate_at: usize,
    /// Section name between the brackets.
    pub(crate) section: String,
    /// Declared octet count.
    pub(crate) size: usize,
    /// Sequence number from the line's `* <n>` prefix.
    pub(crate) seqno: u32,
}

/// Detects a streamed-body declaration on an untagged line.
///
/// Requires both the `BODY[...] {n}` tail and a numeric sequence number
/// right after the `* ` marker; without the seqno the caller falls back to
/// buffering the literal like any other.
pub(crate) fn body_literal_suffix(line: &str) -> Option<BodyLiteralSuffix> {
    let lit = literal_suffix(line)?;
    let head = &line[..lit.truncate_at];
    // ` {n}` is preceded by the closing `]` of the section
    let head = head.strip_suffix("] ")?;

    let body_at = find_body_open(head)?;
    let section = head[body_at + "BODY[".len()..].to_string();
    let seqno = leading_seqno(line)?;

    Some(BodyLiteralSuffix {
        truncate_at: body_at,
        section,
        size: lit.size,
        seqno,
    })
}

/// Finds the first case-insensitive `BODY[` occurrence.
fn find_body_open(head: &str) -> Option<usize> {
    let bytes = head.as_bytes();
    (0..bytes.len().checked_sub(5)?.saturating_add(1))
        .find(|&i| bytes[i..i + 5].eq_ignore_ascii_case(b"BODY["))
}

/// Parses the `* <digits>` sequence number prefix.
fn leading_seqno(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("* ")?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse().ok()
}

/// Parses one complete line into a [`Reply`].
///
/// `literals` holds the buffered literals collected for this line, consumed
/// in FIFO order by placeholder tokens.
pub(crate) fn parse_line(
    line: &str,
    literals: &mut LiteralQueue,
    decoder: &impl MailboxDecoder,
) -> Result<Reply> {
    let result = match prefix(line) {
        LinePrefix::Untagged => parse_untagged(line, literals, decoder),
        LinePrefix::Tagged => parse_tagged(line, literals),
        LinePrefix::Continuation => parse_continuation(line, literals),
        LinePrefix::Other => Ok(Reply::Other(line.to_string())),
    };
    // A failed line must not leave its literals for the next one
    literals.clear();
    result
}

fn parse_tagged(line: &str, literals: &mut LiteralQueue) -> Result<Reply> {
    // Prefix already validated as `A<digits> `
    let rest = &line[1..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let Ok(tag) = rest[..digits].parse::<u32>() else {
        return Ok(Reply::Other(line.to_string()));
    };
    let rest = &rest[digits + 1..];

    let Some((word, tail)) = split_word(rest) else {
        return Ok(Reply::Other(line.to_string()));
    };
    let status = match () {
        () if word.eq_ignore_ascii_case("OK") => Condition::Ok,
        () if word.eq_ignore_ascii_case("NO") => Condition::No,
        () if word.eq_ignore_ascii_case("BAD") => Condition::Bad,
        () => return Ok(Reply::Other(line.to_string())),
    };

    let (code, text) = split_text_code(tail.unwrap_or(""), literals)?;
    Ok(Reply::Tagged(TaggedReply {
        tag,
        status,
        code,
        text: text.unwrap_or_default(),
    }))
}

fn parse_continuation(line: &str, literals: &mut LiteralQueue) -> Result<Reply> {
    let rest = line.strip_prefix("+ ").unwrap_or("");
    let (code, text) = split_text_code(rest, literals)?;
    Ok(Reply::Continuation { code, text })
}

fn parse_untagged(
    line: &str,
    literals: &mut LiteralQueue,
    decoder: &impl MailboxDecoder,
) -> Result<Reply> {
    let rest = &line["* ".len()..];

    // Numbered form: `* <n> EXPUNGE|FETCH|RECENT|EXISTS ...`
    if let Some((num_word, tail)) = split_word(rest)
        && !num_word.is_empty()
        && num_word.bytes().all(|b| b.is_ascii_digit())
    {
        let Some((keyword, data)) = tail.and_then(split_word) else {
            return Ok(Reply::Other(line.to_string()));
        };
        let num: u32 = num_word
            .parse()
            .map_err(|_| Error::shape("untagged", "sequence number out of range"))?;
        let reply = match () {
            () if keyword.eq_ignore_ascii_case("EXISTS") => UntaggedReply::Exists(num),
            () if keyword.eq_ignore_ascii_case("RECENT") => UntaggedReply::Recent(num),
            () if keyword.eq_ignore_ascii_case("EXPUNGE") => UntaggedReply::Expunge(num),
            () if keyword.eq_ignore_ascii_case("FETCH") => UntaggedReply::Fetch {
                seq: num,
                attrs: fetch::parse_fetch(data.unwrap_or("()"), literals)?,
            },
            () => return Ok(Reply::Other(line.to_string())),
        };
        return Ok(Reply::Untagged(reply));
    }

    let Some((keyword, data)) = split_word(rest) else {
        return Ok(Reply::Other(line.to_string()));
    };

    if let Some(status) = condition_word(keyword) {
        let (code, text) = split_text_code(data.unwrap_or(""), literals)?;
        return Ok(Reply::Untagged(UntaggedReply::Condition {
            status,
            code,
            text,
        }));
    }

    let reply = match () {
        () if keyword.eq_ignore_ascii_case("FLAGS") => {
            UntaggedReply::Flags(helpers::string_list(&flat_values(data, literals)?))
        }
        () if keyword.eq_ignore_ascii_case("CAPABILITY") => {
            UntaggedReply::Capability(helpers::string_list(&flat_values(data, literals)?))
        }
        () if keyword.eq_ignore_ascii_case("SEARCH") => UntaggedReply::Search(
            helpers::number_list("SEARCH", &flat_values(data, literals)?)?,
        ),
        () if keyword.eq_ignore_ascii_case("SORT") => UntaggedReply::Sort(
            helpers::number_list("SORT", &flat_values(data, literals)?)?,
        ),
        () if keyword.eq_ignore_ascii_case("LIST") => UntaggedReply::List(
            helpers::build_list_entry(&expr_values("LIST", data, literals)?, decoder)?,
        ),
        () if keyword.eq_ignore_ascii_case("LSUB") => UntaggedReply::Lsub(
            helpers::build_list_entry(&expr_values("LSUB", data, literals)?, decoder)?,
        ),
        () if keyword.eq_ignore_ascii_case("STATUS") => UntaggedReply::MailboxStatus(
            helpers::build_status(&expr_values("STATUS", data, literals)?, decoder)?,
        ),
        () if keyword.eq_ignore_ascii_case("NAMESPACE") => UntaggedReply::Namespace(
            helpers::build_namespaces(&expr_values("NAMESPACE", data, literals)?)?,
        ),
        () => return Ok(Reply::Other(line.to_string())),
    };
    Ok(Reply::Untagged(reply))
}

fn condition_word(word: &str) -> Option<Condition> {
    match () {
        () if word.eq_ignore_ascii_case("OK") => Some(Condition::Ok),
        () if word.eq_ignore_ascii_case("NO") => Some(Condition::No),
        () if word.eq_ignore_ascii_case("BAD") => Some(Condition::Bad),
        () if word.eq_ignore_ascii_case("BYE") => Some(Condition::Bye),
        () if word.eq_ignore_ascii_case("PREAUTH") => Some(Condition::PreAuth),
        () => None,
    }
}

/// Splits the first space-separated word off `text`.
fn split_word(text: &str) -> Option<(&str, Option<&str>)> {
    if text.is_empty() {
        return None;
    }
    match text.split_once(' ') {
        Some((word, rest)) => Some((word, Some(rest))),
        None => Some((text, None)),
    }
}

/// Splits an optional leading `[code] ` off reply text.
///
/// The code only counts when text follows it; a line ending in `[...]` with
/// nothing after keeps the brackets as plain text. Literal placeholders in
/// the text tail dequeue collected literals, same as expression tokens do.
fn split_text_code(
    text: &str,
    literals: &mut LiteralQueue,
) -> Result<(Option<TextCode>, Option<String>)> {
    if let Some(inner) = text.strip_prefix('[')
        && let Some(close) = inner.find(']')
        && close > 0
        && let Some(tail) = inner[close + 1..].strip_prefix(' ')
        && !tail.is_empty()
    {
        let values = parse_expr(&inner[..close], literals, BracketMode::ParensOnly)?;
        return Ok((
            helpers::build_text_code(values),
            Some(substitute_literals(tail, literals)),
        ));
    }
    if text.is_empty() {
        Ok((None, None))
    } else {
        Ok((None, Some(substitute_literals(text, literals))))
    }
}

/// Replaces each placeholder in free text by dequeuing the next collected
/// literal, in FIFO order.
fn substitute_literals(text: &str, literals: &mut LiteralQueue) -> String {
    if !text.contains(LITERAL_PLACEHOLDER) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == LITERAL_PLACEHOLDER
            && let Some(literal) = literals.pop_front()
        {
            out.push_str(&String::from_utf8_lossy(&literal));
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses data text for builders that need the raw value sequence.
fn expr_values(
    context: &'static str,
    data: Option<&str>,
    literals: &mut LiteralQueue,
) -> Result<Vec<Value>> {
    let text = data.ok_or_else(|| Error::shape(context, "missing data"))?;
    parse_expr(text, literals, BracketMode::Both)
}

/// Parses FLAGS/CAPABILITY/SEARCH/SORT data, unwrapping one optional layer
/// of parentheses around the token list.
fn flat_values(data: Option<&str>, literals: &mut LiteralQueue) -> Result<Vec<Value>> {
    let Some(text) = data else {
        return Ok(Vec::new());
    };
    let mut values = parse_expr(text, literals, BracketMode::Both)?;
    if values.len() == 1
        && matches!(values[0], Value::List(_))
        && let Some(Value::List(inner)) = values.pop()
    {
        return Ok(inner);
    }
    Ok(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::NoopDecoder;

    fn parse(line: &str) -> Reply {
        parse_line(line, &mut LiteralQueue::new(), &NoopDecoder).unwrap()
    }

    #[test]
    fn test_prefix_classification() {
        assert_eq!(prefix("* OK ready"), LinePrefix::Untagged);
        assert_eq!(prefix("A1 OK done"), LinePrefix::Tagged);
        assert_eq!(prefix("+ go ahead"), LinePrefix::Continuation);
        assert_eq!(prefix("A OK no digits"), LinePrefix::Other);
        assert_eq!(prefix("B1 OK wrong letter"), LinePrefix::Other);
        assert_eq!(prefix("*missing space"), LinePrefix::Other);
    }

    #[test]
    fn test_literal_suffix() {
        let lit = literal_suffix("A1 LOGIN {11}").unwrap();
        assert_eq!(lit.size, 11);
        assert_eq!(lit.truncate_at, 9);
        assert!(literal_suffix("no literal here").is_none());
        assert!(literal_suffix("{12} not at end").is_none());
        assert!(literal_suffix("trailing {1x}").is_none());
    }

    #[test]
    fn test_zero_length_literal_suffix() {
        assert_eq!(literal_suffix("* 1 FETCH (X {0}").unwrap().size, 0);
    }

    #[test]
    fn test_body_literal_suffix() {
        let body = body_literal_suffix("* 12 FETCH (BODY[TEXT] {342}").unwrap();
        assert_eq!(body.seqno, 12);
        assert_eq!(body.section, "TEXT");
        assert_eq!(body.size, 342);
        assert_eq!(&"* 12 FETCH (BODY[TEXT] {342}"[..body.truncate_at], "* 12 FETCH (");
    }

    #[test]
    fn test_body_literal_needs_seqno() {
        assert!(body_literal_suffix("* SEARCH BODY[TEXT] {5}").is_none());
        assert!(body_literal_suffix("A2 OK BODY[TEXT] {5}").is_none());
    }

    #[test]
    fn test_body_literal_case_insensitive() {
        let body = body_literal_suffix("* 3 FETCH (body[header] {64}").unwrap();
        assert_eq!(body.section, "header");
    }

    #[test]
    fn test_tagged_with_code() {
        let Reply::Tagged(reply) = parse("A47 OK [READ-WRITE] SELECT completed") else {
            panic!("expected tagged reply");
        };
        assert_eq!(reply.tag, 47);
        assert_eq!(reply.status, Condition::Ok);
        assert_eq!(reply.code, Some(TextCode::Word("READ-WRITE".to_string())));
        assert_eq!(reply.text, "SELECT completed");
    }

    #[test]
    fn test_tagged_bad_keyword_degrades() {
        assert!(matches!(parse("A1 MAYBE fine"), Reply::Other(_)));
    }

    #[test]
    fn test_continuation() {
        let Reply::Continuation { code, text } = parse("+ idling") else {
            panic!("expected continuation");
        };
        assert!(code.is_none());
        assert_eq!(text.as_deref(), Some("idling"));
    }

    #[test]
    fn test_untagged_condition_with_pair_code() {
        let Reply::Untagged(UntaggedReply::Condition { status, code, text }) =
            parse("* OK [UIDVALIDITY 3857529045] UIDs valid")
        else {
            panic!("expected condition");
        };
        assert_eq!(status, Condition::Ok);
        assert_eq!(
            code,
            Some(TextCode::Pair {
                key: "UIDVALIDITY".to_string(),
                values: vec![Value::Number(3_857_529_045)],
            })
        );
        assert_eq!(text.as_deref(), Some("UIDs valid"));
    }

    #[test]
    fn test_untagged_code_without_text_stays_text() {
        let Reply::Untagged(UntaggedReply::Condition { code, text, .. }) =
            parse("* OK [UNSEEN 12]")
        else {
            panic!("expected condition");
        };
        assert!(code.is_none());
        assert_eq!(text.as_deref(), Some("[UNSEEN 12]"));
    }

    #[test]
    fn test_untagged_counts() {
        assert_eq!(
            parse("* 23 EXISTS"),
            Reply::Untagged(UntaggedReply::Exists(23))
        );
        assert_eq!(
            parse("* 5 RECENT"),
            Reply::Untagged(UntaggedReply::Recent(5))
        );
        assert_eq!(
            parse("* 44 EXPUNGE"),
            Reply::Untagged(UntaggedReply::Expunge(44))
        );
    }

    #[test]
    fn test_untagged_flags_and_capability() {
        assert_eq!(
            parse(r"* FLAGS (\Answered \Flagged \Deleted)"),
            Reply::Untagged(UntaggedReply::Flags(vec![
                "\\Answered".to_string(),
                "\\Flagged".to_string(),
                "\\Deleted".to_string(),
            ]))
        );
        assert_eq!(
            parse("* CAPABILITY IMAP4rev1 IDLE"),
            Reply::Untagged(UntaggedReply::Capability(vec![
                "IMAP4rev1".to_string(),
                "IDLE".to_string(),
            ]))
        );
    }

    #[test]
    fn test_untagged_search_empty_and_numbers() {
        assert_eq!(
            parse("* SEARCH"),
            Reply::Untagged(UntaggedReply::Search(vec![]))
        );
        assert_eq!(
            parse("* SEARCH 2 84 882"),
            Reply::Untagged(UntaggedReply::Search(vec![2, 84, 882]))
        );
    }

    #[test]
    fn test_untagged_sort_empty_and_numbers() {
        assert_eq!(
            parse("* SORT"),
            Reply::Untagged(UntaggedReply::Sort(vec![]))
        );
        assert_eq!(
            parse("* SORT 5 3 10"),
            Reply::Untagged(UntaggedReply::Sort(vec![5, 3, 10]))
        );
    }

    #[test]
    fn test_untagged_search_non_numeric_errors() {
        let err = parse_line("* SEARCH 1 oops", &mut LiteralQueue::new(), &NoopDecoder)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { .. }));
    }

    #[test]
    fn test_untagged_list() {
        let Reply::Untagged(UntaggedReply::List(entry)) =
            parse(r#"* LIST (\HasNoChildren) "/" "INBOX""#)
        else {
            panic!("expected list entry");
        };
        assert_eq!(entry.flags, vec!["\\HasNoChildren".to_string()]);
        assert_eq!(entry.delimiter.as_deref(), Some("/"));
        assert_eq!(entry.mailbox, "INBOX");
    }

    #[test]
    fn test_untagged_status() {
        let Reply::Untagged(UntaggedReply::MailboxStatus(status)) =
            parse(r#"* STATUS "blurdybloop" (MESSAGES 231 UIDNEXT 44292)"#)
        else {
            panic!("expected status");
        };
        assert_eq!(status.mailbox, "blurdybloop");
        assert_eq!(status.attrs.get("messages"), Some(&Value::Number(231)));
    }

    #[test]
    fn test_untagged_namespace() {
        let Reply::Untagged(UntaggedReply::Namespace(set)) =
            parse(r#"* NAMESPACE (("" "/")) NIL NIL"#)
        else {
            panic!("expected namespace");
        };
        assert!(set.personal.is_some());
        assert!(set.other.is_none());
    }

    #[test]
    fn test_untagged_fetch_with_literal() {
        let mut literals = LiteralQueue::from([b"Hello".to_vec()]);
        let reply = parse_line(
            "* 2 FETCH (BODY[TEXT] \u{0})",
            &mut literals,
            &NoopDecoder,
        )
        .unwrap();
        let Reply::Untagged(UntaggedReply::Fetch { seq, attrs }) = reply else {
            panic!("expected fetch");
        };
        assert_eq!(seq, 2);
        assert_eq!(
            attrs.get("body[text]").and_then(|v| match v {
                types::FetchValue::Value(Value::String(s)) => Some(s.as_str()),
                _ => None,
            }),
            Some("Hello")
        );
    }

    #[test]
    fn test_unknown_untagged_keyword_degrades() {
        assert!(matches!(parse("* XAPPLEPUSH something"), Reply::Other(_)));
    }

    #[test]
    fn test_literal_substituted_into_tagged_text() {
        let mut literals = LiteralQueue::from([b"hello".to_vec()]);
        let reply = parse_line("A1 OK [ALERT] \u{0} done", &mut literals, &NoopDecoder).unwrap();
        let Reply::Tagged(reply) = reply else {
            panic!("expected tagged reply");
        };
        assert_eq!(reply.code, Some(TextCode::Word("ALERT".to_string())));
        assert_eq!(reply.text, "hello done");
    }

    #[test]
    fn test_literal_substituted_into_condition_text() {
        let mut literals = LiteralQueue::from([b"maintenance".to_vec()]);
        let reply = parse_line("* BYE \u{0} window", &mut literals, &NoopDecoder).unwrap();
        let Reply::Untagged(UntaggedReply::Condition { status, text, .. }) = reply else {
            panic!("expected condition");
        };
        assert_eq!(status, Condition::Bye);
        assert_eq!(text.as_deref(), Some("maintenance window"));
    }

    #[test]
    fn test_literal_substituted_into_continuation_text() {
        let mut literals = LiteralQueue::from([b"challenge".to_vec()]);
        let reply = parse_line("+ \u{0} data", &mut literals, &NoopDecoder).unwrap();
        let Reply::Continuation { text, .. } = reply else {
            panic!("expected continuation");
        };
        assert_eq!(text.as_deref(), Some("challenge data"));
    }

    #[test]
    fn test_literal_queue_cleared_after_line() {
        let mut literals = LiteralQueue::from([b"unused".to_vec()]);
        let _ = parse_line("* 3 EXISTS", &mut literals, &NoopDecoder).unwrap();
        assert!(literals.is_empty());
    }

    #[test]
    fn test_literal_queue_cleared_after_parse_error() {
        // The placeholder sits after the unbalanced close, so the failing
        // parse never consumes its literal
        let mut literals = LiteralQueue::from([b"abc".to_vec()]);
        let err = parse_line("* STATUS ) \u{0}", &mut literals, &NoopDecoder).unwrap_err();
        assert!(matches!(err, Error::MalformedExpression { .. }));
        assert!(literals.is_empty());
    }
}
