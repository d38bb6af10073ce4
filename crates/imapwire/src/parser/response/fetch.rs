//! Builders for FETCH data: attribute maps, envelopes, and body structures.

use crate::parser::expr::{parse_expr, BracketMode, LiteralQueue, Value};
use crate::parser::response::helpers::{number, nstring, param_map, parse_internal_date};
use crate::parser::response::types::{
    Address, AddressEntry, BodyPart, BodyStructure, Disposition, Envelope, FetchAttributes,
    FetchValue, MultipartBody, PartExtra,
};
use crate::{Error, Result};

/// Parses the text after `FETCH` into an attribute map.
///
/// Square brackets stay inside tokens here so that section-qualified keys
/// like `BODY[HEADER.FIELDS (DATE)]` survive as single keys.
pub(crate) fn parse_fetch(text: &str, literals: &mut LiteralQueue) -> Result<FetchAttributes> {
    let values = parse_expr(text, literals, BracketMode::ParensOnly)?;
    let items = values
        .first()
        .and_then(Value::as_list)
        .ok_or_else(|| Error::shape("FETCH", "attribute data is not a list"))?;

    let mut attrs = FetchAttributes::default();
    for pair in items.chunks(2) {
        let [key, val] = pair else {
            return Err(Error::shape("FETCH", "odd number of attribute items"));
        };
        let key = key
            .to_text()
            .ok_or_else(|| Error::shape("FETCH", "attribute key is not text"))?
            .to_ascii_lowercase();
        let value = match key.as_str() {
            "envelope" if val.as_list().is_some() => {
                FetchValue::Envelope(Box::new(parse_envelope(val)?))
            }
            "internaldate" => val
                .as_str()
                .and_then(parse_internal_date)
                .map_or_else(|| FetchValue::Value(val.clone()), FetchValue::InternalDate),
            "body" | "bodystructure" if val.as_list().is_some() => {
                FetchValue::BodyStructure(parse_body_structure(val)?)
            }
            _ => FetchValue::Value(val.clone()),
        };
        attrs.push(key, value);
    }
    Ok(attrs)
}

/// Parses the ten positional ENVELOPE fields.
pub(crate) fn parse_envelope(value: &Value) -> Result<Envelope> {
    let fields = value
        .as_list()
        .ok_or_else(|| Error::shape("ENVELOPE", "not a list"))?;
    if fields.len() < 10 {
        return Err(Error::shape(
            "ENVELOPE",
            format!("expected 10 fields, got {}", fields.len()),
        ));
    }

    Ok(Envelope {
        date: nstring(&fields[0]),
        subject: nstring(&fields[1]),
        from: parse_addresses(&fields[2]),
        sender: parse_addresses(&fields[3]),
        reply_to: parse_addresses(&fields[4]),
        to: parse_addresses(&fields[5]),
        cc: parse_addresses(&fields[6]),
        bcc: parse_addresses(&fields[7]),
        in_reply_to: nstring(&fields[8]),
        message_id: nstring(&fields[9]),
    })
}

/// Converts an envelope address list, reconstructing RFC 2822 groups from
/// their start/end marker entries.
///
/// An entry whose mailbox slot is `NIL` ends the open group; an entry whose
/// host slot is `NIL` starts a group named by its mailbox slot. A group
/// still open at the end of the list, or when another group starts, is
/// closed implicitly.
fn parse_addresses(value: &Value) -> Option<Vec<AddressEntry>> {
    let items = value.as_list()?;
    let mut entries = Vec::new();
    let mut group: Option<(Option<String>, Vec<Address>)> = None;

    for item in items {
        let Some(addr) = item.as_list() else {
            continue;
        };
        let mailbox = addr.get(2).map_or(&Value::Nil, |v| v);
        let host = addr.get(3).map_or(&Value::Nil, |v| v);

        if mailbox.is_nil() {
            // group end marker
            if let Some((name, members)) = group.take() {
                entries.push(AddressEntry::Group { name, members });
            }
        } else if host.is_nil() {
            // group start marker
            if let Some((name, members)) = group.take() {
                entries.push(AddressEntry::Group { name, members });
            }
            group = Some((nstring(mailbox), Vec::new()));
        } else {
            let address = Address {
                name: addr.first().and_then(nstring),
                mailbox: nstring(mailbox),
                host: nstring(host),
            };
            match &mut group {
                Some((_, members)) => members.push(address),
                None => entries.push(AddressEntry::Address(address)),
            }
        }
    }

    if let Some((name, members)) = group {
        entries.push(AddressEntry::Group { name, members });
    }
    Some(entries)
}

/// Parses a BODY or BODYSTRUCTURE list into a part tree.
pub(crate) fn parse_body_structure(value: &Value) -> Result<BodyStructure> {
    let items = value
        .as_list()
        .ok_or_else(|| Error::shape("BODYSTRUCTURE", "not a list"))?;
    build_node(items, "")
}

fn build_node(items: &[Value], prefix: &str) -> Result<BodyStructure> {
    if items.first().is_some_and(|v| v.as_list().is_some()) {
        build_multipart(items, prefix)
    } else {
        build_single(items, prefix)
    }
}

fn build_multipart(items: &[Value], prefix: &str) -> Result<BodyStructure> {
    let mut parts = Vec::new();
    let mut cursor = 0;
    while let Some(child) = items.get(cursor).and_then(Value::as_list) {
        let id = if prefix.is_empty() {
            (cursor + 1).to_string()
        } else {
            format!("{prefix}.{}", cursor + 1)
        };
        parts.push(build_node(child, &id)?);
        cursor += 1;
    }

    let subtype = items
        .get(cursor)
        .and_then(Value::to_text)
        .ok_or_else(|| Error::shape("BODYSTRUCTURE", "multipart missing subtype"))?
        .to_ascii_lowercase();
    cursor += 1;

    let mut params = None;
    if let Some(value) = items.get(cursor) {
        params = param_map(value);
        cursor += 1;
    }

    Ok(BodyStructure::Multipart(Box::new(MultipartBody {
        subtype,
        params,
        parts,
        extra: build_extra(&items[cursor.min(items.len())..])?,
    })))
}

fn build_single(items: &[Value], prefix: &str) -> Result<BodyStructure> {
    let media_type = items
        .first()
        .and_then(Value::to_text)
        .ok_or_else(|| Error::shape("BODYSTRUCTURE", "part missing media type"))?
        .to_ascii_lowercase();

    // A subtype that is not text marks a malformed, type-only part; the
    // remaining fields then sit one slot earlier than usual.
    let well_formed = items.get(1).is_some_and(|v| v.as_str().is_some());

    let mut part = BodyPart {
        part_id: if prefix.is_empty() {
            "1".to_string()
        } else {
            prefix.to_string()
        },
        media_type,
        subtype: None,
        params: None,
        id: None,
        description: None,
        encoding: None,
        size: None,
        envelope: None,
        body: None,
        lines: None,
        md5: None,
        extra: PartExtra::default(),
    };

    let mut cursor;
    if well_formed {
        part.subtype = items.get(1).and_then(nstring).map(|s| s.to_ascii_lowercase());
        part.params = items.get(2).and_then(param_map);
        part.id = items.get(3).and_then(nstring);
        part.description = items.get(4).and_then(nstring);
        part.encoding = items.get(5).and_then(nstring);
        part.size = items.get(6).and_then(number);
        cursor = 7;
    } else {
        part.params = items.get(1).and_then(param_map);
        cursor = if part.params.is_some() { 2 } else { 1 };
    }

    let is_rfc822 = part.media_type == "message" && part.subtype.as_deref() == Some("rfc822");
    if is_rfc822 {
        if let Some(env) = items.get(cursor).filter(|v| v.as_list().is_some()) {
            part.envelope = Some(Box::new(parse_envelope(env)?));
        }
        cursor += 1;
        if let Some(body) = items.get(cursor).and_then(Value::as_list) {
            part.body = Some(Box::new(build_node(body, prefix)?));
        }
        cursor += 1;
    }

    if (part.media_type == "text" || is_rfc822) && items.len() > cursor {
        part.lines = number(&items[cursor]);
        cursor += 1;
    }
    if well_formed && items.len() > cursor {
        part.md5 = nstring(&items[cursor]);
        cursor += 1;
    }

    part.extra = build_extra(&items[cursor.min(items.len())..])?;
    Ok(BodyStructure::Part(Box::new(part)))
}

/// Extracts the optional trailing fields common to all body nodes:
/// disposition, language, location, then any later-RFC extension data.
fn build_extra(rest: &[Value]) -> Result<PartExtra> {
    let mut extra = PartExtra::default();

    if let Some(value) = rest.first() {
        extra.disposition = match value {
            Value::Nil => None,
            Value::List(fields) => {
                let kind = fields.first().and_then(Value::to_text);
                kind.map(|kind| Disposition {
                    kind,
                    params: fields.get(1).and_then(param_map),
                })
            }
            other => Some(Disposition {
                kind: other.to_text().ok_or_else(|| {
                    Error::shape("BODYSTRUCTURE", "disposition is not text or a list")
                })?,
                params: None,
            }),
        };
    }

    if let Some(value) = rest.get(1) {
        extra.language = match value {
            Value::Nil => None,
            Value::List(items) => Some(items.iter().filter_map(Value::to_text).collect()),
            other => other.to_text().map(|lang| vec![lang]),
        };
    }

    if let Some(value) = rest.get(2) {
        extra.location = nstring(value);
    }

    // Later-RFC extension data, kept unparsed
    extra.extensions = match rest.get(3..) {
        None | Some([]) => None,
        Some([single]) => Some(single.clone()),
        Some(many) => Some(Value::List(many.to_vec())),
    };

    Ok(extra)
}
