//! Small conversion helpers shared by the semantic builders.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::parser::expr::Value;
use crate::parser::response::types::{
    ListEntry, Namespace, NamespaceSet, StatusReply, TextCode,
};
use crate::{Error, MailboxDecoder, Result};

/// Converts an nstring field: `NIL` becomes `None`, strings and numbers
/// become text.
pub(crate) fn nstring(value: &Value) -> Option<String> {
    match value {
        Value::Nil | Value::List(_) => None,
        other => other.to_text(),
    }
}

/// Extracts a number, tolerating servers that quote numeric fields.
pub(crate) fn number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.parse().ok(),
        Value::Nil | Value::List(_) => None,
    }
}

/// Builds a parameter map from an alternating key/value list, keys
/// lowercased. `NIL` and empty lists yield `None`.
pub(crate) fn param_map(value: &Value) -> Option<HashMap<String, String>> {
    let items = value.as_list()?;
    if items.is_empty() {
        return None;
    }
    let mut map = HashMap::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        if let [key, val] = pair
            && let Some(key) = key.to_text()
        {
            map.insert(
                key.to_ascii_lowercase(),
                val.to_text().unwrap_or_default(),
            );
        }
    }
    Some(map)
}

/// Builds the text code from the parsed contents of a `[...]` section.
pub(crate) fn build_text_code(values: Vec<Value>) -> Option<TextCode> {
    let mut iter = values.into_iter();
    let first = iter.next()?;
    let key = first.to_text()?;
    let rest: Vec<Value> = iter.collect();
    if rest.is_empty() {
        Some(TextCode::Word(key))
    } else {
        Some(TextCode::Pair { key, values: rest })
    }
}

/// Builds a STATUS reply from the values after the `STATUS` keyword.
pub(crate) fn build_status(
    values: &[Value],
    decoder: &impl MailboxDecoder,
) -> Result<StatusReply> {
    let raw = values
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::shape("STATUS", "missing mailbox name"))?;
    let items = values
        .get(1)
        .and_then(Value::as_list)
        .ok_or_else(|| Error::shape("STATUS", "missing attribute list"))?;

    let mut attrs = HashMap::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        if let [key, val] = pair
            && let Some(key) = key.to_text()
        {
            attrs.insert(key.to_ascii_lowercase(), val.clone());
        }
    }

    Ok(StatusReply {
        mailbox: decoder.decode(raw),
        attrs,
    })
}

/// Builds a LIST or LSUB entry from the values after the keyword.
pub(crate) fn build_list_entry(
    values: &[Value],
    decoder: &impl MailboxDecoder,
) -> Result<ListEntry> {
    let flags = values
        .first()
        .and_then(Value::as_list)
        .ok_or_else(|| Error::shape("LIST", "missing flags list"))?
        .iter()
        .filter_map(Value::to_text)
        .collect();
    let delimiter = values.get(1).and_then(nstring);
    let raw = values
        .get(2)
        .and_then(Value::to_text)
        .ok_or_else(|| Error::shape("LIST", "missing mailbox name"))?;

    Ok(ListEntry {
        flags,
        delimiter,
        mailbox: decoder.decode(&raw),
    })
}

/// Builds the NAMESPACE triple from its three positional slots.
pub(crate) fn build_namespaces(values: &[Value]) -> Result<NamespaceSet> {
    let mut set = NamespaceSet::default();
    for (idx, slot) in [&mut set.personal, &mut set.other, &mut set.shared]
        .into_iter()
        .enumerate()
    {
        match values.get(idx) {
            None | Some(Value::Nil) => {}
            Some(Value::List(records)) => {
                let mut parsed = Vec::with_capacity(records.len());
                for record in records {
                    parsed.push(build_namespace(record)?);
                }
                *slot = Some(parsed);
            }
            Some(other) => {
                return Err(Error::shape(
                    "NAMESPACE",
                    format!("slot {idx} is neither NIL nor a list: {other:?}"),
                ));
            }
        }
    }
    Ok(set)
}

fn build_namespace(record: &Value) -> Result<Namespace> {
    let fields = record
        .as_list()
        .ok_or_else(|| Error::shape("NAMESPACE", "record is not a list"))?;
    let prefix = fields
        .first()
        .and_then(Value::to_text)
        .ok_or_else(|| Error::shape("NAMESPACE", "record missing prefix"))?;
    let delimiter = fields.get(1).and_then(nstring);

    // Extension data trails as key then value-list pairs
    let mut extensions: Option<HashMap<String, Value>> = None;
    for pair in fields[2.min(fields.len())..].chunks(2) {
        if let [key, val] = pair
            && let Some(key) = key.to_text()
        {
            extensions
                .get_or_insert_with(HashMap::new)
                .insert(key.to_ascii_lowercase(), val.clone());
        }
    }

    Ok(Namespace {
        prefix,
        delimiter,
        extensions,
    })
}

/// Collects a whitespace-separated list of strings (FLAGS, CAPABILITY).
pub(crate) fn string_list(values: &[Value]) -> Vec<String> {
    values.iter().filter_map(Value::to_text).collect()
}

/// Collects a whitespace-separated list of numbers (SEARCH, SORT).
pub(crate) fn number_list(context: &'static str, values: &[Value]) -> Result<Vec<u64>> {
    values
        .iter()
        .map(|v| {
            number(v).ok_or_else(|| {
                Error::shape(context, format!("non-numeric entry: {v:?}"))
            })
        })
        .collect()
}

/// Parses an INTERNALDATE value, e.g. `17-Jul-1996 02:44:25 -0700`.
///
/// Some servers space-pad single-digit days; both forms are accepted.
pub(crate) fn parse_internal_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, "%d-%b-%Y %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_str(raw.trim_start(), "%e-%b-%Y %H:%M:%S %z"))
        .ok()
}
