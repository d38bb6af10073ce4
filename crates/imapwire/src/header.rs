//! RFC 2822 header block parsing.
//!
//! Used on header text fetched with `BODY[HEADER]` and friends. Folded
//! continuation lines (leading space or tab) are appended to the previous
//! field's value verbatim, whitespace included.

/// An ordered, case-insensitive multimap of header fields.
///
/// Field names are lowercased on insert. Repeated fields accumulate values
/// in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    /// Returns the first value for `name`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).and_then(|values| {
            values.first().map(String::as_str)
        })
    }

    /// Returns every value for `name`, in arrival order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        let lower = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find_map(|(k, v)| (*k == lower).then_some(v.as_slice()))
    }

    /// Iterates fields in first-arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct field names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no fields were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: String, value: String) -> usize {
        if let Some(idx) = self.entries.iter().position(|(k, _)| *k == name) {
            self.entries[idx].1.push(value);
            idx
        } else {
            self.entries.push((name, vec![value]));
            self.entries.len() - 1
        }
    }

    fn append_to(&mut self, idx: usize, extra: &str) {
        if let Some(value) = self
            .entries
            .get_mut(idx)
            .and_then(|(_, values)| values.last_mut())
        {
            value.push_str(extra);
        }
    }
}

/// Parses a header block into a [`HeaderMap`].
///
/// Lines are split on CRLF. A line starting with space or tab continues the
/// previous field's value and is appended verbatim; a continuation with no
/// preceding field is dropped. A non-empty line without a colon ends the
/// header block. A field with no text after the colon yields an empty value.
#[must_use]
pub fn parse_header(text: &str) -> HeaderMap {
    let mut map = HeaderMap::default();
    // (name index, value index) of the field a fold would extend
    let mut current: Option<usize> = None;

    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(idx) = current {
                map.append_to(idx, line);
            }
            continue;
        }
        let Some(colon) = line.find(':') else {
            break;
        };
        let name = line[..colon].to_ascii_lowercase();
        let rest = &line[colon + 1..];
        // At most one leading space or tab separates name from value
        let value = rest
            .strip_prefix(' ')
            .or_else(|| rest.strip_prefix('\t'))
            .unwrap_or(rest);
        current = Some(map.push(name, value.to_string()));
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_fields() {
        let map = parse_header("From: a@b.c\r\nTo: d@e.f\r\n\r\n");
        assert_eq!(map.get("from"), Some("a@b.c"));
        assert_eq!(map.get("To"), Some("d@e.f"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_folded_value_appends_verbatim() {
        let map = parse_header("Subject: Hello\r\n\tworld\r\n\r\n");
        assert_eq!(map.get("subject"), Some("Hello\tworld"));
    }

    #[test]
    fn test_repeated_field_accumulates() {
        let map = parse_header("Received: one\r\nReceived: two\r\n");
        assert_eq!(
            map.get_all("received"),
            Some(["one".to_string(), "two".to_string()].as_slice())
        );
        assert_eq!(map.get("received"), Some("one"));
    }

    #[test]
    fn test_fold_follows_repeated_field() {
        let map = parse_header("Received: one\r\nReceived: two\r\n more\r\n");
        assert_eq!(
            map.get_all("received"),
            Some(["one".to_string(), "two more".to_string()].as_slice())
        );
    }

    #[test]
    fn test_empty_value() {
        let map = parse_header("X-Empty:\r\nX-Space: \r\n");
        assert_eq!(map.get("x-empty"), Some(""));
        assert_eq!(map.get("x-space"), Some(""));
    }

    #[test]
    fn test_orphan_fold_dropped() {
        let map = parse_header("\tstray\r\nFrom: a@b.c\r\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("from"), Some("a@b.c"));
    }

    #[test]
    fn test_non_header_line_terminates() {
        let map = parse_header("From: a@b.c\r\nnot a header\r\nTo: d@e.f\r\n");
        assert_eq!(map.len(), 1);
        assert!(map.get("to").is_none());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let map = parse_header("MIME-Version: 1.0\r\n");
        assert_eq!(map.get("mime-version"), Some("1.0"));
        assert_eq!(map.get("Mime-Version"), Some("1.0"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_header("").is_empty());
    }
}
