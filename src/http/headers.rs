//! Case-insensitive HTTP field collection.
//!
//! Fields are keyed by their lower-cased name and kept in insertion order, so
//! serializing a collection always yields the same bytes. The spelling used the
//! first time a name was inserted is the one written back to the wire.
//!
//! A field seen twice is folded into one entry, values joined with `", "`.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::http::error::{HttpError, Result};
use crate::http::CRLF;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: IndexMap<String, Field>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    /// Adds a value, appending to an existing entry with `", "`.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.fields.get_mut(&normalize(name)) {
            Some(field) => {
                field.value.push_str(", ");
                field.value.push_str(value);
            }
            None => self.insert(name, value),
        }
    }

    /// Overwrites any existing value, keeping the entry's position.
    pub fn replace(&mut self, name: &str, value: &str) {
        match self.fields.get_mut(&normalize(name)) {
            Some(field) => field.value = value.to_string(),
            None => self.insert(name, value),
        }
    }

    pub fn delete(&mut self, name: &str) {
        self.fields.shift_remove(&normalize(name));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&normalize(name)).map(|f| f.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .values()
            .map(|f| (f.name.as_str(), f.value.as_str()))
    }

    /// Consumes every complete `name: value\r\n` line in `data`.
    ///
    /// Returns the number of bytes consumed and whether the empty line ending
    /// the field block was seen. A trailing partial line is left for the next
    /// call. On a malformed line nothing is reported as consumed.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool)> {
        let mut read = 0;

        loop {
            let Some(idx) = find_crlf(&data[read..]) else {
                return Ok((read, false));
            };

            if idx == 0 {
                return Ok((read + CRLF.len(), true));
            }

            let (name, value) = parse_field_line(&data[read..read + idx])?;
            self.set(name, &value);
            read += idx + CRLF.len();
        }
    }

    fn insert(&mut self, name: &str, value: &str) {
        self.fields.insert(
            normalize(name),
            Field {
                name: name.to_string(),
                value: value.to_string(),
            },
        );
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

fn parse_field_line(line: &[u8]) -> Result<(&str, Cow<'_, str>)> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(HttpError::MalformedHeader)?;

    let name = trim_start(&line[..colon]);
    if name.is_empty() || !name.iter().copied().all(is_token_char) {
        return Err(HttpError::MalformedFieldName(
            String::from_utf8_lossy(name).into_owned(),
        ));
    }
    // Token characters are ASCII
    let name = std::str::from_utf8(name).map_err(|_| HttpError::MalformedHeader)?;

    // Values may carry obs-text (0x80-0xFF), which is not UTF-8
    let value = String::from_utf8_lossy(trim_end(trim_start(&line[colon + 1..])));

    Ok((name, value))
}

fn trim_start(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    bytes
}

fn trim_end(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

/// RFC 9110 `tchar`.
pub(crate) fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
