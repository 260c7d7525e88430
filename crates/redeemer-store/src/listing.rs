//! Parsing of `List Blobs` responses.
//!
//! The response shape is small and fixed (`EnumerationResults` > `Blobs` >
//! `Blob` > `Name`, plus `NextMarker`), so it is scanned directly. Names
//! carrying `Encoded="true"` hold characters XML cannot represent and are
//! percent-decoded.

use crate::error::{StoreError, StoreResult};

/// One page of object names plus the continuation marker, if any.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ListPage {
    pub(crate) names: Vec<String>,
    pub(crate) next_marker: Option<String>,
}

pub(crate) fn parse_list_page(body: &str) -> StoreResult<ListPage> {
    if !body.contains("<EnumerationResults") {
        return Err(StoreError::MalformedListing {
            reason: "missing_enumeration_results",
        });
    }

    let mut names = Vec::new();
    let mut rest = body;
    while let Some(blob) = next_element(rest, "Blob") {
        let name = next_element(blob.inner, "Name").ok_or(StoreError::MalformedListing {
            reason: "blob_without_name",
        })?;
        let text = unescape(name.inner)?;
        if name.attrs.contains(r#"Encoded="true""#) {
            names.push(percent_decode(&text)?);
        } else {
            names.push(text);
        }
        rest = blob.rest;
    }

    let next_marker = match next_element(body, "NextMarker") {
        Some(marker) if !marker.inner.trim().is_empty() => Some(unescape(marker.inner.trim())?),
        _ => None,
    };

    Ok(ListPage { names, next_marker })
}

/// An element located by [`next_element`].
struct Element<'a> {
    attrs: &'a str,
    inner: &'a str,
    rest: &'a str,
}

/// First `<tag ...>...</tag>` in a fragment. Self-closing tags have empty
/// inner text.
fn next_element<'a>(xml: &'a str, tag: &str) -> Option<Element<'a>> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut from = 0;
    loop {
        let start = from + xml[from..].find(&open)?;
        let after_name = start + open.len();
        let tail = &xml[after_name..];
        if !tail.starts_with(['>', '/', ' ', '\t', '\r', '\n']) {
            from = after_name;
            continue;
        }
        let gt = tail.find('>')?;
        let head = &tail[..gt];
        let body_start = after_name + gt + 1;
        if let Some(attrs) = head.strip_suffix('/') {
            return Some(Element {
                attrs,
                inner: "",
                rest: &xml[body_start..],
            });
        }
        let end = body_start + xml[body_start..].find(&close)?;
        return Some(Element {
            attrs: head,
            inner: &xml[body_start..end],
            rest: &xml[end + close.len()..],
        });
    }
}

/// Decodes `%XX` escapes used by names the service marks as `Encoded`.
fn percent_decode(text: &str) -> StoreResult<String> {
    let malformed = || StoreError::MalformedListing {
        reason: "invalid_percent_encoding",
    };
    let raw = text.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut index = 0;
    while index < raw.len() {
        if raw[index] == b'%' {
            let hex = text
                .get(index + 1..index + 3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(malformed)?;
            bytes.push(u8::from_str_radix(hex, 16).map_err(|_| malformed())?);
            index += 3;
        } else {
            bytes.push(raw[index]);
            index += 1;
        }
    }
    String::from_utf8(bytes).map_err(|_| malformed())
}

fn unescape(text: &str) -> StoreResult<String> {
    let malformed = || StoreError::MalformedListing {
        reason: "invalid_entity",
    };
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let semi = tail.find(';').ok_or_else(malformed)?;
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(malformed)?
            }
        };
        out.push(decoded);
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
