//! `WWW-Authenticate` challenge parsing.
//!
//! Splits a header value into `key=value` pairs. Quoted values may carry
//! commas and backslash escapes, so tokenizing happens on unquoted commas
//! only.

use std::collections::HashMap;

/// Authentication scheme handled by this crate.
const DIGEST_SCHEME: &str = "Digest";

/// Parameters decoded from a `Digest` challenge.
///
/// Lookups of absent keys return an empty string rather than failing, so a
/// malformed challenge degrades into an `Authorization` header with empty
/// fields instead of an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    params: HashMap<String, String>,
}

impl AuthChallenge {
    /// Decodes a `WWW-Authenticate` header value.
    ///
    /// Anything not starting with the `Digest` scheme token followed by a
    /// space yields an empty challenge.
    pub fn from_header(value: &str) -> Self {
        match value.split_once(' ') {
            Some((DIGEST_SCHEME, rest)) => Self {
                params: parse_pairs(rest),
            },
            _ => Self::default(),
        }
    }

    /// Decodes a raw header value, keeping non-ASCII bytes.
    ///
    /// Each byte becomes the `char` of the same code point, so values can
    /// be turned back into the exact bytes the server sent with
    /// [`header_bytes`].
    pub fn from_header_bytes(value: &[u8]) -> Self {
        Self::from_header(&decode_header_bytes(value))
    }

    /// Returns the value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    /// The `realm` parameter.
    pub fn realm(&self) -> &str {
        self.get("realm")
    }

    /// The server `nonce`.
    pub fn nonce(&self) -> &str {
        self.get("nonce")
    }

    /// The `opaque` token, echoed back unchanged.
    pub fn opaque(&self) -> &str {
        self.get("opaque")
    }

    /// The `qop` value, echoed back unchanged.
    pub fn qop(&self) -> &str {
        self.get("qop")
    }

    /// True when no parameters were decoded.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of decoded parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl From<HashMap<String, String>> for AuthChallenge {
    fn from(params: HashMap<String, String>) -> Self {
        Self { params }
    }
}

/// Maps every header byte to the `char` with the same code point.
pub fn decode_header_bytes(value: &[u8]) -> String {
    value.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`decode_header_bytes`].
///
/// Characters above U+00FF cannot come from a header and are written as
/// UTF-8.
pub fn header_bytes(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for c in value.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(b) => bytes.push(b),
            Err(_) => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
    bytes
}

/// Parses a comma-separated list of `key=value` / `key="value"` pairs.
///
/// A token without `=` is a key with an empty value, as is a token ending
/// in `=`. Surrounding double quotes are removed from values.
pub fn parse_pairs(value: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();

    for token in parse_list(value.trim()) {
        match token.find('=') {
            None => {
                pairs.insert(token, String::new());
            }
            Some(i) if i == token.len() - 1 => {
                pairs.insert(token[..i].to_string(), String::new());
            }
            Some(i) => {
                let raw = &token[i + 1..];
                let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                    &raw[1..raw.len() - 1]
                } else {
                    raw
                };
                pairs.insert(token[..i].to_string(), value.to_string());
            }
        }
    }

    pairs
}

/// Splits on commas outside double quotes, trimming each token.
///
/// Inside a quoted section a backslash is dropped and the character after
/// it is kept literally. Quote characters themselves are preserved.
pub fn parse_list(value: &str) -> Vec<String> {
    let mut list = Vec::new();
    let mut current = String::new();
    let mut escape = false;
    let mut quote = false;

    for c in value.chars() {
        if escape {
            current.push(c);
            escape = false;
        } else if quote {
            match c {
                '\\' => escape = true,
                '"' => {
                    quote = false;
                    current.push(c);
                }
                _ => current.push(c),
            }
        } else {
            match c {
                ',' => {
                    list.push(current.trim().to_string());
                    current.clear();
                }
                '"' => {
                    quote = true;
                    current.push(c);
                }
                _ => current.push(c),
            }
        }
    }

    if !current.is_empty() {
        list.push(current.trim().to_string());
    }

    list
}
