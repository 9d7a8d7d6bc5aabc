//! Splitting navigation targets into path, query and fragment without
//! disturbing the parts nobody asked to change.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::VisorError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryPair {
    key: String,
    /// Still percent-encoded, exactly as written. `None` for a bare `?flag`.
    value: Option<String>,
}

/// A parsed in-app URL such as `/diffLogin?name=myName#myHash`.
///
/// Query parameters and the fragment are kept verbatim; only parameters that
/// are explicitly replaced through [`Destination::set_query_param`] change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    path: String,
    query: Vec<QueryPair>,
    fragment: Option<String>,
}

impl Destination {
    /// Parse an absolute in-app URL. Rejects empty input, relative paths,
    /// whitespace and nameless query parameters.
    pub fn parse(route: &str) -> Result<Self, VisorError> {
        if route.is_empty() {
            return Err(VisorError::malformed(route, "destination is empty"));
        }
        if !route.starts_with('/') {
            return Err(VisorError::malformed(route, "must start with '/'"));
        }
        if route.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(VisorError::malformed(
                route,
                "contains whitespace or control characters",
            ));
        }

        let (rest, fragment) = match route.split_once('#') {
            Some((rest, fragment)) => {
                if fragment.contains('#') {
                    return Err(VisorError::malformed(route, "more than one '#'"));
                }
                (rest, Some(fragment.to_string()))
            }
            None => (route, None),
        };

        let (path, raw_query) = rest.split_once('?').unwrap_or((rest, ""));
        let mut query = Vec::new();
        for segment in raw_query.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = match segment.split_once('=') {
                Some((k, v)) => (k, Some(v.to_string())),
                None => (segment, None),
            };
            if key.is_empty() {
                return Err(VisorError::malformed(route, "query parameter without a name"));
            }
            query.push(QueryPair {
                key: key.to_string(),
                value,
            });
        }

        Ok(Destination {
            path: path.to_string(),
            query,
            fragment,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Decoded value of the first parameter called `name`. A bare `?name` yields `""`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find(|pair| decode_component(&pair.key) == name)
            .map(|pair| pair.value.as_deref().map(decode_component).unwrap_or_default())
    }

    /// Set `name` to `value`, overwriting any existing occurrences in place.
    /// A parameter that was not present is appended after the existing ones.
    pub fn set_query_param(&mut self, name: &str, value: &str) {
        let encoded = encode_component(value);
        let mut replaced = false;
        self.query.retain_mut(|pair| {
            if decode_component(&pair.key) != name {
                return true;
            }
            if replaced {
                return false;
            }
            pair.value = Some(encoded.clone());
            replaced = true;
            true
        });
        if !replaced {
            self.query.push(QueryPair {
                key: encode_component(name),
                value: Some(encoded),
            });
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, pair) in self.query.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            f.write_str(&pair.key)?;
            if let Some(value) = &pair.value {
                write!(f, "={}", value)?;
            }
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// Escaped inside a query component besides controls and non-ASCII. `/`, `?`,
/// `:` and `@` stay readable so `next=/private_url` comes out literally.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_COMPONENT).to_string()
}

/// Form-style decode: `+` is a space, broken escapes are left as written.
fn decode_component(encoded: &str) -> String {
    percent_decode_str(&encoded.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
