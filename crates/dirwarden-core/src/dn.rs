//! Distinguished-name parsing, printing and base-path resolution.
//!
//! Follows RFC 4514 string representation: components are separated by
//! `,`, attribute and value by `=`, and special characters inside
//! values are backslash-escaped. Attribute names are normalized to
//! lowercase so that `CN=a` and `cn=a` compare equal.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Characters that must always be backslash-escaped in a DN value
/// (RFC 4514 §2.4).
const SPECIALS: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '='];

/// Error raised while parsing a DN string or converting between the
/// relative and absolute representations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnError {
    /// The input is not a valid RFC 4514 DN string.
    #[error("malformed DN '{input}': {message}")]
    Malformed { input: String, message: String },

    /// An absolute DN does not live under the configured base path.
    ///
    /// A base-path mismatch is a lookup failure, never silent
    /// corruption: the conversion refuses rather than guessing.
    #[error("DN '{dn}' is not under base path '{base}'")]
    BaseMismatch { dn: String, base: String },
}

impl DnError {
    fn malformed(input: &str, message: impl Into<String>) -> Self {
        DnError::Malformed {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

/// A single `attribute=value` component of a distinguished name.
///
/// The attribute name is stored lowercased; the value is stored in
/// unescaped form and re-escaped on display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Create a component from an attribute name and an unescaped value.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }

    /// The lowercased attribute name (e.g. `cn`, `ou`, `dc`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The unescaped attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for Rdn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_value(&self.value))
    }
}

/// A distinguished name: an ordered sequence of [`Rdn`] components,
/// most-specific first.
///
/// The same type represents both relative and absolute DNs; which one
/// a given value is follows from where it came from (user identifiers
/// are relative, group member references are absolute). Conversion
/// between the two goes through [`DnResolver`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Parse an RFC 4514 DN string. The empty string is the empty DN.
    pub fn parse(input: &str) -> Result<Self, DnError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Dn::default());
        }

        let mut rdns = Vec::new();
        for raw in split_unescaped(input, ',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(DnError::malformed(input, "empty component"));
            }
            let eq = find_unescaped(raw, '=').ok_or_else(|| {
                DnError::malformed(input, format!("component '{raw}' has no '='"))
            })?;
            let attribute = raw[..eq].trim();
            if attribute.is_empty() {
                return Err(DnError::malformed(
                    input,
                    format!("component '{raw}' has an empty attribute name"),
                ));
            }
            let value = unescape_value(input, raw[eq + 1..].trim())?;
            rdns.push(Rdn::new(attribute, value));
        }
        Ok(Dn { rdns })
    }

    /// Build a DN from components, most-specific first.
    #[must_use]
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Dn { rdns }
    }

    /// The components, most-specific first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// True for the empty (zero-component) DN.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// The leading (most-specific) component, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Concatenate `suffix` after this DN's components.
    ///
    /// `cn=a,ou=b` appended with `dc=x,dc=y` is `cn=a,ou=b,dc=x,dc=y`.
    #[must_use]
    pub fn append(&self, suffix: &Dn) -> Dn {
        let mut rdns = self.rdns.clone();
        rdns.extend(suffix.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Whether this DN ends with the given suffix components.
    #[must_use]
    pub fn ends_with(&self, suffix: &Dn) -> bool {
        if suffix.rdns.len() > self.rdns.len() {
            return false;
        }
        let tail = &self.rdns[self.rdns.len() - suffix.rdns.len()..];
        tail == suffix.rdns.as_slice()
    }

    /// Remove the given suffix, yielding the leading components.
    /// `None` when this DN does not end with `suffix`.
    #[must_use]
    pub fn strip_suffix(&self, suffix: &Dn) -> Option<Dn> {
        if !self.ends_with(suffix) {
            return None;
        }
        Some(Dn {
            rdns: self.rdns[..self.rdns.len() - suffix.rdns.len()].to_vec(),
        })
    }
}

impl Display for Dn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for rdn in &self.rdns {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

impl Serialize for Dn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dn::parse(&s).map_err(de::Error::custom)
    }
}

/// Converts between relative and absolute DNs against a fixed base
/// path.
///
/// Both directions use exactly the same base value; the resolver is
/// constructed once at process start and shared. Conversion is
/// lossless: `to_relative(to_absolute(r)) == r` for any relative `r`
/// that does not already contain the base.
#[derive(Debug, Clone)]
pub struct DnResolver {
    base: Dn,
}

impl DnResolver {
    /// Create a resolver over an already-parsed base path.
    #[must_use]
    pub fn new(base: Dn) -> Self {
        Self { base }
    }

    /// Parse the base path from its string form.
    pub fn parse(base: &str) -> Result<Self, DnError> {
        Ok(Self::new(Dn::parse(base)?))
    }

    /// The configured base path.
    #[must_use]
    pub fn base(&self) -> &Dn {
        &self.base
    }

    /// Relative identifier → absolute DN (prefixes the base path).
    #[must_use]
    pub fn to_absolute(&self, relative: &Dn) -> Dn {
        relative.append(&self.base)
    }

    /// Absolute DN → relative identifier (strips the base path).
    pub fn to_relative(&self, absolute: &Dn) -> Result<Dn, DnError> {
        absolute
            .strip_suffix(&self.base)
            .ok_or_else(|| DnError::BaseMismatch {
                dn: absolute.to_string(),
                base: self.base.to_string(),
            })
    }
}

/// Split on an unescaped separator character, keeping escapes intact.
fn split_unescaped(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Byte index of the first unescaped occurrence of `needle`.
fn find_unescaped(input: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(i);
        }
    }
    None
}

/// Undo RFC 4514 escaping in an attribute value.
fn unescape_value(dn: &str, raw: &str) -> Result<String, DnError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(e) if SPECIALS.contains(&e) || e == ' ' || e == '#' => out.push(e),
            Some(h1) if h1.is_ascii_hexdigit() => {
                let h2 = chars
                    .next()
                    .filter(char::is_ascii_hexdigit)
                    .ok_or_else(|| DnError::malformed(dn, "truncated hex escape"))?;
                let mut hex = String::with_capacity(2);
                hex.push(h1);
                hex.push(h2);
                // Parse cannot fail: both characters are hex digits.
                let byte = u8::from_str_radix(&hex, 16).unwrap_or_default();
                out.push(byte as char);
            }
            _ => return Err(DnError::malformed(dn, "dangling escape")),
        }
    }
    Ok(out)
}

/// Escape an attribute value per RFC 4514.
///
/// Always escapes the special characters, NUL as `\00`, a space at the
/// start or end, and `#` at the start.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 2);
    let last = value.chars().count().saturating_sub(1);
    for (i, ch) in value.chars().enumerate() {
        match ch {
            c if SPECIALS.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\00"),
            ' ' if i == 0 || i == last => out.push_str("\\20"),
            '#' if i == 0 => out.push_str("\\23"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_simple() {
        let dn = Dn::parse("cn=emp001,ou=people").unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.first().unwrap().attribute(), "cn");
        assert_eq!(dn.first().unwrap().value(), "emp001");
        assert_eq!(dn.to_string(), "cn=emp001,ou=people");
    }

    #[test]
    fn parse_normalizes_attribute_case_and_whitespace() {
        let a = Dn::parse("CN=Alice Smith, OU=People").unwrap();
        let b = Dn::parse("cn=Alice Smith,ou=People").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "cn=Alice Smith,ou=People");
    }

    #[test]
    fn parse_empty_is_empty_dn() {
        let dn = Dn::parse("").unwrap();
        assert!(dn.is_empty());
        assert_eq!(dn.to_string(), "");
    }

    #[test]
    fn parse_rejects_missing_equals() {
        let err = Dn::parse("cn=ok,nonsense").unwrap_err();
        assert!(matches!(err, DnError::Malformed { .. }));
    }

    #[test]
    fn parse_rejects_empty_attribute() {
        assert!(Dn::parse("=value,ou=people").is_err());
    }

    #[test]
    fn parse_rejects_dangling_escape() {
        assert!(Dn::parse("cn=trailing\\").is_err());
    }

    #[test]
    fn escaped_comma_round_trips() {
        let dn = Dn::parse("cn=Smith\\, Alice,ou=people").unwrap();
        assert_eq!(dn.first().unwrap().value(), "Smith, Alice");
        assert_eq!(dn.to_string(), "cn=Smith\\, Alice,ou=people");
        assert_eq!(Dn::parse(&dn.to_string()).unwrap(), dn);
    }

    #[test]
    fn hex_escape_is_decoded() {
        let dn = Dn::parse("cn=\\23hash").unwrap();
        assert_eq!(dn.first().unwrap().value(), "#hash");
        // Leading '#' is re-escaped on output.
        assert_eq!(dn.to_string(), "cn=\\23hash");
    }

    #[test]
    fn leading_and_trailing_space_are_escaped_on_display() {
        let dn = Dn::from_rdns(vec![Rdn::new("cn", " padded ")]);
        assert_eq!(dn.to_string(), "cn=\\20padded\\20");
        assert_eq!(Dn::parse(&dn.to_string()).unwrap(), dn);
    }

    #[test]
    fn append_and_strip_suffix() {
        let relative = Dn::parse("cn=emp001,ou=people").unwrap();
        let base = Dn::parse("dc=example,dc=com").unwrap();
        let absolute = relative.append(&base);
        assert_eq!(
            absolute.to_string(),
            "cn=emp001,ou=people,dc=example,dc=com"
        );
        assert!(absolute.ends_with(&base));
        assert_eq!(absolute.strip_suffix(&base).unwrap(), relative);
    }

    #[test]
    fn strip_suffix_refuses_non_suffix() {
        let dn = Dn::parse("cn=emp001,ou=people").unwrap();
        let other = Dn::parse("dc=other,dc=net").unwrap();
        assert!(dn.strip_suffix(&other).is_none());
    }

    #[test]
    fn resolver_round_trip() {
        let resolver = DnResolver::parse("dc=example,dc=com").unwrap();
        for raw in [
            "cn=emp001,ou=people",
            "cn=Smith\\, Alice,ou=people",
            "uid=x",
            "",
        ] {
            let relative = Dn::parse(raw).unwrap();
            let absolute = resolver.to_absolute(&relative);
            assert_eq!(resolver.to_relative(&absolute).unwrap(), relative);
        }
    }

    #[test]
    fn resolver_rejects_foreign_base() {
        let resolver = DnResolver::parse("dc=example,dc=com").unwrap();
        let foreign = Dn::parse("cn=emp001,ou=people,dc=other,dc=net").unwrap();
        let err = resolver.to_relative(&foreign).unwrap_err();
        assert!(matches!(err, DnError::BaseMismatch { .. }));
    }

    #[test]
    fn dn_serde_round_trip() {
        let dn = Dn::parse("cn=emp001,ou=people").unwrap();
        let json = serde_json::to_string(&dn).unwrap();
        assert_eq!(json, "\"cn=emp001,ou=people\"");
        let back: Dn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dn);
    }

    #[test]
    fn dn_ordering_is_deterministic() {
        let mut dns = vec![
            Dn::parse("cn=b,ou=people").unwrap(),
            Dn::parse("cn=a,ou=people").unwrap(),
        ];
        dns.sort();
        assert_eq!(dns[0].to_string(), "cn=a,ou=people");
    }
}
