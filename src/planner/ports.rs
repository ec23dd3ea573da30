//! Port list parsing and `allow` field formatting.
//!
//! Port lists are comma-delimited tokens, each a single port (`22`) or an
//! inclusive range (`20000-20005`). For comparison they are expanded into a
//! [`PortSet`], so a range and the same ports listed one by one are equal.
//! For the `gcloud --allow` field they are only reformatted, never expanded.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PortParseError;

/// A single port identifier after expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortToken {
    /// A numeric port.
    Number(u16),
    /// A token that is neither a port number nor a range, kept verbatim.
    Opaque(String),
}

/// Expanded set of port identifiers.
pub type PortSet = BTreeSet<PortToken>;

/// Unexpanded, comma-delimited port list as written by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortSpec(String);

impl PortSpec {
    /// Creates a port list from its textual form.
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    /// Returns the list as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the list has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens().next().is_none()
    }

    /// Iterates over the trimmed, non-empty tokens in their original order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        split_tokens(&self.0)
    }

    /// Expands the list into a [`PortSet`].
    ///
    /// # Errors
    ///
    /// Returns an error if a range has non-numeric bounds.
    pub fn expand(&self) -> Result<PortSet, PortParseError> {
        parse_ports(self.tokens())
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortSpec {
    fn from(spec: &str) -> Self {
        Self::new(spec)
    }
}

impl fmt::Display for PortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(port) => write!(f, "{port}"),
            Self::Opaque(token) => f.write_str(token),
        }
    }
}

/// Splits a comma-delimited list into trimmed, non-empty tokens.
pub fn split_tokens(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Expands port tokens into a set.
///
/// Ranges are inclusive; a range whose start is above its end contributes
/// nothing. Tokens that are not numbers and contain no `-` pass through as
/// [`PortToken::Opaque`].
///
/// # Errors
///
/// Returns an error if a token containing `-` does not have exactly two
/// numeric bounds.
pub fn parse_ports<I, S>(tokens: I) -> Result<PortSet, PortParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ports = PortSet::new();

    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }

        if token.contains('-') {
            let (start, end) = parse_range(token)?;
            ports.extend((start..=end).map(PortToken::Number));
        } else if let Ok(port) = token.parse::<u16>() {
            ports.insert(PortToken::Number(port));
        } else {
            ports.insert(PortToken::Opaque(token.to_string()));
        }
    }

    Ok(ports)
}

/// Expands a comma-delimited port list.
///
/// # Errors
///
/// Returns an error if a range has non-numeric bounds.
pub fn parse_port_list(list: &str) -> Result<PortSet, PortParseError> {
    parse_ports(list.split(','))
}

/// Parses `START-END` into its bounds.
pub(crate) fn parse_range(token: &str) -> Result<(u16, u16), PortParseError> {
    let mut bounds = token.split('-');
    let (Some(start), Some(end), None) = (bounds.next(), bounds.next(), bounds.next()) else {
        return Err(PortParseError::MalformedRange {
            token: token.to_string(),
        });
    };

    let parse_bound = |bound: &str| {
        bound
            .trim()
            .parse::<u16>()
            .map_err(|_| PortParseError::InvalidBound {
                token: token.to_string(),
                bound: bound.to_string(),
            })
    };

    Ok((parse_bound(start)?, parse_bound(end)?))
}

/// Renders desired TCP and UDP lists as a `gcloud --allow` value.
///
/// All TCP tokens come first in their original order, then all UDP tokens.
/// Ranges keep their `START-END` form.
#[must_use]
pub fn format_allow(tcp: &str, udp: &str) -> String {
    split_tokens(tcp)
        .map(|token| format!("tcp:{token}"))
        .chain(split_tokens(udp).map(|token| format!("udp:{token}")))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(ports: &[u16]) -> PortSet {
        ports.iter().copied().map(PortToken::Number).collect()
    }

    #[test]
    fn test_parse_range() {
        let ports = parse_port_list("20000-20002").unwrap();
        assert_eq!(ports, numbers(&[20000, 20001, 20002]));
    }

    #[test]
    fn test_parse_mixed() {
        let ports = parse_port_list("22,20000-20001").unwrap();
        assert_eq!(ports, numbers(&[22, 20000, 20001]));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_port_list("").unwrap().is_empty());
        assert!(parse_ports(Vec::<String>::new()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_collapses_duplicates() {
        let ports = parse_port_list("80,80,79-81").unwrap();
        assert_eq!(ports, numbers(&[79, 80, 81]));
    }

    #[test]
    fn test_range_equals_individual_ports() {
        let range = parse_port_list("20000-20005").unwrap();
        let listed = parse_port_list("20000,20001,20002,20003,20004,20005").unwrap();
        assert_eq!(range, listed);
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert!(parse_port_list("30-20").unwrap().is_empty());
    }

    #[test]
    fn test_opaque_token_passes_through() {
        let ports = parse_port_list("22,all").unwrap();
        assert!(ports.contains(&PortToken::Opaque(String::from("all"))));
        assert!(ports.contains(&PortToken::Number(22)));

        // Out of u16 range, so not a port number.
        let ports = parse_port_list("70000").unwrap();
        assert!(ports.contains(&PortToken::Opaque(String::from("70000"))));
    }

    #[test]
    fn test_malformed_range_fails() {
        let err = parse_port_list("1-2-3").unwrap_err();
        assert!(matches!(err, PortParseError::MalformedRange { .. }));
    }

    #[test]
    fn test_non_numeric_range_fails() {
        let err = parse_port_list("22,abc-90").unwrap_err();
        assert_eq!(
            err,
            PortParseError::InvalidBound {
                token: String::from("abc-90"),
                bound: String::from("abc"),
            }
        );
    }

    #[test]
    fn test_format_allow() {
        assert_eq!(
            format_allow("22,20000-20005", "53"),
            "tcp:22,tcp:20000-20005,udp:53"
        );
        assert_eq!(format_allow("", "53,60000-61000"), "udp:53,udp:60000-61000");
        assert_eq!(format_allow("443", ""), "tcp:443");
        assert_eq!(format_allow("", ""), "");
    }

    #[test]
    fn test_format_skips_empty_tokens() {
        assert_eq!(format_allow("22, 80,", ""), "tcp:22,tcp:80");
    }

    #[test]
    fn test_expansion_is_idempotent() {
        for list in ["22,20000-20002", "", "80", "1-3,2-4,all"] {
            let expanded = parse_port_list(list).unwrap();
            let rendered = expanded
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            assert_eq!(parse_port_list(&rendered).unwrap(), expanded, "list {list:?}");
        }
    }

    #[test]
    fn test_port_spec_tokens() {
        let spec = PortSpec::new(" 22 , ,20000-20001");
        assert_eq!(spec.tokens().collect::<Vec<_>>(), vec!["22", "20000-20001"]);
        assert!(!spec.is_empty());
        assert!(PortSpec::new(" , ").is_empty());
        assert_eq!(spec.expand().unwrap(), numbers(&[22, 20000, 20001]));
    }
}
