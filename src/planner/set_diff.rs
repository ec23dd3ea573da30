//! Symmetric difference shared by every rule dimension.

use std::collections::BTreeSet;

use super::ports::PortToken;

/// Values that are ignored when comparing collections.
pub trait Blank {
    /// Returns true if the value carries no information.
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for &str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for PortToken {
    // Port 0 is never a valid firewall port and counts as empty.
    fn is_blank(&self) -> bool {
        match self {
            Self::Number(port) => *port == 0,
            Self::Opaque(token) => token.trim().is_empty(),
        }
    }
}

/// Additions and removals needed to turn `existing` into `desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T: Ord> {
    /// Present in desired but not in existing.
    pub additions: BTreeSet<T>,
    /// Present in existing but not in desired.
    pub removals: BTreeSet<T>,
}

impl<T: Ord> SetDiff<T> {
    /// Returns true if both sides hold the same values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

impl<T: Ord> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            additions: BTreeSet::new(),
            removals: BTreeSet::new(),
        }
    }
}

/// Computes `(desired - existing, existing - desired)`.
///
/// Blank values are dropped from both sides first, and duplicates collapse.
pub fn diff_sets<T, D, E>(desired: D, existing: E) -> SetDiff<T>
where
    T: Ord + Clone + Blank,
    D: IntoIterator<Item = T>,
    E: IntoIterator<Item = T>,
{
    let desired: BTreeSet<T> = desired.into_iter().filter(|v| !v.is_blank()).collect();
    let existing: BTreeSet<T> = existing.into_iter().filter(|v| !v.is_blank()).collect();

    SetDiff {
        additions: desired.difference(&existing).cloned().collect(),
        removals: existing.difference(&desired).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_collections() {
        let tags = vec!["web", "ssh", "db"];
        let diff = diff_sets(tags.clone(), tags);
        assert!(diff.is_empty());

        let diff: SetDiff<String> = diff_sets(Vec::new(), Vec::new());
        assert_eq!(diff, SetDiff::default());
    }

    #[test]
    fn test_additions_and_removals() {
        let diff = diff_sets(vec!["a", "b", "c"], vec!["b", "c", "d"]);
        assert_eq!(diff.additions.into_iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(diff.removals.into_iter().collect::<Vec<_>>(), vec!["d"]);
    }

    #[test]
    fn test_order_is_irrelevant() {
        assert!(diff_sets(vec!["a", "b"], vec!["b", "a", "a"]).is_empty());
    }

    #[test]
    fn test_blank_values_are_dropped() {
        let diff = diff_sets(
            vec![String::from(""), String::from("10.0.0.0/8")],
            vec![String::from("10.0.0.0/8"), String::from(" ")],
        );
        assert!(diff.is_empty());

        let diff = diff_sets(
            vec![PortToken::Number(0), PortToken::Number(22)],
            vec![PortToken::Number(22)],
        );
        assert!(diff.is_empty());
    }
}
