//! Ban category types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category represents the strength of a ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Hard block
    Full,
    /// Soft/restricted access
    Partial,
}

impl Category {
    /// All categories, in index order.
    pub const ALL: [Category; 2] = [Category::Full, Category::Partial];

    /// Parse a category from a string (case-insensitive).
    ///
    /// Accepts both `full` and `full_ban` forms.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" | "full_ban" => Some(Category::Full),
            "partial" | "partial_ban" => Some(Category::Partial),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Full => "full",
            Category::Partial => "partial",
        }
    }

    /// Dense index for per-category storage.
    pub(crate) fn index(self) -> usize {
        match self {
            Category::Full => 0,
            Category::Partial => 1,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| format!("unknown ban category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("full"), Some(Category::Full));
        assert_eq!(Category::parse("FULL"), Some(Category::Full));
        assert_eq!(Category::parse("partial_ban"), Some(Category::Partial));
        assert_eq!(Category::parse(" Partial "), Some(Category::Partial));
        assert_eq!(Category::parse("soft"), None);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Full.to_string(), "full");
        assert_eq!(Category::Partial.to_string(), "partial");
    }

    #[test]
    fn test_category_index_distinct() {
        assert_ne!(Category::Full.index(), Category::Partial.index());
        for c in Category::ALL {
            assert_eq!(Category::ALL[c.index()], c);
        }
    }

    #[test]
    fn test_category_serde() {
        assert_eq!(serde_json::to_string(&Category::Full).unwrap(), "\"full\"");
        let c: Category = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(c, Category::Partial);
    }
}
