//! Identifier newtypes for documents and revisions.
//!
//! Both are store-assigned integers. Revision ids are strictly increasing,
//! so comparing two ids tells which revision was written later.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(DocumentId)
    }
}

impl FromStr for RevisionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(RevisionId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id: DocumentId = "42".parse().unwrap();
        assert_eq!(id, DocumentId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<RevisionId>().is_err());
    }

    #[test]
    fn revision_ids_order_by_value() {
        assert!(RevisionId(9) > RevisionId(5));
        assert_eq!(
            [RevisionId(3), RevisionId(7), RevisionId(1)].iter().max(),
            Some(&RevisionId(7))
        );
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&RevisionId(5)).unwrap();
        assert_eq!(json, "5");
    }
}
