//! Canonical identity of an active-expert set.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::expert::ExpertId;

/// Order-independent identity of a fusion support set.
///
/// Ids are stored sorted and deduplicated, so two signatures are equal iff
/// their sets are equal. The empty signature denotes the base model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpertSignature(Vec<ExpertId>);

impl ExpertSignature {
    #[must_use]
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ExpertId>,
    {
        let mut ids: Vec<ExpertId> = ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    /// Signature of the unmodified base model.
    #[must_use]
    pub fn base() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &ExpertId) -> bool {
        self.0.binary_search(id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpertId> {
        self.0.iter()
    }
}

impl fmt::Display for ExpertSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<base>");
        }
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            f.write_str(id.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_order_independent() {
        let a = ExpertSignature::from_ids(["math", "code", "creative"]);
        let b = ExpertSignature::from_ids(["creative", "math", "code"]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "code+creative+math");
    }

    #[test]
    fn test_signature_dedups() {
        let sig = ExpertSignature::from_ids(["math", "math"]);
        assert_eq!(sig.len(), 1);
        assert!(sig.contains(&ExpertId::from("math")));
    }

    #[test]
    fn test_overlapping_signatures_differ() {
        let a = ExpertSignature::from_ids(["math", "code"]);
        let b = ExpertSignature::from_ids(["math"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_base_signature() {
        let base = ExpertSignature::base();
        assert!(base.is_base());
        assert_eq!(base.to_string(), "<base>");
        assert_eq!(base, ExpertSignature::from_ids(Vec::<String>::new()));
    }
}
