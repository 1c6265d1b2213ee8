//! Canonical revision selection.

use crate::domain::{RoleDocument, RoleRevision};

/// Pick the revision to analyze for `document`.
///
/// The first revision labelled `HEAD` wins; otherwise the last revision in
/// document order. A document with no revisions yields `None`, which callers
/// treat as "nothing to contribute" rather than an error.
pub fn select(document: &RoleDocument) -> Option<&RoleRevision> {
    document
        .revisions
        .iter()
        .find(|rev| rev.is_head())
        .or_else(|| document.revisions.last())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(labels: &[&str]) -> RoleDocument {
        labels
            .iter()
            .fold(RoleDocument::new("role"), |d, l| d.with_revision(RoleRevision::new(*l)))
    }

    #[test]
    fn test_select_prefers_first_head() {
        let d = doc(&["a1", "HEAD", "b2", "HEAD"]);
        let rev = select(&d).unwrap();
        assert!(std::ptr::eq(rev, &d.revisions[1]));
    }

    #[test]
    fn test_select_falls_back_to_last_revision() {
        let d = doc(&["a1", "b2", "c3"]);
        assert_eq!(select(&d).unwrap().revision_label, "c3");
    }

    #[test]
    fn test_select_empty_document_yields_none() {
        assert!(select(&RoleDocument::new("empty")).is_none());
    }

    #[test]
    fn test_select_is_deterministic() {
        let d = doc(&["x", "y", "HEAD"]);
        let first = select(&d).unwrap();
        let second = select(&d).unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
