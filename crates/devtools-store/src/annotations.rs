//! Annotation accessors
//!
//! Identity is the creator-supplied `id`. Adding is always an upsert so a
//! retried submission never duplicates an entry, and deleting an unknown id is
//! not an error.

use devtools_proto::Annotation;
use serde::Serialize;

use crate::events::DevtoolsEvent;
use crate::store::DevtoolsStore;

/// What an upsert did to the annotation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// New id, appended at the end
    Inserted,
    /// Existing id, replaced at its original position
    Replaced,
}

impl DevtoolsStore {
    /// All annotations in insertion order
    pub fn annotations(&self) -> Vec<Annotation> {
        self.inner.read().annotations.clone()
    }

    /// Replace the entry with the same id in place, or append
    pub fn upsert_annotation(&self, annotation: Annotation) -> UpsertOutcome {
        let outcome = {
            let mut collections = self.inner.write();
            match collections
                .annotations
                .iter_mut()
                .find(|a| a.id == annotation.id)
            {
                Some(existing) => {
                    *existing = annotation.clone();
                    UpsertOutcome::Replaced
                }
                None => {
                    collections.annotations.push(annotation.clone());
                    UpsertOutcome::Inserted
                }
            }
        };
        self.publish(DevtoolsEvent::Annotation { annotation });
        outcome
    }

    /// Remove the annotation with this id, returning whether one existed
    pub fn delete_annotation(&self, id: &str) -> bool {
        let removed = {
            let mut collections = self.inner.write();
            match collections.annotations.iter().position(|a| a.id == id) {
                Some(index) => {
                    collections.annotations.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.publish(DevtoolsEvent::AnnotationDeleted { id: id.to_string() });
        }
        removed
    }

    pub fn clear_annotations(&self) {
        self.inner.write().annotations.clear();
        self.publish(DevtoolsEvent::AnnotationsCleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(id: &str, comment: &str) -> Annotation {
        Annotation {
            id: id.to_string(),
            component: "Button".to_string(),
            file_path: "components/Button.vue".to_string(),
            element_tag: "button".to_string(),
            text_preview: "Click".to_string(),
            comment: comment.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            rect: Default::default(),
        }
    }

    #[test]
    fn test_upsert_new_id_appends() {
        let store = DevtoolsStore::new();
        assert_eq!(
            store.upsert_annotation(annotation("a1", "first")),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert_annotation(annotation("a2", "second")),
            UpsertOutcome::Inserted
        );
        assert_eq!(store.annotations().len(), 2);
    }

    #[test]
    fn test_upsert_existing_id_keeps_position() {
        let store = DevtoolsStore::new();
        store.upsert_annotation(annotation("a1", "first"));
        store.upsert_annotation(annotation("a2", "second"));
        store.upsert_annotation(annotation("a3", "third"));

        let outcome = store.upsert_annotation(annotation("a2", "edited"));

        assert_eq!(outcome, UpsertOutcome::Replaced);
        let annotations = store.annotations();
        assert_eq!(annotations.len(), 3);
        assert_eq!(annotations[1].id, "a2");
        assert_eq!(annotations[1].comment, "edited");
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let store = DevtoolsStore::new();
        store.upsert_annotation(annotation("a1", "keep"));

        assert!(!store.delete_annotation("missing"));
        assert_eq!(store.annotations(), vec![annotation("a1", "keep")]);
    }

    #[test]
    fn test_delete_removes_match() {
        let store = DevtoolsStore::new();
        store.upsert_annotation(annotation("a1", "one"));
        store.upsert_annotation(annotation("a2", "two"));

        assert!(store.delete_annotation("a1"));
        let ids: Vec<_> = store.annotations().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a2"]);
    }

    #[test]
    fn test_clear_annotations_leaves_requests() {
        let store = DevtoolsStore::new();
        store.upsert_annotation(annotation("a1", "one"));

        store.clear_annotations();

        assert!(store.annotations().is_empty());
    }
}
