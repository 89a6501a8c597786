use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityRef;

/// One annotated miRNA / disease-or-gene pair.
///
/// The association references its entities by key and does not own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub id: Uuid,
    pub pubmed_id: String,
    pub pair_id: String,
    pub sentence: String,
    pub interaction: String,
    pub interaction_type: String,
    pub e1: EntityRef,
    pub e2: EntityRef,
}

impl AssociationRecord {
    #[must_use]
    pub fn new(pubmed_id: String, pair_id: String, e1: EntityRef, e2: EntityRef) -> Self {
        Self {
            id: Uuid::now_v7(),
            pubmed_id,
            pair_id,
            sentence: String::new(),
            interaction: String::new(),
            interaction_type: String::new(),
            e1,
            e2,
        }
    }

    #[must_use]
    pub fn with_sentence(mut self, sentence: String) -> Self {
        self.sentence = sentence;
        self
    }

    #[must_use]
    pub fn with_interaction(mut self, interaction: String, interaction_type: String) -> Self {
        self.interaction = interaction;
        self.interaction_type = interaction_type;
        self
    }

    /// Whether the annotators marked this pair as interacting.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.interaction.eq_ignore_ascii_case("true")
    }

    /// Edge label for graph export: the interaction type, or the raw
    /// interaction flag when no type was annotated.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.interaction_type.is_empty() {
            &self.interaction
        } else {
            &self.interaction_type
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AssociationRecord {
        AssociationRecord::new(
            "12345".into(),
            "d0.s0.p0".into(),
            EntityRef::generate(),
            EntityRef::generate(),
        )
    }

    #[test]
    fn test_is_positive() {
        let rec = record().with_interaction("True".into(), "inhibition".into());
        assert!(rec.is_positive());

        let rec = record().with_interaction("false".into(), String::new());
        assert!(!rec.is_positive());
    }

    #[test]
    fn test_label_falls_back_to_interaction() {
        let rec = record().with_interaction("true".into(), "inhibition".into());
        assert_eq!(rec.label(), "inhibition");

        let rec = record().with_interaction("false".into(), String::new());
        assert_eq!(rec.label(), "false");
    }
}
