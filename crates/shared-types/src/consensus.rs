//! Agreement classes and the reviewer-editable consensus map

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::field::GroundedFieldResult;

/// How far the completed agents agree on one field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementClass {
    /// Every agent that reported the field gave the same value
    Full,
    /// Some, not all, agents agree
    Partial,
    /// Every agent disagrees
    None,
}

/// Accepted value per field for one review session
///
/// Never edited in place: every override produces a new map so the review UI
/// can keep old versions for undo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    #[serde(default)]
    pub fields: BTreeMap<String, GroundedFieldResult>,
    /// Field names whose entry was picked by a reviewer
    #[serde(default)]
    pub overridden: BTreeSet<String>,
}

impl ConsensusResult {
    pub fn get(&self, field_name: &str) -> Option<&GroundedFieldResult> {
        self.fields.get(field_name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_overridden(&self, field_name: &str) -> bool {
        self.overridden.contains(field_name)
    }

    /// Copy of this map with one field replaced by a reviewer's choice
    pub fn with_override(&self, field_name: &str, chosen: GroundedFieldResult) -> Self {
        let mut next = self.clone();
        next.fields.insert(field_name.to_string(), chosen);
        next.overridden.insert(field_name.to_string());
        next
    }
}
