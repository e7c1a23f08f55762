//! Default consensus and reviewer overrides
//!
//! Only fields every reporting agent agrees on are filled in automatically.
//! Partial and no-agreement fields stay unresolved until a reviewer picks a
//! candidate; there is no tie-break.

use serde::Serialize;
use shared_types::{AgentRun, AgreementClass, ConsensusResult, GroundedFieldResult, ProviderId};
use tracing::debug;

use crate::agreement::{agreement_for, field_names, normalize_value};

/// Consensus with every fully agreed field filled in
///
/// The adopted entry is the first one, in run order, that carries a resolved
/// location; without one, the first entry.
pub fn build_default_consensus(runs: &[AgentRun]) -> ConsensusResult {
    let mut consensus = ConsensusResult::default();

    for field_name in field_names(runs) {
        if agreement_for(&field_name, runs) != Some(AgreementClass::Full) {
            continue;
        }
        let reported: Vec<&GroundedFieldResult> = runs
            .iter()
            .filter(|r| r.is_completed())
            .filter_map(|r| r.result(&field_name))
            .filter(|r| !normalize_value(r.value()).is_empty())
            .collect();

        let adopted = reported
            .iter()
            .find(|r| r.is_grounded())
            .or_else(|| reported.first());
        if let Some(adopted) = adopted {
            consensus.fields.insert(field_name, (*adopted).clone());
        }
    }

    debug!("Default consensus resolved {} fields", consensus.len());
    consensus
}

/// New consensus with one field replaced by the reviewer's choice
///
/// The consensus passed in is left untouched.
pub fn override_field(
    consensus: &ConsensusResult,
    field_name: &str,
    chosen: GroundedFieldResult,
) -> ConsensusResult {
    debug!("Override for field '{}'", field_name);
    consensus.with_override(field_name, chosen)
}

/// One agent's result for a field, offered to the reviewer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub provider: ProviderId,
    pub result: GroundedFieldResult,
}

/// What each completed agent reported for a field, in run order
pub fn candidates(field_name: &str, runs: &[AgentRun]) -> Vec<Candidate> {
    runs.iter()
        .filter(|r| r.is_completed())
        .filter_map(|r| {
            r.result(field_name).map(|result| Candidate {
                provider: r.provider.clone(),
                result: result.clone(),
            })
        })
        .collect()
}

/// Reported fields the consensus has no entry for yet
pub fn unresolved_fields(consensus: &ConsensusResult, runs: &[AgentRun]) -> Vec<String> {
    field_names(runs)
        .into_iter()
        .filter(|name| consensus.get(name).is_none())
        .collect()
}
