//! Per-provider run state for multi-agent extraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::field::GroundedFieldResult;

/// Identifier of one configured extraction provider
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of one provider within one orchestration
///
/// `Pending -> Extracting -> {Completed | Failed}`; both last states are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Extracting,
    Completed,
    Failed,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Failed)
    }

    fn can_transition_to(&self, next: AgentStatus) -> bool {
        matches!(
            (self, next),
            (AgentStatus::Pending, AgentStatus::Extracting)
                | (AgentStatus::Extracting, AgentStatus::Completed)
                | (AgentStatus::Extracting, AgentStatus::Failed)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Provider {provider}: illegal transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub provider: ProviderId,
    pub from: AgentStatus,
    pub to: AgentStatus,
}

/// State of one provider's extraction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub provider: ProviderId,
    pub status: AgentStatus,
    #[serde(default)]
    pub results: BTreeMap<String, GroundedFieldResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentRun {
    pub fn pending(provider: ProviderId) -> Self {
        Self {
            provider,
            status: AgentStatus::Pending,
            results: BTreeMap::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AgentStatus::Completed
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(AgentStatus::Extracting)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Populate results and finish. Later duplicates of a field name are dropped.
    pub fn complete(
        &mut self,
        results: impl IntoIterator<Item = GroundedFieldResult>,
    ) -> Result<(), TransitionError> {
        self.transition(AgentStatus::Completed)?;
        for result in results {
            self.results
                .entry(result.field_name().to_string())
                .or_insert(result);
        }
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(AgentStatus::Failed)?;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn result(&self, field_name: &str) -> Option<&GroundedFieldResult> {
        self.results.get(field_name)
    }

    fn transition(&mut self, next: AgentStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                provider: self.provider.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
