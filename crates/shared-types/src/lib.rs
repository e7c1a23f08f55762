//! Data model shared by the grounding, orchestration and consensus crates

pub mod agent;
pub mod consensus;
pub mod field;
pub mod page;

pub use agent::{AgentRun, AgentStatus, ProviderId, TransitionError};
pub use consensus::{AgreementClass, ConsensusResult};
pub use field::{
    Confidence, ExtractedFieldResult, FieldValue, GroundedFieldResult, ResolvedLocation,
    SourceLocation, UngroundedReason,
};
pub use page::{PageContent, TextRun, FALLBACK_RUN_HEIGHT};
