//! Multi-agent consensus
//!
//! Classifies how far completed agent runs agree on each field and builds the
//! merged result a reviewer starts from:
//! - `agreement_for`: full / partial / none per field
//! - `build_default_consensus`: fully agreed fields only, no tie-break
//! - `override_field`: reviewer choice, returning a new consensus

pub mod agreement;
pub mod consensus;

pub use agreement::{
    agreement_for, agreement_report, agreement_stats, field_names, normalize_value,
    overall_agreement_percent, AgreementStats, FieldAgreement, ProviderValue,
};
pub use consensus::{
    build_default_consensus, candidates, override_field, unresolved_fields, Candidate,
};
