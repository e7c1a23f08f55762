//! Multi-agent extraction
//!
//! Sends one extraction request to several AI providers at once, maps every
//! answer to the canonical field shape, grounds it against the document and
//! tracks each provider's run until all have settled.
//!
//! - `ExtractionProvider`: the per-provider seam (HTTP implementations in `providers`)
//! - `normalize_extraction`: the single place external answer shapes are accepted
//! - `AgentOrchestrator`: concurrent fan-out, settle-all fan-in, cancellation

pub mod cancel;
pub mod error;
pub mod json_parser;
pub mod normalize;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod providers;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use error::{NormalizeError, ProviderError};
pub use normalize::normalize_extraction;
pub use orchestrator::{merge_runs, AgentOrchestrator};
pub use provider::{ExtractionProvider, ExtractionRequest, FieldSpec};
pub use providers::{build_providers, HttpProvider, ProviderConfig, ProviderKind};
