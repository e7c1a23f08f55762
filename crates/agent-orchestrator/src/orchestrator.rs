//! Multi-agent fan-out / fan-in
//!
//! ```text
//!            ┌─► provider A ─┐
//! request ───┼─► provider B ─┼─► normalize ─► ground ─► AgentRun (completed | failed)
//!            └─► provider C ─┘
//! ```
//!
//! All calls run concurrently on the caller's task. Each provider's run is
//! written only by the fan-in loop, one transition at a time, so no locking
//! is needed. The call returns once every run is terminal.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use grounding_core::{GroundingPipeline, PageSource, TextLocator};
use shared_types::{AgentRun, TransitionError};
use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::normalize::normalize_extraction;
use crate::provider::{ExtractionProvider, ExtractionRequest};

#[derive(Clone, Copy, Debug, Default)]
pub struct AgentOrchestrator {
    pipeline: GroundingPipeline,
}

impl AgentOrchestrator {
    pub fn new(pipeline: GroundingPipeline) -> Self {
        Self { pipeline }
    }

    /// Run the request against every provider and wait for all of them
    pub async fn run_all<S>(
        &self,
        providers: &[Arc<dyn ExtractionProvider>],
        request: &ExtractionRequest,
        source: &S,
    ) -> Vec<AgentRun>
    where
        S: PageSource + Sync + ?Sized,
    {
        self.run_all_observed(providers, request, source, &CancelToken::never(), |_| {})
            .await
    }

    /// [`run_all`](Self::run_all) with cancellation and a snapshot callback
    ///
    /// `on_update` sees the all-pending snapshot, then the all-extracting
    /// snapshot, then one snapshot per provider as it settles. Runs still in
    /// flight when `cancel` fires end up `failed` with a `cancelled:` reason.
    #[instrument(skip_all, fields(provider_count = providers.len(), field_count = request.fields.len()))]
    pub async fn run_all_observed<S, F>(
        &self,
        providers: &[Arc<dyn ExtractionProvider>],
        request: &ExtractionRequest,
        source: &S,
        cancel: &CancelToken,
        mut on_update: F,
    ) -> Vec<AgentRun>
    where
        S: PageSource + Sync + ?Sized,
        F: FnMut(&[AgentRun]),
    {
        let mut runs: Vec<AgentRun> = providers
            .iter()
            .map(|p| AgentRun::pending(p.id().clone()))
            .collect();
        on_update(&runs);

        for run in &mut runs {
            apply(run.start());
        }
        on_update(&runs);

        let locator = TextLocator::new(source);
        let mut in_flight: FuturesUnordered<_> = providers
            .iter()
            .enumerate()
            .map(|(index, provider)| async move {
                let outcome = tokio::select! {
                    result = provider.extract(request) => result.map_err(|e| e.to_string()),
                    reason = cancel.cancelled() => Err(format!("cancelled: {}", reason)),
                };
                (index, outcome)
            })
            .collect();

        while let Some((index, outcome)) = in_flight.next().await {
            let run = &mut runs[index];
            let fields = outcome
                .and_then(|raw| normalize_extraction(&raw).map_err(|e| e.to_string()));

            match fields {
                Ok(fields) => {
                    let grounded = self.pipeline.ground_with(&fields, &locator);
                    let located = grounded.iter().filter(|r| r.is_grounded()).count();
                    info!(
                        "Provider {} completed: {} fields, {} grounded",
                        run.provider,
                        grounded.len(),
                        located
                    );
                    apply(run.complete(grounded));
                }
                Err(error) => {
                    warn!("Provider {} failed: {}", run.provider, error);
                    apply(run.fail(error));
                }
            }
            on_update(&runs);
        }

        let completed = runs.iter().filter(|r| r.is_completed()).count();
        info!("{} of {} providers completed", completed, runs.len());
        runs
    }
}

/// Every transition here is legal by construction; an error means a bug in
/// the orchestrator itself.
fn apply(transition: Result<(), TransitionError>) {
    if let Err(e) = transition {
        panic!("orchestrator bug: {}", e);
    }
}

/// Replace runs of re-invoked providers, keeping the rest
///
/// Order of `previous` is preserved; providers only present in `fresh` are
/// appended.
pub fn merge_runs(previous: Vec<AgentRun>, fresh: Vec<AgentRun>) -> Vec<AgentRun> {
    let mut merged = previous;
    for run in fresh {
        match merged.iter_mut().find(|r| r.provider == run.provider) {
            Some(slot) => *slot = run,
            None => merged.push(run),
        }
    }
    merged
}
