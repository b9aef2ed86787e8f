use super::{Deadline, ResolutionState};
use crate::config::ResolverConfig;
use crate::document::{Document, DocumentClassifier};
use crate::error::{MexError, MexResult};
use crate::retriever::{RetrievalContext, Retriever};
use crate::transport::Backends;

/// Walk the metadata graph starting from `seeds`.
///
/// Retrievers are taken from a LIFO stack. A retriever equal to one already
/// fetched is skipped; once `max_resolved_references` distinct retrievals
/// have happened, the next one that would need fetching fails the whole
/// call with `TooManyReferences`. Any failure discards everything gathered
/// so far.
pub async fn resolve(
    seeds: Vec<Retriever>,
    config: &ResolverConfig,
    backends: &Backends,
) -> MexResult<Vec<Document>> {
    if seeds.is_empty() {
        return Err(MexError::Config(
            "at least one metadata location or reference is required".to_string(),
        ));
    }

    let deadline = Deadline::start(config.timeout());
    let ctx = RetrievalContext {
        backends,
        classifier: DocumentClassifier::new(config.quotas),
        deadline: &deadline,
    };

    let mut state = ResolutionState::new(
        config.max_resolved_references,
        config.resolve_nested,
        config.allowed_schemes.clone(),
    );
    for seed in seeds {
        state.push(seed);
    }

    while let Some(retriever) = state.pop_next() {
        if state.has_been_visited(&retriever) {
            log::debug!("Skipping already retrieved {}", retriever);
            continue;
        }
        if state.is_at_capacity() {
            log::warn!(
                "Reference limit of {} reached with {} still pending",
                state.max_resolved(),
                retriever
            );
            return Err(MexError::TooManyReferences {
                max: state.max_resolved(),
            });
        }

        state.mark_visited(retriever.clone())?;
        log::debug!(
            "Retrieving {} ({}/{})",
            retriever,
            state.visited_count(),
            state.max_resolved()
        );

        let document = match retriever.retrieve(&ctx).await {
            Ok(document) => document,
            Err(e) => {
                log::warn!("Metadata resolution failed at {}: {}", retriever, e);
                return Err(e);
            }
        };
        state.absorb(document)?;
    }

    log::info!(
        "Resolved {} metadata documents from {} retrievals",
        state.output().len(),
        state.visited_count()
    );
    Ok(state.into_output())
}

/// Run [`resolve`] to completion on the calling thread.
///
/// Fails with `BlockingInAsyncContext` when called from inside a tokio
/// runtime, where blocking would stall the executor.
pub fn resolve_blocking(
    seeds: Vec<Retriever>,
    config: &ResolverConfig,
    backends: &Backends,
) -> MexResult<Vec<Document>> {
    let runtime = current_thread_runtime()?;
    runtime.block_on(resolve(seeds, config, backends))
}

pub(crate) fn current_thread_runtime() -> MexResult<tokio::runtime::Runtime> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(MexError::BlockingInAsyncContext);
    }
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
