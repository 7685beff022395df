//! Web search degradation for OpenRouter.
//!
//! Whether a model can use OpenRouter's native search engine is only known by asking. A
//! chat call with search enabled therefore walks through at most three tiers, each one
//! asking for less: the native engine, then the exa engine, then no search at all. The
//! choice of the next tier is a pure function of the current tier and the error it produced.

use std::future::Future;
use strum_macros::Display;
use tracing::{error, info, warn};

use super::openrouter::SearchEngine;
use crate::errors::{ArenaError, ArenaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SearchTier {
    Native,
    Exa,
    NoPlugin,
}

impl SearchTier {
    /// The engine requested in this tier, `None` when the plugin is dropped.
    pub fn engine(&self) -> Option<SearchEngine> {
        match self {
            SearchTier::Native => Some(SearchEngine::Native),
            SearchTier::Exa => Some(SearchEngine::Exa),
            SearchTier::NoPlugin => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Retry(SearchTier),
    Fatal,
}

/// Upper bound on calls made for one chat request.
pub const MAX_ATTEMPTS: usize = 3;

/// Select what follows a failed attempt.
///
/// Only a 404 saying the native engine is unsupported leads to exa; any other native failure
/// goes straight to dropping the plugin. The plugin-less tier is the last one.
pub fn next_tier(tier: SearchTier, error: &ArenaError) -> Transition {
    match tier {
        SearchTier::Native if error.is_native_search_unsupported() => {
            Transition::Retry(SearchTier::Exa)
        }
        SearchTier::Native | SearchTier::Exa => Transition::Retry(SearchTier::NoPlugin),
        SearchTier::NoPlugin => Transition::Fatal,
    }
}

/// Run `attempt` for each tier until one succeeds or the tiers are exhausted, in which case
/// the last error is returned. Attempts are sequential and immediate.
pub async fn run<T, F, Fut>(model_id: &str, mut attempt: F) -> ArenaResult<T>
where
    F: FnMut(SearchTier) -> Fut,
    Fut: Future<Output = ArenaResult<T>>,
{
    let mut tier = SearchTier::Native;
    let mut attempts = 0;
    info!("Web search enabled for model {}, trying {} engine", model_id, tier);

    loop {
        attempts += 1;
        match attempt(tier).await {
            Ok(value) => {
                if tier != SearchTier::Native {
                    info!("Model {} succeeded with {} tier", model_id, tier);
                }
                return Ok(value);
            }
            Err(err) => match next_tier(tier, &err) {
                Transition::Retry(next) if attempts < MAX_ATTEMPTS => {
                    warn!(
                        model = model_id,
                        failed = %tier,
                        next = %next,
                        status = err.upstream().map(|u| u.status),
                        "Web search attempt failed: {}",
                        err
                    );
                    tier = next;
                }
                _ => {
                    error!("All web search tiers failed for model {}: {}", model_id, err);
                    return Err(err);
                }
            },
        }
    }
}
