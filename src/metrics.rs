//! Process-wide crafting counters, keyed by recipe name.
//! Read by the CLI `simulate` summary and by tests.
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

static RECIPE_COUNTERS: OnceLock<Mutex<HashMap<String, RecipeCounter>>> = OnceLock::new();

/// Per-recipe tally of processing results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecipeCounter {
    pub attempts: u64,
    pub successes: u64,
    pub no_effect: u64,
    pub unknown: u64,
    pub tool_missing: u64,
    pub target_missing: u64,
    pub skipped: u64,
}

/// Which bucket a finished processing call lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    NoEffect,
    Unknown,
    ToolMissing,
    TargetMissing,
    /// Not accepted, or the item was already gone.
    Skipped,
}

fn counter_lock() -> &'static Mutex<HashMap<String, RecipeCounter>> {
    RECIPE_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_outcome(recipe: &str, kind: OutcomeKind) -> RecipeCounter {
    let mut guard = counter_lock()
        .lock()
        .expect("recipe counter mutex poisoned");
    let counter = guard.entry(recipe.to_string()).or_default();
    match kind {
        OutcomeKind::Skipped => {
            counter.skipped = counter.skipped.saturating_add(1);
            return *counter;
        }
        OutcomeKind::Success => counter.successes = counter.successes.saturating_add(1),
        OutcomeKind::NoEffect => counter.no_effect = counter.no_effect.saturating_add(1),
        OutcomeKind::Unknown => counter.unknown = counter.unknown.saturating_add(1),
        OutcomeKind::ToolMissing => counter.tool_missing = counter.tool_missing.saturating_add(1),
        OutcomeKind::TargetMissing => {
            counter.target_missing = counter.target_missing.saturating_add(1)
        }
    }
    counter.attempts = counter.attempts.saturating_add(1);
    *counter
}

pub fn recipe_counters_snapshot() -> HashMap<String, RecipeCounter> {
    counter_lock()
        .lock()
        .expect("recipe counter mutex poisoned")
        .clone()
}
