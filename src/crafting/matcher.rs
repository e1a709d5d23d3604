//! Item name matching
//!
//! Every "is this the item I mean" question in the engine goes through
//! [`matches`]. Recipes describe what they accept as a [`RecipeRule`] (data),
//! never as inline string logic.
//!
//! ## Normalization
//! Before any comparison both sides are trimmed and inner whitespace runs are
//! collapsed to a single space, so `"  Smelly   Liquid "` and
//! `"Smelly Liquid"` compare equal under every mode.
//!
//! ## Modes
//! - [`MatchMode::Exact`]: normalized, case-sensitive equality
//! - [`MatchMode::IgnoreCase`]: normalized, case-insensitive equality
//! - [`MatchMode::Contains`]: normalized, case-insensitive substring
//! - [`MatchMode::Prefix`]: normalized, case-insensitive starts-with

use serde::{Deserialize, Serialize};

/// Comparison mode for a single pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    #[default]
    IgnoreCase,
    Contains,
    Prefix,
}

/// One token and how to compare it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamePattern {
    pub token: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl NamePattern {
    pub fn exact(token: &str) -> Self {
        Self {
            token: token.to_string(),
            mode: MatchMode::Exact,
        }
    }

    pub fn ignore_case(token: &str) -> Self {
        Self {
            token: token.to_string(),
            mode: MatchMode::IgnoreCase,
        }
    }

    pub fn contains(token: &str) -> Self {
        Self {
            token: token.to_string(),
            mode: MatchMode::Contains,
        }
    }

    pub fn prefix(token: &str) -> Self {
        Self {
            token: token.to_string(),
            mode: MatchMode::Prefix,
        }
    }

    /// Evaluate this pattern against a display name.
    pub fn is_match(&self, name: &str) -> bool {
        let token = normalize(&self.token);
        if token.is_empty() {
            return false;
        }
        let name = normalize(name);
        match self.mode {
            MatchMode::Exact => name == token,
            MatchMode::IgnoreCase => name.to_lowercase() == token.to_lowercase(),
            MatchMode::Contains => name.to_lowercase().contains(&token.to_lowercase()),
            MatchMode::Prefix => name.to_lowercase().starts_with(&token.to_lowercase()),
        }
    }

    /// Substitute `{target}` in the token with the given name.
    pub fn render(&self, target_name: &str) -> NamePattern {
        NamePattern {
            token: self.token.replace("{target}", &normalize(target_name)),
            mode: self.mode,
        }
    }
}

/// Accept/reject pattern set for one recipe.
///
/// A name matches when any accept pattern matches and no reject pattern does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipeRule {
    pub accept: Vec<NamePattern>,
    #[serde(default)]
    pub reject: Vec<NamePattern>,
}

impl RecipeRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting(mut self, pattern: NamePattern) -> Self {
        self.accept.push(pattern);
        self
    }

    /// Accept each of `names` with the same mode.
    pub fn accepting_all(mut self, names: &[&str], mode: MatchMode) -> Self {
        self.accept.extend(names.iter().map(|n| NamePattern {
            token: n.to_string(),
            mode,
        }));
        self
    }

    pub fn rejecting(mut self, pattern: NamePattern) -> Self {
        self.reject.push(pattern);
        self
    }

    /// Substitute `{target}` in every pattern.
    pub fn render(&self, target_name: &str) -> RecipeRule {
        RecipeRule {
            accept: self.accept.iter().map(|p| p.render(target_name)).collect(),
            reject: self.reject.iter().map(|p| p.render(target_name)).collect(),
        }
    }
}

/// Normalize a display name for comparison: trim, collapse inner whitespace.
pub fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Does `rule` accept an item called `name`?
pub fn matches(name: &str, rule: &RecipeRule) -> bool {
    rule.accept.iter().any(|p| p.is_match(name)) && !rule.reject.iter().any(|p| p.is_match(name))
}

/// Do two display names refer to the same kind of item?
pub fn same_name(a: &str, b: &str) -> bool {
    normalize(a).to_lowercase() == normalize(b).to_lowercase()
}
