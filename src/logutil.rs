//! Logging helpers.
//!
//! Item and container names come from the remote world and may carry control
//! characters; [`sanitize_name`] keeps every log line single-line. [`RecipeLog`]
//! is the per-recipe debug sink used by the crafting engine.

/// Log target for all recipe processing output.
pub const RECIPE_TARGET: &str = "craftbot::recipe";

/// Escape a remote name for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - other control characters => `\\xNN`
///
/// Names longer than `MAX_NAME` chars are cut with an ellipsis.
pub fn sanitize_name(s: &str) -> String {
    const MAX_NAME: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_NAME) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_NAME {
            out.push('…');
            break;
        }
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Debug sink bound to one recipe name. Every line is prefixed with
/// `[<recipe>]` and written under [`RECIPE_TARGET`].
#[derive(Debug, Clone)]
pub struct RecipeLog {
    recipe: String,
}

impl RecipeLog {
    pub fn new(recipe: &str) -> Self {
        Self {
            recipe: sanitize_name(recipe),
        }
    }

    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    pub fn debug(&self, message: &str) {
        log::debug!(target: RECIPE_TARGET, "[{}] {}", self.recipe, message);
    }

    pub fn info(&self, message: &str) {
        log::info!(target: RECIPE_TARGET, "[{}] {}", self.recipe, message);
    }

    pub fn warn(&self, message: &str) {
        log::warn!(target: RECIPE_TARGET, "[{}] {}", self.recipe, message);
    }

    pub fn error(&self, message: &str) {
        log::error!(target: RECIPE_TARGET, "[{}] {}", self.recipe, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(sanitize_name("Ruby\nPearl\t"), "Ruby\\nPearl\\t");
        assert_eq!(sanitize_name("a\u{7}b"), "a\\x07b");
    }

    #[test]
    fn truncates_long_names() {
        let long = "x".repeat(500);
        let out = sanitize_name(&long);
        assert!(out.ends_with('…'));
        assert_eq!(out.chars().count(), 121);
    }

    #[test]
    fn recipe_log_sanitizes_recipe_name() {
        let sink = RecipeLog::new("Ice\r\n");
        assert_eq!(sink.recipe(), "Ice\\r\\n");
    }
}
