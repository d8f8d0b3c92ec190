//! Engine configuration.

// ---------------------------------------------------------------------------
// EvalLimits
// ---------------------------------------------------------------------------

/// Size caps applied to every expression.
///
/// A source is rejected before parsing when its trimmed length reaches
/// `max_length`, or when it contains `max_brackets` or more opening brackets
/// (`(`, `[`, `{`). After parsing, a syntax tree nested deeper than
/// `max_depth` is rejected too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    pub max_length: usize,
    pub max_brackets: usize,
    pub max_depth: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_length: 500,
            max_brackets: 60,
            max_depth: 100,
        }
    }
}

impl EvalLimits {
    /// Check `source` against the limits. Returns `(length, brackets)` on failure.
    pub fn check(&self, source: &str) -> Result<(), (usize, usize)> {
        let trimmed = source.trim();
        let length = trimmed.chars().count();
        let brackets = trimmed.chars().filter(|c| matches!(c, '(' | '[' | '{')).count();
        if length >= self.max_length || brackets >= self.max_brackets {
            Err((length, brackets))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// FlareConfig
// ---------------------------------------------------------------------------

/// Configuration for template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlareConfig {
    /// Prefix marking directive attributes (`flare-if`, `flare-for`, ...).
    pub directive_prefix: String,
    /// Limits for expressions compiled by the default evaluator.
    pub limits: EvalLimits,
    /// Whether `{{ }}` substitution and directives are evaluated at all.
    pub expressions: bool,
    /// Deepest element nesting a template may have. The parser keeps deeper
    /// tags as text; rendering a deeper tree fails.
    pub max_depth: usize,
}

impl Default for FlareConfig {
    fn default() -> Self {
        Self {
            directive_prefix: "flare-".into(),
            limits: EvalLimits::default(),
            expressions: true,
            max_depth: crate::template::MAX_DEPTH,
        }
    }
}

impl FlareConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directive prefix (builder).
    pub fn with_directive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.directive_prefix = prefix.into();
        self
    }

    /// Set the expression limits (builder).
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enable or disable expression evaluation (builder).
    pub fn with_expressions(mut self, enabled: bool) -> Self {
        self.expressions = enabled;
        self
    }

    /// Set the maximum element nesting (builder).
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Full attribute name of directive `name`, e.g. `"if"` → `"flare-if"`.
    pub fn directive(&self, name: &str) -> String {
        format!("{}{}", self.directive_prefix, name)
    }

    /// If `attr` is a directive attribute, return its name without the prefix.
    pub fn strip_directive<'a>(&self, attr: &'a str) -> Option<&'a str> {
        attr.strip_prefix(self.directive_prefix.as_str())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
