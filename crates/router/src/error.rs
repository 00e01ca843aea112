use thiserror::Error;

/// A route pattern could not be compiled into a matcher.
#[derive(Error, Debug)]
#[error("invalid route pattern '{pattern}': {kind}")]
pub struct PatternSyntaxError {
    pattern: String,
    #[source]
    kind: PatternErrorKind,
}

impl PatternSyntaxError {
    pub(crate) fn new(pattern: impl Into<String>, kind: impl Into<PatternErrorKind>) -> Self {
        Self { pattern: pattern.into(), kind: kind.into() }
    }

    /// the pattern text as it was registered
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> &PatternErrorKind {
        &self.kind
    }
}

/// Why a route pattern was rejected.
#[derive(Error, Debug)]
pub enum PatternErrorKind {
    #[error(transparent)]
    Syntax(#[from] regex_syntax::Error),

    /// a repetition operator applied directly to another one, e.g. `a**`
    #[error("invalid nested repetition operator at offset {offset}")]
    NestedRepetition { offset: usize },

    /// the pattern parsed but could not be compiled, e.g. it is too large
    #[error(transparent)]
    Build(#[from] regex_automata::meta::BuildError),
}

impl From<regex_syntax::ast::Error> for PatternErrorKind {
    fn from(e: regex_syntax::ast::Error) -> Self {
        Self::Syntax(e.into())
    }
}

impl From<regex_syntax::hir::Error> for PatternErrorKind {
    fn from(e: regex_syntax::hir::Error) -> Self {
        Self::Syntax(e.into())
    }
}

/// Errors raised while building a [`Router`](crate::Router).
///
/// Every variant is a startup error: a router that fails to build must not
/// serve traffic.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error(transparent)]
    Pattern(#[from] PatternSyntaxError),
}
