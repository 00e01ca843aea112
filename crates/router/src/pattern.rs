//! Route pattern compilation and path matching.
//!
//! A route pattern is a regular expression in the syntax of the [`regex`]
//! crate. Named groups (`(?P<name>...)` or `(?<name>...)`) become path
//! parameters; unnamed groups take part in matching only. Stacked repetition
//! operators such as `a**` or `a???` are rejected, as RE2 does.
//!
//! Matching always covers the whole path: the parsed expression is placed
//! between a start-of-text and an end-of-text assertion, so `^`/`$` in the
//! pattern text are accepted but not required, and a top level alternation
//! such as `/a|/b` cannot match a substring of the path.
//!
//! [`regex`]: https://docs.rs/regex

use crate::PathParams;
use crate::error::{PatternErrorKind, PatternSyntaxError};
use regex_automata::PatternID;
use regex_automata::meta::{Config, Regex};
use regex_syntax::ast::parse::Parser;
use regex_syntax::ast::{Ast, Position};
use regex_syntax::hir::translate::Translator;
use regex_syntax::hir::{Hir, Look};
use std::fmt;

/// Default upper bound of the compiled program size of one pattern.
pub const DEFAULT_SIZE_LIMIT: usize = 1 << 20; // 1 MiB

/// A compiled route pattern.
#[derive(Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl RoutePattern {
    /// Compiles `pattern` with the [`DEFAULT_SIZE_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`PatternSyntaxError`] when the pattern is not a valid regular
    /// expression.
    pub fn compile(pattern: impl Into<String>) -> Result<Self, PatternSyntaxError> {
        Self::compile_with_limit(pattern, DEFAULT_SIZE_LIMIT)
    }

    /// Compiles `pattern`, rejecting it if the compiled program would exceed
    /// `size_limit` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PatternSyntaxError`] when the pattern is not a valid regular
    /// expression or is too large.
    pub fn compile_with_limit(pattern: impl Into<String>, size_limit: usize) -> Result<Self, PatternSyntaxError> {
        let source = pattern.into();

        let ast = Parser::new().parse(&source).map_err(|e| PatternSyntaxError::new(&source, e))?;
        if let Some(at) = nested_repetition(&ast) {
            return Err(PatternSyntaxError::new(&source, PatternErrorKind::NestedRepetition { offset: at.offset }));
        }
        let hir = Translator::new().translate(&source, &ast).map_err(|e| PatternSyntaxError::new(&source, e))?;

        let anchored = Hir::concat(vec![Hir::look(Look::Start), hir, Hir::look(Look::End)]);
        let regex = Regex::builder()
            .configure(Config::new().nfa_size_limit(Some(size_limit)))
            .build_from_hir(&anchored)
            .map_err(|e| PatternSyntaxError::new(&source, e))?;

        let names = regex.group_info().pattern_names(PatternID::ZERO).flatten().map(String::from).collect();

        Ok(Self { source, regex, names })
    }

    /// the pattern text as it was registered
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// names of the named groups, in declaration order
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` against this pattern.
    ///
    /// Returns `None` when the whole path does not match. On a match every
    /// named group gets an entry; a named group that did not take part in the
    /// match maps to the empty string.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        if self.names.is_empty() {
            return self.regex.is_match(path).then(PathParams::empty);
        }

        let mut captures = self.regex.create_captures();
        self.regex.captures(path, &mut captures);
        if !captures.is_match() {
            return None;
        }

        let mut params = PathParams::with_capacity(self.names.len());
        for name in &self.names {
            let value = captures.get_group_by_name(name).map_or("", |span| &path[span.range()]);
            params.insert(name.as_str(), value);
        }

        Some(params)
    }
}

/// Position of the first repetition operator applied directly to another
/// repetition, e.g. the second `*` of `a**`.
fn nested_repetition(ast: &Ast) -> Option<Position> {
    match ast {
        Ast::Repetition(rep) => match &*rep.ast {
            Ast::Repetition(_) => Some(rep.op.span.start),
            inner => nested_repetition(inner),
        },
        Ast::Group(group) => nested_repetition(&group.ast),
        Ast::Alternation(alt) => alt.asts.iter().find_map(nested_repetition),
        Ast::Concat(concat) => concat.asts.iter().find_map(nested_repetition),
        _ => None,
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoutePattern").field(&self.source).finish()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
