use regex::{Captures, RegexBuilder};

use crate::common::*;

use super::{CaptureMatch, FindError};

/// Matches a pattern which is a plain string, without any placeholders
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    needle: Box<str>,
}
impl SubstringMatcher {
    pub fn new(needle: impl Into<Box<str>>) -> Self {
        Self {
            needle: needle.into(),
        }
    }

    pub fn find(&self, buffer: &str, range: Range<usize>) -> Option<PatternMatch> {
        let offset = memchr::memmem::find(&buffer.as_bytes()[range.clone()], self.needle.as_bytes())?;
        let start = range.start + offset;
        Some(PatternMatch::new(start..(start + self.needle.len())))
    }
}

/// A fragment of a regular expression which is only complete once references are substituted
#[derive(Debug, Clone)]
pub(super) enum Piece {
    /// Regex source, used as-is
    Source(String),
    /// A reference to a variable defined by an earlier directive, replaced
    /// with its escaped value at match time
    Reference(Box<str>),
    /// A reference to a variable defined earlier in the same pattern, by the
    /// capture group `definition`.
    ///
    /// Candidate matches are found with `regex` in its place, then confirmed by
    /// substituting the text the definition captured.
    Backreference { definition: Box<str>, regex: Box<str> },
}

/// A capture group which defines a variable
#[derive(Debug, Clone)]
pub(super) struct Definition {
    pub group: Box<str>,
    pub name: Box<str>,
}

/// Matches a pattern compiled to a regular expression
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    pieces: Vec<Piece>,
    /// The compiled regex, when the pattern does not depend on any bindings
    compiled: Option<Regex>,
    definitions: SmallVec<[Definition; 1]>,
    has_backreferences: bool,
    /// When true, matches may span lines, otherwise each line is searched separately
    multiline: bool,
    ignore_case: bool,
}
impl RegexMatcher {
    pub(super) fn new(
        pieces: Vec<Piece>,
        definitions: SmallVec<[Definition; 1]>,
        multiline: bool,
        ignore_case: bool,
    ) -> Result<Self, regex::Error> {
        let is_static = !pieces
            .iter()
            .any(|piece| matches!(piece, Piece::Reference(_)));
        let has_backreferences = pieces
            .iter()
            .any(|piece| matches!(piece, Piece::Backreference { .. }));
        let compiled = if is_static {
            Some(build_regex(&loose_source(&pieces), ignore_case)?)
        } else {
            build_regex(&loose_source(&pieces), ignore_case)?;
            None
        };

        Ok(Self {
            pieces,
            compiled,
            definitions,
            has_backreferences,
            multiline,
            ignore_case,
        })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &str> + '_ {
        self.definitions.iter().map(|def| &*def.name)
    }

    /// Prepare this matcher for searching with the bindings in `env`.
    ///
    /// References to earlier directives are substituted once, so the returned
    /// searcher can be used for any number of searches while `env` is unchanged.
    pub fn searcher<'a>(&'a self, env: &'a Env) -> Result<RegexSearcher<'a>, FindError> {
        let regex = match self.compiled.as_ref() {
            Some(regex) => Cow::Borrowed(regex),
            None => {
                let source = self.render(env, None)?;
                log::trace!(target: "goldcheck::pattern", "instantiated regex `{source}`");
                Cow::Owned(build_regex(&source, self.ignore_case)?)
            }
        };
        Ok(RegexSearcher {
            matcher: self,
            env,
            regex,
        })
    }

    /// Build the regex source for this pattern with the current value of every reference.
    ///
    /// When `bound` is given, same-pattern references are replaced with the
    /// text captured by their definition in `bound`.
    fn render(&self, env: &Env, bound: Option<&Captures<'_>>) -> Result<String, FindError> {
        let mut source = String::new();
        for piece in self.pieces.iter() {
            match piece {
                Piece::Source(s) => source.push_str(s),
                Piece::Reference(name) => {
                    let value = env
                        .resolve(name)
                        .ok_or_else(|| FindError::Undefined(name.clone()))?;
                    source.push_str(&regex_syntax::escape(value));
                }
                Piece::Backreference { definition, regex } => {
                    match bound.and_then(|captures| captures.name(definition)) {
                        Some(value) => source.push_str(&regex_syntax::escape(value.as_str())),
                        None => push_group(&mut source, regex),
                    }
                }
            }
        }
        Ok(source)
    }

    fn to_match(&self, captures: &Captures<'_>) -> Option<PatternMatch> {
        let mut found = PatternMatch::new(captures.get(0)?.range());
        for def in self.definitions.iter() {
            if let Some(group) = captures.name(&def.group) {
                found.captures.push(CaptureMatch {
                    name: def.name.clone(),
                    range: group.range(),
                });
            }
        }
        Some(found)
    }
}

/// A [RegexMatcher] with the references to earlier directives resolved
#[derive(Debug)]
pub struct RegexSearcher<'a> {
    matcher: &'a RegexMatcher,
    env: &'a Env,
    regex: Cow<'a, Regex>,
}
impl<'a> RegexSearcher<'a> {
    pub fn find(&self, buffer: &str, range: Range<usize>) -> Result<Option<PatternMatch>, FindError> {
        if self.matcher.multiline {
            return self.search(buffer, range);
        }
        for line in text::lines_in(buffer.as_bytes(), range) {
            if let Some(found) = self.search(buffer, line)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Find the first match in `range` which satisfies all same-pattern references
    fn search(&self, buffer: &str, range: Range<usize>) -> Result<Option<PatternMatch>, FindError> {
        let haystack = &buffer[..range.end];
        let mut pos = range.start;
        while pos <= range.end {
            let Some(candidate) = self.regex.captures_at(haystack, pos) else {
                return Ok(None);
            };
            let Some(whole) = candidate.get(0) else {
                return Ok(None);
            };
            let found = if self.matcher.has_backreferences {
                self.confirm(haystack, &candidate)?
            } else {
                self.matcher.to_match(&candidate)
            };
            if found.is_some() {
                return Ok(found);
            }
            pos = whole.start()
                + haystack[whole.start()..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
        }
        Ok(None)
    }

    /// Re-match `candidate` with each same-pattern reference replaced by the
    /// text its definition captured, starting at the same offset.
    ///
    /// The match is rejected unless every definition captures that same text again.
    fn confirm(
        &self,
        haystack: &str,
        candidate: &Captures<'_>,
    ) -> Result<Option<PatternMatch>, FindError> {
        let Some(start) = candidate.get(0).map(|m| m.start()) else {
            return Ok(None);
        };
        let source = self.matcher.render(self.env, Some(candidate))?;
        let exact = build_regex(&source, self.matcher.ignore_case)?;
        let Some(captures) = exact.captures_at(haystack, start) else {
            return Ok(None);
        };
        if captures.get(0).map(|m| m.start()) != Some(start) {
            return Ok(None);
        }
        let consistent = self.matcher.pieces.iter().all(|piece| match piece {
            Piece::Backreference { definition, .. } => {
                let rebound = captures.name(definition).map(|m| m.as_str());
                rebound == candidate.name(definition).map(|m| m.as_str())
            }
            _ => true,
        });
        if !consistent {
            return Ok(None);
        }
        Ok(self.matcher.to_match(&captures))
    }
}

pub(super) fn build_regex(source: &str, ignore_case: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .multi_line(true)
        .case_insensitive(ignore_case)
        .build()
}

/// The regex source for `pieces`, with same-pattern references matched by their
/// definition's regex and references to earlier directives left empty
fn loose_source(pieces: &[Piece]) -> String {
    let mut source = String::new();
    for piece in pieces {
        match piece {
            Piece::Source(s) => source.push_str(s),
            Piece::Reference(_) => source.push_str("(?:)"),
            Piece::Backreference { regex, .. } => push_group(&mut source, regex),
        }
    }
    source
}

fn push_group(source: &mut String, regex: &str) {
    source.push_str("(?:");
    source.push_str(regex);
    source.push(')');
}
