use crate::{
    common::*,
    pattern::{FindError, Searcher},
};

use super::CompiledDirective;

/// The mutable state of a single verification run, shared by all rules
pub struct MatchContext<'a> {
    pub config: &'a Config,
    pub match_file: Arc<SourceFile>,
    pub input_file: Arc<SourceFile>,
    buffer: &'a str,
    pub env: Env,
    pub cursor: Cursor<'a>,
}
impl<'a> MatchContext<'a> {
    pub fn new(
        config: &'a Config,
        match_file: Arc<SourceFile>,
        input_file: &'a Arc<SourceFile>,
    ) -> Self {
        let buffer = input_file.as_str();
        Self {
            config,
            match_file,
            input_file: Arc::clone(input_file),
            buffer,
            env: Env::from_config(config),
            cursor: Cursor::new(buffer.as_bytes()),
        }
    }

    #[inline(always)]
    pub fn buffer(&self) -> &'a str {
        self.buffer
    }

    /// Search for `directive`'s pattern in `range` of the input
    pub fn find(
        &self,
        directive: &CompiledDirective,
        range: Range<usize>,
    ) -> Result<Option<PatternMatch>, CheckFailedError> {
        let searcher = self.searcher(directive)?;
        self.find_with(directive, &searcher, range)
    }

    /// Resolve the references of `directive`'s pattern against the current bindings,
    /// for use with [MatchContext::find_with]
    pub fn searcher<'s>(
        &'s self,
        directive: &'s CompiledDirective,
    ) -> Result<Searcher<'s>, CheckFailedError> {
        directive
            .pattern
            .searcher(&self.env)
            .map_err(|err| self.find_error(directive, err))
    }

    /// Search for `directive`'s pattern in `range` of the input, using a prepared `searcher`
    pub fn find_with(
        &self,
        directive: &CompiledDirective,
        searcher: &Searcher<'_>,
        range: Range<usize>,
    ) -> Result<Option<PatternMatch>, CheckFailedError> {
        log::trace!(
            target: "goldcheck::match",
            "searching for {} `{}` in {range:?}",
            &directive.ty,
            &directive.pattern
        );
        searcher
            .find(self.buffer, range)
            .map_err(|err| self.find_error(directive, err))
    }

    fn find_error(&self, directive: &CompiledDirective, err: FindError) -> CheckFailedError {
        match err {
            FindError::Undefined(name) => CheckFailedError::UndefinedVariable {
                span: directive.pattern.span(),
                match_file: self.match_file.clone(),
                index: directive.index,
                name,
            },
            FindError::Regex(error) => CheckFailedError::InvalidPattern {
                span: directive.pattern.span(),
                match_file: self.match_file.clone(),
                index: directive.index,
                error: error.to_string(),
            },
        }
    }

    /// Bind the variables defined by `found`
    pub fn bind(&mut self, directive: &CompiledDirective, found: &PatternMatch) {
        for capture in found.captures.iter() {
            let value = &self.buffer[capture.range.clone()];
            self.env.define(&capture.name, value, Some(directive.index));
        }
    }

    /// Bind the variables defined by `found`, and move the cursor to the end of the match
    pub fn consume(&mut self, directive: &CompiledDirective, found: &PatternMatch) {
        self.bind(directive, found);
        self.cursor.advance_to(found.end());
    }

    /// The offset of the character following the one at `offset`, if there is one
    pub fn next_char(&self, offset: usize) -> Option<usize> {
        self.buffer
            .get(offset..)?
            .chars()
            .next()
            .map(|c| offset + c.len_utf8())
    }

    /// Find the line in `window` which most resembles `directive`'s pattern
    pub fn nearest_line(
        &self,
        directive: &CompiledDirective,
        window: Range<usize>,
    ) -> Option<RelatedLabel> {
        let mut best = None;
        let mut best_score = 0;
        for line in text::lines_in(self.buffer.as_bytes(), window) {
            let score = directive.pattern.similarity(&self.buffer[line.clone()]);
            if score > best_score {
                best_score = score;
                best = Some(line);
            }
        }
        best.map(|line| {
            RelatedLabel::note(
                Label::new(line, "possible intended match here"),
                self.input_file.clone(),
            )
        })
    }

    /// Describe the pattern of `directive`, and where it was searched for
    fn describe(&self, directive: &CompiledDirective, window: &Range<usize>) -> String {
        let mut note = directive.pattern.describe(&self.env);
        if window.end < self.cursor.eof() && window.end == self.cursor.block_end() {
            note.push_str("; the search stopped at the next CHECK-LABEL match");
        }
        note
    }

    /// Construct the error for a positive directive which has no match in `window`
    pub fn not_found(&self, directive: &CompiledDirective, window: Range<usize>) -> CheckFailedError {
        CheckFailedError::MatchNoneButExpected {
            span: directive.pattern.span(),
            match_file: self.match_file.clone(),
            index: directive.index,
            directive: directive.name(),
            note: Some(self.describe(directive, &window)),
            hint: self.nearest_line(directive, window),
        }
    }

    /// Construct the error for a directive anchored to the previous match which
    /// has no match on the line it is anchored to.
    ///
    /// The rest of the block is searched to tell a misplaced match from a missing one.
    pub fn misplaced(&self, directive: &CompiledDirective, note: &str) -> CheckFailedError {
        let block = self.cursor.search_block();
        match self.find(directive, block.clone()) {
            Ok(Some(found)) => CheckFailedError::MatchFoundButWrongLine {
                span: SourceSpan::from(found.range),
                input_file: self.input_file.clone(),
                index: directive.index,
                directive: directive.name(),
                pattern: Some(RelatedCheckError {
                    span: directive.pattern.span(),
                    match_file: self.match_file.clone(),
                }),
                note: Some(note.to_string()),
            },
            Ok(None) => self.not_found(directive, block),
            Err(err) => err,
        }
    }

    /// Construct the error for a `CHECK-NOT` directive which matched in `window`
    pub fn excluded(
        &self,
        directive: &CompiledDirective,
        found: PatternMatch,
        window: Range<usize>,
    ) -> CheckFailedError {
        let from = self.input_file.location(window.start);
        let to = self.input_file.location(window.end);
        CheckFailedError::MatchFoundButExcluded {
            span: SourceSpan::from(found.range),
            input_file: self.input_file.clone(),
            index: directive.index,
            directive: directive.name(),
            pattern: Some(RelatedCheckError {
                span: directive.pattern.span(),
                match_file: self.match_file.clone(),
            }),
            note: Some(format!(
                "the pattern must not occur between {from} and {to}"
            )),
        }
    }

    /// Construct the error for a member of a `CHECK-DAG` group which has no match in `window`
    pub fn dag_unmatched(
        &self,
        directive: &CompiledDirective,
        group: &CompiledDirective,
        window: Range<usize>,
    ) -> CheckFailedError {
        CheckFailedError::DagMemberUnmatched {
            span: directive.pattern.span(),
            match_file: self.match_file.clone(),
            index: directive.index,
            directive: directive.name(),
            group: if group.index == directive.index {
                None
            } else {
                Some(group.span())
            },
            hint: self.nearest_line(directive, window),
        }
    }
}
