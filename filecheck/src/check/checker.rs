use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use crate::{
    ast::CheckSection, common::*, errors::AbortReason, test::LabelPosition, NotScope,
};

use super::{
    rules::{CheckDag, CheckNext, CheckNot, CheckPlain, CheckSame, Rule},
    CheckProgram, CompiledDirective, MatchContext,
};

/// The region of input governed by a `CHECK-LABEL` directive
#[derive(Debug, Clone)]
struct BlockInfo {
    /// The index of the label directive
    index: usize,
    /// Where the label matched
    label: PatternMatch,
    /// The start of the next label match, or EOF
    end: usize,
}

/// A `CHECK-NOT` group whose window has been opened by the preceding match,
/// and is closed by the next positive match.
#[derive(Debug)]
struct PendingNot<'a> {
    group: CheckNot<'a>,
    start: usize,
}

/// Walks a [CheckProgram] and a candidate input in lock-step
pub struct Checker<'a> {
    program: &'a CheckProgram,
    context: MatchContext<'a>,
    abort: Option<&'a AtomicBool>,
    deadline: Option<(Instant, Duration)>,
    result: TestResult,
}
impl<'a> Checker<'a> {
    pub fn new(
        config: &'a Config,
        program: &'a CheckProgram,
        match_file: Arc<SourceFile>,
        input_file: &'a Arc<SourceFile>,
    ) -> Self {
        Self {
            program,
            context: MatchContext::new(config, match_file, input_file),
            abort: None,
            deadline: None,
            result: TestResult::new(program.len()),
        }
    }

    /// Abort the run at the next directive boundary once `abort` is set
    pub fn with_abort_flag(mut self, abort: Option<&'a AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    /// Abort the run at the next directive boundary once `timeout` has elapsed
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|timeout| (Instant::now() + timeout, timeout));
        self
    }

    /// Run every directive of the program against the input, stopping at the first failure
    pub fn check(mut self) -> Result<TestResult, CheckFailedError> {
        let program = self.program;
        let directives = program.directives();
        let eof = self.context.cursor.eof();

        let blocks = discover_blocks(program, &self.context)?;
        let first_block = blocks.first().map(|block| block.label.start());
        self.context.cursor.set_block_end(first_block.unwrap_or(eof));

        let mut pending = SmallVec::<[PendingNot<'a>; 1]>::new();
        for section in program.sections() {
            self.checkpoint()?;
            match section {
                CheckSection::Not(range) => {
                    let group = CheckNot::new(&directives[range.clone()]);
                    match self.context.config.not_scope {
                        NotScope::Stream => {
                            group.apply(&self.context, 0..eof)?;
                            self.result.passed(group.len());
                        }
                        NotScope::Window => pending.push(PendingNot {
                            group,
                            start: self.context.cursor.start(),
                        }),
                    }
                }
                CheckSection::Dag(range) => {
                    let matches = CheckDag::new(&directives[range.clone()]).apply(&mut self.context)?;
                    let first_start = matches
                        .iter()
                        .filter_map(|m| m.found.as_ref().map(|found| found.start()))
                        .min();
                    if let Some(end) = first_start {
                        self.close_pending(&mut pending, end)?;
                    }
                    for m in matches {
                        match m.found {
                            Some(found) => self.result.matched(MatchInfo::new(m.directive, found)),
                            None => self.skip(m.directive),
                        }
                    }
                }
                CheckSection::Single(index) => {
                    let directive = &directives[*index];
                    match directive.kind() {
                        Check::Label => {
                            match blocks.iter().find(|block| block.index == *index) {
                                Some(block) => self.enter_block(block, &mut pending)?,
                                None => self.skip(directive),
                            }
                        }
                        Check::Same => {
                            self.apply_rule(CheckSame::new(directive), directive, &mut pending)?
                        }
                        Check::Next => {
                            self.apply_rule(CheckNext::new(directive), directive, &mut pending)?
                        }
                        _ => self.apply_rule(CheckPlain::new(directive), directive, &mut pending)?,
                    }
                }
            }
        }

        let end = self.context.cursor.block_end();
        self.close_pending(&mut pending, end)?;

        log::debug!(
            target: "goldcheck::match",
            "{} of {} directives satisfied",
            self.result.num_passed(),
            program.len()
        );
        Ok(self.result)
    }

    fn apply_rule<R: Rule>(
        &mut self,
        rule: R,
        directive: &'a CompiledDirective,
        pending: &mut SmallVec<[PendingNot<'a>; 1]>,
    ) -> Result<(), CheckFailedError> {
        match rule.apply(&mut self.context) {
            Ok(found) => {
                log::trace!(
                    target: "goldcheck::match",
                    "{} matched at {:?}",
                    rule.kind(),
                    &found.range
                );
                self.close_pending(pending, found.start())?;
                self.result.matched(MatchInfo::new(directive, found));
                Ok(())
            }
            Err(
                CheckFailedError::MatchNoneButExpected { .. }
                | CheckFailedError::MatchFoundButWrongLine { .. },
            ) if directive.is_optional() => {
                self.skip(directive);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Move the cursor past the label of `block`, and bound the search to the block
    fn enter_block(
        &mut self,
        block: &BlockInfo,
        pending: &mut SmallVec<[PendingNot<'a>; 1]>,
    ) -> Result<(), CheckFailedError> {
        self.close_pending(pending, block.label.start())?;
        self.context.cursor.advance_to(block.label.end());
        self.context.cursor.set_block_end(block.end);
        self.result.label(LabelPosition {
            index: block.index,
            span: block.label.range.clone(),
            block_end: block.end,
        });
        let directive = &self.program.directives()[block.index];
        self.result
            .matched(MatchInfo::new(directive, block.label.clone()));
        Ok(())
    }

    /// Verify each open `CHECK-NOT` window, closing it at `end`
    fn close_pending(
        &mut self,
        pending: &mut SmallVec<[PendingNot<'a>; 1]>,
        end: usize,
    ) -> Result<(), CheckFailedError> {
        for not in pending.drain(..) {
            let window = not.start..end.max(not.start);
            not.group.apply(&self.context, window)?;
            self.result.passed(not.group.len());
        }
        Ok(())
    }

    fn skip(&mut self, directive: &CompiledDirective) {
        log::debug!(
            target: "goldcheck::match",
            "skipping optional {} at index {}",
            &directive.ty,
            directive.index
        );
        self.result.skipped(directive.index);
    }

    fn checkpoint(&self) -> Result<(), CheckFailedError> {
        if self.abort.is_some_and(|abort| abort.load(Ordering::Relaxed)) {
            return Err(CheckFailedError::Aborted {
                reason: AbortReason::Cancelled,
            });
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CheckFailedError::Aborted {
                    reason: AbortReason::TimedOut(timeout),
                });
            }
        }
        Ok(())
    }
}

/// Match every `CHECK-LABEL` directive, in order, to divide the input into blocks.
///
/// Each label is searched for after the match of the previous label. An
/// optional label which does not match does not start a block.
fn discover_blocks(
    program: &CheckProgram,
    context: &MatchContext<'_>,
) -> Result<SmallVec<[BlockInfo; 2]>, CheckFailedError> {
    let eof = context.cursor.eof();
    let mut labels = SmallVec::<[(usize, PatternMatch); 2]>::new();
    let mut offset = 0;
    for label in program.labels() {
        match context.find(label, offset..eof)? {
            Some(found) => {
                offset = found.end();
                labels.push((label.index, found));
            }
            None if label.is_optional() => continue,
            None => return Err(context.not_found(label, offset..eof)),
        }
    }

    let mut blocks = SmallVec::<[BlockInfo; 2]>::with_capacity(labels.len());
    for (i, (index, label)) in labels.iter().enumerate() {
        let end = labels
            .get(i + 1)
            .map(|(_, next)| next.start())
            .unwrap_or(eof);
        blocks.push(BlockInfo {
            index: *index,
            label: label.clone(),
            end,
        });
    }
    log::debug!(target: "goldcheck::match", "discovered {} blocks", blocks.len());
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use goldcheck::assert_matches;

    use super::*;

    fn run(context: &TestContext) -> Result<TestResult, CheckFailedError> {
        let program = context.compile();
        let input = context.input_file();
        Checker::new(&context.config, &program, context.match_file(), &input).check()
    }

    #[test]
    fn checker_labels_bound_blocks() {
        let mut context = TestContext::new();
        context
            .with_checks(
                "\
CHECK-LABEL: define void @f()
CHECK: ret void
CHECK-LABEL: define void @g()
CHECK: unreachable
",
            )
            .with_input(
                "\
define void @f() {
  unreachable
}
define void @g() {
  ret void
}
",
            );
        let err = run(&context).unwrap_err();
        assert_matches!(err, CheckFailedError::MatchNoneButExpected { index: 1, ref note, .. } if note.as_deref().unwrap().contains("CHECK-LABEL"));
    }

    #[test]
    fn checker_records_label_positions() {
        let mut context = TestContext::new();
        let input = "\
define void @f() {
  ret void
}
define void @g() {
  unreachable
}
";
        context
            .with_checks(
                "\
CHECK-LABEL: define void @f()
CHECK: ret void
CHECK-LABEL: define void @g()
CHECK: unreachable
",
            )
            .with_input(input);
        let result = run(&context).unwrap();
        assert_eq!(result.num_passed(), 4);
        let labels = result.labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].index, 0);
        assert_eq!(labels[0].block_end, labels[1].span.start);
        assert_eq!(labels[1].span.start, input.find("define void @g").unwrap());
        assert_eq!(labels[1].block_end, input.len());
    }

    #[test]
    fn checker_missing_label_fails_before_matching() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: nothing here\nCHECK-LABEL: define void @h()\n")
            .with_input("define void @f() {\n}\n");
        let err = run(&context).unwrap_err();
        assert_matches!(err, CheckFailedError::MatchNoneButExpected { index: 1, .. });
    }

    #[test]
    fn checker_optional_directives_are_skipped() {
        let mut context = TestContext::new();
        context.config.allow_optional = true;
        context
            .with_checks(
                "\
CHECK: define
CHECK{OPTIONAL}: personality
CHECK-NEXT: entry:
",
            )
            .with_input("define void @f() {\nentry:\n  ret void\n}\n");
        let result = run(&context).unwrap();
        assert_eq!(result.skipped_directives(), &[1]);
        assert_eq!(result.num_matched(), 2);
    }

    #[test]
    fn checker_aborts_when_flag_is_set() {
        let mut context = TestContext::new();
        context.with_checks("CHECK: foo\n").with_input("foo\n");
        let program = context.compile();
        let input = context.input_file();
        let abort = AtomicBool::new(true);
        let err = Checker::new(&context.config, &program, context.match_file(), &input)
            .with_abort_flag(Some(&abort))
            .check()
            .unwrap_err();
        assert_matches!(
            err,
            CheckFailedError::Aborted {
                reason: AbortReason::Cancelled
            }
        );
    }

    #[test]
    fn checker_times_out() {
        let mut context = TestContext::new();
        context.with_checks("CHECK: foo\n").with_input("foo\n");
        let program = context.compile();
        let input = context.input_file();
        let err = Checker::new(&context.config, &program, context.match_file(), &input)
            .with_timeout(Some(Duration::ZERO))
            .check()
            .unwrap_err();
        assert_matches!(
            err,
            CheckFailedError::Aborted {
                reason: AbortReason::TimedOut(_)
            }
        );
    }
}
