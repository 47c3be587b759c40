use crate::check::CompiledDirective;

use super::*;

/// Matches on the line following the one where the previous match ended
#[derive(Debug)]
pub struct CheckNext<'a> {
    directive: &'a CompiledDirective,
}
impl<'a> CheckNext<'a> {
    pub fn new(directive: &'a CompiledDirective) -> Self {
        Self { directive }
    }
}
impl<'a> Rule for CheckNext<'a> {
    fn kind(&self) -> Check {
        Check::Next
    }

    fn span(&self) -> SourceSpan {
        self.directive.pattern.span()
    }

    fn apply(&self, context: &mut MatchContext<'_>) -> Result<PatternMatch, CheckFailedError> {
        // There is no next line when it would lie beyond the current block
        if let Some(window) = context.cursor.search_next_line() {
            if let Some(found) = context.find(self.directive, window)? {
                context.consume(self.directive, &found);
                return Ok(found);
            }
        }
        Err(context.misplaced(
            self.directive,
            "CHECK-NEXT patterns must match on the line following the previous match",
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use goldcheck::assert_matches;

    use crate::check::CheckPlain;

    use super::*;

    const INPUT: &str = "
define void @inc4(i64* %p) {
entry:
  %0 = tail call i64 @llvm.atomic.load.add.i64.p0i64(i64* %p, i64 1)
  ret void
}
";

    #[test]
    fn check_next_matches_following_line() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: @inc4\nCHECK-NEXT: entry:\nCHECK-NEXT: tail call\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let entry = CheckNext::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap();
        assert_eq!(&mctx.buffer()[entry.range.clone()], "entry:");
        let call = CheckNext::new(&program.directives()[2])
            .apply(&mut mctx)
            .unwrap();
        assert_eq!(mctx.input_file.location(call.start()).line, 4);
    }

    #[test]
    fn check_next_rejects_later_line() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: @inc4\nCHECK-NEXT: ret void\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let err = CheckNext::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap_err();
        assert_matches!(err, CheckFailedError::MatchFoundButWrongLine { index: 1, .. });
    }

    #[test]
    fn check_next_rejects_same_line() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: define void\nCHECK-NEXT: @inc4\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let err = CheckNext::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap_err();
        assert_matches!(err, CheckFailedError::MatchFoundButWrongLine { index: 1, .. });
    }

    #[test]
    fn check_next_at_end_of_input() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: ret void\nCHECK-NEXT: }\nCHECK-NEXT: declare\n")
            .with_input("ret void\n}");
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        CheckNext::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap();
        let err = CheckNext::new(&program.directives()[2])
            .apply(&mut mctx)
            .unwrap_err();
        assert_matches!(err, CheckFailedError::MatchNoneButExpected { index: 2, .. });
    }
}
