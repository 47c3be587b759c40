use crate::check::CompiledDirective;

use super::*;

/// Matches anywhere between the cursor and the end of the current block
#[derive(Debug)]
pub struct CheckPlain<'a> {
    directive: &'a CompiledDirective,
}
impl<'a> CheckPlain<'a> {
    pub fn new(directive: &'a CompiledDirective) -> Self {
        Self { directive }
    }
}
impl<'a> Rule for CheckPlain<'a> {
    fn kind(&self) -> Check {
        Check::Plain
    }

    fn span(&self) -> SourceSpan {
        self.directive.pattern.span()
    }

    fn apply(&self, context: &mut MatchContext<'_>) -> Result<PatternMatch, CheckFailedError> {
        let window = context.cursor.search_block();
        match context.find(self.directive, window.clone())? {
            Some(found) => {
                context.consume(self.directive, &found);
                Ok(found)
            }
            None => Err(context.not_found(self.directive, window)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use goldcheck::assert_matches;

    use super::*;

    const INPUT: &str = "
define void @inc4(i64* %p) {
entry:
  %0 = tail call i64 @llvm.atomic.load.add.i64.p0i64(i64* %p, i64 1)
  ret void
}
";

    #[test]
    fn check_plain_advances_cursor() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: @inc4\nCHECK: entry:\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        let found = CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        assert_eq!(&mctx.buffer()[found.range.clone()], "@inc4");
        assert_eq!(mctx.cursor.start(), found.end());

        let found = CheckPlain::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap();
        assert_eq!(&mctx.buffer()[found.range.clone()], "entry:");
    }

    #[test]
    fn check_plain_never_matches_behind_cursor() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: ret void\nCHECK: entry:\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let start = mctx.cursor.start();
        let err = CheckPlain::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap_err();
        assert_matches!(err, CheckFailedError::MatchNoneButExpected { index: 1, .. });
        assert_eq!(mctx.cursor.start(), start);
    }

    #[test]
    fn check_plain_binds_definitions() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: %[[REG:[0-9]+]] = tail call\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        assert_eq!(mctx.env.resolve("REG"), Some("0"));
        assert_eq!(mctx.env.binding("REG").unwrap().defined_at, Some(0));
    }
}
