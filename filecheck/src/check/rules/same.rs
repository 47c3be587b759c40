use crate::check::CompiledDirective;

use super::*;

/// Matches on the line where the previous match ended, after the previous match
#[derive(Debug)]
pub struct CheckSame<'a> {
    directive: &'a CompiledDirective,
}
impl<'a> CheckSame<'a> {
    pub fn new(directive: &'a CompiledDirective) -> Self {
        Self { directive }
    }
}
impl<'a> Rule for CheckSame<'a> {
    fn kind(&self) -> Check {
        Check::Same
    }

    fn span(&self) -> SourceSpan {
        self.directive.pattern.span()
    }

    fn apply(&self, context: &mut MatchContext<'_>) -> Result<PatternMatch, CheckFailedError> {
        let window = context.cursor.search_line();
        if let Some(found) = context.find(self.directive, window)? {
            context.consume(self.directive, &found);
            return Ok(found);
        }
        Err(context.misplaced(
            self.directive,
            "CHECK-SAME patterns must match on the same line as the previous match",
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use goldcheck::assert_matches;

    use crate::check::CheckPlain;

    use super::*;

    const INPUT: &str = r#"@"$s4main5ValueVMn" = hidden constant <{ i32, i32 }>
@"$s4main5ValueVMf" = internal global <{ ptr, i64 }>
"#;

    #[test]
    fn check_same_continues_previous_line() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: @\"$s4main5ValueVMn\" =\nCHECK-SAME: hidden\nCHECK-SAME: constant\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let hidden = CheckSame::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap();
        let constant = CheckSame::new(&program.directives()[2])
            .apply(&mut mctx)
            .unwrap();
        assert!(hidden.end() <= constant.start());
        assert_eq!(&mctx.buffer()[constant.range], "constant");
    }

    #[test]
    fn check_same_reports_match_on_wrong_line() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: hidden constant\nCHECK-SAME: internal global\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let start = mctx.cursor.start();
        let err = CheckSame::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap_err();
        assert_matches!(err, CheckFailedError::MatchFoundButWrongLine { index: 1, .. });
        assert_eq!(mctx.cursor.start(), start);
    }

    #[test]
    fn check_same_reports_missing_match() {
        let mut context = TestContext::new();
        context
            .with_checks("CHECK: hidden constant\nCHECK-SAME: weak_odr\n")
            .with_input(INPUT);
        let program = context.compile();
        let mut mctx = context.match_context();

        CheckPlain::new(&program.directives()[0])
            .apply(&mut mctx)
            .unwrap();
        let err = CheckSame::new(&program.directives()[1])
            .apply(&mut mctx)
            .unwrap_err();
        assert_matches!(err, CheckFailedError::MatchNoneButExpected { index: 1, .. });
    }
}
