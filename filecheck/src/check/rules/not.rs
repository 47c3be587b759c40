use crate::check::CompiledDirective;

use super::*;

/// A group of consecutive `CHECK-NOT` directives.
///
/// Unlike the positive rules, this does not search relative to the cursor:
/// the checker decides the window once the surrounding positive matches are known.
#[derive(Debug)]
pub struct CheckNot<'a> {
    directives: &'a [CompiledDirective],
}
impl<'a> CheckNot<'a> {
    pub fn new(directives: &'a [CompiledDirective]) -> Self {
        Self { directives }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Verify that no pattern in this group occurs in `window`
    pub fn apply(
        &self,
        context: &MatchContext<'_>,
        window: Range<usize>,
    ) -> Result<(), CheckFailedError> {
        log::debug!(
            target: "goldcheck::match",
            "checking {} excluded patterns in {window:?}",
            self.directives.len()
        );
        for directive in self.directives {
            if let Some(found) = context.find(directive, window.clone())? {
                return Err(context.excluded(directive, found, window));
            }
        }
        Ok(())
    }
}
