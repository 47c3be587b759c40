mod dag;
mod next;
mod not;
mod plain;
mod same;

pub use self::dag::CheckDag;
pub use self::next::CheckNext;
pub use self::not::CheckNot;
pub use self::plain::CheckPlain;
pub use self::same::CheckSame;

use crate::common::*;

use super::MatchContext;

/// A rule for a single positive directive, which must match relative to the cursor
pub trait Rule: fmt::Debug {
    fn kind(&self) -> Check;
    fn span(&self) -> SourceSpan;
    /// Search for a match in the window this rule permits.
    ///
    /// On success, the variables defined by the match are bound, and the cursor
    /// is moved to the end of the match. On failure, the context is unchanged.
    fn apply(&self, context: &mut MatchContext<'_>) -> Result<PatternMatch, CheckFailedError>;
}
