use crate::check::CompiledDirective;

use super::*;

/// The outcome of matching one member of a `CHECK-DAG` group
#[derive(Debug)]
pub struct DagMatch<'a> {
    pub directive: &'a CompiledDirective,
    /// The match, or `None` if the member is optional and was skipped
    pub found: Option<PatternMatch>,
}

/// The number of candidate matches a `CHECK-DAG` group may try before giving up
const MAX_DAG_CANDIDATES: usize = 4096;

/// A group of consecutive `CHECK-DAG` directives.
///
/// Every member must match between the cursor and the end of the block, in
/// any order relative to the other members, but no two members may match
/// overlapping text. Members are matched in file order, each taking the
/// earliest match which does not overlap a match of a preceding member. When
/// a member cannot be matched, the preceding members are retried at their
/// next match.
#[derive(Debug)]
pub struct CheckDag<'a> {
    directives: &'a [CompiledDirective],
}
impl<'a> CheckDag<'a> {
    pub fn new(directives: &'a [CompiledDirective]) -> Self {
        Self { directives }
    }

    pub fn span(&self) -> SourceSpan {
        let start = self.directives.first().map(|d| d.start()).unwrap_or(0);
        let end = self.directives.last().map(|d| d.end()).unwrap_or(start);
        SourceSpan::from(start..end)
    }

    /// Match every member of the group, then move the cursor to the end of the
    /// match which ends last.
    pub fn apply(
        &self,
        context: &mut MatchContext<'_>,
    ) -> Result<SmallVec<[DagMatch<'a>; 4]>, CheckFailedError> {
        let mut search = DagSearch {
            window: context.cursor.search_block(),
            taken: smallvec![],
            found: smallvec![],
            candidates: 0,
            deepest: 0,
        };
        if !search.assign(context, self.directives)? {
            let directive = &self.directives[search.deepest];
            let group = &self.directives[0];
            return Err(context.dag_unmatched(directive, group, search.window));
        }

        if let Some(exit) = search.taken.iter().map(|range| range.end).max() {
            context.cursor.advance_to(exit);
        }
        let matches = self
            .directives
            .iter()
            .zip(search.found)
            .map(|(directive, found)| DagMatch { directive, found })
            .collect();
        Ok(matches)
    }
}

/// The state of a backtracking search for disjoint matches of a `CHECK-DAG` group
struct DagSearch {
    window: Range<usize>,
    /// The ranges matched by the members assigned so far
    taken: SmallVec<[Range<usize>; 4]>,
    /// The match of each member assigned so far, `None` for a skipped optional member
    found: SmallVec<[Option<PatternMatch>; 4]>,
    candidates: usize,
    /// The index of the furthest member the search reached
    deepest: usize,
}
impl DagSearch {
    /// Assign a match to each member of `members` from `self.found.len()` on.
    ///
    /// Returns false if there is no assignment. The variables bound by members
    /// which are retried are restored before the next candidate is tried.
    fn assign(
        &mut self,
        context: &mut MatchContext<'_>,
        members: &[CompiledDirective],
    ) -> Result<bool, CheckFailedError> {
        let index = self.found.len();
        let Some(directive) = members.get(index) else {
            return Ok(true);
        };
        self.deepest = self.deepest.max(index);

        let defines = directive.pattern.definitions().next().is_some();
        let mut start = self.window.start;
        while self.candidates < MAX_DAG_CANDIDATES {
            let Some(found) = self.find_disjoint(context, directive, start)? else {
                break;
            };
            self.candidates += 1;
            log::trace!(
                target: "goldcheck::match",
                "{} matched at {:?}",
                &directive.ty,
                &found.range
            );
            let next = context.next_char(found.start());
            let saved = defines.then(|| context.env.clone());
            context.bind(directive, &found);
            self.taken.push(found.range.clone());
            self.found.push(Some(found));
            if self.assign(context, members)? {
                return Ok(true);
            }
            self.found.pop();
            self.taken.pop();
            if let Some(saved) = saved {
                context.env = saved;
            }
            match next {
                Some(next) if next <= self.window.end => start = next,
                _ => break,
            }
        }

        if directive.is_optional() {
            self.found.push(None);
            if self.assign(context, members)? {
                return Ok(true);
            }
            self.found.pop();
        }
        Ok(false)
    }

    /// Find the earliest match of `directive` from `start` which overlaps none of the taken ranges
    fn find_disjoint(
        &self,
        context: &MatchContext<'_>,
        directive: &CompiledDirective,
        mut start: usize,
    ) -> Result<Option<PatternMatch>, CheckFailedError> {
        let searcher = context.searcher(directive)?;
        loop {
            let Some(found) = context.find_with(directive, &searcher, start..self.window.end)?
            else {
                return Ok(None);
            };
            if !self.taken.iter().any(|range| found.overlaps(range)) {
                return Ok(Some(found));
            }
            match context.next_char(found.start()) {
                Some(next) if next <= self.window.end => start = next,
                _ => return Ok(None),
            }
        }
    }
}
