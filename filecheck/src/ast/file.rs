use crate::{check::CheckProgram, common::*};

use super::{CheckPattern, CheckType};

/// A check file, parsed into the ordered list of directives it contains
#[derive(Debug)]
pub struct CheckFile<'a> {
    lines: Vec<CheckLine<'a>>,
    sections: Vec<CheckSection>,
}
impl<'a> CheckFile<'a> {
    /// Construct a check file from its directives, computing the section structure
    pub fn new(lines: Vec<CheckLine<'a>>) -> Self {
        let sections = CheckSection::partition(&lines);
        Self { lines, sections }
    }

    pub fn lines(&self) -> &[CheckLine<'a>] {
        self.lines.as_slice()
    }

    /// The directives of this file, grouped into matching units
    pub fn sections(&self) -> &[CheckSection] {
        self.sections.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn compile(&self, config: &Config) -> Result<CheckProgram, PatternError> {
        CheckProgram::compile(self, config)
    }
}

/// A single directive from a check file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLine<'a> {
    /// The span of the whole directive, from the prefix to the end of the pattern
    pub span: Range<usize>,
    pub ty: CheckType,
    pub pattern: CheckPattern<'a>,
}
impl<'a> CheckLine<'a> {
    pub fn new(span: Range<usize>, ty: CheckType, pattern: CheckPattern<'a>) -> Self {
        Self { span, ty, pattern }
    }

    #[inline(always)]
    pub fn kind(&self) -> Check {
        self.ty.kind
    }
}
impl<'a> Spanned for CheckLine<'a> {
    fn span(&self) -> SourceSpan {
        SourceSpan::from(self.span.clone())
    }

    fn range(&self) -> Range<usize> {
        self.span.clone()
    }
}

/// A unit of matching, expressed as a range of directive indices.
///
/// Consecutive `CHECK-DAG` directives form a single group, as do consecutive
/// `CHECK-NOT` directives. Every other directive is a section of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSection {
    Single(usize),
    Dag(Range<usize>),
    Not(Range<usize>),
}
impl CheckSection {
    fn partition(lines: &[CheckLine<'_>]) -> Vec<Self> {
        let mut sections = Vec::with_capacity(lines.len());
        let mut index = 0;
        while index < lines.len() {
            let kind = lines[index].kind();
            match kind {
                Check::Dag | Check::Not => {
                    let start = index;
                    while index < lines.len() && lines[index].kind() == kind {
                        index += 1;
                    }
                    sections.push(if kind == Check::Dag {
                        Self::Dag(start..index)
                    } else {
                        Self::Not(start..index)
                    });
                }
                _ => {
                    sections.push(Self::Single(index));
                    index += 1;
                }
            }
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn line(kind: Check) -> CheckLine<'static> {
        CheckLine::new(
            0..1,
            CheckType::new(SourceSpan::from(0..1), Arc::from("CHECK"), kind),
            CheckPattern::literal(Span::new(0..1, "x")),
        )
    }

    #[test]
    fn sections_group_consecutive_dag_and_not() {
        let file = CheckFile::new(vec![
            line(Check::Label),
            line(Check::Dag),
            line(Check::Dag),
            line(Check::Not),
            line(Check::Dag),
            line(Check::Plain),
            line(Check::Not),
            line(Check::Not),
        ]);
        assert_eq!(
            file.sections(),
            &[
                CheckSection::Single(0),
                CheckSection::Dag(1..3),
                CheckSection::Not(3..4),
                CheckSection::Dag(4..5),
                CheckSection::Single(5),
                CheckSection::Not(6..8),
            ]
        );
    }
}
