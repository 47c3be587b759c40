use crate::{
    ast::{CheckFile, CheckSection, CheckType},
    common::*,
    pattern::PatternCompiler,
};

/// A directive whose pattern has been compiled, and is ready to be matched
#[derive(Debug)]
pub struct CompiledDirective {
    /// The index of this directive in the check file
    pub index: usize,
    pub ty: CheckType,
    /// The span of the whole directive in the check file
    pub span: Range<usize>,
    pub pattern: Pattern,
}
impl CompiledDirective {
    #[inline(always)]
    pub fn kind(&self) -> Check {
        self.ty.kind
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.ty.is_optional()
    }

    /// The directive as written, e.g. `CHECK-apple-SAME`
    pub fn name(&self) -> Box<str> {
        self.ty.to_string().into_boxed_str()
    }
}
impl Spanned for CompiledDirective {
    fn span(&self) -> SourceSpan {
        SourceSpan::from(self.span.clone())
    }

    fn range(&self) -> Range<usize> {
        self.span.clone()
    }
}

/// The compiled form of a check file
#[derive(Debug)]
pub struct CheckProgram {
    directives: Vec<CompiledDirective>,
    sections: Vec<CheckSection>,
}
impl CheckProgram {
    /// Compile every directive in `file`, in file order.
    ///
    /// Compilation stops at the first pattern error.
    pub fn compile(file: &CheckFile<'_>, config: &Config) -> Result<Self, PatternError> {
        let mut compiler = PatternCompiler::new(config);
        let mut directives = Vec::with_capacity(file.lines().len());
        for (index, line) in file.lines().iter().enumerate() {
            let pattern = compiler.compile(line)?;
            directives.push(CompiledDirective {
                index,
                ty: line.ty.clone(),
                span: line.span.clone(),
                pattern,
            });
        }
        log::debug!(
            target: "goldcheck::compile",
            "compiled {} directives into {} sections",
            directives.len(),
            file.sections().len()
        );

        Ok(Self {
            directives,
            sections: file.sections().to_vec(),
        })
    }

    pub fn directives(&self) -> &[CompiledDirective] {
        self.directives.as_slice()
    }

    pub fn sections(&self) -> &[CheckSection] {
        self.sections.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// The `CHECK-LABEL` directives of this program, in file order
    pub fn labels(&self) -> impl Iterator<Item = &CompiledDirective> + '_ {
        self.directives
            .iter()
            .filter(|directive| directive.kind() == Check::Label)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::parse::CheckFileParser;

    use super::*;

    #[test]
    fn compile_program_in_file_order() {
        let input = "\
CHECK-LABEL: define void @f
CHECK: foo [[X:[0-9]+]]
CHECK-NOT: bar [[X]]
CHECK-DAG: baz
CHECK-DAG: qux
";
        let config = Config::default();
        let mut parser = CheckFileParser::new(&config).unwrap();
        let file = parser.parse(input).unwrap();
        let program = file.compile(&config).unwrap();
        assert_eq!(program.len(), 5);
        assert_eq!(program.labels().count(), 1);
        assert_eq!(program.sections().len(), 4);
        assert_eq!(&*program.directives()[2].name(), "CHECK-NOT");
        assert_eq!(
            program.directives()[2].pattern.references().collect::<Vec<_>>(),
            vec!["X"]
        );
        assert!(program.directives()[3].pattern.is_substring());
    }

    #[test]
    fn compile_program_stops_at_undefined_reference() {
        let input = "CHECK: foo [[X]]\nCHECK: bar [[X:[0-9]+]]\n";
        let config = Config::default();
        let mut parser = CheckFileParser::new(&config).unwrap();
        let file = parser.parse(input).unwrap();
        let err = file.compile(&config).unwrap_err();
        goldcheck::assert_matches!(err, PatternError::UndefinedVariable { ref name, .. } if &**name == "X");
    }
}
