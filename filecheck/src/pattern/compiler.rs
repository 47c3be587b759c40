use crate::{
    ast::{CheckLine, CheckPatternPart},
    common::*,
};

use super::{
    matcher::{self, Definition, Piece},
    Matcher, RegexMatcher, SubstringMatcher,
};

/// The regex used by `[[NAME]]` when it implicitly defines `NAME`
const IMPLICIT_CAPTURE_REGEX: &str = r"\S+";

/// Matches any run of horizontal whitespace, when whitespace is canonicalized
const WHITESPACE_REGEX: &str = r"[\t\p{Zs}]+";

/// Compiles the patterns of a check file, in directive order.
///
/// The compiler tracks which variables are defined by the directives it has
/// compiled so far, which determines whether a `[[NAME]]` placeholder is a
/// reference or, with `--implicit-definitions`, a definition.
pub struct PatternCompiler<'config> {
    config: &'config Config,
    known: FxHashSet<Box<str>>,
}
impl<'config> PatternCompiler<'config> {
    pub fn new(config: &'config Config) -> Self {
        let known = config
            .variables
            .iter()
            .map(|var| var.name.clone())
            .collect();
        Self { config, known }
    }

    /// Returns true if `name` is defined by a previously compiled directive, or on the command line
    pub fn is_defined(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    pub fn compile(&mut self, line: &CheckLine<'_>) -> Result<Pattern, PatternError> {
        let pattern = &line.pattern;
        let span = pattern.range();
        let source = Box::<str>::from(pattern.as_str());

        if line.ty.is_literal() {
            let literal = pattern.as_str();
            let matcher = self.compile_literal(literal, span.clone())?;
            return Ok(Pattern {
                span,
                source,
                matcher,
                references: smallvec![],
                words: words_of(literal),
            });
        }

        if let [CheckPatternPart::Literal(literal)] = pattern.parts() {
            let matcher = self.compile_literal(literal, span.clone())?;
            return Ok(Pattern {
                span,
                source,
                matcher,
                references: smallvec![],
                words: words_of(literal),
            });
        }

        let is_negative = line.kind() == Check::Not;
        let mut pieces = vec![];
        let mut current = String::new();
        let mut definitions = SmallVec::<[Definition; 1]>::new();
        let mut references = SmallVec::<[Box<str>; 1]>::new();
        let mut words = SmallVec::<[Box<str>; 4]>::new();
        // Variables defined earlier in this pattern: name -> (group, regex)
        let mut local = FxHashMap::<&str, (Box<str>, &str)>::default();
        let mut multiline = false;

        for part in pattern.parts() {
            match part {
                CheckPatternPart::Literal(literal) => {
                    current.push_str(&self.literal_regex(literal));
                    words.extend(words_of(literal));
                }
                CheckPatternPart::Regex(regex) => {
                    validate_regex(regex, part.span(), self.config.ignore_case)?;
                    multiline |= regex.contains("\\n");
                    current.push_str("(?:");
                    current.push_str(regex);
                    current.push(')');
                }
                CheckPatternPart::Capture { name, pattern, .. } => {
                    if is_negative {
                        return Err(PatternError::DefinitionInNegativeCheck { span: part.span() });
                    }
                    validate_regex(pattern, pattern.span(), self.config.ignore_case)?;
                    let (name, pattern): (&str, &str) = (**name, **pattern);
                    multiline |= pattern.contains("\\n");
                    let group = define(&mut current, &mut definitions, name, pattern);
                    local.insert(name, (group, pattern));
                }
                CheckPatternPart::Variable(name) => {
                    let name = **name;
                    if let Some((definition, regex)) = local.get(name) {
                        if !current.is_empty() {
                            pieces.push(Piece::Source(core::mem::take(&mut current)));
                        }
                        pieces.push(Piece::Backreference {
                            definition: definition.clone(),
                            regex: Box::from(*regex),
                        });
                    } else if self.known.contains(name) {
                        if !current.is_empty() {
                            pieces.push(Piece::Source(core::mem::take(&mut current)));
                        }
                        pieces.push(Piece::Reference(Box::from(name)));
                        if !references.iter().any(|r| &**r == name) {
                            references.push(Box::from(name));
                        }
                    } else if self.config.implicit_definitions && !is_negative {
                        let group =
                            define(&mut current, &mut definitions, name, IMPLICIT_CAPTURE_REGEX);
                        local.insert(name, (group, IMPLICIT_CAPTURE_REGEX));
                    } else {
                        return Err(PatternError::UndefinedVariable {
                            span: part.span(),
                            name: Box::from(name),
                        });
                    }
                }
            }
        }
        if !current.is_empty() {
            pieces.push(Piece::Source(current));
        }

        let ignore_case = self.config.ignore_case;
        let matcher = RegexMatcher::new(pieces, definitions, multiline, ignore_case)
            .map_err(|err| PatternError::InvalidRegex {
                span: pattern.span(),
                error: err.to_string(),
            })?;

        for name in matcher.definitions() {
            if !self.known.contains(name) {
                self.known.insert(Box::from(name));
            }
        }

        log::trace!(
            target: "goldcheck::pattern",
            "compiled pattern `{}` with {} references",
            &source,
            references.len()
        );

        Ok(Pattern {
            span,
            source,
            matcher: Matcher::Regex(matcher),
            references,
            words,
        })
    }

    fn compile_literal(&self, literal: &str, span: Range<usize>) -> Result<Matcher, PatternError> {
        let canonical_whitespace =
            !self.config.strict_whitespace && literal.contains(text::is_horizontal_whitespace);
        if !self.config.ignore_case && !canonical_whitespace {
            return Ok(Matcher::Substring(SubstringMatcher::new(literal)));
        }

        let source = self.literal_regex(literal);
        RegexMatcher::new(
            vec![Piece::Source(source)],
            smallvec![],
            false,
            self.config.ignore_case,
        )
        .map(Matcher::Regex)
        .map_err(|err| PatternError::InvalidRegex {
            span: SourceSpan::from(span),
            error: err.to_string(),
        })
    }

    /// Escape `literal` for use in a regex, canonicalizing whitespace unless `--strict-whitespace`
    fn literal_regex(&self, literal: &str) -> String {
        if self.config.strict_whitespace {
            return regex_syntax::escape(literal);
        }

        let mut source = String::with_capacity(literal.len());
        let mut rest = literal;
        while !rest.is_empty() {
            let end = rest
                .find(text::is_horizontal_whitespace)
                .unwrap_or(rest.len());
            source.push_str(&regex_syntax::escape(&rest[..end]));
            rest = &rest[end..];
            let ws_end = rest
                .find(|c: char| !text::is_horizontal_whitespace(c))
                .unwrap_or(rest.len());
            if ws_end > 0 {
                source.push_str(WHITESPACE_REGEX);
                rest = &rest[ws_end..];
            }
        }
        source
    }
}

/// Append a named capture group defining `name` to `current`, returning the group name
fn define(
    current: &mut String,
    definitions: &mut SmallVec<[Definition; 1]>,
    name: &str,
    regex: &str,
) -> Box<str> {
    let group = format!("__def{}", definitions.len()).into_boxed_str();
    current.push_str(&format!("(?P<{group}>{regex})"));
    definitions.push(Definition {
        group: group.clone(),
        name: Box::from(name),
    });
    group
}

fn validate_regex(regex: &str, span: SourceSpan, ignore_case: bool) -> Result<(), PatternError> {
    matcher::build_regex(regex, ignore_case)
        .map(|_| ())
        .map_err(|err| PatternError::InvalidRegex {
            span,
            error: err.to_string(),
        })
}

fn words_of(literal: &str) -> SmallVec<[Box<str>; 4]> {
    literal
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')' | ';'))
        .filter(|word| word.len() > 1)
        .map(Box::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use goldcheck::assert_matches;

    use crate::{ast::CheckFile, parse::CheckFileParser};

    use super::*;

    fn compile_all(config: &Config, input: &str) -> Result<Vec<Pattern>, PatternError> {
        let mut parser = CheckFileParser::new(config).unwrap();
        let file: CheckFile<'_> = parser.parse(input).unwrap();
        let mut compiler = PatternCompiler::new(config);
        file.lines()
            .iter()
            .map(|line| compiler.compile(line))
            .collect()
    }

    #[test]
    fn pattern_literal_is_substring() {
        let config = Config::default();
        let patterns = compile_all(&config, "CHECK: entry:").unwrap();
        assert!(patterns[0].is_substring());

        let env = Env::new();
        let found = patterns[0].find("foo\nentry:\n", 0..11, &env).unwrap();
        assert_eq!(found.map(|m| m.range), Some(4..10));
    }

    #[test]
    fn pattern_whitespace_is_canonicalized() {
        let config = Config::default();
        let patterns = compile_all(&config, "CHECK: 5: ; preds = %entry").unwrap();
        assert!(!patterns[0].is_substring());

        let env = Env::new();
        let input = "5:                                                ; preds = %entry";
        let found = patterns[0].find(input, 0..input.len(), &env).unwrap();
        assert_eq!(found.map(|m| m.range), Some(0..input.len()));

        let mut config = Config::default();
        config.strict_whitespace = true;
        let patterns = compile_all(&config, "CHECK: 5: ; preds = %entry").unwrap();
        assert_eq!(patterns[0].find(input, 0..input.len(), &env).unwrap(), None);
    }

    #[test]
    fn pattern_definition_then_reference() {
        let config = Config::default();
        let patterns =
            compile_all(&config, "CHECK: foo [[X:[0-9]+]]\nCHECK: bar [[X]]").unwrap();
        assert_eq!(patterns[0].definitions().collect::<Vec<_>>(), vec!["X"]);
        assert_eq!(patterns[1].references().collect::<Vec<_>>(), vec!["X"]);

        let input = "foo 42\nbar 43\nbar 42";
        let mut env = Env::new();
        let found = patterns[0]
            .find(input, 0..input.len(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(found.captures.len(), 1);
        assert_eq!(&input[found.captures[0].range.clone()], "42");
        env.define("X", &input[found.captures[0].range.clone()], Some(0));

        let found = patterns[1].find(input, 6..input.len(), &env).unwrap();
        assert_eq!(found.map(|m| m.range), Some(14..20));
    }

    #[test]
    fn pattern_reference_value_is_escaped() {
        let config = Config::default().define("TY", "i8*");
        let patterns = compile_all(&config, "CHECK: load [[TY]],").unwrap();
        let env = Env::from_config(&config);
        let input = "load i8, i8* %p\nload i8*, i8** %q";
        let found = patterns[0].find(input, 0..input.len(), &env).unwrap();
        assert_eq!(found.map(|m| m.range), Some(16..25));
    }

    #[test]
    fn pattern_same_pattern_backreference() {
        let config = Config::default();
        let patterns = compile_all(&config, "CHECK: [[R:%[0-9]+]] = add [[R]]").unwrap();
        assert!(patterns[0].references().next().is_none());

        let env = Env::new();
        let input = "%1 = add %2\n%3 = add %3";
        let found = patterns[0]
            .find(input, 0..input.len(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(found.range, 12..23);
    }

    #[test]
    fn pattern_same_pattern_backreference_is_exact() {
        let config = Config::default();
        let patterns = compile_all(&config, "CHECK: [[R:%[0-9]+]] = add [[R]]").unwrap();

        // the definition's regex alone would also accept `%12`
        let env = Env::new();
        let input = "%1 = add %12\n";
        let found = patterns[0]
            .find(input, 0..input.len(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(found.range, 0..11);
        assert_eq!(&input[found.captures[0].range.clone()], "%1");

        let input = "%1 = add %2\n";
        assert_eq!(patterns[0].find(input, 0..input.len(), &env).unwrap(), None);
    }

    #[test]
    fn pattern_undefined_reference() {
        let config = Config::default();
        assert_matches!(
            compile_all(&config, "CHECK: bar [[X]]"),
            Err(PatternError::UndefinedVariable { ref name, .. }) if &**name == "X"
        );

        let mut config = Config::default();
        config.implicit_definitions = true;
        let patterns = compile_all(&config, "CHECK: bar [[X]]\nCHECK: baz [[X]]").unwrap();
        assert_eq!(patterns[0].definitions().collect::<Vec<_>>(), vec!["X"]);
        assert_eq!(patterns[1].references().collect::<Vec<_>>(), vec!["X"]);
    }

    #[test]
    fn pattern_invalid_regex() {
        let config = Config::default();
        assert_matches!(
            compile_all(&config, "CHECK: foo {{[0-9}}"),
            Err(PatternError::InvalidRegex { .. })
        );
    }

    #[test]
    fn pattern_negative_cannot_define() {
        let config = Config::default();
        assert_matches!(
            compile_all(&config, "CHECK: foo\nCHECK-NOT: [[X:bar]]"),
            Err(PatternError::DefinitionInNegativeCheck { .. })
        );
    }

    #[test]
    fn pattern_matches_do_not_span_lines() {
        let config = Config::default();
        let patterns = compile_all(&config, "CHECK: a{{.*}}b").unwrap();
        let env = Env::new();
        let input = "a\nb";
        assert_eq!(patterns[0].find(input, 0..3, &env).unwrap(), None);

        let patterns = compile_all(&config, r"CHECK: a{{\n}}b").unwrap();
        let found = patterns[0].find(input, 0..3, &env).unwrap();
        assert_eq!(found.map(|m| m.range), Some(0..3));
    }

    #[test]
    fn pattern_ignore_case() {
        let mut config = Config::default();
        config.ignore_case = true;
        let patterns = compile_all(&config, "CHECK: Define Void").unwrap();
        let env = Env::new();
        let found = patterns[0].find("define void @f()", 0..16, &env).unwrap();
        assert_eq!(found.map(|m| m.range), Some(0..11));
    }

    #[test]
    fn pattern_describe_lists_references() {
        let config = Config::default().define("INT", "i64");
        let patterns = compile_all(&config, "CHECK: [[INT]] [[Y]]");
        assert!(patterns.is_err());

        let patterns = compile_all(&config, "CHECK: size [[INT]]").unwrap();
        let env = Env::from_config(&config);
        assert_eq!(
            patterns[0].describe(&env),
            "expected `size [[INT]]`, where 'INT' is \"i64\""
        );
    }
}
