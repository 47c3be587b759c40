use crate::{ast::*, common::*};

use super::{is_valid_variable_name, ParseResult, ParserError};

/// Extracts the directives from a check file.
///
/// A directive is a check prefix, not preceded by an identifier character,
/// followed by an optional kind suffix, an optional list of modifiers in braces,
/// and a colon. Everything after the colon, up to the end of the line, is the
/// pattern. At most one directive is recognized per line.
#[derive(Debug)]
pub struct CheckFileParser<'config> {
    config: &'config Config,
    /// Matches any check or comment prefix, along with its suffix and modifiers
    directive: Regex,
    check_prefixes: Vec<Arc<str>>,
    comment_prefixes: FxHashSet<Arc<str>>,
}
impl<'config> CheckFileParser<'config> {
    pub fn new(config: &'config Config) -> ParseResult<Self> {
        let mut seen = FxHashSet::<&str>::default();
        for prefix in config.check_prefixes.iter().chain(config.comment_prefixes.iter()) {
            if !seen.insert(prefix) {
                return Err(ParserError::DuplicatePrefix {
                    prefix: Arc::from(&**prefix),
                });
            }
        }

        let check_prefixes = if config.check_prefixes.is_empty() {
            crate::DEFAULT_CHECK_PREFIXES
                .iter()
                .map(|p| Arc::from(*p))
                .collect::<Vec<_>>()
        } else {
            config
                .check_prefixes
                .iter()
                .map(|p| Arc::from(&**p))
                .collect::<Vec<_>>()
        };
        let comment_prefixes = config
            .comment_prefixes
            .iter()
            .map(|p| Arc::from(&**p))
            .collect::<FxHashSet<Arc<str>>>();

        // Longer prefixes must be tried first, so that `CHECK-apple:` is not
        // recognized as `CHECK` with an unknown `-apple` suffix
        let mut alternatives = check_prefixes
            .iter()
            .chain(comment_prefixes.iter())
            .map(|p| regex_syntax::escape(p))
            .collect::<Vec<_>>();
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let directive = Regex::new(&format!(
            r"(?P<prefix>{})(?P<kind>-[A-Za-z]+(?:-[0-9]+)?)?(?:\{{(?P<modifiers>[^}}\n]*)\}})?:",
            alternatives.join("|")
        ))
        .expect("escaped prefixes always form a valid regex");

        Ok(Self {
            config,
            directive,
            check_prefixes,
            comment_prefixes,
        })
    }

    pub fn parse<'a, S>(&mut self, code: &'a S) -> ParseResult<CheckFile<'a>>
    where
        S: AsRef<str> + ?Sized + 'a,
    {
        let source = code.as_ref();
        let mut used = FxHashSet::<Arc<str>>::default();
        let mut seen_positive = false;
        let mut lines = vec![];

        for line in text::lines_in(source.as_bytes(), 0..source.len()) {
            let Some(check) = self.parse_line(source, line)? else {
                continue;
            };
            let kind = check.kind();
            if kind.is_continuation() && !seen_positive {
                return Err(ParserError::InvalidFirstCheck {
                    span: check.ty.span,
                    kind,
                });
            }
            seen_positive |= kind.is_positive();
            used.insert(check.ty.prefix.clone());
            lines.push(check);
        }

        if lines.is_empty() {
            return Err(ParserError::Empty);
        }

        if !self.config.allow_unused_prefixes {
            let unused = self
                .check_prefixes
                .iter()
                .filter(|p| !used.contains(*p))
                .cloned()
                .collect::<Vec<_>>();
            if !unused.is_empty() {
                return Err(ParserError::UnusedCheckPrefixes(unused));
            }
        }

        log::debug!(target: "goldcheck::parse", "parsed {} directives", lines.len());

        Ok(CheckFile::new(lines))
    }

    /// Parse the directive on `line`, if there is one
    fn parse_line<'a>(
        &self,
        source: &'a str,
        line: Range<usize>,
    ) -> ParseResult<Option<CheckLine<'a>>> {
        let bytes = source.as_bytes();
        let haystack = &source[..line.end];
        let mut pos = line.start;
        while let Some(captures) = self.directive.captures_at(haystack, pos) {
            let Some(whole) = captures.get(0) else {
                break;
            };
            let Some(prefix) = captures.name("prefix") else {
                break;
            };
            let start = whole.start();
            // Every prefix starts with an ASCII letter, so `start + 1` is a char boundary
            pos = start + 1;
            if start > line.start && is_prefix_char(bytes[start - 1]) {
                continue;
            }

            let kind = captures.name("kind");
            let modifiers = captures.name("modifiers");
            if self.comment_prefixes.contains(prefix.as_str()) {
                if kind.is_none() && modifiers.is_none() {
                    log::trace!(target: "goldcheck::parse", "skipping comment at offset {start}");
                    return Ok(None);
                }
                continue;
            }

            let kind_span = start..kind.map(|k| k.end()).unwrap_or(prefix.end());
            let check = match kind.map(|k| &k.as_str()[1..]).unwrap_or("").parse::<Check>() {
                Ok(check) => check,
                Err(InvalidCheckTypeError::Unrecognized) => continue,
                Err(InvalidCheckTypeError::Unsupported) => {
                    return Err(ParserError::UnsupportedCheckType {
                        span: SourceSpan::from(kind_span),
                    });
                }
            };

            let prefix = self
                .check_prefixes
                .iter()
                .find(|p| &***p == prefix.as_str())
                .cloned()
                .unwrap_or_else(|| Arc::from(prefix.as_str()));
            let modifiers = match modifiers {
                Some(modifiers) => self.parse_modifiers(check, modifiers)?,
                None => CheckModifier::empty(),
            };
            let ty = CheckType::new(SourceSpan::from(start..whole.end()), prefix, check)
                .with_modifiers(modifiers);

            let pattern = self.parse_pattern(&ty, source, whole.end()..line.end)?;
            return Ok(Some(CheckLine::new(start..pattern.end(), ty, pattern)));
        }

        Ok(None)
    }

    fn parse_modifiers(&self, check: Check, modifiers: regex::Match<'_>) -> ParseResult<CheckModifier> {
        let mut result = CheckModifier::empty();
        let mut offset = modifiers.start();
        for modifier in modifiers.as_str().split(',') {
            let span = offset..(offset + modifier.len());
            offset = span.end + 1;
            let parsed = modifier.trim().parse::<CheckModifier>().map_err(|_| {
                ParserError::InvalidCheckModifier {
                    span: SourceSpan::from(span.clone()),
                }
            })?;
            if parsed.is_optional() {
                if !self.config.allow_optional {
                    return Err(ParserError::OptionalNotAllowed {
                        span: SourceSpan::from(span),
                    });
                }
                if check == Check::Not {
                    return Err(ParserError::OptionalNegativeCheck {
                        span: SourceSpan::from(span),
                    });
                }
            }
            result |= parsed;
        }
        Ok(result)
    }

    fn parse_pattern<'a>(
        &self,
        ty: &CheckType,
        source: &'a str,
        range: Range<usize>,
    ) -> ParseResult<CheckPattern<'a>> {
        let raw = &source[range.clone()];
        let trimmed_start = raw.trim_start_matches([' ', '\t']);
        let start = range.start + (raw.len() - trimmed_start.len());
        let trimmed = trimmed_start.trim_end_matches([' ', '\t', '\r']);
        let end = start + trimmed.len();
        if trimmed.is_empty() {
            return Err(ParserError::EmptyPattern {
                span: SourceSpan::from(ty.span.offset()..range.end),
            });
        }

        let raw = Span::new(start..end, trimmed);
        if ty.is_literal() {
            return Ok(CheckPattern::literal(raw));
        }

        let parts = self.split_pattern(trimmed, start)?;
        let pattern = CheckPattern::new(raw, parts);
        if ty.kind == Check::Label {
            if let Some(var) = pattern.first_variable() {
                return Err(ParserError::InvalidLabel {
                    span: pattern.span(),
                    var: var.span(),
                });
            }
        }

        Ok(pattern)
    }

    /// Split `text`, found at `offset` in the check file, into literals and placeholders
    fn split_pattern<'a>(
        &self,
        text: &'a str,
        offset: usize,
    ) -> ParseResult<SmallVec<[CheckPatternPart<'a>; 1]>> {
        let open = &*self.config.var_open;
        let close = &*self.config.var_close;

        let mut parts = SmallVec::<[CheckPatternPart<'a>; 1]>::new();
        let mut literal_start = 0;
        let mut pos = 0;
        let push_literal = |parts: &mut SmallVec<[CheckPatternPart<'a>; 1]>, start: usize, end: usize| {
            if start < end {
                parts.push(CheckPatternPart::Literal(Span::new(
                    (offset + start)..(offset + end),
                    &text[start..end],
                )));
            }
        };

        while pos < text.len() {
            let rest = &text[pos..];
            if rest.starts_with("{{") {
                push_literal(&mut parts, literal_start, pos);
                let body_start = pos + 2;
                let end = find_regex_end(text, body_start).ok_or(ParserError::UnclosedRegex {
                    span: SourceSpan::from((offset + pos)..(offset + text.len())),
                })?;
                if end == body_start {
                    return Err(ParserError::EmptyRegex {
                        span: SourceSpan::from((offset + pos)..(offset + end + 2)),
                    });
                }
                parts.push(CheckPatternPart::Regex(Span::new(
                    (offset + body_start)..(offset + end),
                    &text[body_start..end],
                )));
                pos = end + 2;
                literal_start = pos;
            } else if !open.is_empty() && rest.starts_with(open) {
                push_literal(&mut parts, literal_start, pos);
                let body_start = pos + open.len();
                let end = find_placeholder_end(text, body_start, close).ok_or_else(|| {
                    ParserError::UnclosedSubstitution {
                        span: SourceSpan::from((offset + pos)..(offset + text.len())),
                        close: Box::from(close),
                    }
                })?;
                let span = (offset + pos)..(offset + end + close.len());
                parts.push(parse_placeholder(
                    &text[body_start..end],
                    offset + body_start,
                    span,
                )?);
                pos = end + close.len();
                literal_start = pos;
            } else {
                pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
        push_literal(&mut parts, literal_start, text.len());

        Ok(parts)
    }
}

/// Parse the body of a `[[...]]` block found at `offset`
fn parse_placeholder(
    body: &str,
    offset: usize,
    span: Range<usize>,
) -> ParseResult<CheckPatternPart<'_>> {
    if body.starts_with('#') || body.starts_with('@') {
        return Err(ParserError::UnsupportedExpression {
            span: SourceSpan::from(span),
        });
    }

    match body.split_once(':') {
        Some((name, pattern)) => {
            if !is_valid_variable_name(name) {
                return Err(ParserError::InvalidVariableName {
                    span: SourceSpan::from(offset..(offset + name.len())),
                });
            }
            if pattern.is_empty() {
                return Err(ParserError::EmptyRegex {
                    span: SourceSpan::from(span),
                });
            }
            let pattern_start = offset + name.len() + 1;
            Ok(CheckPatternPart::Capture {
                span,
                name: Span::new(offset..(offset + name.len()), name),
                pattern: Span::new(pattern_start..(pattern_start + pattern.len()), pattern),
            })
        }
        None if is_valid_variable_name(body) => Ok(CheckPatternPart::Variable(Span::new(span, body))),
        None => Err(ParserError::InvalidVariableName {
            span: SourceSpan::from(span),
        }),
    }
}

/// Find the `}}` closing a regex block whose body starts at `from`.
///
/// A run of more than two braces is treated as ending with the last two, so
/// that `{{[0-9]{2}}}` closes after the quantifier.
fn find_regex_end(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut end = from + text[from..].find("}}")?;
    while end + 2 < bytes.len() && bytes[end + 2] == b'}' {
        end += 1;
    }
    Some(end)
}

/// Find `close` terminating a placeholder whose body starts at `from`,
/// skipping over balanced brackets and escaped characters in the body.
fn find_placeholder_end(text: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut pos = from;
    while pos < bytes.len() {
        if depth == 0 && bytes[pos..].starts_with(close.as_bytes()) {
            return Some(pos);
        }
        match bytes[pos] {
            b'\\' => pos += 1,
            b'[' => depth += 1,
            b']' if depth > 0 => depth -= 1,
            _ => (),
        }
        pos += 1;
    }
    None
}

#[inline]
fn is_prefix_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}
