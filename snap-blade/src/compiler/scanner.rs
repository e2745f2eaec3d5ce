//! Finds directives in template source
//!
//! Template tags (`{{ }}`, `{% %}` and `{# #}`) are passed through
//! untouched, so an `@` inside them is never read as a directive.

use crate::directive::args::matching_close;
use crate::error::CompileError;

const TAGS: [(&str, &str); 3] = [("{{", "}}"), ("{%", "%}"), ("{#", "#}")];

/// First template tag at or after `from`, as start offset, opener and closer
fn next_tag(source: &str, from: usize) -> Option<(usize, &'static str, &'static str)> {
    let mut search = from;
    while let Some(i) = source[search..].find('{') {
        let start = search + i;
        let rest = &source[start..];
        if let Some(&(open, close)) = TAGS.iter().find(|(open, _)| rest.starts_with(open)) {
            return Some((start, open, close));
        }
        search = start + 1;
    }
    None
}

/// Offset of `close` at or after `from`, skipping quoted strings
fn find_closing(source: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if bytes[i..].starts_with(close.as_bytes()) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

/// A piece of scanned template source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text and template tags, copied to the output as-is
    Verbatim(&'a str),
    /// `@name` with its argument text, parentheses included
    Directive {
        /// Directive name without `@`
        name: &'a str,
        /// Argument text, empty when no argument list follows
        args: &'a str,
        /// 1-based line of the `@`
        line: usize,
    },
}

/// Tracks line numbers while moving forward through the source
struct Lines<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> Lines<'a> {
    const fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
        }
    }

    fn at(&mut self, offset: usize) -> usize {
        self.line += self.source[self.offset..offset].matches('\n').count();
        self.offset = offset;
        self.line
    }
}

const fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split `source` into verbatim runs and directives
///
/// # Errors
///
/// Returns the line and a [`CompileError::Syntax`] for an unterminated
/// argument list or host tag.
pub fn scan(source: &str) -> Result<Vec<Segment<'_>>, (usize, CompileError)> {
    let bytes = source.as_bytes();
    let mut lines = Lines::new(source);
    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut text_start = 0;

    while cursor < source.len() {
        let next_at = source[cursor..].find('@').map(|i| cursor + i);
        let tag = next_tag(source, cursor).filter(|(start, _, _)| next_at.map_or(true, |at| *start < at));

        if let Some((start, open, close)) = tag {
            let body = start + open.len();
            let end = if open == "{#" {
                source[body..].find(close).map(|i| body + i)
            } else {
                find_closing(source, body, close)
            }
            .ok_or_else(|| {
                (
                    lines.at(start),
                    CompileError::Syntax(format!("unclosed `{open}`")),
                )
            })?;
            cursor = end + close.len();
            continue;
        }

        let Some(at) = next_at else {
            break;
        };

        if bytes.get(at + 1) == Some(&b'@') {
            // `@@` escapes a literal `@`
            push_verbatim(&mut segments, &source[text_start..=at]);
            cursor = at + 2;
            text_start = cursor;
            continue;
        }

        let name_end = at + 1 + bytes[at + 1..]
            .iter()
            .take_while(|b| is_word(**b))
            .count();
        let preceded_by_word = at > 0 && is_word(bytes[at - 1]);
        let starts_with_letter = bytes
            .get(at + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_');
        if preceded_by_word || !starts_with_letter {
            cursor = at + 1;
            continue;
        }

        let line = lines.at(at);
        let after_spaces = name_end
            + bytes[name_end..]
                .iter()
                .take_while(|b| **b == b' ' || **b == b'\t')
                .count();
        let end = if bytes.get(after_spaces) == Some(&b'(') {
            let close = matching_close(source, after_spaces).ok_or_else(|| {
                (
                    line,
                    CompileError::Syntax(format!(
                        "unterminated argument list for @{}",
                        &source[at + 1..name_end]
                    )),
                )
            })?;
            close + 1
        } else {
            name_end
        };

        push_verbatim(&mut segments, &source[text_start..at]);
        segments.push(Segment::Directive {
            name: &source[at + 1..name_end],
            args: if end > name_end {
                &source[after_spaces..end]
            } else {
                ""
            },
            line,
        });
        cursor = end;
        text_start = end;
    }

    push_verbatim(&mut segments, &source[text_start..]);
    Ok(segments)
}

fn push_verbatim<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Verbatim(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const fn directive<'a>(name: &'a str, args: &'a str, line: usize) -> Segment<'a> {
        Segment::Directive { name, args, line }
    }

    #[test]
    fn test_scan_directives_and_text() {
        let segments = scan("<ul>@loop($posts as $p)<li>{{ p.title }}</li>@endloop</ul>").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Verbatim("<ul>"),
                directive("loop", "($posts as $p)", 1),
                Segment::Verbatim("<li>{{ p.title }}</li>"),
                directive("endloop", "", 1),
                Segment::Verbatim("</ul>"),
            ]
        );
    }

    #[test]
    fn test_arguments_after_spaces() {
        let segments = scan("@partial  ('a')").unwrap();
        assert_eq!(segments, vec![directive("partial", "('a')", 1)]);
    }

    #[test]
    fn test_nested_and_quoted_parentheses() {
        let segments = scan("@action('x)', f(1, (2))) tail").unwrap();
        assert_eq!(
            segments,
            vec![
                directive("action", "('x)', f(1, (2)))", 1),
                Segment::Verbatim(" tail"),
            ]
        );
    }

    #[test]
    fn test_email_addresses_are_text() {
        let segments = scan("mail me@example.com").unwrap();
        assert_eq!(segments, vec![Segment::Verbatim("mail me@example.com")]);
    }

    #[test]
    fn test_double_at_escapes() {
        let segments = scan("@@loop").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Verbatim("@"), Segment::Verbatim("loop")]
        );
    }

    #[test]
    fn test_host_tags_are_not_scanned() {
        let source = "{{ '@loop' }}{# @endloop #}{% if x %}@auth{% endif %}";
        let segments = scan(source).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Verbatim("{{ '@loop' }}{# @endloop #}{% if x %}"),
                directive("auth", "", 1),
                Segment::Verbatim("{% endif %}"),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let segments = scan("a\n{# \n #}\n@loop\nb\n@endloop").unwrap();
        let lines: Vec<usize> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Directive { line, .. } => Some(*line),
                Segment::Verbatim(_) => None,
            })
            .collect();
        assert_eq!(lines, vec![4, 6]);
    }

    #[test]
    fn test_unterminated_arguments() {
        let err = scan("x\n@partial('a'").unwrap_err();
        assert_eq!(err.0, 2);
        assert!(matches!(err.1, CompileError::Syntax(_)));
    }

    #[test]
    fn test_unclosed_comment() {
        assert!(scan("{# never closed").is_err());
    }

    #[test]
    fn test_closer_inside_string() {
        let segments = scan("{{ '}}@x' }}@auth").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Verbatim("{{ '}}@x' }}"), directive("auth", "", 1)]
        );
    }

    #[test]
    fn test_lone_brace_is_text() {
        let segments = scan("a { b } @auth").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Verbatim("a { b } "), directive("auth", "", 1)]
        );
    }

    proptest! {
        #[test]
        fn prop_text_without_directives_is_preserved(text in "[a-z <>/.,\n]{0,64}") {
            let segments = scan(&text).unwrap();
            let joined: String = segments
                .iter()
                .map(|s| match s {
                    Segment::Verbatim(t) => *t,
                    Segment::Directive { .. } => "",
                })
                .collect();
            prop_assert_eq!(joined, text);
        }
    }
}
