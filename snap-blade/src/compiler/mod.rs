//! Directive compiler
//!
//! The [`scanner`] finds every `@directive`; each one is looked up in the
//! [`DirectiveRegistry`], checked for correct nesting and replaced with the
//! template code its expander emits. The engine then compiles the expanded
//! source as a minijinja template.
//!
//! Expansion keeps line numbers intact: a directive whose arguments span
//! several lines is followed by a comment holding the same number of line
//! breaks, so errors in later template code point at the right line.
//!
//! Any failure stops compilation before a single byte is rendered.

pub mod scanner;

use crate::directive::{BlockRole, DirectiveRegistry};
use crate::directive::args::bare_iteration_len;
use crate::error::{CompileError, Result};
use scanner::{scan, Segment};

/// An open block directive awaiting its closer
#[derive(Debug)]
struct OpenBlock<'a> {
    group: String,
    directive: &'a str,
    line: usize,
}

/// Expands directives using a registry
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'r> {
    directives: &'r DirectiveRegistry,
}

impl<'r> Compiler<'r> {
    /// Create a compiler over `directives`
    #[must_use]
    pub const fn new(directives: &'r DirectiveRegistry) -> Self {
        Self { directives }
    }

    /// Replace every directive in `source` with its expansion
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Compile`](crate::error::BladeError::Compile) for
    /// unknown, malformed or unbalanced
    /// directives and unterminated argument lists.
    pub fn expand(&self, name: &str, source: &str) -> Result<String> {
        let segments = scan(source).map_err(|(line, e)| e.at(name, line))?;
        let mut output = String::with_capacity(source.len());
        let mut open: Vec<OpenBlock<'_>> = Vec::new();
        let mut expanded = 0usize;

        let mut segments = segments.into_iter().peekable();
        while let Some(segment) = segments.next() {
            let (directive, mut args, line) = match segment {
                Segment::Verbatim(text) => {
                    output.push_str(text);
                    continue;
                }
                Segment::Directive {
                    name: directive,
                    args,
                    line,
                } => (directive, args, line),
            };

            let entry = self
                .directives
                .get(directive)
                .ok_or_else(|| CompileError::UnknownDirective(directive.to_string()).at(name, line))?;

            // `@loop items as $item` takes its arguments from the following text
            let mut rest = None;
            if args.is_empty() && entry.takes_bare_iteration() {
                if let Some(Segment::Verbatim(text)) = segments.peek().copied() {
                    if let Some(len) = bare_iteration_len(text) {
                        segments.next();
                        args = &text[..len];
                        rest = Some(&text[len..]);
                    }
                }
            }

            check_nesting(&mut open, directive, entry.role(), line).map_err(|e| e.at(name, line))?;
            let code = entry.expand(args).map_err(|e| e.at(name, line))?;
            tracing::trace!(template = name, directive, line, "expanded directive");
            output.push_str(&code);
            pad_lines(&mut output, args, &code);
            if let Some(rest) = rest {
                output.push_str(rest);
            }
            expanded += 1;
        }

        if let Some(block) = open.pop() {
            return Err(CompileError::UnbalancedDirective {
                found: block.directive.to_string(),
                reason: format!("opened on line {} and never closed", block.line),
            }
            .at(name, block.line));
        }

        tracing::debug!(template = name, directives = expanded, "expanded template");
        Ok(output)
    }
}

/// Restore the line breaks a directive's arguments held
fn pad_lines(output: &mut String, args: &str, code: &str) {
    let missing = args
        .matches('\n')
        .count()
        .saturating_sub(code.matches('\n').count());
    if missing > 0 {
        output.push_str("{#");
        output.extend(std::iter::repeat('\n').take(missing));
        output.push_str("#}");
    }
}

fn check_nesting<'a>(
    open: &mut Vec<OpenBlock<'a>>,
    directive: &'a str,
    role: &BlockRole,
    line: usize,
) -> Result<(), CompileError> {
    match role {
        BlockRole::Inline => Ok(()),
        BlockRole::Open(group) => {
            open.push(OpenBlock {
                group: group.clone(),
                directive,
                line,
            });
            Ok(())
        }
        BlockRole::Continue(group) => match open.last() {
            Some(block) if &block.group == group => Ok(()),
            innermost => Err(unbalanced(directive, group, innermost)),
        },
        BlockRole::Close(group) => match open.last() {
            Some(block) if &block.group == group => {
                open.pop();
                Ok(())
            }
            innermost => Err(unbalanced(directive, group, innermost)),
        },
    }
}

fn unbalanced(directive: &str, group: &str, innermost: Option<&OpenBlock<'_>>) -> CompileError {
    let reason = innermost.map_or_else(
        || format!("no open `{group}` block"),
        |block| {
            format!(
                "expected inside a `{group}` block, but the innermost block is @{} from line {}",
                block.directive, block.line
            )
        },
    );
    CompileError::UnbalancedDirective {
        found: directive.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BladeError;
    use crate::testing::{data, engine, RecordingHost};
    use serde_json::json;

    fn compile_error(source: &str) -> (usize, CompileError) {
        let registry = DirectiveRegistry::with_builtins();
        match Compiler::new(&registry).expand("views.test", source) {
            Err(BladeError::Compile { line, error, .. }) => (line, error),
            other => panic!("expected a compile error, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_replaces_directives() {
        let registry = DirectiveRegistry::with_builtins();
        let code = Compiler::new(&registry)
            .expand("t", "<p>@sidebar('main')</p> me@example.com")
            .unwrap();
        assert_eq!(code, "<p>{{ __invoke('sidebar', 'main') }}</p> me@example.com");
    }

    #[test]
    fn test_unknown_directive_names_location() {
        let (line, error) = compile_error("ok\n@nope('x')");
        assert_eq!(line, 2);
        assert_eq!(error, CompileError::UnknownDirective("nope".into()));
    }

    #[test]
    fn test_malformed_directive_fails_before_rendering() {
        let (_, error) = compile_error("@simplemenu('primary')@endsimplemenu");
        assert!(matches!(error, CompileError::MalformedDirective { .. }));
    }

    #[test]
    fn test_close_without_open() {
        let (line, error) = compile_error("a\n@endloop");
        assert_eq!(line, 2);
        assert!(matches!(
            error,
            CompileError::UnbalancedDirective { ref found, .. } if found == "endloop"
        ));
    }

    #[test]
    fn test_crossed_blocks() {
        let (_, error) = compile_error("@loop @simplemenu('m' as $i) @endloop @endsimplemenu");
        match error {
            CompileError::UnbalancedDirective { found, reason } => {
                assert_eq!(found, "endloop");
                assert!(reason.contains("@simplemenu"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unclosed_block_reports_opening_line() {
        let (line, error) = compile_error("\n\n@loop\n");
        assert_eq!(line, 3);
        assert!(matches!(error, CompileError::UnbalancedDirective { .. }));
    }

    #[test]
    fn test_continue_outside_block() {
        let (_, error) = compile_error("@elsecan('x')");
        assert!(matches!(error, CompileError::UnbalancedDirective { .. }));
    }

    #[test]
    fn test_multiline_arguments_keep_line_numbers() {
        let registry = DirectiveRegistry::with_builtins();
        let code = Compiler::new(&registry)
            .expand("t", "@partial('a',\n  {'x': 1})\nnext")
            .unwrap();
        assert_eq!(code.matches('\n').count(), 2);
        assert!(code.ends_with("{#\n#}\nnext"));
    }

    #[test]
    fn test_errors_after_multiline_directive_report_source_line() {
        let (engine, _) = engine(
            &[
                ("t", "@partial('a',\n  {'x': 1})\n{{ a + [] }}"),
                ("partials.a", ""),
            ],
            RecordingHost::default(),
        );
        let err = engine.render("t", &data(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, BladeError::Eval { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_bare_iteration_arguments() {
        let registry = DirectiveRegistry::with_builtins();
        let code = Compiler::new(&registry)
            .expand("t", "@loop items as $item {{ blade_loop.index }} @endloop")
            .unwrap();
        assert!(code.starts_with("{% for item in __loop_push(items, 'loop') %}"));
        assert!(code.contains(" {{ blade_loop.index }} "));
    }

    #[test]
    fn test_bare_iteration_renders_each_item() {
        let (engine, _) = engine(
            &[("t", "@loop items as $item {{ blade_loop.index }} @endloop")],
            RecordingHost::default(),
        );
        let out = engine
            .render("t", &data(json!({"items": ["p1", "p2", "p3"]})))
            .unwrap();
        assert_eq!(out, " 0  1  2 ");
    }

    #[test]
    fn test_bare_iteration_with_bad_binding_is_rejected() {
        let (_, error) = compile_error("@loop items as item @endloop");
        assert!(matches!(error, CompileError::MalformedDirective { .. }));
    }

    #[test]
    fn test_prose_after_loop_is_not_an_argument() {
        let registry = DirectiveRegistry::with_builtins();
        let code = Compiler::new(&registry)
            .expand("t", "@loop Logged in as $user @endloop")
            .unwrap();
        assert!(code.contains("__loop_push(__current_query(), 'loop')"));
        assert!(code.contains(" Logged in as $user "));
    }
}
