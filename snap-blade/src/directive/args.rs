//! Directive argument parsing
//!
//! Expanders receive the argument text exactly as written, parentheses
//! included. These helpers turn it into structured values.

use crate::error::CompileError;
use crate::template::helpers::bladeify;

/// Remove wrapping parentheses and surrounding whitespace
///
/// Only parentheses that enclose the whole text are removed, so
/// `(a)(b)` is left alone. Stripping is idempotent.
///
/// ```rust
/// use snap_blade::directive::strip_parens;
///
/// assert_eq!(strip_parens("((items as $x))"), "items as $x");
/// assert_eq!(strip_parens("(a), (b)"), "(a), (b)");
/// assert_eq!(strip_parens(""), "");
/// ```
#[must_use]
pub fn strip_parens(raw: &str) -> &str {
    let mut text = raw.trim();
    while text.starts_with('(') && matching_close(text, 0) == Some(text.len() - 1) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Byte offset of the bracket closing the one at `open`
pub(crate) fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `text` on `separator` outside quotes and brackets
#[must_use]
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// Offset of the last top-level ` as ` keyword
fn find_as(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut found = None;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'a' if depth == 0
                && bytes.get(i + 1) == Some(&b's')
                && i > 0
                && bytes[i - 1].is_ascii_whitespace()
                && bytes.get(i + 2).is_some_and(u8::is_ascii_whitespace) =>
            {
                found = Some(i);
            }
            _ => {}
        }
    }
    found
}

/// Rewrite directive argument text as a host expression
///
/// Blade-style `$` sigils are dropped from variable names outside string
/// literals, so `$post.title` and `post.title` mean the same thing.
///
/// ```rust
/// use snap_blade::directive::args::host_expr;
///
/// assert_eq!(host_expr("$items"), "items");
/// assert_eq!(host_expr("{'price': '$5', 'id': $post.id}"), "{'price': '$5', 'id': post.id}");
/// ```
#[must_use]
pub fn host_expr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '$' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {}
            _ => out.push(c),
        }
    }
    out
}

/// Length of a parenthesis-free `<source> as $<binding>` argument
///
/// Iteration directives may be written `@loop items as $item`. `text` is
/// the source following the directive name; the match must start with
/// whitespace, and the source must be a plain variable path. Only the
/// binding's own characters are consumed, so `$item<li>` stops before `<`.
#[must_use]
pub fn bare_iteration_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let blanks = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| **b == b' ' || **b == b'\t')
            .count()
    };
    let word = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count()
    };

    let mut at = blanks(0);
    if at == 0 {
        return None;
    }
    if bytes.get(at) == Some(&b'$') {
        at += 1;
    }
    if !bytes.get(at).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') {
        return None;
    }
    at += word(at);
    while bytes.get(at) == Some(&b'.') && word(at + 1) > 0 {
        at += 1 + word(at + 1);
    }

    let gap = blanks(at);
    if gap == 0 || !text[at + gap..].starts_with("as") {
        return None;
    }
    at += gap + 2;
    let gap = blanks(at);
    if gap == 0 {
        return None;
    }
    at += gap;

    let binding = if bytes.get(at) == Some(&b'$') {
        1 + word(at + 1)
    } else {
        bytes[at..]
            .iter()
            .take_while(|b| !b.is_ascii_whitespace())
            .count()
    };
    (binding > 0).then_some(at + binding)
}

fn is_variable(text: &str) -> bool {
    let Some(name) = text.strip_prefix('$') else {
        return false;
    };
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `<source> as $<binding>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationArgs {
    /// Expression producing the items
    pub source: String,
    /// Loop variable, including its `$`
    pub binding: String,
}

impl IterationArgs {
    /// Parse the arguments of iteration directive `directive`
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedDirective`] when the `as` separator,
    /// the source or a `$variable` binding is missing.
    pub fn parse(directive: &str, raw: &str) -> Result<Self, CompileError> {
        let text = strip_parens(raw);
        let at = find_as(text).ok_or_else(|| {
            CompileError::malformed(directive, raw, "expected `<source> as $<binding>`")
        })?;
        Self::from_parts(directive, raw, &text[..at], &text[at + 2..])
    }

    fn from_parts(
        directive: &str,
        raw: &str,
        source: &str,
        binding: &str,
    ) -> Result<Self, CompileError> {
        let source = source.trim();
        let binding = binding.trim();
        if source.is_empty() {
            return Err(CompileError::malformed(directive, raw, "missing source expression"));
        }
        if !is_variable(binding) {
            return Err(CompileError::malformed(
                directive,
                raw,
                format!("binding `{binding}` is not a variable such as `$item`"),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            binding: binding.to_string(),
        })
    }

    /// Loop variable as named in template code, without its `$`
    #[must_use]
    pub fn variable(&self) -> &str {
        self.binding.trim_start_matches('$')
    }
}

/// Expression `@loop` falls back to without an argument
pub const CURRENT_QUERY: &str = "__current_query()";

/// Variable `@loop` binds when no `as` clause is given
pub const DEFAULT_LOOP_BINDING: &str = "$post";

/// Arguments of `@loop`, where both parts are optional
///
/// - `@loop` iterates the current query as `$post`
/// - `@loop($query)` iterates `$query` as `$post`
/// - `@loop($items as $item)` iterates `$items` as `$item`
///
/// # Errors
///
/// Returns [`CompileError::MalformedDirective`] for an `as` clause without a
/// source or with a binding that is not a variable.
pub fn parse_loop(raw: &str) -> Result<IterationArgs, CompileError> {
    let text = strip_parens(raw);
    if text.is_empty() {
        return Ok(IterationArgs {
            source: CURRENT_QUERY.to_string(),
            binding: DEFAULT_LOOP_BINDING.to_string(),
        });
    }
    match find_as(text) {
        Some(at) => IterationArgs::from_parts("loop", raw, &text[..at], &text[at + 2..]),
        None => Ok(IterationArgs {
            source: text.to_string(),
            binding: DEFAULT_LOOP_BINDING.to_string(),
        }),
    }
}

/// Arguments of `@partial('name', data)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialArgs {
    /// Dotted partial name, without the `partials.` prefix
    pub name: String,
    /// Data expression, if given
    pub data: Option<String>,
}

impl PartialArgs {
    /// Parse `@partial` arguments
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedDirective`] unless the arguments are
    /// a quoted name optionally followed by one data expression.
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        let parts = split_top_level(strip_parens(raw), ',');
        let (name, data) = match parts.as_slice() {
            [name] => (*name, None),
            [name, data] if !data.is_empty() => (*name, Some((*data).to_string())),
            _ => {
                return Err(CompileError::malformed(
                    "partial",
                    raw,
                    "expected `('name')` or `('name', data)`",
                ))
            }
        };
        let name = unquote(name)
            .ok_or_else(|| CompileError::malformed("partial", raw, "partial name must be a quoted string"))?;
        let name = bladeify(name.trim_matches(['/', '\\']));
        if name.is_empty() {
            return Err(CompileError::malformed("partial", raw, "partial name is empty"));
        }
        Ok(Self { name, data })
    }
}

/// Contents of a single- or double-quoted literal
fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = text.strip_prefix(quote)?.strip_suffix(quote)?;
    (!inner.contains(quote)).then_some(inner)
}

/// Render `text` as a single-quoted literal
#[must_use]
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
