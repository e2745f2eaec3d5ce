//! Built-in directive set
//!
//! Every expander here is a plain function from argument text to host
//! template code. The emitted code talks to the runtime through the `__`
//! functions (loop stack, child renders, host bridges). Argument
//! expressions go through [`host_expr`], so `$` sigils are optional.

use super::args::{host_expr, parse_loop, quote, split_top_level, strip_parens, IterationArgs, PartialArgs};
use super::Directive;
use crate::error::CompileError;
use crate::runtime::LoopKind;

/// Variable holding the metadata of the innermost directive loop
pub const LOOP_VARIABLE: &str = "blade_loop";

/// Pass-through directives forwarded to [`ThemeHost::invoke`](crate::host::ThemeHost::invoke)
pub const PASS_THROUGH: [&str; 8] = [
    "wphead",
    "wpfooter",
    "sidebar",
    "action",
    "thecontent",
    "theexcerpt",
    "navmenu",
    "searchform",
];

/// All built-in directives
#[must_use]
pub fn directives() -> Vec<Directive> {
    let mut directives = vec![
        Directive::new("loop", expand_loop).opens("loop").bare_iteration(),
        Directive::new("endloop", |args| close_loop("endloop", LoopKind::Loop, args))
            .closes("loop"),
        Directive::new("simplemenu", expand_simplemenu)
            .opens("simplemenu")
            .bare_iteration(),
        Directive::new("endsimplemenu", |args| {
            close_loop("endsimplemenu", LoopKind::SimpleMenu, args)
        })
        .closes("simplemenu"),
        Directive::new("partial", expand_partial),
        Directive::new("posttypepartial", expand_post_type_partial),
        Directive::new("paginate", expand_paginate),
        Directive::new("setpostdata", expand_set_post_data),
        Directive::new("resetpostdata", |args| {
            no_arguments("resetpostdata", args)?;
            Ok("{{ __reset_current_item() }}".to_string())
        }),
        Directive::new("can", |args| condition("can", "__can", false, args)).opens("can"),
        Directive::new("elsecan", |args| elif("elsecan", "__can", false, args)).continues("can"),
        Directive::new("endcan", |args| end_if("endcan", args)).closes("can"),
        Directive::new("cannot", |args| condition("cannot", "__can", true, args)).opens("cannot"),
        Directive::new("elsecannot", |args| elif("elsecannot", "__can", true, args))
            .continues("cannot"),
        Directive::new("endcannot", |args| end_if("endcannot", args)).closes("cannot"),
        Directive::new("canany", |args| condition("canany", "__can_any", false, args))
            .opens("canany"),
        Directive::new("endcanany", |args| end_if("endcanany", args)).closes("canany"),
        Directive::new("auth", |args| {
            no_arguments("auth", args)?;
            Ok("{% if __auth() %}".to_string())
        })
        .opens("auth"),
        Directive::new("endauth", |args| end_if("endauth", args)).closes("auth"),
        Directive::new("guest", |args| {
            no_arguments("guest", args)?;
            Ok("{% if not __auth() %}".to_string())
        })
        .opens("guest"),
        Directive::new("endguest", |args| end_if("endguest", args)).closes("guest"),
    ];

    directives.extend(
        PASS_THROUGH
            .into_iter()
            .map(|name| Directive::new(name, move |args| pass_through(name, args))),
    );
    directives
}

fn open_loop(kind: LoopKind, args: &IterationArgs) -> String {
    let kind = quote(kind.as_str());
    format!(
        "{{% for {binding} in __loop_push({source}, {kind}) %}}\
         {{% set {LOOP_VARIABLE} = __loop_next({binding}, {kind}) %}}",
        binding = args.variable(),
        source = host_expr(&args.source),
    )
}

/// `@loop`, `@loop($query)`, `@loop($items as $item)`
///
/// # Errors
///
/// Fails when an `as` clause is malformed.
pub fn expand_loop(args: &str) -> Result<String, CompileError> {
    let args = parse_loop(args)?;
    Ok(open_loop(LoopKind::Loop, &args))
}

/// `@simplemenu($menu as $item)`
///
/// The menu expression is handed to the host's `nav_menu`.
///
/// # Errors
///
/// Fails unless the argument has the `<source> as $<binding>` form.
pub fn expand_simplemenu(args: &str) -> Result<String, CompileError> {
    let mut args = IterationArgs::parse("simplemenu", args)?;
    args.source = format!("__nav_menu({})", args.source);
    Ok(open_loop(LoopKind::SimpleMenu, &args))
}

fn close_loop(directive: &str, kind: LoopKind, args: &str) -> Result<String, CompileError> {
    no_arguments(directive, args)?;
    Ok(format!(
        "{{% endfor %}}{{% set {LOOP_VARIABLE} = __loop_pop({}) %}}",
        quote(kind.as_str())
    ))
}

/// `@partial('name')` or `@partial('name', data)`
///
/// # Errors
///
/// Fails unless the first argument is a quoted partial name.
pub fn expand_partial(args: &str) -> Result<String, CompileError> {
    let args = PartialArgs::parse(args)?;
    let data = args.data.as_deref().map_or_else(|| "{}".to_string(), host_expr);
    Ok(format!(
        "{{{{ __render_child({}, {data}) }}}}",
        quote(&format!("partials.{}", args.name)),
    ))
}

fn expand_post_type_partial(args: &str) -> Result<String, CompileError> {
    no_arguments("posttypepartial", args)?;
    Ok(
        "{{ __render_child('partials.post-type.' ~ __post_type(), {'post': __current_item()}) }}"
            .to_string(),
    )
}

fn expand_paginate(args: &str) -> Result<String, CompileError> {
    let config = strip_parens(args);
    if split_top_level(config, ',').len() > 1 {
        return Err(CompileError::malformed(
            "paginate",
            args,
            "expected at most one configuration argument",
        ));
    }
    let config = if config.is_empty() {
        "{}".to_string()
    } else {
        host_expr(config)
    };
    Ok(format!("{{{{ __paginate({config}) }}}}"))
}

fn expand_set_post_data(args: &str) -> Result<String, CompileError> {
    let item = strip_parens(args);
    if item.is_empty() {
        return Err(CompileError::malformed("setpostdata", args, "expected an item expression"));
    }
    Ok(format!("{{{{ __set_current_item({}) }}}}", host_expr(item)))
}

fn pass_through(name: &str, args: &str) -> Result<String, CompileError> {
    let args = strip_parens(args);
    let name = quote(name);
    Ok(if args.is_empty() {
        format!("{{{{ __invoke({name}) }}}}")
    } else {
        format!("{{{{ __invoke({name}, {}) }}}}", host_expr(args))
    })
}

fn condition(directive: &str, check: &str, negate: bool, args: &str) -> Result<String, CompileError> {
    let test = check_call(directive, check, negate, args)?;
    Ok(format!("{{% if {test} %}}"))
}

fn elif(directive: &str, check: &str, negate: bool, args: &str) -> Result<String, CompileError> {
    let test = check_call(directive, check, negate, args)?;
    Ok(format!("{{% elif {test} %}}"))
}

fn check_call(directive: &str, check: &str, negate: bool, args: &str) -> Result<String, CompileError> {
    let inner = strip_parens(args);
    if inner.is_empty() {
        return Err(CompileError::malformed(directive, args, "expected an ability"));
    }
    let not = if negate { "not " } else { "" };
    Ok(format!("{not}{check}({})", host_expr(inner)))
}

fn end_if(directive: &str, args: &str) -> Result<String, CompileError> {
    no_arguments(directive, args)?;
    Ok("{% endif %}".to_string())
}

fn no_arguments(directive: &str, args: &str) -> Result<(), CompileError> {
    if strip_parens(args).is_empty() {
        Ok(())
    } else {
        Err(CompileError::malformed(directive, args, "takes no arguments"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveRegistry;

    fn registry() -> DirectiveRegistry {
        DirectiveRegistry::with_builtins()
    }

    #[test]
    fn test_loop_defaults_to_current_query() {
        assert_eq!(
            expand_loop("").unwrap(),
            "{% for post in __loop_push(__current_query(), 'loop') %}\
             {% set blade_loop = __loop_next(post, 'loop') %}"
        );
    }

    #[test]
    fn test_loop_with_binding() {
        assert_eq!(
            expand_loop("($items as $item)").unwrap(),
            "{% for item in __loop_push(items, 'loop') %}\
             {% set blade_loop = __loop_next(item, 'loop') %}"
        );
    }

    #[test]
    fn test_bare_loop_argument() {
        assert_eq!(
            expand_loop(" items as $item").unwrap(),
            expand_loop("(items as $item)").unwrap()
        );
        assert!(expand_loop(" items as item").is_err());
    }

    #[test]
    fn test_endloop_pops_and_refreshes_metadata() {
        assert_eq!(
            registry().expand("endloop", "").unwrap(),
            "{% endfor %}{% set blade_loop = __loop_pop('loop') %}"
        );
        assert!(registry().expand("endloop", "(x)").is_err());
    }

    #[test]
    fn test_simplemenu() {
        assert_eq!(
            expand_simplemenu("('primary' as $item)").unwrap(),
            "{% for item in __loop_push(__nav_menu('primary'), 'simplemenu') %}\
             {% set blade_loop = __loop_next(item, 'simplemenu') %}"
        );
    }

    #[test]
    fn test_simplemenu_without_as_fails() {
        let err = expand_simplemenu("('primary')").unwrap_err();
        assert!(matches!(
            err,
            CompileError::MalformedDirective { ref directive, ref argument, .. }
                if directive == "simplemenu" && argument == "('primary')"
        ));
    }

    #[test]
    fn test_partial() {
        assert_eq!(
            expand_partial("('header/primary')").unwrap(),
            "{{ __render_child('partials.header.primary', {}) }}"
        );
        assert_eq!(
            expand_partial("('card', {'title': $post.title})").unwrap(),
            "{{ __render_child('partials.card', {'title': post.title}) }}"
        );
    }

    #[test]
    fn test_paginate() {
        assert_eq!(expand_paginate("").unwrap(), "{{ __paginate({}) }}");
        assert_eq!(
            expand_paginate("({'mid_size': 2})").unwrap(),
            "{{ __paginate({'mid_size': 2}) }}"
        );
    }

    #[test]
    fn test_paginate_rejects_extra_arguments() {
        let err = expand_paginate("($query, {'mid_size': 2})").unwrap_err();
        assert!(matches!(
            err,
            CompileError::MalformedDirective { ref directive, .. } if directive == "paginate"
        ));
        assert!(expand_paginate("({'a': 1, 'b': 2})").is_ok());
    }

    #[test]
    fn test_pass_through_forwards_arguments() {
        let registry = registry();
        assert_eq!(
            registry.expand("sidebar", "('footer-1')").unwrap(),
            "{{ __invoke('sidebar', 'footer-1') }}"
        );
        assert_eq!(
            registry.expand("action", "('after_header', $post, 2)").unwrap(),
            "{{ __invoke('action', 'after_header', post, 2) }}"
        );
        assert_eq!(
            registry.expand("wphead", "").unwrap(),
            "{{ __invoke('wphead') }}"
        );
    }

    #[test]
    fn test_post_data() {
        let registry = registry();
        assert_eq!(
            registry.expand("setpostdata", "($featured)").unwrap(),
            "{{ __set_current_item(featured) }}"
        );
        assert!(registry.expand("setpostdata", "").is_err());
        assert_eq!(
            registry.expand("resetpostdata", "").unwrap(),
            "{{ __reset_current_item() }}"
        );
    }

    #[test]
    fn test_authorization_blocks() {
        let registry = registry();
        assert_eq!(
            registry.expand("can", "('edit_post', $post)").unwrap(),
            "{% if __can('edit_post', post) %}"
        );
        assert_eq!(
            registry.expand("elsecan", "('read')").unwrap(),
            "{% elif __can('read') %}"
        );
        assert_eq!(
            registry.expand("cannot", "('edit_post')").unwrap(),
            "{% if not __can('edit_post') %}"
        );
        assert_eq!(
            registry.expand("canany", "(['a', 'b'])").unwrap(),
            "{% if __can_any(['a', 'b']) %}"
        );
        assert_eq!(registry.expand("guest", "").unwrap(), "{% if not __auth() %}");
        assert_eq!(registry.expand("endcan", "").unwrap(), "{% endif %}");
        assert!(registry.expand("can", "").is_err());
    }
}
