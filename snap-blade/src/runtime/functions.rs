//! Functions called by expanded directive code
//!
//! Directive expanders emit calls to these `__`-prefixed functions. Each one
//! finds the active render through [`RenderContext::from_state`], so they
//! fail cleanly when a template is rendered outside the engine.

use minijinja::value::{Object, ObjectRepr, Rest, Value as TemplateValue};
use minijinja::{Environment, Error, ErrorKind, Output, State};
use serde_json::Value;
use std::sync::Arc;

use super::context::RenderContext;
use super::loop_stack::LoopKind;
use super::value::{display, iterate, to_json, to_template, truthy};
use crate::view::data_from_value;

/// Register every runtime function on `env`
pub(crate) fn register(env: &mut Environment<'static>) {
    env.add_function("__loop_push", loop_push);
    env.add_function("__loop_next", loop_next);
    env.add_function("__loop_pop", loop_pop);
    env.add_function("__current_query", current_query);
    env.add_function("__nav_menu", nav_menu);
    env.add_function("__paginate", paginate);
    env.add_function("__render_child", render_child);
    env.add_function("__post_type", post_type);
    env.add_function("__current_item", current_item);
    env.add_function("__set_current_item", set_current_item);
    env.add_function("__reset_current_item", reset_current_item);
    env.add_function("__can", can);
    env.add_function("__can_any", can_any);
    env.add_function("__auth", auth);
    env.add_function("__invoke", invoke);
}

/// Print values HTML-escaped, with `none` as nothing
pub(crate) fn write_value(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &TemplateValue,
) -> Result<(), Error> {
    if value.is_none() {
        return Ok(());
    }
    minijinja::escape_formatter(out, state, value)
}

/// Template function answered by [`ThemeHost::call`](crate::host::ThemeHost::call)
#[derive(Debug)]
pub(crate) struct HostFunction {
    name: String,
}

impl HostFunction {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Object for HostFunction {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call(
        self: &Arc<Self>,
        state: &State<'_, '_>,
        args: &[TemplateValue],
    ) -> Result<TemplateValue, Error> {
        let ctx = RenderContext::from_state(state)?;
        let args: Vec<Value> = args.iter().map(to_json).collect();
        let result = ctx.host().call(&ctx, &self.name, &args);
        ctx.collaborator(&self.name, result).map(|value| to_template(&value))
    }
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidOperation, message)
}

fn loop_kind(kind: &str) -> Result<LoopKind, Error> {
    LoopKind::from_name(kind).ok_or_else(|| invalid(format!("unknown loop kind `{kind}`")))
}

fn loop_push(state: &State<'_, '_>, source: TemplateValue, kind: &str) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let kind = loop_kind(kind)?;
    let items = iterate(to_json(&source))
        .ok_or_else(|| invalid(format!("@{kind} over a value that is not a list")))?;
    Ok(to_template(&Value::Array(ctx.push_loop(kind, items))))
}

fn loop_next(state: &State<'_, '_>, item: TemplateValue, kind: &str) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let kind = loop_kind(kind)?;
    let metadata = ctx.next_loop(kind, to_json(&item)).map_err(|e| ctx.fail(e))?;
    Ok(TemplateValue::from_serialize(&metadata))
}

fn loop_pop(state: &State<'_, '_>, kind: &str) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let kind = loop_kind(kind)?;
    Ok(match ctx.pop_loop(kind).map_err(|e| ctx.fail(e))? {
        Some(parent) => TemplateValue::from_serialize(&parent),
        None => TemplateValue::UNDEFINED,
    })
}

fn current_query(state: &State<'_, '_>) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let result = ctx.host().current_query(&ctx);
    ctx.collaborator("current_query", result).map(|items| to_template(&items))
}

fn nav_menu(state: &State<'_, '_>, menu: TemplateValue) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let result = ctx.host().nav_menu(&ctx, &to_json(&menu));
    ctx.collaborator("nav_menu", result).map(|items| to_template(&items))
}

fn paginate(state: &State<'_, '_>, config: Option<TemplateValue>) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let config = match config.as_ref().map(to_json) {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(config) => config,
    };
    let result = ctx.host().paginate(&ctx, &config);
    ctx.collaborator("paginate", result).map(TemplateValue::from_safe_string)
}

fn render_child(
    state: &State<'_, '_>,
    name: &str,
    data: Option<TemplateValue>,
) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let data = data_from_value(data.as_ref().map_or(Value::Null, to_json))
        .ok_or_else(|| invalid(format!("data for '{name}' must be a map")))?;
    ctx.render_child(name, &data)
        .map(TemplateValue::from_safe_string)
        .map_err(|e| ctx.fail(e))
}

fn post_type(state: &State<'_, '_>) -> Result<String, Error> {
    let ctx = RenderContext::from_state(state)?;
    let result = ctx.host().post_type(&ctx);
    ctx.collaborator("post_type", result)
}

fn current_item(state: &State<'_, '_>) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    Ok(to_template(&ctx.current_item()))
}

fn set_current_item(state: &State<'_, '_>, item: TemplateValue) -> Result<String, Error> {
    RenderContext::from_state(state)?.set_current_item(to_json(&item));
    Ok(String::new())
}

fn reset_current_item(state: &State<'_, '_>) -> Result<String, Error> {
    RenderContext::from_state(state)?.reset_current_item();
    Ok(String::new())
}

fn can(state: &State<'_, '_>, action: &str, subject: Option<TemplateValue>) -> Result<bool, Error> {
    let ctx = RenderContext::from_state(state)?;
    let subject = subject.as_ref().map_or(Value::Null, to_json);
    let result = ctx.host().can(&ctx, action, &subject);
    ctx.collaborator("can", result)
}

fn can_any(
    state: &State<'_, '_>,
    actions: TemplateValue,
    subject: Option<TemplateValue>,
) -> Result<bool, Error> {
    let ctx = RenderContext::from_state(state)?;
    let actions: Vec<String> = match to_json(&actions) {
        Value::Array(items) => items.iter().map(display).collect(),
        single => vec![display(&single)],
    };
    let subject = subject.as_ref().map_or(Value::Null, to_json);
    let result = ctx.host().can_any(&ctx, &actions, &subject);
    ctx.collaborator("can_any", result)
}

fn auth(state: &State<'_, '_>) -> Result<bool, Error> {
    let ctx = RenderContext::from_state(state)?;
    let result = ctx.host().current_user(&ctx);
    ctx.collaborator("current_user", result).map(|user| truthy(&user))
}

fn invoke(state: &State<'_, '_>, name: &str, args: Rest<TemplateValue>) -> Result<TemplateValue, Error> {
    let ctx = RenderContext::from_state(state)?;
    let args: Vec<Value> = args.iter().map(to_json).collect();
    let result = ctx.host().invoke(&ctx, name, &args);
    ctx.collaborator(name, result).map(TemplateValue::from_safe_string)
}
