//! Capabilities supplied by the surrounding site
//!
//! The engine owns directive expansion, loop bookkeeping and view data. Every
//! piece of site knowledge (queries, menus, permissions, theme hooks) comes
//! from a [`ThemeHost`]. Each method receives the active [`RenderContext`],
//! so a host can read the current item or view and render partials of its
//! own through [`RenderContext::render_child`].
//!
//! All methods have defaults that return empty results, so a host only
//! implements what its templates use.

use serde_json::Value;

use crate::runtime::RenderContext;

/// Site collaborator consulted while rendering
pub trait ThemeHost: Send + Sync {
    /// Items of the ambient query, used by `@loop` without an argument
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn current_query(&self, ctx: &RenderContext<'_>) -> anyhow::Result<Value> {
        let _ = ctx;
        Ok(Value::Array(Vec::new()))
    }

    /// Items of the navigation menu `menu`, used by `@simplemenu`
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn nav_menu(&self, ctx: &RenderContext<'_>, menu: &Value) -> anyhow::Result<Value> {
        let _ = (ctx, menu);
        Ok(Value::Array(Vec::new()))
    }

    /// Rendered pagination built from `config`, used by `@paginate`
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn paginate(&self, ctx: &RenderContext<'_>, config: &Value) -> anyhow::Result<String> {
        let _ = (ctx, config);
        Ok(String::new())
    }

    /// Whether the current user may perform `action`, optionally on `subject`
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn can(
        &self,
        ctx: &RenderContext<'_>,
        action: &str,
        subject: &Value,
    ) -> anyhow::Result<bool> {
        let _ = (ctx, action, subject);
        Ok(false)
    }

    /// Whether the current user may perform any of `actions`
    ///
    /// Defaults to asking [`ThemeHost::can`] for each action.
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn can_any(
        &self,
        ctx: &RenderContext<'_>,
        actions: &[String],
        subject: &Value,
    ) -> anyhow::Result<bool> {
        for action in actions {
            if self.can(ctx, action, subject)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The signed-in user, or `null` for guests
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn current_user(&self, ctx: &RenderContext<'_>) -> anyhow::Result<Value> {
        let _ = ctx;
        Ok(Value::Null)
    }

    /// Current item when a root render starts
    ///
    /// `@resetpostdata` returns to this value.
    fn current_post(&self) -> Value {
        Value::Null
    }

    /// Post type of the current item, used by `@posttypepartial`
    ///
    /// Defaults to the item's `post_type` field, or `post`.
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn post_type(&self, ctx: &RenderContext<'_>) -> anyhow::Result<String> {
        Ok(ctx
            .current_item()
            .get("post_type")
            .and_then(Value::as_str)
            .unwrap_or("post")
            .to_string())
    }

    /// Run the theme procedure `name` and return its output
    ///
    /// Backs the pass-through directives such as `@sidebar` and `@wphead`.
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is returned to its caller.
    fn invoke(
        &self,
        ctx: &RenderContext<'_>,
        name: &str,
        args: &[Value],
    ) -> anyhow::Result<String> {
        let _ = (ctx, name, args);
        Ok(String::new())
    }

    /// Names of the template functions answered by [`ThemeHost::call`]
    ///
    /// Read once, when the engine is built.
    fn functions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Call one of the template functions named by [`ThemeHost::functions`]
    ///
    /// # Errors
    ///
    /// The default rejects every name.
    fn call(
        &self,
        ctx: &RenderContext<'_>,
        name: &str,
        args: &[Value],
    ) -> anyhow::Result<Value> {
        let _ = (ctx, args);
        Err(anyhow::anyhow!("unknown function `{name}`"))
    }
}

/// Host that provides nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl ThemeHost for NullHost {}
