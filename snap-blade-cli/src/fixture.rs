//! JSON fixtures standing in for a live site
//!
//! ```json
//! {
//!   "data": { "title": "Home" },
//!   "defaults": { "partials.*": { "site": "Example" } },
//!   "query": [{ "title": "Hello", "post_type": "post" }],
//!   "menus": { "primary": [{ "label": "Home", "url": "/" }] },
//!   "permissions": ["edit_posts"],
//!   "user": { "name": "admin" },
//!   "post": { "title": "Front page", "post_type": "page" },
//!   "procedures": { "wphead": "<meta charset=\"utf-8\">" }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use snap_blade::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Partial rendered by `@paginate` when the theme provides it
pub const PAGINATION_PARTIAL: &str = "partials.pagination";

/// Contents of a fixture file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Explicit data for the rendered template
    pub data: ViewData,

    /// Default data keyed by template name or `prefix*` pattern
    pub defaults: BTreeMap<String, ViewData>,

    /// Items of the main query
    pub query: Vec<Value>,

    /// Navigation menus by name
    pub menus: BTreeMap<String, Vec<Value>>,

    /// Abilities granted to the current user
    pub permissions: Vec<String>,

    /// Signed-in user, `null` for a guest
    pub user: Value,

    /// Current post when the render starts
    pub post: Value,

    /// Output of pass-through procedures such as `wphead`
    pub procedures: BTreeMap<String, String>,
}

impl Fixture {
    /// Read a fixture from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid fixture.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid fixture {}", path.display()))
    }

    /// Default data as view composers
    #[must_use]
    pub fn composers(&self) -> ViewComposers {
        self.defaults
            .iter()
            .fold(ViewComposers::new(), |composers, (pattern, data)| {
                let data = data.clone();
                composers.when([pattern], move |_| data.clone())
            })
    }

    /// Host answering from this fixture
    #[must_use]
    pub fn host(&self) -> FixtureHost {
        FixtureHost {
            query: self.query.clone(),
            menus: self.menus.clone(),
            permissions: self.permissions.iter().cloned().collect(),
            user: self.user.clone(),
            post: self.post.clone(),
            procedures: self.procedures.clone(),
        }
    }
}

/// [`ThemeHost`] backed by a [`Fixture`]
#[derive(Debug, Clone, Default)]
pub struct FixtureHost {
    query: Vec<Value>,
    menus: BTreeMap<String, Vec<Value>>,
    permissions: HashSet<String>,
    user: Value,
    post: Value,
    procedures: BTreeMap<String, String>,
}

impl ThemeHost for FixtureHost {
    fn current_query(&self, _ctx: &RenderContext<'_>) -> anyhow::Result<Value> {
        Ok(Value::Array(self.query.clone()))
    }

    fn nav_menu(&self, _ctx: &RenderContext<'_>, menu: &Value) -> anyhow::Result<Value> {
        let name = menu
            .as_str()
            .with_context(|| format!("menu name must be a string, got {menu}"))?;
        let items = self
            .menus
            .get(name)
            .with_context(|| format!("no menu named `{name}` in fixture"))?;
        Ok(Value::Array(items.clone()))
    }

    fn paginate(&self, ctx: &RenderContext<'_>, config: &Value) -> anyhow::Result<String> {
        let mut data = ViewData::new();
        data.insert("pagination".into(), config.clone());
        match ctx.render_child(PAGINATION_PARTIAL, &data) {
            Err(BladeError::TemplateNotFound(name)) if name == PAGINATION_PARTIAL => {
                tracing::debug!("theme has no pagination partial");
                Ok(String::new())
            }
            output => Ok(output?),
        }
    }

    fn can(
        &self,
        _ctx: &RenderContext<'_>,
        action: &str,
        _subject: &Value,
    ) -> anyhow::Result<bool> {
        Ok(self.permissions.contains(action))
    }

    fn current_user(&self, _ctx: &RenderContext<'_>) -> anyhow::Result<Value> {
        Ok(self.user.clone())
    }

    fn current_post(&self) -> Value {
        self.post.clone()
    }

    fn invoke(
        &self,
        _ctx: &RenderContext<'_>,
        name: &str,
        _args: &[Value],
    ) -> anyhow::Result<String> {
        Ok(self.procedures.get(name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let fixture: Fixture = serde_json::from_value(json!({"query": [1, 2]})).unwrap();
        assert_eq!(fixture.query.len(), 2);
        assert!(fixture.data.is_empty());
        assert_eq!(fixture.user, Value::Null);
    }

    #[test]
    fn test_defaults_become_composers() {
        let fixture: Fixture = serde_json::from_value(json!({
            "defaults": {"partials.*": {"site": "Example"}, "views.index": {"hero": true}}
        }))
        .unwrap();
        let composers = fixture.composers();
        assert_eq!(composers.len(), 2);
        assert_eq!(composers.defaults("partials.nav").unwrap()["site"], json!("Example"));
        assert!(composers.defaults("views.single").unwrap().is_empty());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Fixture::load(&path).unwrap_err();
        assert!(err.to_string().contains("fixture.json"));
    }
}
