//! View data resolution
//!
//! Each render merges three layers into the variables a template sees:
//!
//! 1. variables inherited from the calling template (child renders only)
//! 2. defaults supplied for the template by a [`DefaultsProvider`]
//! 3. data passed explicitly by the caller
//!
//! Later layers win on key collisions. Inputs are never mutated.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::{BladeError, Result};

/// Variables available to a template
pub type ViewData = Map<String, Value>;

/// Supplies per-template default data
#[cfg_attr(test, mockall::automock)]
pub trait DefaultsProvider: Send + Sync {
    /// Default data for `template`
    fn defaults(&self, template: &str) -> anyhow::Result<ViewData>;
}

impl<F> DefaultsProvider for F
where
    F: Fn(&str) -> anyhow::Result<ViewData> + Send + Sync,
{
    fn defaults(&self, template: &str) -> anyhow::Result<ViewData> {
        self(template)
    }
}

/// Provider that contributes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefaults;

impl DefaultsProvider for NoDefaults {
    fn defaults(&self, _template: &str) -> anyhow::Result<ViewData> {
        Ok(ViewData::new())
    }
}

type Composer = Arc<dyn Fn(&str) -> ViewData + Send + Sync>;

/// Which template names a composer applies to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        pattern.strip_suffix('*').map_or_else(
            || Self::Exact(pattern.to_string()),
            |prefix| Self::Prefix(prefix.to_string()),
        )
    }

    fn matches(&self, template: &str) -> bool {
        match self {
            Self::Exact(name) => name == template,
            Self::Prefix(prefix) => template.starts_with(prefix.as_str()),
        }
    }
}

/// Data hooks keyed by template name
///
/// Patterns are exact names (`views.index`) or prefixes ending in `*`
/// (`partials.*`, or `*` for every template). All matching composers run in
/// registration order.
///
/// ```rust
/// use serde_json::json;
/// use snap_blade::view::{DefaultsProvider, ViewComposers};
///
/// let composers = ViewComposers::new().when(["partials.*"], |_| {
///     let mut data = snap_blade::view::ViewData::new();
///     data.insert("site".into(), json!("Example"));
///     data
/// });
///
/// let data = composers.defaults("partials.header").unwrap();
/// assert_eq!(data["site"], json!("Example"));
/// assert!(composers.defaults("views.index").unwrap().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ViewComposers {
    composers: Vec<(Vec<Pattern>, Composer)>,
}

impl ViewComposers {
    /// Create an empty set of composers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `composer` for every template matching one of `templates`
    #[must_use]
    pub fn when<I, S, F>(mut self, templates: I, composer: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> ViewData + Send + Sync + 'static,
    {
        let patterns = templates
            .into_iter()
            .map(|t| Pattern::parse(t.as_ref()))
            .collect();
        self.composers.push((patterns, Arc::new(composer)));
        self
    }

    /// Number of registered composers
    #[must_use]
    pub fn len(&self) -> usize {
        self.composers.len()
    }

    /// Whether no composer is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.composers.is_empty()
    }
}

impl fmt::Debug for ViewComposers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewComposers")
            .field("composers", &self.composers.len())
            .finish()
    }
}

impl DefaultsProvider for ViewComposers {
    fn defaults(&self, template: &str) -> anyhow::Result<ViewData> {
        let mut data = ViewData::new();
        for (patterns, composer) in &self.composers {
            if patterns.iter().any(|p| p.matches(template)) {
                data.extend(composer(template));
            }
        }
        Ok(data)
    }
}

/// Merges default, inherited and explicit data for a render
#[derive(Clone)]
pub struct ViewDataResolver {
    provider: Arc<dyn DefaultsProvider>,
}

impl Default for ViewDataResolver {
    fn default() -> Self {
        Self::new(Arc::new(NoDefaults))
    }
}

impl fmt::Debug for ViewDataResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDataResolver").finish_non_exhaustive()
    }
}

impl ViewDataResolver {
    /// Create a resolver backed by `provider`
    #[must_use]
    pub fn new(provider: Arc<dyn DefaultsProvider>) -> Self {
        Self { provider }
    }

    /// Data for a root render: defaults overlaid with `explicit`
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Collaborator`] if the defaults provider fails.
    pub fn resolve_root(&self, template: &str, explicit: &ViewData) -> Result<ViewData> {
        let mut merged = self.defaults(template)?;
        overlay(&mut merged, explicit);
        Ok(merged)
    }

    /// Data for a child render: `inherited`, then defaults, then `explicit`
    ///
    /// # Errors
    ///
    /// Returns [`BladeError::Collaborator`] if the defaults provider fails.
    pub fn resolve_child(
        &self,
        template: &str,
        inherited: &ViewData,
        explicit: &ViewData,
    ) -> Result<ViewData> {
        let mut merged = inherited.clone();
        overlay(&mut merged, &self.defaults(template)?);
        overlay(&mut merged, explicit);
        Ok(merged)
    }

    fn defaults(&self, template: &str) -> Result<ViewData> {
        self.provider
            .defaults(template)
            .map_err(|e| BladeError::collaborator("defaults", e))
    }
}

fn overlay(target: &mut ViewData, layer: &ViewData) {
    for (key, value) in layer {
        target.insert(key.clone(), value.clone());
    }
}

/// Convert a template value into view data
///
/// `null` and empty lists (`[]` written in a template) count as no data.
pub(crate) fn data_from_value(value: Value) -> Option<ViewData> {
    match value {
        Value::Object(map) => Some(map),
        Value::Null => Some(ViewData::new()),
        Value::Array(list) if list.is_empty() => Some(ViewData::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> ViewData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn resolver_with(defaults: Value) -> ViewDataResolver {
        let defaults = data(defaults);
        let provider = move |_: &str| -> anyhow::Result<ViewData> { Ok(defaults.clone()) };
        ViewDataResolver::new(Arc::new(provider))
    }

    #[test]
    fn test_resolve_root_explicit_wins() {
        let resolver = resolver_with(json!({"x": 0, "y": 2}));
        let merged = resolver.resolve_root("home", &data(json!({"x": 1}))).unwrap();
        assert_eq!(Value::Object(merged), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_resolve_child_layers() {
        let resolver = resolver_with(json!({"a": 2, "b": 3}));
        let inherited = data(json!({"a": 1}));
        let explicit = data(json!({"b": 4}));

        let merged = resolver.resolve_child("partials.card", &inherited, &explicit).unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 2, "b": 4}));

        // inputs untouched
        assert_eq!(Value::Object(inherited), json!({"a": 1}));
        assert_eq!(Value::Object(explicit), json!({"b": 4}));
    }

    #[test]
    fn test_inherited_keys_survive_when_not_overridden() {
        let resolver = ViewDataResolver::default();
        let merged = resolver
            .resolve_child("partials.x", &data(json!({"keep": true})), &ViewData::new())
            .unwrap();
        assert_eq!(merged["keep"], json!(true));
    }

    #[test]
    fn test_defaults_requested_by_template_name() {
        let mut provider = MockDefaultsProvider::new();
        provider
            .expect_defaults()
            .withf(|template| template == "views.index")
            .times(1)
            .returning(|_| Ok(ViewData::new()));

        let resolver = ViewDataResolver::new(Arc::new(provider));
        resolver.resolve_root("views.index", &ViewData::new()).unwrap();
    }

    #[test]
    fn test_provider_failure_is_surfaced() {
        let mut provider = MockDefaultsProvider::new();
        provider
            .expect_defaults()
            .returning(|_| Err(anyhow::anyhow!("database down")));

        let resolver = ViewDataResolver::new(Arc::new(provider));
        let err = resolver.resolve_root("views.index", &ViewData::new()).unwrap_err();
        match err {
            BladeError::Collaborator { function, source } => {
                assert_eq!(function, "defaults");
                assert_eq!(source.to_string(), "database down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_composers_match_exact_and_prefix() {
        let composers = ViewComposers::new()
            .when(["views.index"], |_| data(json!({"hero": true, "n": 1})))
            .when(["*"], |_| data(json!({"n": 2})));

        let index = composers.defaults("views.index").unwrap();
        assert_eq!(Value::Object(index), json!({"hero": true, "n": 2}));

        let other = composers.defaults("views.single").unwrap();
        assert_eq!(Value::Object(other), json!({"n": 2}));
        assert_eq!(composers.len(), 2);
    }

    #[test]
    fn test_composer_receives_template_name() {
        let composers =
            ViewComposers::new().when(["partials.*"], |name| data(json!({"name": name})));
        let got = composers.defaults("partials.nav.primary").unwrap();
        assert_eq!(got["name"], json!("partials.nav.primary"));
    }

    #[test]
    fn test_data_from_value() {
        assert!(data_from_value(json!([])).unwrap().is_empty());
        assert!(data_from_value(Value::Null).unwrap().is_empty());
        assert_eq!(data_from_value(json!({"a": 1})).unwrap()["a"], json!(1));
        assert!(data_from_value(json!([1])).is_none());
        assert!(data_from_value(json!("x")).is_none());
    }
}
