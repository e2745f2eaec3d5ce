//! Test fixtures shared by unit tests

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::engine::BladeEngine;
use crate::host::ThemeHost;
use crate::runtime::RenderContext;
use crate::template::MemoryLoader;
use crate::view::ViewData;

/// Host with canned answers that records what templates asked for
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub query: Vec<Value>,
    pub menus: HashMap<String, Vec<Value>>,
    pub permissions: HashSet<String>,
    pub user: Option<Value>,
    pub post: Value,
    /// Collaborator that returns an error when asked
    pub failing: Option<String>,
    /// `(procedure, current item)` for every `invoke`
    pub invoked: Mutex<Vec<(String, Value)>>,
}

impl RecordingHost {
    fn fail_if(&self, function: &str) -> anyhow::Result<()> {
        if self.failing.as_deref() == Some(function) {
            anyhow::bail!("{function} unavailable");
        }
        Ok(())
    }

    pub fn invoked_names(&self) -> Vec<String> {
        self.invoked.lock().iter().map(|(name, _)| name.clone()).collect()
    }
}

impl ThemeHost for RecordingHost {
    fn current_query(&self, _ctx: &RenderContext<'_>) -> anyhow::Result<Value> {
        self.fail_if("current_query")?;
        Ok(Value::Array(self.query.clone()))
    }

    fn nav_menu(&self, _ctx: &RenderContext<'_>, menu: &Value) -> anyhow::Result<Value> {
        self.fail_if("nav_menu")?;
        let items = menu
            .as_str()
            .and_then(|name| self.menus.get(name))
            .cloned()
            .unwrap_or_default();
        Ok(Value::Array(items))
    }

    fn paginate(&self, _ctx: &RenderContext<'_>, config: &Value) -> anyhow::Result<String> {
        self.fail_if("paginate")?;
        Ok(format!("<nav>{config}</nav>"))
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
        Ok(self.user.clone().unwrap_or(Value::Null))
    }

    fn current_post(&self) -> Value {
        self.post.clone()
    }

    fn invoke(
        &self,
        ctx: &RenderContext<'_>,
        name: &str,
        args: &[Value],
    ) -> anyhow::Result<String> {
        self.fail_if(name)?;
        self.invoked
            .lock()
            .push((name.to_string(), ctx.current_item()));
        let args: Vec<String> = args.iter().map(Value::to_string).collect();
        Ok(format!("[{name}({})]", args.join(",")))
    }

    fn functions(&self) -> Vec<String> {
        vec!["upper".to_string()]
    }

    fn call(
        &self,
        _ctx: &RenderContext<'_>,
        name: &str,
        args: &[Value],
    ) -> anyhow::Result<Value> {
        match (name, args) {
            ("upper", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
            _ => anyhow::bail!("unknown function `{name}`"),
        }
    }
}

/// Three posts titled `A`, `B` and `C`
pub fn posts() -> Vec<Value> {
    ["A", "B", "C"]
        .into_iter()
        .map(|title| json!({"title": title, "post_type": "post"}))
        .collect()
}

/// Convert a JSON object literal into view data
pub fn data(value: Value) -> ViewData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Engine over in-memory `templates` and `host`
pub fn engine(templates: &[(&str, &str)], host: RecordingHost) -> (BladeEngine, Arc<RecordingHost>) {
    let loader: MemoryLoader = templates
        .iter()
        .map(|(name, source)| ((*name).to_string(), (*source).to_string()))
        .collect();
    let host = Arc::new(host);
    let engine = BladeEngine::builder()
        .loader(Arc::new(loader))
        .host(Arc::clone(&host) as Arc<dyn ThemeHost>)
        .build();
    (engine, host)
}
