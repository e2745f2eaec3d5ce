//! Per-render state
//!
//! Every root render creates a [`RenderSession`] and hands it to the
//! template under a reserved variable. The runtime functions find it there,
//! so a root render and all of its child renders share one loop stack and
//! one current-item binding, while concurrent root renders share neither.
//!
//! Host calls see the session through a [`RenderContext`], which lives for
//! one runtime function call. No lock is held while the host runs, so a
//! host may render partials of its own.

use minijinja::value::{Object, ObjectRepr, Value as TemplateValue};
use minijinja::{Error, ErrorKind, State, Template};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::loop_stack::{Checkpoint, LoopKind, LoopMetadata, LoopStack};
use super::value::{is_data, to_json, to_template};
use crate::error::{BladeError, Result};
use crate::host::ThemeHost;
use crate::view::{ViewData, ViewDataResolver};

/// Variable carrying the session into every template of a render
pub(crate) const SESSION: &str = "__snap_render";

/// Deepest allowed chain of partials rendering partials
pub const MAX_RENDER_DEPTH: usize = 32;

#[derive(Debug)]
struct SessionState {
    loops: LoopStack,
    current_item: Value,
    failure: Option<BladeError>,
    depth: usize,
}

/// State of one root render and the child renders it triggers
pub(crate) struct RenderSession {
    host: Arc<dyn ThemeHost>,
    resolver: ViewDataResolver,
    current_view: Option<String>,
    base_item: Value,
    state: Mutex<SessionState>,
}

impl fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSession")
            .field("current_view", &self.current_view)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Object for RenderSession {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }
}

impl RenderSession {
    pub(crate) fn new(
        host: Arc<dyn ThemeHost>,
        resolver: ViewDataResolver,
        current_view: Option<String>,
    ) -> Self {
        let base_item = host.current_post();
        Self {
            host,
            resolver,
            current_view,
            state: Mutex::new(SessionState {
                loops: LoopStack::new(),
                current_item: base_item.clone(),
                failure: None,
                depth: 0,
            }),
            base_item,
        }
    }

    /// Keep the first failure of the render and turn it into a template error
    ///
    /// The template engine only carries its own error type, so the original
    /// error waits here until the render returns.
    fn fail(&self, error: BladeError) -> Error {
        let template_error = Error::new(ErrorKind::InvalidOperation, error.to_string());
        let mut state = self.state.lock();
        if state.failure.is_none() {
            state.failure = Some(error);
        }
        template_error
    }

    fn take_failure(&self) -> Option<BladeError> {
        self.state.lock().failure.take()
    }

    fn enter(&self, template: &str) -> Result<Checkpoint> {
        let mut state = self.state.lock();
        if state.depth >= MAX_RENDER_DEPTH {
            return Err(BladeError::eval(
                template,
                0,
                format!("partials nested more than {MAX_RENDER_DEPTH} deep"),
            ));
        }
        state.depth += 1;
        Ok(state.loops.checkpoint())
    }

    fn leave(&self, mark: Checkpoint, result: Result<String>) -> Result<String> {
        let mut state = self.state.lock();
        state.depth -= 1;
        match result {
            Ok(output) => {
                state.loops.verify(mark)?;
                Ok(output)
            }
            Err(e) => {
                state.loops.unwind(mark);
                Err(e)
            }
        }
    }
}

/// Template context for `data` plus the session handle
fn context(data: &ViewData, session: &TemplateValue) -> TemplateValue {
    data.iter()
        .map(|(key, value)| (key.clone(), to_template(value)))
        .chain(std::iter::once((SESSION.to_string(), session.clone())))
        .collect()
}

/// Run a root render of `template` with a fresh session
///
/// The loop stack must be empty again when the template finishes.
pub(crate) fn render_root(
    template: &Template<'_, '_>,
    session: RenderSession,
    data: &ViewData,
) -> Result<String> {
    let name = template.name().to_string();
    let handle = TemplateValue::from_object(session);
    let Some(session) = handle.downcast_object::<RenderSession>() else {
        return Err(BladeError::NoActiveRender(name));
    };

    match template.render(context(data, &handle)) {
        Ok(output) => {
            session.state.lock().loops.verify(LoopStack::new().checkpoint())?;
            Ok(output)
        }
        Err(e) => Err(session
            .take_failure()
            .unwrap_or_else(|| BladeError::from_template(&e, &name))),
    }
}

/// What the executing template exposes to the runtime
pub(crate) trait Scope {
    /// Name of the executing template
    fn template(&self) -> &str;
    /// Current value of `name`
    fn variable(&self, name: &str) -> Option<TemplateValue>;
    /// Every visible data variable, for a child render to inherit
    fn variables(&self) -> ViewData;
    /// Render another template of the same environment
    fn render_template(&self, name: &str, context: TemplateValue) -> Result<String, Error>;
}

impl Scope for State<'_, '_> {
    fn template(&self) -> &str {
        self.name()
    }

    fn variable(&self, name: &str) -> Option<TemplateValue> {
        self.lookup(name)
    }

    fn variables(&self) -> ViewData {
        let mut variables = ViewData::new();
        for name in self.known_variables() {
            let name: &str = &name;
            // the engine's own loop object and runtime plumbing stay behind
            if name == "loop" || name.starts_with("__") {
                continue;
            }
            if let Some(value) = self.lookup(name).filter(is_data) {
                variables.insert(name.to_string(), to_json(&value));
            }
        }
        variables
    }

    fn render_template(&self, name: &str, context: TemplateValue) -> Result<String, Error> {
        self.env().get_template(name)?.render(context)
    }
}

/// View of the active render handed to [`ThemeHost`] methods
pub struct RenderContext<'a> {
    session: Arc<RenderSession>,
    handle: TemplateValue,
    scope: &'a (dyn Scope + 'a),
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("template", &self.template())
            .field("session", &self.session)
            .finish()
    }
}

impl<'a> RenderContext<'a> {
    /// Context of the render `state` belongs to
    pub(crate) fn from_state(state: &'a State<'_, '_>) -> Result<Self, Error> {
        let Some((handle, session)) = state.lookup(SESSION).and_then(|handle| {
            let session = handle.downcast_object::<RenderSession>()?;
            Some((handle, session))
        }) else {
            let error = BladeError::NoActiveRender(state.name().to_string());
            return Err(Error::new(ErrorKind::InvalidOperation, error.to_string()).with_source(error));
        };
        Ok(Self {
            session,
            handle,
            scope: state,
        })
    }

    /// Site collaborator of this render
    #[must_use]
    pub fn host(&self) -> &dyn ThemeHost {
        self.session.host.as_ref()
    }

    /// Item bound by the innermost `@loop` or `@setpostdata`
    #[must_use]
    pub fn current_item(&self) -> Value {
        self.session.state.lock().current_item.clone()
    }

    /// View named by [`BladeEngine::render_view`](crate::engine::BladeEngine::render_view),
    /// if this render is one
    #[must_use]
    pub fn current_view(&self) -> Option<&str> {
        self.session.current_view.as_deref()
    }

    /// Template currently executing
    #[must_use]
    pub fn template(&self) -> &str {
        self.scope.template()
    }

    /// Metadata of the innermost open loop
    #[must_use]
    pub fn loop_metadata(&self) -> Option<LoopMetadata> {
        self.session.state.lock().loops.top_metadata()
    }

    /// Number of open loops across all active templates
    #[must_use]
    pub fn loop_depth(&self) -> usize {
        self.session.state.lock().loops.depth()
    }

    /// Value of `name` as seen by the executing template
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.scope
            .variable(name)
            .filter(is_data)
            .map(|value| to_json(&value))
    }

    /// Render `name` as a child of the executing template
    ///
    /// The child sees a copy of the caller's variables, overlaid with the
    /// child's defaults and then `data`. Loops opened by the child must be
    /// closed by it.
    ///
    /// # Errors
    ///
    /// Any error from resolving the child's data or rendering it, and
    /// [`BladeError::LoopStack`] if the child leaves a loop open.
    pub fn render_child(&self, name: &str, data: &ViewData) -> Result<String> {
        let inherited = self.scope.variables();
        let merged = self.session.resolver.resolve_child(name, &inherited, data)?;

        let mark = self.session.enter(name)?;
        tracing::debug!(template = name, caller = self.template(), "child render");
        let result = self
            .scope
            .render_template(name, context(&merged, &self.handle))
            .map_err(|e| {
                self.session
                    .take_failure()
                    .unwrap_or_else(|| BladeError::from_template(&e, name))
            });
        self.session.leave(mark, result)
    }

    /// Record `error` as the render's failure
    pub(crate) fn fail(&self, error: BladeError) -> Error {
        self.session.fail(error)
    }

    /// Unwrap a host answer, recording a failure against `function`
    pub(crate) fn collaborator<T>(&self, function: &str, result: anyhow::Result<T>) -> Result<T, Error> {
        result.map_err(|e| self.fail(BladeError::collaborator(function, e)))
    }

    /// Open a loop over `items`, saving the current item
    pub(crate) fn push_loop(&self, kind: LoopKind, items: Vec<Value>) -> Vec<Value> {
        let mut guard = self.session.state.lock();
        let state = &mut *guard;
        let restore = state.current_item.clone();
        state.loops.push(kind, items, restore).items().to_vec()
    }

    /// Step the innermost loop onto `item`
    pub(crate) fn next_loop(&self, kind: LoopKind, item: Value) -> Result<LoopMetadata> {
        let mut state = self.session.state.lock();
        let metadata = state.loops.advance(kind)?;
        if kind.binds_current_item() {
            state.current_item = item;
        }
        Ok(metadata)
    }

    /// Close the innermost loop and return the metadata now in effect
    pub(crate) fn pop_loop(&self, kind: LoopKind) -> Result<Option<LoopMetadata>> {
        let mut state = self.session.state.lock();
        let frame = state.loops.pop(kind)?;
        if kind.binds_current_item() {
            state.current_item = frame.restore_item().clone();
        }
        Ok(state.loops.top_metadata())
    }

    pub(crate) fn set_current_item(&self, item: Value) {
        self.session.state.lock().current_item = item;
    }

    pub(crate) fn reset_current_item(&self) {
        self.session.state.lock().current_item = self.session.base_item.clone();
    }
}
