//! Template engine module
//!
//! Two flavours share one type: a plain text engine and an HTML engine that
//! auto-escapes every interpolated value. A template source starting with
//! `tmpl://` names a registered template instead of being parsed inline.

use std::path::Path;

use minijinja::{path_loader, AutoEscape, Environment, Error};
use serde::Serialize;

use super::funcs;

/// Prefix addressing a registered template, e.g. `tmpl://users.html`
pub const NAMED_TEMPLATE_PREFIX: &str = "tmpl://";

#[derive(Debug)]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Engine for `text/plain` output, no escaping
    pub fn text() -> Self {
        Self::with_escape(AutoEscape::None)
    }

    /// Engine for `text/html` output, values are HTML-escaped
    pub fn html() -> Self {
        Self::with_escape(AutoEscape::Html)
    }

    fn with_escape(escape: AutoEscape) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(move |_| escape.clone());
        funcs::register(&mut env);
        Self { env }
    }

    /// Register a named template, addressable as `tmpl://<name>`
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), Error> {
        self.env.add_template_owned(name.into(), source.into())
    }

    /// Resolve named templates not registered explicitly from files under `dir`
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) {
        self.env.set_loader(path_loader(dir));
    }

    /// Direct access for registering extra functions, filters or globals
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    /// Render `source` against `value`
    pub fn render<T: Serialize + ?Sized>(&self, source: &str, value: &T) -> Result<String, Error> {
        match source.strip_prefix(NAMED_TEMPLATE_PREFIX) {
            Some(name) => self.env.get_template(name)?.render(value),
            None => self.env.render_str(source, value),
        }
    }
}
