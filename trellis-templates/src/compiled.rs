//! A page template compiled against the shared environment.

use std::sync::Arc;

use tera::{Context, Tera};

/// A compiled page template, reusable across renders with different data.
///
/// Compilation parses the source into a copy of the environment so that
/// inheritance (`{% extends %}`) is checked up front. At render time the
/// *current* environment is extended with the compiled set, so includes that
/// were reloaded since compilation take precedence over the copies taken here.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    name: String,
    templates: Arc<Tera>,
}

impl CompiledTemplate {
    /// Compile `content` under `name` against `env`.
    pub fn compile(content: &str, env: &Tera, name: &str) -> Result<Self, CompileError> {
        let mut templates = env.clone();
        templates
            .add_raw_template(name, content)
            .map_err(|source| CompileError {
                template: name.to_string(),
                source,
            })?;

        Ok(Self {
            name: name.to_string(),
            templates: Arc::new(templates),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render on Tokio's blocking pool and report through `callback`.
    ///
    /// Returns immediately. `callback` runs exactly once on the worker thread,
    /// unless the worker panics, in which case it is dropped uncalled.
    /// Must be called from within a Tokio runtime.
    pub fn render<F>(&self, mut env: Tera, context: Context, callback: F)
    where
        F: FnOnce(tera::Result<String>) + Send + 'static,
    {
        let compiled = self.clone();
        tokio::task::spawn_blocking(move || {
            let result = env
                .extend(&compiled.templates)
                .and_then(|()| env.render(&compiled.name, &context));
            callback(result);
        });
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to compile template '{template}': {source}")]
pub struct CompileError {
    pub template: String,
    pub source: tera::Error,
}
