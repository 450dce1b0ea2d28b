//! Filename-keyed compiled-template cache with change-driven invalidation.
//!
//! Entry lifecycle: absent → (first render) → compiled → (change notification
//! naming the file) → absent. A render while compiled never recompiles, even
//! when the content passed in differs: the key is the filename, not the content.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tera::{Context, Filter, Value};
use tokio::sync::oneshot;

use crate::compiled::{CompileError, CompiledTemplate};
use crate::config::{Config, TemplatesConfig};
use crate::environment::Environment;
use crate::filters::{AsyncFilter, AttrFilter, BoxError};
use crate::loader::FileSystemLoader;
use crate::site::{ChangeEvent, SiteRoot, SiteSource};

/// Pending render. Owns everything it needs, so renders of different files
/// can be spawned as independent tasks.
pub type RenderFuture = BoxFuture<'static, Result<String, RenderError>>;

/// Compiled-template cache over a shared Tera environment.
#[derive(Debug)]
pub struct TemplateCache {
    site: Arc<dyn SiteSource>,
    env: Environment,
    compiled: HashMap<PathBuf, CompiledTemplate>,
}

impl TemplateCache {
    /// Build a cache for `site`, loading includes from `config.includes`.
    ///
    /// Never fails: broken includes only fail the pages that use them, and an
    /// unreadable includes directory is retried on the next render.
    pub fn new(site: impl SiteSource + 'static, config: &TemplatesConfig) -> Self {
        let site: Arc<dyn SiteSource> = Arc::new(site);
        let loader = FileSystemLoader::new(site.src(&config.includes));
        let mut env = Environment::new(loader).with_autoescape(config.autoescape);

        if !config.attr_filter.is_empty() {
            env.register_filter(&config.attr_filter, AttrFilter);
        }
        if let Err(e) = env.refresh() {
            tracing::warn!(error = %e, "Failed to load includes, retrying on next render");
        }

        tracing::debug!(
            includes = ?env.loader().root(),
            filters = ?env.filter_names().collect::<Vec<_>>(),
            "Template cache ready"
        );

        Self {
            site,
            env,
            compiled: HashMap::new(),
        }
    }

    /// Build a cache from a loaded [`Config`], rooted at `config.site.root`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(SiteRoot::new(&config.site.root), &config.templates)
    }

    /// Render `content` as the template `filename` with `data` as context.
    ///
    /// The template is compiled on the first call for `filename` and reused
    /// afterwards until [`invalidate`](Self::invalidate) names the file.
    /// Compilation errors are returned here; everything that goes wrong while
    /// rendering is reported by the returned future.
    ///
    /// The future must be polled inside a Tokio runtime.
    pub fn render<T>(
        &mut self,
        content: &str,
        data: &T,
        filename: impl AsRef<Path>,
    ) -> Result<RenderFuture, CompileError>
    where
        T: Serialize + ?Sized,
    {
        let filename = filename.as_ref();

        // The last good environment stays in use until a refresh succeeds
        if let Err(e) = self.env.refresh() {
            tracing::warn!(error = %e, "Failed to refresh template environment");
        }

        let compiled = match self.compiled.get(filename) {
            Some(compiled) => {
                tracing::trace!(?filename, "Template cache hit");
                compiled.clone()
            }
            None => {
                let name = filename.to_string_lossy();
                let compiled = CompiledTemplate::compile(content, self.env.tera(), &name)?;
                tracing::debug!(?filename, "Compiled template");
                self.compiled.insert(filename.to_path_buf(), compiled.clone());
                compiled
            }
        };

        let env = self.env.tera().clone();
        let context = Context::from_serialize(data);
        let template = compiled.name().to_string();

        Ok(Box::pin(async move {
            let context = context.map_err(|source| RenderError::Context {
                template: template.clone(),
                source,
            })?;

            let (tx, rx) = oneshot::channel();
            compiled.render(env, context, move |result| {
                // Receiver gone means the caller dropped the future
                let _ = tx.send(result);
            });

            match rx.await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(source)) => Err(RenderError::Template { template, source }),
                Err(_) => Err(RenderError::Aborted { template }),
            }
        }))
    }

    /// Evict whatever cache holds each changed file.
    ///
    /// Paths are site-relative. A file the include loader knows is evicted from
    /// the loader's cache under its logical name and the compiled templates are
    /// left alone; any other file is evicted from the compiled-template cache
    /// under its absolute path.
    pub fn invalidate<I>(&mut self, files: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for file in files {
            let filename = self.site.src(file.as_ref());

            if let Some(name) = self.env.loader().name_for(&filename).map(str::to_string) {
                self.env.evict_include(&name);
                continue;
            }

            if self.compiled.remove(&filename).is_some() {
                tracing::debug!(?filename, "Evicted compiled template");
            }

            // New include files are only discovered by a rescan
            if self.env.loader().covers(&filename) {
                self.env.mark_stale();
            }
        }
    }

    /// Apply a change notification from the site pipeline.
    pub fn handle_event(&mut self, event: &ChangeEvent) {
        self.invalidate(&event.files);
    }

    /// Register a synchronous filter; its return value is the output.
    pub fn add_filter<F: Filter + 'static>(&mut self, name: &str, filter: F) {
        self.env.register_filter(name, filter);
    }

    /// Register an async filter through [`AsyncFilter`].
    pub fn add_async_filter<F, Fut, E>(&mut self, name: &str, func: F)
    where
        F: Fn(Value, HashMap<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.env.register_filter(name, AsyncFilter::new(name, func));
    }

    /// Whether a compiled template is cached for `filename`.
    pub fn contains(&self, filename: impl AsRef<Path>) -> bool {
        self.compiled.contains_key(filename.as_ref())
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Drop every compiled template. Include sources are kept.
    pub fn clear(&mut self) {
        self.compiled.clear();
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn site(&self) -> &dyn SiteSource {
        self.site.as_ref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid render data for '{template}': {source}")]
    Context {
        template: String,
        source: tera::Error,
    },
    #[error("failed to render '{template}': {source}")]
    Template {
        template: String,
        source: tera::Error,
    },
    #[error("render of '{template}' stopped before completing")]
    Aborted { template: String },
}
