//! Shared Tera environment: include templates plus registered filters.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tera::{Filter, Template, Tera, Value};

use crate::loader::{FileSystemLoader, LoaderError};

/// A filter stored once and registered into every rebuilt [`Tera`].
#[derive(Clone)]
struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.filter(value, args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

/// The engine configuration every page template compiles against.
///
/// Holds the include loader, the filter registry and the Tera instance built
/// from them. Evicting an include marks the environment stale; the next
/// [`refresh`](Self::refresh) rebuilds the Tera instance from the loader.
///
/// An include that cannot be built (syntax error, missing parent or macro
/// file) is replaced by a stand-in that raises the build error when rendered.
/// Pages that use it fail; every other page keeps rendering.
pub struct Environment {
    loader: FileSystemLoader,
    filters: Vec<(String, SharedFilter)>,
    autoescape: bool,
    tera: Tera,
    stale: bool,
    broken: Vec<String>,
}

impl Environment {
    pub fn new(loader: FileSystemLoader) -> Self {
        Self {
            loader,
            filters: Vec::new(),
            autoescape: true,
            tera: blank_tera(true),
            stale: true,
            broken: Vec::new(),
        }
    }

    /// Enable or disable Tera's suffix-based autoescaping (`.html`, `.htm`, `.xml`).
    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self.tera = blank_tera(autoescape);
        self.stale = true;
        self
    }

    pub fn loader(&self) -> &FileSystemLoader {
        &self.loader
    }

    /// The current Tera instance. Call [`refresh`](Self::refresh) first to pick
    /// up evicted includes.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Force a rebuild on the next refresh, e.g. after an include was created.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Evict an include from the loader cache. The local template cache is not
    /// involved.
    pub fn evict_include(&mut self, name: &str) -> bool {
        self.stale = true;
        self.loader.evict(name)
    }

    /// Register a filter under `name`, replacing any earlier one.
    pub fn register_filter<F: Filter + 'static>(&mut self, name: &str, filter: F) {
        let shared = SharedFilter(Arc::new(filter));
        self.tera.register_filter(name, shared.clone());
        match self.filters.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = shared,
            None => self.filters.push((name.to_string(), shared)),
        }
        tracing::debug!(filter = name, "Registered template filter");
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(n, _)| n.as_str())
    }

    /// Includes that failed to build on the last refresh, by name.
    pub fn broken_includes(&self) -> &[String] {
        &self.broken
    }

    /// Rebuild the Tera instance if stale. Broken includes do not fail the
    /// rebuild. On a loader failure, or anything else Tera rejects as a whole,
    /// the previous instance is kept and the environment stays stale.
    pub fn refresh(&mut self) -> Result<(), LoaderError> {
        if !self.stale {
            return Ok(());
        }

        let sources = self.loader.load_all()?;
        let count = sources.len();
        let (sources, broken) = quarantine(sources);

        let mut tera = blank_tera(self.autoescape);
        tera.add_raw_templates(sources)
            .map_err(|source| LoaderError::Parse {
                root: self.loader.root().to_path_buf(),
                source,
            })?;
        for (name, filter) in &self.filters {
            tera.register_filter(name, filter.clone());
        }

        self.tera = tera;
        self.stale = false;
        self.broken = broken;
        tracing::debug!(includes = count, root = ?self.loader.root(), "Refreshed template environment");
        Ok(())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("loader", &self.loader)
            .field("filters", &self.filter_names().collect::<Vec<_>>())
            .field("autoescape", &self.autoescape)
            .field("stale", &self.stale)
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

/// Swap every include Tera would reject for a stand-in that throws the
/// rejection at render time. Returns the sources to load and the swapped names.
fn quarantine(sources: Vec<(String, String)>) -> (Vec<(String, String)>, Vec<String>) {
    let mut parsed = Vec::with_capacity(sources.len());
    let mut failed = Vec::new();
    for (name, source) in sources {
        match Template::new(&name, None, &source) {
            Ok(template) => parsed.push((name, source, template)),
            Err(e) => {
                let message = format!("Failed to parse include '{}': {}", name, e);
                failed.push((name, message));
            }
        }
    }

    // Parents and macro files are checked against every known name. Broken
    // ones still count since their stand-in takes the name.
    let known: HashSet<String> = parsed
        .iter()
        .map(|(name, ..)| name.clone())
        .chain(failed.iter().map(|(name, _)| name.clone()))
        .collect();

    let mut loaded = Vec::with_capacity(known.len());
    for (name, source, template) in parsed {
        let missing = template
            .parent
            .iter()
            .chain(template.imported_macro_files.iter().map(|(file, _)| file))
            .find(|dep| !known.contains(dep.as_str()));
        match missing {
            Some(dep) => {
                let message = format!("Include '{}' depends on '{}', which does not exist", name, dep);
                failed.push((name, message));
            }
            None => loaded.push((name, source)),
        }
    }

    let mut broken = Vec::with_capacity(failed.len());
    for (name, message) in failed {
        tracing::warn!(include = %name, error = %message, "Include cannot be built");
        loaded.push((name.clone(), stand_in(&message)));
        broken.push(name);
    }
    broken.sort();
    (loaded, broken)
}

fn stand_in(message: &str) -> String {
    // Backquoted Tera strings have no escapes, so backquotes cannot appear inside
    format!("{{{{ throw(message=`{}`) }}}}", message.replace('`', "'"))
}

fn blank_tera(autoescape: bool) -> Tera {
    let mut tera = Tera::default();
    if !autoescape {
        tera.autoescape_on(vec![]);
    }
    tera
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tera::Context;

    fn setup() -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("greeting.html"), "Hello {{ name | shout }}").unwrap();
        let env = Environment::new(FileSystemLoader::new(dir.path()));
        (dir, env)
    }

    fn shout(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Ok(Value::String(value.as_str().unwrap_or_default().to_uppercase()))
    }

    fn error_chain(err: &dyn std::error::Error) -> String {
        let mut out = err.to_string();
        let mut next = err.source();
        while let Some(e) = next {
            out.push_str(": ");
            out.push_str(&e.to_string());
            next = e.source();
        }
        out
    }

    fn render(env: &Environment, name: &str) -> String {
        let mut context = Context::new();
        context.insert("name", "ada");
        env.tera().render(name, &context).unwrap()
    }

    #[test]
    fn test_refresh_loads_includes_and_filters() {
        let (_dir, mut env) = setup();
        env.register_filter("shout", shout);
        assert!(env.is_stale());

        env.refresh().unwrap();
        assert!(!env.is_stale());
        assert_eq!(render(&env, "greeting.html"), "Hello ADA");
    }

    #[test]
    fn test_evicted_include_reloaded_on_refresh() {
        let (dir, mut env) = setup();
        env.register_filter("shout", shout);
        env.refresh().unwrap();

        fs::write(dir.path().join("greeting.html"), "Bye {{ name }}").unwrap();
        env.refresh().unwrap();
        assert_eq!(render(&env, "greeting.html"), "Hello ADA");

        assert!(env.evict_include("greeting.html"));
        assert!(env.is_stale());
        env.refresh().unwrap();
        assert_eq!(render(&env, "greeting.html"), "Bye ada");
    }

    #[test]
    fn test_filter_registered_after_refresh_is_live() {
        let (_dir, mut env) = setup();
        env.refresh().unwrap();
        env.register_filter("shout", shout);
        assert_eq!(render(&env, "greeting.html"), "Hello ADA");
    }

    #[test]
    fn test_reregistering_filter_replaces_it() {
        let (_dir, mut env) = setup();
        env.register_filter("shout", shout);
        env.register_filter("shout", |v: &Value, _: &HashMap<String, Value>| {
            Ok::<_, tera::Error>(v.clone())
        });
        env.refresh().unwrap();
        assert_eq!(env.filter_names().collect::<Vec<_>>(), vec!["shout"]);
        assert_eq!(render(&env, "greeting.html"), "Hello ada");
    }

    #[test]
    fn test_broken_include_only_breaks_itself() {
        let (dir, mut env) = setup();
        env.register_filter("shout", shout);
        fs::write(dir.path().join("plain.html"), "plain {{ name }}").unwrap();
        env.refresh().unwrap();

        fs::write(dir.path().join("greeting.html"), "{% if %}").unwrap();
        env.evict_include("greeting.html");
        env.refresh().unwrap();

        assert!(!env.is_stale());
        assert_eq!(env.broken_includes(), ["greeting.html".to_string()]);
        assert_eq!(render(&env, "plain.html"), "plain ada");

        let err = env.tera().render("greeting.html", &Context::new()).unwrap_err();
        assert!(error_chain(&err).contains("Failed to parse include 'greeting.html'"));
    }

    #[test]
    fn test_include_with_missing_parent_is_broken() {
        let (dir, mut env) = setup();
        fs::write(dir.path().join("child.html"), r#"{% extends "gone.html" %}"#).unwrap();
        env.register_filter("shout", shout);
        env.refresh().unwrap();

        assert_eq!(env.broken_includes(), ["child.html".to_string()]);
        assert_eq!(render(&env, "greeting.html"), "Hello ADA");
        assert!(env.tera().render("child.html", &Context::new()).is_err());
    }

    #[test]
    fn test_fixed_include_clears_broken_list() {
        let (dir, mut env) = setup();
        env.register_filter("shout", shout);
        fs::write(dir.path().join("greeting.html"), "{% if %}").unwrap();
        env.refresh().unwrap();
        assert_eq!(env.broken_includes().len(), 1);

        fs::write(dir.path().join("greeting.html"), "Hi {{ name | shout }}").unwrap();
        env.evict_include("greeting.html");
        env.refresh().unwrap();
        assert!(env.broken_includes().is_empty());
        assert_eq!(render(&env, "greeting.html"), "Hi ADA");
    }
}
