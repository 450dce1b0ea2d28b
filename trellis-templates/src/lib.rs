//! Compiled-template cache for static-site generation.
//!
//! [`TemplateCache`] compiles page templates once per filename on top of a
//! shared Tera [`Environment`], runs them off the async executor and hands the
//! result back as a future. Change notifications from the site pipeline evict
//! whichever cache holds the changed file: include templates live in the
//! [`FileSystemLoader`] under their logical names, page templates live in the
//! cache under their absolute paths.
//!
//! # Modules
//!
//! - [`cache`]: the filename-keyed template cache and render bridge
//! - [`compiled`]: a single compiled template and its callback-based render
//! - [`environment`]: shared Tera environment with filter registry
//! - [`loader`]: file-system include loader with its own source cache
//! - [`filters`]: the `attr` filter and the async filter adapter
//! - [`site`]: site path resolution and change events
//! - [`config`]: `trellis.toml` configuration

pub mod cache;
pub mod compiled;
pub mod config;
pub mod environment;
pub mod filters;
pub mod loader;
pub mod site;

pub use cache::{RenderError, RenderFuture, TemplateCache};
pub use compiled::{CompileError, CompiledTemplate};
pub use config::{Config, ConfigError, SiteConfig, TemplatesConfig};
pub use environment::Environment;
pub use filters::{AsyncFilter, AttrFilter, FilterError};
pub use loader::{FileSystemLoader, LoaderError};
pub use site::{ChangeEvent, SiteRoot, SiteSource};

/// Re-exported so filter authors don't need a direct Tera dependency.
pub use tera::{Filter, Value};
