//! Templating support for static-site generation.
//!
//! - [`attrs`]: HTML attribute string builder with allow-lists and tag presets
//! - [`templates`]: compiled-template cache with change-driven invalidation
//!
//! The most used types are re-exported at the crate root.

pub use trellis_attrs as attrs;
pub use trellis_templates as templates;

pub use trellis_attrs::{attributes, AttrValue};
pub use trellis_templates::{
    ChangeEvent, CompileError, Config, RenderError, SiteRoot, SiteSource, TemplateCache,
};
