//! HTML attribute string builder for templates.
//!
//! Turns heterogeneous, possibly nested attribute inputs (names,
//! lists, maps of name to value) into a validated, escaped attribute string.
//! An optional allow-list restricts which names survive; a single preset key
//! such as `BUTTON` expands to that element's attribute names.
//!
//! The builder never fails. Disallowed or malformed input is dropped.
//!
//! ```
//! use serde_json::json;
//! use trellis_attrs::{attributes, AttrValue};
//!
//! let spec = AttrValue::from(json!([{ "hidden": true }, "tabindex", "foo"]));
//! assert_eq!(attributes(&spec, &["BUTTON"]), "hidden tabindex");
//! ```
//!
//! # Modules
//!
//! - [`value`]: the tagged [`AttrValue`] input type
//! - [`presets`]: static allow-list presets (`GLOBAL`, `A`, `AUDIO`, ...)
//! - [`builder`]: normalization into an ordered attribute map and serialization
//! - [`escape`]: attribute value escaping

pub mod builder;
pub mod escape;
pub mod presets;
pub mod value;

pub use builder::{attributes, AllowList, AttributeMap, MULTI_VALUE_ATTRIBUTES};
pub use escape::escape;
pub use presets::{preset, PRESET_NAMES};
pub use value::AttrValue;
