//! Allow-list presets.
//!
//! `GLOBAL` holds the attributes valid on any element. Each tag preset lists
//! its element-specific attributes followed by every `GLOBAL` name.

/// Attributes accepted on any element.
pub const GLOBAL: &[&str] = &[
    "class",
    "hidden",
    "id",
    "lang",
    "style",
    "tabindex",
    "title",
    "translate",
];

/// `<a>` attributes.
pub const A: &[&str] = &[
    "download", "href", "hreflang", "rel", "target", // anchor
    "class", "hidden", "id", "lang", "style", "tabindex", "title", "translate",
];

/// `<audio>` attributes.
pub const AUDIO: &[&str] = &[
    "autoplay", "controls", "loop", "muted", "preload", "src", // audio
    "class", "hidden", "id", "lang", "style", "tabindex", "title", "translate",
];

/// `<button>` attributes.
pub const BUTTON: &[&str] = &[
    "autofocus", "disabled", "name", "type", "value", // button
    "class", "hidden", "id", "lang", "style", "tabindex", "title", "translate",
];

/// `<img>` attributes.
pub const IMG: &[&str] = &[
    "alt", "width", "height", "loading", "src", "srcset", // image
    "class", "hidden", "id", "lang", "style", "tabindex", "title", "translate",
];

/// `<video>` attributes.
pub const VIDEO: &[&str] = &[
    "autoplay", "width", "height", "controls", "loop", "muted", "poster", "preload", "src", // video
    "class", "hidden", "id", "lang", "style", "tabindex", "title", "translate",
];

/// Every preset key, in declaration order.
pub const PRESET_NAMES: &[&str] = &["GLOBAL", "A", "AUDIO", "BUTTON", "IMG", "VIDEO"];

/// Look up a preset by key. Keys are case-sensitive.
pub fn preset(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "GLOBAL" => Some(GLOBAL),
        "A" => Some(A),
        "AUDIO" => Some(AUDIO),
        "BUTTON" => Some(BUTTON),
        "IMG" => Some(IMG),
        "VIDEO" => Some(VIDEO),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_resolves() {
        for key in PRESET_NAMES {
            assert!(preset(key).is_some(), "missing preset {key}");
        }
    }

    #[test]
    fn test_tag_presets_extend_global() {
        for key in PRESET_NAMES {
            let names = preset(key).unwrap();
            for global in GLOBAL {
                assert!(names.contains(global), "{key} lacks {global}");
            }
        }
    }

    #[test]
    fn test_tag_presets_have_no_duplicates() {
        for key in PRESET_NAMES {
            let names = preset(key).unwrap();
            for (i, name) in names.iter().enumerate() {
                assert!(!names[i + 1..].contains(name), "{key} repeats {name}");
            }
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(preset("button").is_none());
        assert!(preset("Global").is_none());
        assert!(preset("").is_none());
    }
}
