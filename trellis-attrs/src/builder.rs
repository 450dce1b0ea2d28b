//! Normalization of attribute inputs and serialization to HTML.

use crate::escape::escape;
use crate::presets::preset;
use crate::value::AttrValue;

/// Attributes whose value is the union of tokens from every source.
pub const MULTI_VALUE_ATTRIBUTES: &[&str] = &["class"];

/// Attribute names a builder call accepts. Empty means every name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowList {
    names: Vec<String>,
}

impl AllowList {
    /// Resolve name tokens into an allow-list.
    ///
    /// A single token naming a preset expands to that preset; anything else is
    /// taken literally.
    pub fn resolve<S: AsRef<str>>(tokens: &[S]) -> Self {
        if let [only] = tokens {
            if let Some(names) = preset(only.as_ref()) {
                return Self::from_names(names.iter().copied());
            }
        }
        Self::from_names(tokens.iter().map(AsRef::as_ref))
    }

    fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            names: names.into_iter().map(str::to_string).collect(),
        }
    }

    /// Whether every name is accepted.
    pub fn is_unrestricted(&self) -> bool {
        self.names.is_empty()
    }

    /// Check a name. The empty name is never allowed.
    pub fn allows(&self, name: &str) -> bool {
        !name.is_empty() && (self.names.is_empty() || self.names.iter().any(|n| n == name))
    }

    /// The accepted names, after preset expansion.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Value(AttrValue),
    Tokens(Vec<String>),
}

/// Ordered attribute accumulator for a single builder call.
///
/// Keeps first-insertion order; overwriting a name keeps its position.
#[derive(Debug, Default)]
pub struct AttributeMap {
    allow: AllowList,
    entries: Vec<(String, Entry)>,
}

impl AttributeMap {
    pub fn new(allow: AllowList) -> Self {
        Self {
            allow,
            entries: Vec::new(),
        }
    }

    /// Fold one input value into the map.
    pub fn push(&mut self, value: &AttrValue) {
        match value {
            AttrValue::Str(name) => {
                if self.allow.allows(name) {
                    self.set(name, Entry::Value(AttrValue::Bool(true)));
                }
            }
            AttrValue::List(items) => {
                for item in items {
                    self.push(item);
                }
            }
            AttrValue::Map(pairs) => {
                for (key, value) in pairs {
                    if !self.allow.allows(key) {
                        continue;
                    }
                    if MULTI_VALUE_ATTRIBUTES.contains(&key.as_str()) {
                        self.merge_tokens(key, value);
                    } else {
                        self.set(key, Entry::Value(value.clone()));
                    }
                }
            }
            AttrValue::Null | AttrValue::Bool(_) | AttrValue::Number(_) => {}
        }
    }

    fn set(&mut self, name: &str, entry: Entry) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((name.to_string(), entry)),
        }
    }

    fn merge_tokens(&mut self, name: &str, value: &AttrValue) {
        match value {
            AttrValue::Str(token) => self.add_token(name, token),
            AttrValue::List(items) => {
                for item in items {
                    self.merge_tokens(name, item);
                }
            }
            AttrValue::Map(flags) => {
                for (token, flag) in flags {
                    if flag.is_truthy() {
                        self.add_token(name, token);
                    }
                }
            }
            AttrValue::Null | AttrValue::Bool(_) | AttrValue::Number(_) => {}
        }
    }

    fn add_token(&mut self, name: &str, token: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, Entry::Tokens(tokens))) => {
                if !tokens.iter().any(|t| t == token) {
                    tokens.push(token.to_string());
                }
            }
            // A bare `class` flag set earlier is replaced by a token list in place
            Some((_, slot)) => *slot = Entry::Tokens(vec![token.to_string()]),
            None => self
                .entries
                .push((name.to_string(), Entry::Tokens(vec![token.to_string()]))),
        }
    }

    /// Number of accumulated entries, including ones that will render empty.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been accumulated yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to an attribute string.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.entries.len());
        for (name, entry) in &self.entries {
            match entry {
                Entry::Tokens(tokens) => {
                    if !tokens.is_empty() {
                        parts.push(format!("{name}=\"{}\"", escape(&tokens.join(" "))));
                    }
                }
                Entry::Value(AttrValue::Null | AttrValue::Bool(false)) => {}
                Entry::Value(AttrValue::Bool(true)) => parts.push(name.clone()),
                Entry::Value(value) => {
                    // Lists and maps have no text form and are dropped
                    if let Some(text) = value.as_text() {
                        parts.push(format!("{name}=\"{}\"", escape(&text)));
                    }
                }
            }
        }
        parts.join(" ")
    }
}

/// Build an HTML attribute string from `value`, restricted by `names`.
///
/// `names` is either a single preset key (`"GLOBAL"`, `"A"`, `"AUDIO"`,
/// `"BUTTON"`, `"IMG"`, `"VIDEO"`) or a literal list of accepted attribute
/// names; an empty slice accepts everything.
pub fn attributes<S: AsRef<str>>(value: &AttrValue, names: &[S]) -> String {
    let mut map = AttributeMap::new(AllowList::resolve(names));
    map.push(value);
    map.render()
}
