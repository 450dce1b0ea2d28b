//! Template filters: the `attr` attribute builder and the async filter adapter.

use std::collections::HashMap;
use std::future::Future;

use tera::{Filter, Value};
use trellis_attrs::{attributes, AttrValue};

/// Boxed error accepted from async filter functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds an HTML attribute string from the filtered value.
///
/// ```text
/// <button {{ button | attr(allow="BUTTON") }}>
/// <a {{ link | attr(allow=["href", "title"]) }}>
/// ```
///
/// `allow` is a preset key or a list of attribute names; without it every
/// name is accepted. The output is escaped already and marked safe. An
/// `allow` argument of any other shape accepts nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttrFilter;

impl Filter for AttrFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let Some(names) = allow_names(args.get("allow")) else {
            return Ok(Value::String(String::new()));
        };
        Ok(Value::String(attributes(&AttrValue::from(value), &names)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn allow_names(arg: Option<&Value>) -> Option<Vec<String>> {
    match arg {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::String(name)) => Some(vec![name.clone()]),
        Some(Value::Array(items)) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            // A non-empty list with no usable names must not widen to "everything"
            (items.is_empty() || !names.is_empty()).then_some(names)
        }
        Some(_) => None,
    }
}

/// Adapts an async function into a Tera filter.
///
/// Tera calls filters synchronously from the render worker; the adapter drives
/// the returned future to completion there (on the ambient Tokio runtime when
/// there is one) and forwards either the value or the error to the engine. A
/// failing future becomes a Tera error whose source is a [`FilterError`], so it
/// surfaces as a render failure instead of being lost.
///
/// Must not be invoked from inside an async task; [`crate::TemplateCache`]
/// renders on the blocking pool.
pub struct AsyncFilter<F> {
    name: String,
    func: F,
}

impl<F> AsyncFilter<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> std::fmt::Debug for AsyncFilter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, E> Filter for AsyncFilter<F>
where
    F: Fn(Value, HashMap<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, E>>,
    E: Into<BoxError>,
{
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let pending = (self.func)(value.clone(), args.clone());
        let outcome = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(pending),
            Err(_) => futures::executor::block_on(pending),
        };

        outcome.map_err(|e| {
            tracing::debug!(filter = %self.name, "Async filter failed");
            tera::Error::chain(
                format!("Filter call '{}' failed", self.name),
                FilterError {
                    filter: self.name.clone(),
                    source: e.into(),
                },
            )
        })
    }
}

/// Error raised inside an async filter function.
#[derive(Debug, thiserror::Error)]
#[error("async filter '{filter}' failed: {source}")]
pub struct FilterError {
    pub filter: String,
    pub source: BoxError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tera::{Context, Tera};

    fn apply(value: Value, allow: Option<Value>) -> String {
        let mut args = HashMap::new();
        if let Some(allow) = allow {
            args.insert("allow".to_string(), allow);
        }
        AttrFilter.filter(&value, &args).unwrap().as_str().unwrap().to_string()
    }

    #[test]
    fn test_attr_without_allow_accepts_everything() {
        assert_eq!(apply(json!({"id": "x", "foo": "y"}), None), r#"id="x" foo="y""#);
        assert_eq!(apply(json!("class"), None), "class");
        assert_eq!(apply(Value::Null, None), "");
    }

    #[test]
    fn test_attr_preset() {
        assert_eq!(apply(json!({"id": "x", "foo": "y"}), Some(json!("GLOBAL"))), r#"id="x""#);
        assert_eq!(
            apply(json!([{"hidden": true}, "tabindex", "foo"]), Some(json!("BUTTON"))),
            "hidden tabindex"
        );
    }

    #[test]
    fn test_attr_literal_list() {
        assert_eq!(
            apply(json!({"id": "x", "href": "/", "rel": "me"}), Some(json!(["href", "rel"]))),
            r#"href="/" rel="me""#
        );
        assert_eq!(apply(json!({"id": "x"}), Some(json!(["GLOBAL"]))), r#"id="x""#);
    }

    #[test]
    fn test_attr_malformed_allow_accepts_nothing() {
        assert_eq!(apply(json!({"id": "x"}), Some(json!(42))), "");
        assert_eq!(apply(json!({"id": "x"}), Some(json!([1, 2]))), "");
        assert_eq!(apply(json!({"id": "x"}), Some(json!(["id", 2]))), r#"id="x""#);
        assert_eq!(apply(json!({"id": "x"}), Some(json!([]))), r#"id="x""#);
    }

    #[test]
    fn test_attr_output_not_autoescaped() {
        let mut tera = Tera::default();
        tera.register_filter("attr", AttrFilter);
        tera.add_raw_template("page.html", r#"<a {{ link | attr(allow="A") }}>"#)
            .unwrap();

        let mut context = Context::new();
        context.insert("link", &json!({"href": "/a?b=1&c=2", "onclick": "evil()"}));
        assert_eq!(
            tera.render("page.html", &context).unwrap(),
            r#"<a href="/a?b=1&amp;c=2">"#
        );
    }

    #[test]
    fn test_async_filter_without_runtime() {
        let filter = AsyncFilter::new("upper", |value: Value, _args: HashMap<String, Value>| async move {
            Ok::<_, BoxError>(Value::String(value.as_str().unwrap_or_default().to_uppercase()))
        });
        let out = filter.filter(&json!("abc"), &HashMap::new()).unwrap();
        assert_eq!(out, json!("ABC"));
    }

    #[test]
    fn test_async_filter_error_forwarded() {
        let filter = AsyncFilter::new("fail", |_value: Value, _args: HashMap<String, Value>| async move {
            Err::<Value, _>(std::io::Error::other("boom"))
        });
        let err = filter.filter(&json!("abc"), &HashMap::new()).unwrap_err();

        let source = std::error::Error::source(&err).expect("filter error attached");
        let filter_err = source.downcast_ref::<FilterError>().expect("FilterError source");
        assert_eq!(filter_err.filter, "fail");
        assert!(filter_err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_async_filter_on_blocking_pool() {
        let filter = AsyncFilter::new("echo", |value: Value, args: HashMap<String, Value>| async move {
            tokio::task::yield_now().await;
            let suffix = args.get("suffix").and_then(Value::as_str).unwrap_or_default().to_string();
            Ok::<_, BoxError>(Value::String(format!("{}{suffix}", value.as_str().unwrap_or_default())))
        });

        let out = tokio::task::spawn_blocking(move || {
            let mut args = HashMap::new();
            args.insert("suffix".to_string(), json!("!"));
            filter.filter(&json!("hi"), &args)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(out, json!("hi!"));
    }
}
