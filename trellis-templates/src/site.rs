//! Site path resolution and change notifications.

use std::path::PathBuf;

/// Resolves site-relative paths to absolute source paths.
///
/// Object-safe so the cache can hold any site implementation as
/// `Arc<dyn SiteSource>`.
pub trait SiteSource: Send + Sync + std::fmt::Debug {
    /// Absolute path of a site-relative source path such as `/_includes/nav.html`.
    fn src(&self, path: &str) -> PathBuf;
}

/// A site rooted at a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot {
    root: PathBuf,
}

impl SiteRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl SiteSource for SiteRoot {
    fn src(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            return self.root.clone();
        }
        self.root.join(relative)
    }
}

/// Files changed since the last build, as site-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    pub files: Vec<String>,
}

impl ChangeEvent {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_src_strips_leading_slash() {
        let site = SiteRoot::new("/srv/site");
        assert_eq!(site.src("/_includes/nav.html"), PathBuf::from("/srv/site/_includes/nav.html"));
        assert_eq!(site.src("pages/index.html"), PathBuf::from("/srv/site/pages/index.html"));
    }

    #[test]
    fn test_src_of_root() {
        let site = SiteRoot::new("/srv/site");
        assert_eq!(site.src("/"), PathBuf::from("/srv/site"));
        assert_eq!(site.src(""), PathBuf::from("/srv/site"));
    }

    #[test]
    fn test_change_event_from_strs() {
        let event = ChangeEvent::new(["/a.html", "/b.html"]);
        assert_eq!(event.files, vec!["/a.html".to_string(), "/b.html".to_string()]);
    }
}
