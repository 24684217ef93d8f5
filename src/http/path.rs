use crate::config::Config;

const SEPARATOR: char = '/';

/// Joins path parts with `/`, collapses separator runs and drops a trailing
/// separator unless the whole result is the root.
///
/// # Example
///
/// ```
/// # use captive::http::path::merge;
/// assert_eq!(merge(&["/wwwroot/", "//css/site.css"]), "/wwwroot/css/site.css");
/// assert_eq!(merge(&["", "/"]), "/");
/// ```
pub fn merge(parts: &[&str]) -> String {
    let mut out = String::new();

    for part in parts {
        for c in std::iter::once(SEPARATOR).chain(part.chars()) {
            if c == SEPARATOR && out.ends_with(SEPARATOR) {
                continue;
            }
            out.push(c);
        }
    }

    if out.is_empty() {
        out.push(SEPARATOR);
    }
    if out.len() > 1 && out.ends_with(SEPARATOR) {
        out.pop();
    }

    out
}

/// A request path mapped onto storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: String,
    /// Set when the requested file was missing and the captive page stands in.
    pub redirected: bool,
}

/// Maps request paths to files under the document root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root_path: String,
    default_document: String,
    captive_path: String,
}

impl PathResolver {
    pub fn new(cfg: &Config) -> Self {
        Self {
            root_path: cfg.root_path.clone(),
            default_document: cfg.default_document.clone(),
            captive_path: cfg.captive_path(),
        }
    }

    pub fn captive_path(&self) -> &str {
        &self.captive_path
    }

    /// Physical path for `raw_path` before the existence check.
    pub fn target_for(&self, raw_path: &str) -> String {
        let path = strip_query(raw_path);
        let path = if path.is_empty() || path == "/" {
            self.default_document.as_str()
        } else {
            path
        };
        merge(&[self.root_path.as_str(), path])
    }

    /// Resolves a request path, falling back to the captive page whenever the
    /// target is not a regular file. Missing files never surface as errors.
    pub async fn resolve(&self, raw_path: &str) -> ResolvedTarget {
        let target = self.target_for(raw_path);

        if !escapes_root(raw_path) && is_file(&target).await {
            return ResolvedTarget { path: target, redirected: false };
        }

        tracing::debug!(requested = %target, fallback = %self.captive_path, "Serving captive page");
        ResolvedTarget {
            path: self.captive_path.clone(),
            redirected: true,
        }
    }
}

/// Drops everything from the first `?`.
pub fn strip_query(raw_path: &str) -> &str {
    match raw_path.split_once('?') {
        Some((path, _)) => path,
        None => raw_path,
    }
}

fn escapes_root(raw_path: &str) -> bool {
    strip_query(raw_path).split(SEPARATOR).any(|segment| segment == "..")
}

async fn is_file(path: &str) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
