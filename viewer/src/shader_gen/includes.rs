//! `#include "..."` lookup
//!
//! Fetching is not done here. A resolver only answers from what it already
//! has (a map, or snippets cached on disk by some other tool).

use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use super::error::IncludeError;

/// Source of include text, keyed by normalized URL.
pub trait IncludeResolver {
    fn resolve(&self, url: &str) -> Result<String, IncludeError>;
}

/// Resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, url: &str) -> Result<String, IncludeError> {
        Err(IncludeError::NotFound(url.to_string()))
    }
}

/// In-memory snippets.
#[derive(Debug, Clone, Default)]
pub struct MemoryIncludes {
    entries: HashMap<String, String>,
}

impl MemoryIncludes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a snippet. `path` may be an include path or a full URL.
    pub fn insert(&mut self, path: &str, text: impl Into<String>) -> &mut Self {
        let url = include_url(path).unwrap_or_else(|_| path.to_string());
        self.entries.insert(url, text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IncludeResolver for MemoryIncludes {
    fn resolve(&self, url: &str) -> Result<String, IncludeError> {
        self.entries
            .get(url)
            .cloned()
            .ok_or_else(|| IncludeError::NotFound(url.to_string()))
    }
}

/// Snippets cached on disk under `root/<host>/<path>`.
#[derive(Debug, Clone)]
pub struct CacheDirIncludes {
    root: PathBuf,
}

impl CacheDirIncludes {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a URL is cached in. `None` for URLs that would escape the root.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let key = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let mut path = self.root.clone();
        for part in key.split('/') {
            match part {
                "" | "." => {}
                ".." => return None,
                part => path.push(part),
            }
        }
        Some(path)
    }
}

impl IncludeResolver for CacheDirIncludes {
    fn resolve(&self, url: &str) -> Result<String, IncludeError> {
        let path = self
            .path_for(url)
            .ok_or_else(|| IncludeError::NotFound(url.to_string()))?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IncludeError::NotFound(url.to_string()))
            }
            Err(source) => Err(IncludeError::Io {
                url: url.to_string(),
                path,
                source,
            }),
        }
    }
}

/// Maps an include path to the URL it is served from.
///
/// - `lygia/x` and `lygia.xyz/x` map to `https://lygia.xyz/x`
/// - `github.com/user/repo/blob/branch/x` maps to
///   `https://raw.githubusercontent.com/user/repo/branch/x`
pub fn include_url(path: &str) -> Result<String, IncludeError> {
    if let Some(rest) = path.strip_prefix("lygia/") {
        return Ok(format!("https://lygia.xyz/{rest}"));
    }
    if let Some(rest) = path.strip_prefix("lygia.xyz/") {
        return Ok(format!("https://lygia.xyz/{rest}"));
    }
    if let Some(rest) = path.strip_prefix("github.com/") {
        let rest = rest.replacen("/blob/", "/", 1);
        return Ok(format!("https://raw.githubusercontent.com/{rest}"));
    }
    Err(IncludeError::Unsupported(path.to_string()))
}

/// Resolves `path` as written inside a file fetched from `parent`.
///
/// Relative paths (`./x`, `../x`) are joined onto the parent's directory;
/// anything else goes through [`include_url`].
pub fn nested_include_url(parent: &str, path: &str) -> Result<String, IncludeError> {
    if !(path.starts_with("./") || path.starts_with("../")) {
        return include_url(path);
    }
    let Some((scheme, rest)) = parent.split_once("://") else {
        return Err(IncludeError::Unsupported(path.to_string()));
    };
    let mut parts: Vec<&str> = rest.split('/').collect();
    parts.pop();
    for part in path.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                // Never pop the host.
                if parts.len() > 1 {
                    parts.pop();
                }
            }
            part => parts.push(part),
        }
    }
    Ok(format!("{scheme}://{}", parts.join("/")))
}

/// Path of a `#include "path"` directive line, if it is one.
pub fn parse_directive(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let (path, _) = rest.split_once('"')?;
    Some(path)
}
