//! Resource paths and their project/package/file decomposition.
//!
//! A [`MacroPath`] is a read-only projection of a workspace path such as
//! `/Tetris/src/game/Board.java` into its project (`Tetris`), package
//! (`game`), and file (`Board.java`) names, plus the VCS branch the resource
//! was on when the macro was recorded.
//!
//! The package name depends on where the project keeps its sources, which
//! only the host knows. [`PathResolver`] asks a [`ProjectLayout`] once per
//! project and caches the answer.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Path separator used in workspace paths on every platform.
pub const SEPARATOR: char = '/';

/// Package name reported for files directly under a source root.
pub const DEFAULT_PACKAGE: &str = "(default package)";

/// Decomposed resource location carried by every macro.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroPath {
    /// Absolute workspace path, always starting with `/`.
    pub path: String,
    /// VCS branch of the enclosing project, or empty.
    pub branch: String,
    /// First path segment.
    #[serde(rename = "project")]
    pub project_name: String,
    /// Dotted package name relative to the source root, or empty.
    #[serde(rename = "package")]
    pub package_name: String,
    /// Last path segment for source files, otherwise empty.
    #[serde(rename = "file")]
    pub file_name: String,
}

impl MacroPath {
    /// A path with no project/package/file decomposition.
    pub fn bare(path: impl Into<String>, branch: impl Into<String>) -> Self {
        let path = normalize(&path.into());
        Self {
            project_name: project_name(&path).to_owned(),
            path,
            branch: branch.into(),
            ..Self::default()
        }
    }
}

/// Prefix `raw` with `/` when missing.
pub fn normalize(raw: &str) -> String {
    if raw.starts_with(SEPARATOR) {
        raw.to_owned()
    } else {
        format!("{SEPARATOR}{raw}")
    }
}

/// First segment of a normalized path, or the empty string.
pub fn project_name(path: &str) -> &str {
    let Some(rest) = path.strip_prefix(SEPARATOR) else {
        return path.split(SEPARATOR).next().unwrap_or_default();
    };
    rest.split(SEPARATOR).next().unwrap_or_default()
}

/// Host knowledge about where a project keeps its sources.
pub trait ProjectLayout: Send + Sync {
    /// Workspace paths of the source roots of `project` (e.g. `/Tetris/src`).
    fn source_roots(&self, project: &str) -> Vec<String>;
}

/// Layout for hosts without source-root information. Package names are empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSourceRoots;

impl ProjectLayout for NoSourceRoots {
    fn source_roots(&self, _project: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Turns raw paths into [`MacroPath`]s, caching source roots per project.
pub struct PathResolver {
    layout: Arc<dyn ProjectLayout>,
    roots: DashMap<String, Vec<String>>,
    extensions: Vec<String>,
    default_package: String,
}

impl PathResolver {
    /// Resolver recognising `.java` source files.
    pub fn new(layout: Arc<dyn ProjectLayout>) -> Self {
        Self {
            layout,
            roots: DashMap::new(),
            extensions: vec![".java".to_owned()],
            default_package: DEFAULT_PACKAGE.to_owned(),
        }
    }

    /// Replace the set of source-file extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Replace the name reported for the default package.
    #[must_use]
    pub fn with_default_package(mut self, name: impl Into<String>) -> Self {
        self.default_package = name.into();
        self
    }

    /// Resolve `raw` on `branch`.
    pub fn resolve(&self, raw: &str, branch: &str) -> MacroPath {
        let path = normalize(raw);
        let project = project_name(&path).to_owned();
        let package_name = self.package_name(&project, &path);
        let file_name = if self.is_source_file(&path) {
            path.rsplit(SEPARATOR).next().unwrap_or_default().to_owned()
        } else {
            String::new()
        };
        MacroPath {
            path,
            branch: branch.to_owned(),
            project_name: project,
            package_name,
            file_name,
        }
    }

    /// Drop cached source roots of `project` (e.g. after its layout changed).
    pub fn invalidate(&self, project: &str) {
        let _ = self.roots.remove(project);
    }

    fn is_source_file(&self, path: &str) -> bool {
        self.extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    fn package_name(&self, project: &str, path: &str) -> String {
        if project.is_empty() {
            return String::new();
        }
        let Some(index) = path.rfind(SEPARATOR) else {
            return String::new();
        };
        if index == 0 {
            return String::new();
        }
        let dir = if self.is_source_file(path) {
            &path[..index]
        } else {
            path
        };

        let roots = self
            .roots
            .entry(project.to_owned())
            .or_insert_with(|| self.layout.source_roots(project));
        let Some(relative) = roots.iter().find_map(|root| {
            let rest = dir.strip_prefix(root.as_str())?;
            (rest.is_empty() || rest.starts_with(SEPARATOR)).then_some(rest)
        }) else {
            return String::new();
        };

        if relative.is_empty() {
            return self.default_package.clone();
        }
        relative[1..].replace(SEPARATOR, ".")
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("cached_projects", &self.roots.len())
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct SrcLayout {
        calls: AtomicUsize,
    }

    impl ProjectLayout for SrcLayout {
        fn source_roots(&self, project: &str) -> Vec<String> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            vec![format!("/{project}/src"), format!("/{project}/test")]
        }
    }

    fn resolver() -> (PathResolver, Arc<SrcLayout>) {
        let layout = Arc::new(SrcLayout {
            calls: AtomicUsize::new(0),
        });
        (PathResolver::new(layout.clone()), layout)
    }

    #[test]
    fn resolves_java_file() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris/src/game/ui/Board.java", "main");
        assert_eq!(p.path, "/Tetris/src/game/ui/Board.java");
        assert_eq!(p.branch, "main");
        assert_eq!(p.project_name, "Tetris");
        assert_eq!(p.package_name, "game.ui");
        assert_eq!(p.file_name, "Board.java");
    }

    #[test]
    fn prefixes_missing_separator() {
        let (r, _) = resolver();
        let p = r.resolve("Tetris/src/A.java", "");
        assert_eq!(p.path, "/Tetris/src/A.java");
        assert_eq!(p.project_name, "Tetris");
    }

    #[test]
    fn default_package_directly_under_root() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris/src/A.java", "");
        assert_eq!(p.package_name, DEFAULT_PACKAGE);
    }

    #[test]
    fn second_source_root_matches() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris/test/game/BoardTest.java", "");
        assert_eq!(p.package_name, "game");
    }

    #[test]
    fn non_source_file_has_no_file_name() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris/README.md", "");
        assert_eq!(p.file_name, "");
        assert_eq!(p.package_name, "");
    }

    #[test]
    fn package_folder_resolves_package_name() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris/src/game/ui", "");
        assert_eq!(p.package_name, "game.ui");
        assert_eq!(p.file_name, "");
    }

    #[test]
    fn root_sibling_with_common_prefix_is_not_matched() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris/srcgen/x/A.java", "");
        assert_eq!(p.package_name, "");
    }

    #[test]
    fn project_only_path() {
        let (r, _) = resolver();
        let p = r.resolve("/Tetris", "dev");
        assert_eq!(p.project_name, "Tetris");
        assert_eq!(p.package_name, "");
    }

    #[test]
    fn source_roots_cached_per_project() {
        let (r, layout) = resolver();
        let _ = r.resolve("/Tetris/src/a/A.java", "");
        let _ = r.resolve("/Tetris/src/b/B.java", "");
        assert_eq!(layout.calls.load(Ordering::SeqCst), 1);
        r.invalidate("Tetris");
        let _ = r.resolve("/Tetris/src/b/B.java", "");
        assert_eq!(layout.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_extensions() {
        let layout = Arc::new(SrcLayout {
            calls: AtomicUsize::new(0),
        });
        let r = PathResolver::new(layout).with_extensions(vec![".rs".into()]);
        let p = r.resolve("/crate/src/engine/mod.rs", "");
        assert_eq!(p.file_name, "mod.rs");
        assert_eq!(p.package_name, "engine");
    }

    #[test]
    fn no_source_roots_layout() {
        let r = PathResolver::new(Arc::new(NoSourceRoots));
        let p = r.resolve("/P/src/A.java", "");
        assert_eq!(p.package_name, "");
        assert_eq!(p.file_name, "A.java");
    }

    #[test]
    fn bare_path_has_project_only() {
        let p = MacroPath::bare("P/x", "b");
        assert_eq!(p.path, "/P/x");
        assert_eq!(p.project_name, "P");
        assert_eq!(p.file_name, "");
    }

    #[test]
    fn serialized_field_names() {
        let (r, _) = resolver();
        let v = serde_json::to_value(r.resolve("/P/src/q/A.java", "main")).unwrap();
        assert_eq!(v["project"], "P");
        assert_eq!(v["package"], "q");
        assert_eq!(v["file"], "A.java");
        assert_eq!(v["branch"], "main");
    }
}
