//! Stylesheet loading collaborator.
//!
//! The engine never touches the file system itself. An [`Importer`] turns a
//! URL plus the path of the stylesheet containing the rule into a canonical
//! path, and parses the stylesheet at that path into a caller-provided root
//! descriptor.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sass_ir::ast::{Stylesheet, StylesheetBuilder};
use sass_ir::{ScopeArena, ScopeId, StringInterner};

#[derive(Debug, thiserror::Error)]
pub enum ImporterError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("no stylesheet at {}", path.display())]
    Missing { path: PathBuf },
}

pub trait Importer {
    /// Canonical path for `url` as written in the stylesheet at `base`
    /// (`None` for the entry point), or `None` if nothing matches.
    fn canonicalize(&self, url: &str, base: Option<&Path>) -> Option<PathBuf>;

    /// Parse the stylesheet at a canonical `path`, declaring its top-level
    /// names in `root`.
    fn load(
        &self,
        path: &Path,
        interner: &StringInterner,
        arena: &mut ScopeArena,
        root: ScopeId,
    ) -> Result<Stylesheet, ImporterError>;
}

/// Relative paths a URL may refer to, in priority order: the file itself,
/// its partial, then a directory index.
pub fn candidate_paths(url: &str) -> Vec<PathBuf> {
    let path = Path::new(url);
    let dir = path.parent().unwrap_or(Path::new(""));
    let Some(file) = path.file_name().and_then(|f| f.to_str()) else {
        return Vec::new();
    };

    let has_extension = Path::new(file)
        .extension()
        .is_some_and(|ext| ext == "scss" || ext == "css");
    if has_extension {
        return vec![path.to_path_buf(), dir.join(format!("_{file}"))];
    }
    vec![
        dir.join(format!("{file}.scss")),
        dir.join(format!("_{file}.scss")),
        path.join("_index.scss"),
        path.join("index.scss"),
    ]
}

/// Resolve `.` and `..` lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }
    result
}

type SourceFn = dyn Fn(&mut StylesheetBuilder<'_>) + Send + Sync;

/// Importer over stylesheets registered in memory.
///
/// Each stylesheet is a closure that builds it; it runs once per load, which
/// is how a parser would be re-run for every `@import` site.
#[derive(Clone, Default)]
pub struct MemoryImporter {
    sources: FxHashMap<PathBuf, Arc<SourceFn>>,
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stylesheet at `path`.
    #[must_use]
    pub fn with(
        mut self,
        path: impl AsRef<Path>,
        build: impl Fn(&mut StylesheetBuilder<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.add(path, build);
        self
    }

    pub fn add(
        &mut self,
        path: impl AsRef<Path>,
        build: impl Fn(&mut StylesheetBuilder<'_>) + Send + Sync + 'static,
    ) {
        self.sources
            .insert(normalize_path(path.as_ref()), Arc::new(build));
    }
}

impl Importer for MemoryImporter {
    fn canonicalize(&self, url: &str, base: Option<&Path>) -> Option<PathBuf> {
        let dir = base.and_then(Path::parent).unwrap_or(Path::new(""));
        let candidates = candidate_paths(url);
        [dir, Path::new("")]
            .into_iter()
            .flat_map(|dir| candidates.iter().map(move |c| normalize_path(&dir.join(c))))
            .find(|path| self.sources.contains_key(path))
    }

    fn load(
        &self,
        path: &Path,
        interner: &StringInterner,
        arena: &mut ScopeArena,
        root: ScopeId,
    ) -> Result<Stylesheet, ImporterError> {
        let build = self
            .sources
            .get(path)
            .ok_or_else(|| ImporterError::Missing {
                path: path.to_path_buf(),
            })?;
        let mut builder = StylesheetBuilder::new(interner, arena, root);
        build(&mut builder);
        Ok(builder.finish())
    }
}
