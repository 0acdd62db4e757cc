//! File-system importer.
//!
//! A URL is tried relative to the directory of the file containing the rule,
//! then relative to each load path. Within a directory the candidates are
//! `url.scss`, `_url.scss`, `url/_index.scss` and `url/index.scss`; the first
//! existing file wins and is canonicalized, so two spellings of the same file
//! share one module.

use std::fs;
use std::path::{Path, PathBuf};

use sass_eval::importer::{candidate_paths, Importer, ImporterError};
use sass_ir::ast::{Stylesheet, StylesheetBuilder};
use sass_ir::{ScopeArena, ScopeId, StringInterner};

/// Syntax error reported by a [`SourceParser`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending construct.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    #[cold]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            message: message.into(),
        }
    }
}

/// Grammar front end: reads source text and drives a [`StylesheetBuilder`],
/// which allocates scopes and addresses as the text is walked.
pub trait SourceParser {
    fn parse(&self, source: &str, builder: &mut StylesheetBuilder<'_>) -> Result<(), ParseError>;
}

pub struct FsImporter<P> {
    parser: P,
    load_paths: Vec<PathBuf>,
}

impl<P: SourceParser> FsImporter<P> {
    pub fn new(parser: P, load_paths: Vec<PathBuf>) -> Self {
        FsImporter { parser, load_paths }
    }

    /// Directories searched for a URL written in `base`, in priority order.
    ///
    /// The entry point has no base; its URL is taken relative to the working
    /// directory.
    fn search_dirs<'a>(&'a self, base: Option<&'a Path>) -> impl Iterator<Item = &'a Path> + 'a {
        let base_dir = match base {
            Some(base) => base.parent().unwrap_or(Path::new("")),
            None => Path::new(""),
        };
        std::iter::once(base_dir).chain(self.load_paths.iter().map(PathBuf::as_path))
    }
}

impl<P: SourceParser> Importer for FsImporter<P> {
    fn canonicalize(&self, url: &str, base: Option<&Path>) -> Option<PathBuf> {
        let candidates = candidate_paths(url);
        for dir in self.search_dirs(base) {
            for candidate in &candidates {
                let path = dir.join(candidate);
                if !path.is_file() {
                    continue;
                }
                match fs::canonicalize(&path) {
                    Ok(canonical) => return Some(canonical),
                    Err(err) => {
                        tracing::debug!(path = %path.display(), %err, "cannot canonicalize");
                    }
                }
            }
        }
        None
    }

    fn load(
        &self,
        path: &Path,
        interner: &StringInterner,
        arena: &mut ScopeArena,
        root: ScopeId,
    ) -> Result<Stylesheet, ImporterError> {
        let source = fs::read_to_string(path).map_err(|source| ImporterError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut builder = StylesheetBuilder::new(interner, arena, root);
        self.parser
            .parse(&source, &mut builder)
            .map_err(|err| ImporterError::Parse {
                path: path.to_path_buf(),
                line: err.line,
                message: err.message,
            })?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "parsed stylesheet");
        Ok(builder.finish())
    }
}
