//! Playground directory scanning.
//!
//! # Responsibilities
//! - Walk the playground root recursively
//! - Map each template file's directory to a URL path
//! - Classify and parse every template file
//! - Group files by URL path, response kind and method, ordered by sequence index
//!
//! # Design Decisions
//! - Pure function of the directory contents: `scan(root) -> RouteTable`
//! - Walk order is sorted by file name so repeated scans are identical
//! - Any I/O or parse error aborts the whole scan (no partial tables)

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::time::Instant;

use thiserror::Error;
use walkdir::WalkDir;

use crate::observability::metrics;
use crate::routing::classify::{classify, ResponseKind};
use crate::routing::template::{ParsedFile, TemplateFileError};

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("walking playground directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Template(#[from] TemplateFileError),
}

/// Files served by a single URL path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteEntry {
    /// Method → HTML files. The empty method means "any method".
    pub html: BTreeMap<String, Vec<ParsedFile>>,
    /// Method → live-stream files. The empty method means "any method".
    pub live: BTreeMap<String, Vec<ParsedFile>>,
}

impl RouteEntry {
    fn files_mut(&mut self, kind: ResponseKind) -> &mut BTreeMap<String, Vec<ParsedFile>> {
        match kind {
            ResponseKind::Html => &mut self.html,
            ResponseKind::Live => &mut self.live,
        }
    }

    /// All method lists of one kind.
    pub fn files(&self, kind: ResponseKind) -> &BTreeMap<String, Vec<ParsedFile>> {
        match kind {
            ResponseKind::Html => &self.html,
            ResponseKind::Live => &self.live,
        }
    }

    /// Files for a method, falling back to the "any method" list when the
    /// method has no files of its own.
    pub fn lookup(&self, kind: ResponseKind, method: &str) -> Option<&[ParsedFile]> {
        let files = self.files(kind);
        files
            .get(&method.to_ascii_uppercase())
            .filter(|list| !list.is_empty())
            .or_else(|| files.get(""))
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }
}

/// URL path → files. Keys always start and end with `/`.
pub type RouteTable = BTreeMap<String, RouteEntry>;

/// Scan a playground root into a fresh route table.
pub fn scan(root: &Path, extension: &str) -> Result<RouteTable, ScanError> {
    let start = Instant::now();
    let mut routes = RouteTable::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
            continue;
        };

        let rel = path.strip_prefix(root).unwrap_or(path);
        let url_path = url_path_for(rel);
        let class = classify(&stem);
        let parsed = ParsedFile::load(path, class.seq_index)?;

        routes
            .entry(url_path)
            .or_default()
            .files_mut(class.kind)
            .entry(class.method)
            .or_default()
            .push(parsed);
    }

    for entry in routes.values_mut() {
        for files in entry.html.values_mut().chain(entry.live.values_mut()) {
            // Stable: equal indices keep walk order.
            files.sort_by_key(|f| f.seq_index);
        }
    }

    metrics::record_scan(routes.len(), start);
    Ok(routes)
}

/// URL path for a template file given its path relative to the root.
fn url_path_for(rel: &Path) -> String {
    let dirs: Vec<String> = rel
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if dirs.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", dirs.join("/"))
    }
}

/// Normalize a request path into route table key form.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Log every route, file and sequence position at debug level.
pub fn log_route_table(routes: &RouteTable) {
    tracing::debug!(routes = routes.len(), "Route table");
    for (url_path, entry) in routes {
        for kind in [ResponseKind::Html, ResponseKind::Live] {
            for (method, files) in entry.files(kind) {
                let method = if method.is_empty() { "*" } else { method.as_str() };
                for file in files {
                    tracing::debug!(
                        method,
                        path = %url_path,
                        kind = %kind,
                        file = %file.source_path.display(),
                        sections = file.sections.len(),
                        seq = file.seq_index,
                        "Route"
                    );
                }
            }
        }
    }
}
