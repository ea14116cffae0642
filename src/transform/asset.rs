// src/transform/asset.rs

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;

/// Where one generated line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOrigin {
    /// Index into [`Asset::sources`].
    pub source: usize,
    /// Zero-based line in that source.
    pub line: u32,
}

/// Line provenance carried alongside asset contents for source maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMap {
    /// Line N comes from line N of `sources[0]`.
    Identity,
    Mapped(Vec<LineOrigin>),
    /// Rewritten by a step that does not track lines.
    Unknown,
}

/// A file travelling through a pipeline.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Output path relative to the destination directory.
    pub rel_path: PathBuf,
    /// Absolute path of the file this asset was read from.
    pub source_path: PathBuf,
    pub contents: Vec<u8>,
    /// Every file that contributed content, `source_path` first.
    pub sources: Vec<PathBuf>,
    pub lines: LineMap,
}

impl Asset {
    pub fn new(rel_path: PathBuf, source_path: PathBuf, contents: Vec<u8>) -> Self {
        Self {
            rel_path,
            sources: vec![source_path.clone()],
            source_path,
            contents,
            lines: LineMap::Identity,
        }
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{:?} is not valid UTF-8", self.source_path))
    }

    pub fn extension(&self) -> Option<&str> {
        self.rel_path.extension().and_then(|e| e.to_str())
    }

    pub fn set_extension(&mut self, ext: &str) {
        self.rel_path.set_extension(ext);
    }

    /// `main.css` + `.min` -> `main.min.css`.
    pub fn add_suffix(&mut self, suffix: &str) {
        let stem = self
            .rel_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.extension() {
            Some(ext) => format!("{stem}{suffix}.{ext}"),
            None => format!("{stem}{suffix}"),
        };
        self.rel_path.set_file_name(name);
    }
}

/// Compile a glob the way every pattern in a path table is interpreted:
/// `*` stops at `/`, `**` crosses directories.
pub fn build_glob(pattern: &str) -> std::result::Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Literal directory prefix of a glob.
///
/// `src/img/**/*.*` -> `src/img`; a pattern without wildcards names a single
/// file, so its parent directory is the base (`src/js/main.js` -> `src/js`).
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let is_magic = |p: &&str| p.contains(['*', '?', '[', '{']);

    let literal_len = parts
        .iter()
        .position(|p| is_magic(p))
        .unwrap_or(parts.len().saturating_sub(1));

    parts[..literal_len]
        .iter()
        .filter(|p| !p.is_empty() && **p != ".")
        .collect::<PathBuf>()
}

/// All files under `root` whose root-relative path matches `pattern`,
/// sorted. A missing base directory yields no files.
pub fn collect_sources(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher: GlobMatcher = build_glob(pattern)
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher();

    let base = root.join(glob_base(pattern));
    if !fs.is_dir(&base) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![base];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel) = relative_slash_path(root, &path) {
                    if matcher.is_match(&rel) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// `path` relative to `root`, with forward slashes.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("src/img/**/*.*"), PathBuf::from("src/img"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/js/main.js"), PathBuf::from("src/js"));
        assert_eq!(glob_base("./src/fonts/**"), PathBuf::from("src/fonts"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/index.html", "<p>");
        fs.add_file("/site/src/template/header.html", "<h1>");

        let files = collect_sources(&fs, Path::new("/site"), "src/*.html").unwrap();
        assert_eq!(files, vec![PathBuf::from("/site/src/index.html")]);
    }

    #[test]
    fn missing_base_dir_is_empty_not_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/site");
        let files = collect_sources(&fs, Path::new("/site"), "src/fonts/**/*.*").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn add_suffix_goes_before_extension() {
        let mut asset = Asset::new("sub/main.css".into(), "/x/main.css".into(), Vec::new());
        asset.add_suffix(".min");
        assert_eq!(asset.rel_path, PathBuf::from("sub/main.min.css"));
    }
}
