// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{PipelineError, Result};
use crate::types::{BuildMode, Category, ReloadPolicy, ReloadScope};

/// Top-level configuration as read from a TOML file.
///
/// Every section is optional; an empty file yields the built-in layout:
///
/// ```toml
/// [config]
/// mode = "production"
/// output_root = "dist"
/// task_timeout = "60s"
///
/// [category.styles]
/// source = "src/sass/main.scss"
/// dest = "dist/css"
/// watch = "src/sass/**/*.scss"
/// compiler = "sass --stdin"
/// reload = "inject"
///
/// [task.assets-no-images]
/// parallel = ["html", "styles", "scripts"]
///
/// [server]
/// port = 3000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Per-category overrides from `[category.<name>]`.
    #[serde(default)]
    pub category: BTreeMap<Category, CategoryConfig>,

    /// User-declared composite tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, CompositeTaskConfig>,

    #[serde(default)]
    pub server: ServerSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Build mode; the `--mode` flag wins over this.
    #[serde(default)]
    pub mode: Option<BuildMode>,

    /// Directory every category writes under; wiped by `clean`.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Where cached image optimisation results are kept.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Optional per-transform timeout (`"30s"`, `"500ms"`, `"2m"`).
    #[serde(default)]
    pub task_timeout: Option<String>,
}

fn default_output_root() -> String {
    "dist".to_string()
}

fn default_cache_dir() -> String {
    ".assetpipe/cache".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            mode: None,
            output_root: default_output_root(),
            cache_dir: default_cache_dir(),
            task_timeout: None,
        }
    }
}

/// `[category.<name>]` section. Unset fields fall back to the built-in table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub watch: Option<String>,

    /// Shell command replacing the built-in style compiler (stdin -> stdout).
    #[serde(default)]
    pub compiler: Option<String>,

    /// Shell command run on compiled styles before minification.
    #[serde(default)]
    pub prefixer: Option<String>,

    /// Shell command run on each image in production builds.
    #[serde(default)]
    pub optimizer: Option<String>,

    #[serde(default)]
    pub reload: Option<ReloadPolicy>,
}

/// `[task.<name>]` section: exactly one of `series` / `parallel`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeTaskConfig {
    #[serde(default)]
    pub series: Vec<String>,
    #[serde(default)]
    pub parallel: Vec<String>,
}

impl CompositeTaskConfig {
    /// Names this task refers to, in declared order.
    pub fn children(&self) -> &[String] {
        if self.series.is_empty() {
            &self.parallel
        } else {
            &self.series
        }
    }

    pub fn is_series(&self) -> bool {
        !self.series.is_empty()
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Source/destination/watch mapping for one category.
///
/// All paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub category: Category,
    pub source_pattern: String,
    pub dest_dir: PathBuf,
    pub watch_pattern: String,
}

/// Fixed lookup table from category to its [`PathSpec`].
#[derive(Debug, Clone)]
pub struct PathTable {
    output_root: PathBuf,
    entries: BTreeMap<Category, PathSpec>,
}

impl PathTable {
    pub(crate) fn new_unchecked(output_root: PathBuf, entries: BTreeMap<Category, PathSpec>) -> Self {
        Self {
            output_root,
            entries,
        }
    }

    /// Look up a category; a missing entry is a configuration error.
    pub fn get(&self, category: Category) -> Result<&PathSpec> {
        self.entries
            .get(&category)
            .ok_or_else(|| PipelineError::UnknownCategory(category.to_string()))
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSpec> {
        self.entries.values()
    }
}

/// Built-in layout: `src/` in, `dist/` out.
pub fn default_path_spec(category: Category) -> PathSpec {
    let (source, dest, watch) = match category {
        Category::Html => ("src/*.html", "dist/html", "src/**/*.html"),
        Category::Scripts => ("src/js/main.js", "dist/js", "src/js/**/*.js"),
        Category::Styles => ("src/sass/main.scss", "dist/css", "src/sass/**/*.scss"),
        Category::Images => ("src/img/**/*.*", "dist/img", "src/img/**/*.*"),
        Category::Fonts => ("src/fonts/**/*.*", "dist/fonts", "src/fonts/**/*.*"),
    };
    PathSpec {
        category,
        source_pattern: source.to_string(),
        dest_dir: PathBuf::from(dest),
        watch_pattern: watch.to_string(),
    }
}

/// Default reload behaviour after a watched rebuild.
///
/// Only markup, scripts and styles notify browsers; fonts and images are
/// picked up on the next page load.
pub fn default_reload(category: Category) -> Option<ReloadScope> {
    match category {
        Category::Html | Category::Scripts => Some(ReloadScope::FullPage),
        Category::Styles => Some(ReloadScope::InjectCss),
        Category::Images | Category::Fonts => None,
    }
}

/// External tools and reload policy attached to one category.
#[derive(Debug, Clone, Default)]
pub struct CategoryOptions {
    pub compiler: Option<String>,
    pub prefixer: Option<String>,
    pub optimizer: Option<String>,
    pub reload: Option<ReloadScope>,
}

/// Validated configuration, constructed once at startup and shared by
/// reference with the orchestrator, watcher and dev server.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: PathBuf,
    mode: BuildMode,
    paths: PathTable,
    options: BTreeMap<Category, CategoryOptions>,
    cache_dir: PathBuf,
    task_timeout: Option<Duration>,
    tasks: BTreeMap<String, CompositeTaskConfig>,
    server: ServerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        mode: BuildMode,
        paths: PathTable,
        options: BTreeMap<Category, CategoryOptions>,
        cache_dir: PathBuf,
        task_timeout: Option<Duration>,
        tasks: BTreeMap<String, CompositeTaskConfig>,
        server: ServerSection,
    ) -> Self {
        Self {
            root: PathBuf::from("."),
            mode,
            paths,
            options,
            cache_dir,
            task_timeout,
            tasks,
            server,
        }
    }

    /// Built-in configuration, equivalent to an empty TOML file.
    pub fn defaults() -> Result<Self> {
        ConfigFile::try_from(RawConfigFile::default())
    }

    /// Set the project root all relative paths are resolved against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    /// Tools and reload policy for a category (defaults if not configured).
    pub fn options(&self, category: Category) -> CategoryOptions {
        self.options.get(&category).cloned().unwrap_or_default()
    }

    /// Absolute (root-joined) output root.
    pub fn output_root(&self) -> PathBuf {
        self.root.join(self.paths.output_root())
    }

    /// Absolute (root-joined) cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.cache_dir)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    pub fn tasks(&self) -> &BTreeMap<String, CompositeTaskConfig> {
        &self.tasks
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }
}
