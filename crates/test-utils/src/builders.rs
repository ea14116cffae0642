use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use assetpipe::config::{CategoryConfig, CompositeTaskConfig, ConfigFile, RawConfigFile};
use assetpipe::errors::Result;
use assetpipe::types::{BuildMode, Category};
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    root: Option<PathBuf>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.config.config.mode = Some(mode);
        self
    }

    pub fn with_timeout(mut self, timeout: &str) -> Self {
        self.config.config.task_timeout = Some(timeout.to_string());
        self
    }

    pub fn with_category(mut self, category: Category, cfg: CategoryConfig) -> Self {
        self.config.category.insert(category, cfg);
        self
    }

    pub fn with_series(mut self, name: &str, children: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CompositeTaskConfig {
                series: children.iter().map(|c| c.to_string()).collect(),
                parallel: Vec::new(),
            },
        );
        self
    }

    pub fn with_parallel(mut self, name: &str, children: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CompositeTaskConfig {
                series: Vec::new(),
                parallel: children.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        let cfg = ConfigFile::try_from(self.config)?;
        Ok(match self.root {
            Some(root) => cfg.with_root(root),
            None => cfg,
        })
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// A throwaway project directory on disk.
#[derive(Debug)]
pub struct ProjectDir {
    dir: TempDir,
}

impl ProjectDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn file(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating parent dir");
        }
        std::fs::write(&path, contents).expect("writing project file");
        self
    }

    pub fn dir(&self, rel: &str) -> &Self {
        std::fs::create_dir_all(self.dir.path().join(rel)).expect("creating project dir");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).expect("reading project file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    /// Every file under `rel`, keyed by slash-separated path relative to it.
    pub fn snapshot(&self, rel: &str) -> BTreeMap<String, Vec<u8>> {
        let base = self.dir.path().join(rel);
        let mut out = BTreeMap::new();
        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                let path = entry.expect("reading dir entry").path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let key = path
                        .strip_prefix(&base)
                        .expect("entry under base")
                        .to_string_lossy()
                        .replace('\\', "/");
                    out.insert(key, std::fs::read(&path).expect("reading snapshot file"));
                }
            }
        }
        out
    }

    /// The classic `src/` layout with one file per category.
    pub fn classic_layout(&self) -> &Self {
        self.file(
            "src/index.html",
            "<html>\n<head><link rel=\"stylesheet\" href=\"/css/main.css\"></head>\n<body>\n//= template/header.html\n</body>\n</html>\n",
        )
        .file("src/template/header.html", "<header>Site</header>\n")
        .file(
            "src/js/main.js",
            "// entry\n//= partials/util.js\nconsole.log(util(1));\n",
        )
        .file(
            "src/js/partials/util.js",
            "function util(x) {\n  return x + 1; // add\n}\n",
        )
        .file(
            "src/sass/main.scss",
            "@import \"vars\";\n\nbody {\n  color: red;\n}\n",
        )
        .file("src/sass/_vars.scss", "/* vars */\n.brand {\n  color: blue;\n}\n")
        .file("src/img/logo.png", [0x89u8, 0x50, 0x4e, 0x47, 1, 2, 3])
        .file("src/fonts/site.woff2", [0u8, 1, 2, 3])
    }
}

impl Default for ProjectDir {
    fn default() -> Self {
        Self::new()
    }
}
