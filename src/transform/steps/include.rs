// src/transform/steps/include.rs

//! File inclusion: `//= path` directives for markup/scripts and
//! `@import "name";` inlining for stylesheets.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{bail, Result};
use regex::Regex;

use crate::fs::{blocking, FileSystem};
use crate::transform::asset::{Asset, LineMap, LineOrigin};
use crate::transform::pipeline::{Step, StepContext, StepFuture};

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*//=\s*(?:include\s+)?["']?([^"'\s]+)["']?\s*$"#)
        .expect("valid regex")
});

static SCSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*@import\s+["']([^"']+)["']\s*;?\s*$"#)
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeSyntax {
    /// `//= relative/path.ext`, resolved next to the including file.
    Directive,
    /// `@import "partial";` resolving `_partial.scss` / `partial.scss`.
    /// Plain CSS imports (`.css`, `url(..)`, `http..`) are left alone and
    /// `//` line comments are dropped.
    ScssImport,
}

/// Recursively inline included files, recording line provenance.
#[derive(Debug, Clone)]
pub struct IncludeStep {
    name: &'static str,
    syntax: IncludeSyntax,
    output_extension: Option<&'static str>,
}

impl IncludeStep {
    /// `//=` inclusion, keeping file names.
    pub fn directives() -> Self {
        Self {
            name: "include",
            syntax: IncludeSyntax::Directive,
            output_extension: None,
        }
    }

    /// Built-in stylesheet compiler: import inlining, output renamed to `.css`.
    pub fn scss() -> Self {
        Self {
            name: "compile",
            syntax: IncludeSyntax::ScssImport,
            output_extension: Some("css"),
        }
    }

    fn expand_asset(&self, fs: &dyn FileSystem, asset: &mut Asset) -> Result<()> {
        let text = asset.text()?.to_string();
        let mut state = Expansion {
            sources: vec![asset.source_path.clone()],
            lines: Vec::new(),
            origins: Vec::new(),
        };
        let mut stack = Vec::new();
        self.expand(fs, &asset.source_path, &text, 0, &mut state, &mut stack)?;

        let mut out = state.lines.join("\n");
        if text.ends_with('\n') {
            out.push('\n');
        }
        asset.contents = out.into_bytes();
        asset.sources = state.sources;
        asset.lines = LineMap::Mapped(state.origins);
        if let Some(ext) = self.output_extension {
            asset.set_extension(ext);
        }
        Ok(())
    }

    fn expand(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        text: &str,
        source: usize,
        state: &mut Expansion,
        stack: &mut Vec<PathBuf>,
    ) -> Result<()> {
        if stack.iter().any(|p| p == path) {
            let chain: Vec<String> = stack
                .iter()
                .chain(std::iter::once(&path.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            bail!("include cycle: {}", chain.join(" -> "));
        }
        stack.push(path.to_path_buf());

        let dir = path.parent().unwrap_or(Path::new(""));
        for (idx, line) in text.lines().enumerate() {
            if self.syntax == IncludeSyntax::ScssImport && line.trim_start().starts_with("//") {
                continue;
            }

            match self.resolve(fs, dir, line)? {
                Some(target) => {
                    let nested = fs.read_to_string(&target)?;
                    let nested_source = state.source_index(&target);
                    self.expand(fs, &target, &nested, nested_source, state, stack)?;
                }
                None => {
                    state.lines.push(line.to_string());
                    state.origins.push(LineOrigin {
                        source,
                        line: idx as u32,
                    });
                }
            }
        }

        stack.pop();
        Ok(())
    }

    /// The file a line includes, or `None` if it is ordinary content.
    fn resolve(&self, fs: &dyn FileSystem, dir: &Path, line: &str) -> Result<Option<PathBuf>> {
        match self.syntax {
            IncludeSyntax::Directive => {
                let Some(caps) = INCLUDE_DIRECTIVE.captures(line) else {
                    return Ok(None);
                };
                let target = dir.join(&caps[1]);
                if !fs.is_file(&target) {
                    bail!("included file not found: {}", target.display());
                }
                Ok(Some(target))
            }
            IncludeSyntax::ScssImport => {
                let Some(caps) = SCSS_IMPORT.captures(line) else {
                    return Ok(None);
                };
                let name = &caps[1];
                if name.ends_with(".css") || name.starts_with("http") || name.starts_with("url(") {
                    return Ok(None);
                }
                for candidate in scss_candidates(dir, name) {
                    if fs.is_file(&candidate) {
                        return Ok(Some(candidate));
                    }
                }
                bail!("cannot resolve @import \"{}\" from {}", name, dir.display());
            }
        }
    }
}

fn scss_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let rel = Path::new(name);
    let file = rel
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = dir.join(rel.parent().unwrap_or(Path::new("")));

    if file.ends_with(".scss") {
        return vec![parent.join(format!("_{file}")), parent.join(&file)];
    }
    vec![
        parent.join(format!("_{file}.scss")),
        parent.join(format!("{file}.scss")),
        dir.join(rel).join("_index.scss"),
    ]
}

struct Expansion {
    sources: Vec<PathBuf>,
    lines: Vec<String>,
    origins: Vec<LineOrigin>,
}

impl Expansion {
    fn source_index(&mut self, path: &Path) -> usize {
        match self.sources.iter().position(|p| p == path) {
            Some(idx) => idx,
            None => {
                self.sources.push(path.to_path_buf());
                self.sources.len() - 1
            }
        }
    }
}

impl Step for IncludeStep {
    fn name(&self) -> &str {
        self.name
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a> {
        let step = self.clone();
        let fs = Arc::clone(&ctx.fs);
        Box::pin(blocking(move || {
            let mut assets = assets;
            for asset in assets.iter_mut() {
                step.expand_asset(fs.as_ref(), asset)?;
            }
            Ok(assets)
        }))
    }
}
