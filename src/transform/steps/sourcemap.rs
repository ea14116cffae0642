// src/transform/steps/sourcemap.rs

//! Line-level v3 source maps written as `<file>.map` side artifacts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::fs::blocking;
use crate::transform::asset::{relative_slash_path, Asset, LineMap, LineOrigin};
use crate::transform::pipeline::{Step, StepContext, StepFuture};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap {
    version: u8,
    file: String,
    sources: Vec<String>,
    sources_content: Vec<String>,
    names: Vec<String>,
    mappings: String,
}

/// Emits a map for every `.css` / `.js` asset and links it with a trailing
/// `sourceMappingURL` comment. Other assets pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct SourceMapStep;

impl SourceMapStep {
    pub fn new() -> Self {
        Self
    }

    fn map_for(&self, asset: &Asset, ctx: &StepContext) -> Result<Asset> {
        let file = asset
            .rel_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut sources = Vec::with_capacity(asset.sources.len());
        let mut sources_content = Vec::with_capacity(asset.sources.len());
        for src in &asset.sources {
            sources.push(
                relative_slash_path(&ctx.root, src)
                    .unwrap_or_else(|| src.to_string_lossy().replace('\\', "/")),
            );
            sources_content.push(
                ctx.fs
                    .read_to_string(src)
                    .with_context(|| format!("reading source {:?} for map", src))?,
            );
        }

        let line_count = asset.text()?.lines().count();
        let map = SourceMap {
            version: 3,
            file,
            sources,
            sources_content,
            names: Vec::new(),
            mappings: encode_mappings(&asset.lines, line_count),
        };

        let json = serde_json::to_string(&map).context("serialising source map")?;
        let mut rel = asset.rel_path.clone().into_os_string();
        rel.push(".map");

        let mut map_asset = Asset::new(PathBuf::from(rel), asset.source_path.clone(), json.into_bytes());
        map_asset.lines = LineMap::Unknown;
        Ok(map_asset)
    }

    /// Append a map and link comment for every stylesheet and script.
    fn link_maps(&self, assets: Vec<Asset>, ctx: &StepContext) -> Result<Vec<Asset>> {
        let mut out = Vec::with_capacity(assets.len() * 2);
        for mut asset in assets {
            let comment = match asset.extension() {
                Some("css") => "/*# sourceMappingURL={} */",
                Some("js") => "//# sourceMappingURL={}",
                _ => {
                    out.push(asset);
                    continue;
                }
            };

            let map = self.map_for(&asset, ctx)?;
            let map_name = map
                .rel_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();

            if !asset.contents.is_empty() && !asset.contents.ends_with(b"\n") {
                asset.contents.push(b'\n');
            }
            asset
                .contents
                .extend_from_slice(comment.replace("{}", &map_name).as_bytes());
            asset.contents.push(b'\n');

            out.push(asset);
            out.push(map);
        }
        Ok(out)
    }
}

impl Step for SourceMapStep {
    fn name(&self) -> &str {
        "sourcemap"
    }

    fn apply<'a>(&'a self, assets: Vec<Asset>, ctx: &'a StepContext) -> StepFuture<'a> {
        let step = self.clone();
        let ctx = ctx.clone();
        Box::pin(blocking(move || step.link_maps(assets, &ctx)))
    }
}

/// One segment per generated line, starting at column 0 of the origin line.
fn encode_mappings(lines: &LineMap, line_count: usize) -> String {
    let origins: Vec<LineOrigin> = match lines {
        LineMap::Identity => (0..line_count)
            .map(|line| LineOrigin {
                source: 0,
                line: line as u32,
            })
            .collect(),
        LineMap::Mapped(origins) => origins.clone(),
        LineMap::Unknown => return String::new(),
    };

    let mut prev_source = 0i64;
    let mut prev_line = 0i64;
    let mut segments = Vec::with_capacity(origins.len());
    for origin in origins {
        let source = origin.source as i64;
        let line = i64::from(origin.line);
        let mut seg = String::new();
        for value in [0, source - prev_source, line - prev_line, 0] {
            encode_vlq(value, &mut seg);
        }
        prev_source = source;
        prev_line = line;
        segments.push(seg);
    }
    segments.join(";")
}

fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;

    #[test]
    fn vlq_matches_known_values() {
        let enc = |v| {
            let mut s = String::new();
            encode_vlq(v, &mut s);
            s
        };
        assert_eq!(enc(0), "A");
        assert_eq!(enc(1), "C");
        assert_eq!(enc(-1), "D");
        assert_eq!(enc(16), "gB");
    }

    #[test]
    fn identity_mappings_advance_one_line_each() {
        assert_eq!(encode_mappings(&LineMap::Identity, 3), "AAAA;AACA;AACA");
        assert_eq!(encode_mappings(&LineMap::Unknown, 3), "");
    }

    #[tokio::test]
    async fn map_is_emitted_next_to_stylesheet() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/sass/main.scss", "a{}\n");
        let ctx = StepContext {
            fs: Arc::new(fs.clone()),
            root: "/p".into(),
        };
        let contents = fs.read(Path::new("/p/src/sass/main.scss")).unwrap();
        let asset = Asset::new("main.css".into(), "/p/src/sass/main.scss".into(), contents);

        let out = SourceMapStep::new().apply(vec![asset], &ctx).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text().unwrap(), "a{}\n/*# sourceMappingURL=main.css.map */\n");
        assert_eq!(out[1].rel_path, PathBuf::from("main.css.map"));
        let json: serde_json::Value = serde_json::from_slice(&out[1].contents).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["sources"][0], "src/sass/main.scss");
        assert_eq!(json["sourcesContent"][0], "a{}\n");
        assert_eq!(json["mappings"], "AAAA");
    }
}
