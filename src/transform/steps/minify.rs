// src/transform/steps/minify.rs

use anyhow::{anyhow, bail, Context, Result};
use swc_common::sync::Lrc;
use swc_common::{FileName, Globals, SourceMap, GLOBALS};
use swc_ecma_ast::EsVersion;
use swc_ecma_codegen::text_writer::JsWriter;
use swc_ecma_codegen::{Config as CodegenConfig, Emitter};
use swc_ecma_parser::{parse_file_as_program, EsSyntax, Syntax as EcmaSyntax};

use crate::transform::asset::{Asset, LineMap};
use crate::transform::pipeline::{Step, StepContext, StepFuture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Css,
    Js,
}

/// Whitespace and comment stripping for stylesheets, full reprinting for
/// scripts.
#[derive(Debug, Clone)]
pub struct MinifyStep {
    syntax: Syntax,
}

impl MinifyStep {
    pub fn css() -> Self {
        Self { syntax: Syntax::Css }
    }

    pub fn js() -> Self {
        Self { syntax: Syntax::Js }
    }

    fn minify(&self, asset: &mut Asset) -> Result<()> {
        let text = asset.text()?;
        let out = match self.syntax {
            Syntax::Css => minify_css(text),
            Syntax::Js => minify_js(text)
                .with_context(|| format!("minifying {}", asset.source_path.display()))?,
        };
        asset.contents = out.into_bytes();
        asset.lines = LineMap::Unknown;
        Ok(())
    }
}

impl Step for MinifyStep {
    fn name(&self) -> &str {
        "minify"
    }

    fn apply<'a>(&'a self, mut assets: Vec<Asset>, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            for asset in assets.iter_mut() {
                self.minify(asset)?;
            }
            Ok(assets)
        })
    }
}

/// Characters that never need surrounding whitespace. `+` only counts
/// outside parentheses: `calc(1px + 2px)` needs its spaces.
fn css_tight_before(c: char, in_parens: bool) -> bool {
    matches!(c, '{' | '}' | ';' | ',' | '>' | ')' | '~') || (c == '+' && !in_parens)
}

fn css_tight_after(c: char, in_parens: bool) -> bool {
    matches!(c, '{' | '}' | ';' | ',' | '>' | '(' | ':' | '~') || (c == '+' && !in_parens)
}

pub fn minify_css(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut pending_space = false;
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            c if c.is_whitespace() => pending_space = true,
            '"' | '\'' => {
                push_pending(&mut out, &mut pending_space, c, depth > 0);
                out.push(c);
                let mut escaped = false;
                for n in chars.by_ref() {
                    out.push(n);
                    if escaped {
                        escaped = false;
                    } else if n == '\\' {
                        escaped = true;
                    } else if n == c {
                        break;
                    }
                }
            }
            '}' => {
                pending_space = false;
                if out.ends_with(';') {
                    out.pop();
                }
                out.push('}');
            }
            c => {
                push_pending(&mut out, &mut pending_space, c, depth > 0);
                out.push(c);
                match c {
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
    }

    out
}

fn push_pending(out: &mut String, pending: &mut bool, next: char, in_parens: bool) {
    if *pending {
        if let Some(last) = out.chars().last() {
            if !css_tight_after(last, in_parens) && !css_tight_before(next, in_parens) {
                out.push(' ');
            }
        }
        *pending = false;
    }
}

/// Parse as an ES module-or-script and print it back in minified form.
/// Comments are dropped; literals (strings, templates, regexes) keep their
/// source text.
pub fn minify_js(input: &str) -> Result<String> {
    GLOBALS.set(&Globals::default(), || {
        let source_map = Lrc::new(SourceMap::default());
        let source_file =
            source_map.new_source_file(Lrc::new(FileName::Anon), input.to_owned());

        let mut recovered = Vec::new();
        let program = parse_file_as_program(
            &source_file,
            EcmaSyntax::Es(EsSyntax::default()),
            EsVersion::latest(),
            None,
            &mut recovered,
        )
        .map_err(|e| anyhow!("syntax error: {}", e.kind().msg()))?;
        if let Some(e) = recovered.first() {
            bail!("syntax error: {}", e.kind().msg());
        }

        let mut buf = Vec::with_capacity(input.len());
        {
            let writer = JsWriter::new(Lrc::clone(&source_map), "\n", &mut buf, None);
            let mut emitter = Emitter {
                cfg: CodegenConfig::default().with_minify(true),
                cm: Lrc::clone(&source_map),
                comments: None,
                wr: writer,
            };
            emitter.emit_program(&program).context("printing minified script")?;
        }

        String::from_utf8(buf).context("minified script is not UTF-8")
    })
}
