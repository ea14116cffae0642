mod common;

use std::path::Path;
use std::time::Duration;

use assetpipe::config::{load_and_validate, resolve_config};
use assetpipe::errors::PipelineError;
use assetpipe::types::{BuildMode, Category, ReloadScope};
use assetpipe_test_utils::ProjectDir;

use crate::common::init_tracing;

fn write_config(project: &ProjectDir, toml: &str) -> std::path::PathBuf {
    project.file("Assetpipe.toml", toml);
    project.path().join("Assetpipe.toml")
}

#[test]
fn overrides_merge_with_builtin_table() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(
        &project,
        r#"
[config]
mode = "production"
output_root = "public"
task_timeout = "45s"

[category.styles]
source = "assets/scss/app.scss"
dest = "public/styles"
watch = "assets/scss/**/*.scss"
compiler = "sass --stdin"
reload = "full"

[category.html]
dest = "public/pages"

[category.js]
dest = "public/js"

[category.images]
dest = "public/img"

[category.fonts]
dest = "public/fonts"

[server]
port = 8080
"#,
    );

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.root(), project.path());
    assert_eq!(cfg.mode(), BuildMode::Production);
    assert_eq!(cfg.task_timeout(), Some(Duration::from_secs(45)));
    assert_eq!(cfg.output_root(), project.path().join("public"));
    assert_eq!(cfg.server().port, 8080);

    let styles = cfg.paths().get(Category::Styles).unwrap();
    assert_eq!(styles.source_pattern, "assets/scss/app.scss");
    assert_eq!(styles.dest_dir, Path::new("public/styles"));

    let scripts = cfg.paths().get(Category::Scripts).unwrap();
    assert_eq!(scripts.source_pattern, "src/js/main.js");

    let opts = cfg.options(Category::Styles);
    assert_eq!(opts.compiler.as_deref(), Some("sass --stdin"));
    assert_eq!(opts.reload, Some(ReloadScope::FullPage));
    assert_eq!(cfg.options(Category::Fonts).reload, None);
}

#[test]
fn unknown_keys_are_toml_errors() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(&project, "[config]\nqueue_length = 3\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)), "{err}");
}

#[test]
fn nested_destinations_are_rejected() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(&project, "[category.styles]\ndest = \"dist/html/css\"\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)), "{err}");
}

#[test]
fn invalid_glob_is_rejected() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(&project, "[category.fonts]\nsource = \"src/fonts/[\"\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("fonts")));
}

#[test]
fn composite_cycles_are_rejected() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(
        &project,
        "[task.a]\nseries = [\"b\", \"html\"]\n\n[task.b]\nparallel = [\"a\"]\n",
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::TaskCycle(_)), "{err}");
}

#[test]
fn composites_may_not_shadow_builtins() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(&project, "[task.build]\nseries = [\"html\"]\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("built-in")));
}

#[test]
fn explicit_missing_config_is_an_error() {
    init_tracing();
    let project = ProjectDir::new();
    let missing = project.path().join("nope.toml");

    let err = resolve_config(Some(&missing)).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("does not exist")));
}

#[test]
fn oversized_timeout_is_a_config_error() {
    init_tracing();
    let project = ProjectDir::new();
    let path = write_config(&project, "[config]\ntask_timeout = \"307445734561825861m\"\n");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("task_timeout")));
}
