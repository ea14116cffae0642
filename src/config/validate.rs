// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::duration::parse_duration;
use crate::config::model::{
    default_path_spec, default_reload, CategoryOptions, ConfigFile, PathSpec, PathTable,
    RawConfigFile,
};
use crate::dag::{builtin_task_names, composite_order};
use crate::errors::{PipelineError, Result};
use crate::transform::asset::build_glob;
use crate::types::{BuildMode, Category};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let output_root = normalize_relative(&raw.config.output_root, "[config].output_root")?;
        let cache_dir = normalize_relative(&raw.config.cache_dir, "[config].cache_dir")?;

        let entries = merge_path_specs(&raw)?;
        validate_path_specs(&output_root, &entries)?;

        if cache_dir.starts_with(&output_root) {
            return Err(PipelineError::ConfigError(format!(
                "[config].cache_dir {:?} must not live under the output root {:?} (clean would wipe it)",
                cache_dir, output_root
            )));
        }

        let task_timeout = match raw.config.task_timeout.as_deref() {
            Some(s) => Some(parse_duration(s).map_err(|e| {
                PipelineError::ConfigError(format!("[config].task_timeout: {e}"))
            })?),
            None => None,
        };

        validate_composite_tasks(&raw)?;

        let options = raw
            .category
            .iter()
            .map(|(cat, c)| {
                let reload = match c.reload {
                    Some(policy) => policy.into(),
                    None => default_reload(*cat),
                };
                (
                    *cat,
                    CategoryOptions {
                        compiler: c.compiler.clone(),
                        prefixer: c.prefixer.clone(),
                        optimizer: c.optimizer.clone(),
                        reload,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        let options = Category::ALL
            .iter()
            .map(|cat| {
                let opts = options.get(cat).cloned().unwrap_or_else(|| CategoryOptions {
                    reload: default_reload(*cat),
                    ..CategoryOptions::default()
                });
                (*cat, opts)
            })
            .collect();

        Ok(ConfigFile::new_unchecked(
            raw.config.mode.unwrap_or(BuildMode::Development),
            PathTable::new_unchecked(output_root, entries),
            options,
            cache_dir,
            task_timeout,
            raw.task,
            raw.server,
        ))
    }
}

/// Apply `[category.*]` overrides on top of the built-in table.
fn merge_path_specs(raw: &RawConfigFile) -> Result<BTreeMap<Category, PathSpec>> {
    let mut entries = BTreeMap::new();

    for category in Category::ALL {
        let mut spec = default_path_spec(category);
        if let Some(over) = raw.category.get(&category) {
            if let Some(ref source) = over.source {
                spec.source_pattern = source.clone();
            }
            if let Some(ref dest) = over.dest {
                spec.dest_dir =
                    normalize_relative(dest, &format!("[category.{category}].dest"))?;
            }
            if let Some(ref watch) = over.watch {
                spec.watch_pattern = watch.clone();
            }
        }
        entries.insert(category, spec);
    }

    Ok(entries)
}

/// Every dest dir sits strictly below the output root, and no dest dir is a
/// prefix of another. Globs must compile.
fn validate_path_specs(output_root: &Path, entries: &BTreeMap<Category, PathSpec>) -> Result<()> {
    for spec in entries.values() {
        if spec.dest_dir == output_root || !spec.dest_dir.starts_with(output_root) {
            return Err(PipelineError::ConfigError(format!(
                "category '{}' writes to {:?}, which is not inside the output root {:?}",
                spec.category, spec.dest_dir, output_root
            )));
        }

        for (what, pattern) in [("source", &spec.source_pattern), ("watch", &spec.watch_pattern)] {
            build_glob(pattern).map_err(|e| {
                PipelineError::ConfigError(format!(
                    "category '{}' has an invalid {what} glob '{pattern}': {e}",
                    spec.category
                ))
            })?;
        }
    }

    let specs: Vec<&PathSpec> = entries.values().collect();
    for (i, a) in specs.iter().enumerate() {
        for b in specs.iter().skip(i + 1) {
            if a.dest_dir.starts_with(&b.dest_dir) || b.dest_dir.starts_with(&a.dest_dir) {
                return Err(PipelineError::ConfigError(format!(
                    "categories '{}' and '{}' have overlapping destinations {:?} and {:?}",
                    a.category, b.category, a.dest_dir, b.dest_dir
                )));
            }
        }
    }

    Ok(())
}

fn validate_composite_tasks(cfg: &RawConfigFile) -> Result<()> {
    let builtins = builtin_task_names();

    for (name, task) in cfg.task.iter() {
        if builtins.contains(&name.as_str()) {
            return Err(PipelineError::ConfigError(format!(
                "task '{}' shadows a built-in task",
                name
            )));
        }
        if task.series.is_empty() == task.parallel.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "task '{}' must declare exactly one non-empty `series` or `parallel` list",
                name
            )));
        }
        for child in task.children() {
            if child == name {
                return Err(PipelineError::ConfigError(format!(
                    "task '{}' cannot refer to itself",
                    name
                )));
            }
            if !cfg.task.contains_key(child) && !builtins.contains(&child.as_str()) {
                return Err(PipelineError::ConfigError(format!(
                    "task '{}' refers to unknown task '{}'",
                    name, child
                )));
            }
        }
    }

    composite_order(&cfg.task).map(|_| ())
}

/// Reject absolute paths and `..`; strip `.` components and trailing slashes.
fn normalize_relative(raw: &str, field: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for comp in Path::new(raw.trim()).components() {
        match comp {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PipelineError::ConfigError(format!(
                    "{field} must be a relative path without '..' (got '{raw}')"
                )));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "{field} must not be empty or '.'"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_disjoint() {
        let cfg = ConfigFile::defaults().unwrap();
        assert_eq!(cfg.paths().output_root(), Path::new("dist"));
        let dests: Vec<_> = cfg.paths().iter().map(|s| s.dest_dir.clone()).collect();
        assert_eq!(dests.len(), 5);
        for (i, a) in dests.iter().enumerate() {
            for b in dests.iter().skip(i + 1) {
                assert!(!a.starts_with(b) && !b.starts_with(a));
            }
        }
    }

    #[test]
    fn normalize_strips_dots_and_rejects_parents() {
        assert_eq!(
            normalize_relative("./dist/css/", "x").unwrap(),
            PathBuf::from("dist/css")
        );
        assert!(normalize_relative("../dist", "x").is_err());
        assert!(normalize_relative(".", "x").is_err());
    }

    #[test]
    fn dest_equal_to_output_root_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.category.insert(
            Category::Html,
            crate::config::model::CategoryConfig {
                dest: Some("dist/".to_string()),
                ..Default::default()
            },
        );
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("output root")));
    }
}
