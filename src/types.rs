// src/types.rs

//! Small shared enums: asset categories, build mode and reload scope.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Logical asset category. Every category owns exactly one `PathSpec` and
/// one producer task of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Html,
    #[serde(alias = "js")]
    Scripts,
    Styles,
    Images,
    Fonts,
}

impl Category {
    /// All categories in the order producers are declared in the build.
    pub const ALL: [Category; 5] = [
        Category::Html,
        Category::Styles,
        Category::Scripts,
        Category::Fonts,
        Category::Images,
    ];

    /// Canonical name, also used as the producer task name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Scripts => "scripts",
            Category::Styles => "styles",
            Category::Images => "images",
            Category::Fonts => "fonts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(Category::Html),
            "scripts" | "js" => Ok(Category::Scripts),
            "styles" => Ok(Category::Styles),
            "images" => Ok(Category::Images),
            "fonts" => Ok(Category::Fonts),
            other => Err(format!(
                "unknown category: {other} (expected html, scripts, styles, images or fonts)"
            )),
        }
    }
}

/// Process-wide build mode, fixed at startup.
///
/// Production adds optimisation steps (minify, compress); development adds
/// debug side-artifacts (source maps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    pub fn is_production(&self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Production => f.write_str("production"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!(
                "invalid build mode: {other} (expected \"development\" or \"production\")"
            )),
        }
    }
}

/// What connected browsers should do after a watched task succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadScope {
    /// Reload the whole page.
    FullPage,
    /// Swap changed stylesheets in place without reloading.
    InjectCss,
}

impl ReloadScope {
    /// Name of the server-sent event pushed to clients.
    pub fn event_name(&self) -> &'static str {
        match self {
            ReloadScope::FullPage => "reload",
            ReloadScope::InjectCss => "css",
        }
    }
}

/// Reload policy as written in TOML (`reload = "full" | "inject" | "none"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    Full,
    Inject,
    None,
}

impl From<ReloadPolicy> for Option<ReloadScope> {
    fn from(policy: ReloadPolicy) -> Self {
        match policy {
            ReloadPolicy::Full => Some(ReloadScope::FullPage),
            ReloadPolicy::Inject => Some(ReloadScope::InjectCss),
            ReloadPolicy::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_js_alias() {
        assert_eq!("js".parse::<Category>(), Ok(Category::Scripts));
        assert_eq!(" Styles ".parse::<Category>(), Ok(Category::Styles));
        assert!("sass".parse::<Category>().is_err());
    }

    #[test]
    fn build_mode_parses_short_forms() {
        assert_eq!("prod".parse::<BuildMode>(), Ok(BuildMode::Production));
        assert_eq!("development".parse::<BuildMode>(), Ok(BuildMode::Development));
        assert_eq!(BuildMode::default(), BuildMode::Development);
    }
}
