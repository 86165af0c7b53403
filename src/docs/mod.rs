// src/docs/mod.rs

//! Documentation build configuration (Sphinx + Breathe + Doxygen), as a
//! typed model.
//!
//! The defaults describe the project's documentation; a TOML file may
//! override any of them:
//!
//! ```toml
//! version = "2.1"
//! release = "2.1.0"
//!
//! [html_theme_options]
//! navigation_depth = 3
//! ```
//!
//! Where Doxygen's XML lives depends on the build: Read the Docs builds
//! (`READTHEDOCS=True`) run Doxygen themselves and read `../doxygen/xml`,
//! local builds expect CMake to have produced `_build/doxygen/xml`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::{Command, ExitStatus};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{RawToAcesError, Result};
use crate::fs::FileSystem;

pub const READTHEDOCS_ENV_VAR: &str = "READTHEDOCS";
pub const READTHEDOCS_XML_PATH: &str = "../doxygen/xml";
pub const LOCAL_XML_PATH: &str = "_build/doxygen/xml";
pub const DOXYGEN_PROGRAM: &str = "doxygen";
pub const DOXYFILE: &str = "docs/Doxyfile";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeOptions {
    pub logo_only: bool,
    pub display_version: bool,
    pub prev_next_buttons_location: String,
    pub style_external_links: bool,
    pub collapse_navigation: bool,
    pub sticky_navigation: bool,
    pub navigation_depth: u32,
    pub includehidden: bool,
    pub titles_only: bool,
}

impl Default for ThemeOptions {
    fn default() -> Self {
        Self {
            logo_only: false,
            display_version: true,
            prev_next_buttons_location: "bottom".to_string(),
            style_external_links: false,
            collapse_navigation: false,
            sticky_navigation: true,
            navigation_depth: 4,
            includehidden: true,
            titles_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreatheConfig {
    pub default_project: String,
    pub default_members: Vec<String>,
    /// Project name to Doxygen XML directory.
    pub projects: BTreeMap<String, String>,
}

impl BreatheConfig {
    pub fn for_build(read_the_docs: bool) -> Self {
        let xml = if read_the_docs {
            READTHEDOCS_XML_PATH
        } else {
            LOCAL_XML_PATH
        };
        Self {
            default_project: "rawtoaces".to_string(),
            default_members: vec!["members".to_string(), "undoc-members".to_string()],
            projects: BTreeMap::from([("rawtoaces".to_string(), xml.to_string())]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocsConfig {
    pub project: String,
    pub copyright: String,
    pub author: String,
    pub version: String,
    pub release: String,
    /// Load order matters.
    pub extensions: Vec<String>,
    pub templates_path: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub source_suffix: BTreeMap<String, String>,
    pub master_doc: String,
    pub html_theme: String,
    pub html_static_path: Vec<String>,
    pub html_theme_options: ThemeOptions,
    pub breathe: BreatheConfig,
    pub intersphinx_mapping: BTreeMap<String, String>,
    pub myst_enable_extensions: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl DocsConfig {
    pub fn for_build(read_the_docs: bool) -> Self {
        Self {
            project: "RAWtoACES".to_string(),
            copyright: "2024, Contributors to the rawtoaces Project".to_string(),
            author: "Contributors to the rawtoaces Project".to_string(),
            version: "2.0".to_string(),
            release: "2.0.0".to_string(),
            extensions: strings(&[
                "breathe",
                "sphinx.ext.autodoc",
                "sphinx.ext.intersphinx",
                "sphinx.ext.viewcode",
                "sphinx_rtd_theme",
                "myst_parser",
            ]),
            templates_path: strings(&["_templates"]),
            exclude_patterns: strings(&["_build", "Thumbs.db", ".DS_Store"]),
            source_suffix: BTreeMap::from([
                (".rst".to_string(), "restructuredtext".to_string()),
                (".md".to_string(), "markdown".to_string()),
            ]),
            master_doc: "index".to_string(),
            html_theme: "sphinx_rtd_theme".to_string(),
            html_static_path: strings(&["_static"]),
            html_theme_options: ThemeOptions::default(),
            breathe: BreatheConfig::for_build(read_the_docs),
            intersphinx_mapping: BTreeMap::from([(
                "python".to_string(),
                "https://docs.python.org/3".to_string(),
            )]),
            myst_enable_extensions: strings(&["colon_fence", "deflist"]),
        }
    }

    /// Apply a file's overrides on top of `self`.
    pub fn with_overrides(self, overrides: DocsOverrides) -> Self {
        Self {
            project: overrides.project.unwrap_or(self.project),
            copyright: overrides.copyright.unwrap_or(self.copyright),
            author: overrides.author.unwrap_or(self.author),
            version: overrides.version.unwrap_or(self.version),
            release: overrides.release.unwrap_or(self.release),
            extensions: overrides.extensions.unwrap_or(self.extensions),
            templates_path: overrides.templates_path.unwrap_or(self.templates_path),
            exclude_patterns: overrides.exclude_patterns.unwrap_or(self.exclude_patterns),
            source_suffix: overrides.source_suffix.unwrap_or(self.source_suffix),
            master_doc: overrides.master_doc.unwrap_or(self.master_doc),
            html_theme: overrides.html_theme.unwrap_or(self.html_theme),
            html_static_path: overrides.html_static_path.unwrap_or(self.html_static_path),
            html_theme_options: overrides
                .html_theme_options
                .unwrap_or(self.html_theme_options),
            breathe: overrides.breathe.unwrap_or(self.breathe),
            intersphinx_mapping: overrides
                .intersphinx_mapping
                .unwrap_or(self.intersphinx_mapping),
            myst_enable_extensions: overrides
                .myst_enable_extensions
                .unwrap_or(self.myst_enable_extensions),
        }
    }

    /// Ordered lists must not repeat entries.
    pub fn validate(&self) -> Result<()> {
        let lists = [
            ("extensions", &self.extensions),
            ("templates_path", &self.templates_path),
            ("exclude_patterns", &self.exclude_patterns),
            ("html_static_path", &self.html_static_path),
            ("myst_enable_extensions", &self.myst_enable_extensions),
        ];
        for (name, values) in lists {
            let mut seen = BTreeSet::new();
            for value in values {
                if !seen.insert(value) {
                    return Err(RawToAcesError::ConfigError(format!(
                        "duplicate entry '{value}' in `{name}`"
                    )));
                }
            }
        }
        if !self.breathe.projects.contains_key(&self.breathe.default_project) {
            return Err(RawToAcesError::ConfigError(format!(
                "breathe default project '{}' has no entry in `breathe.projects`",
                self.breathe.default_project
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RawToAcesError::ConfigError(e.to_string()))
    }
}

/// Optional overrides read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocsOverrides {
    pub project: Option<String>,
    pub copyright: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub templates_path: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub source_suffix: Option<BTreeMap<String, String>>,
    pub master_doc: Option<String>,
    pub html_theme: Option<String>,
    pub html_static_path: Option<Vec<String>>,
    pub html_theme_options: Option<ThemeOptions>,
    pub breathe: Option<BreatheConfig>,
    pub intersphinx_mapping: Option<BTreeMap<String, String>>,
    pub myst_enable_extensions: Option<Vec<String>>,
}

/// `READTHEDOCS` must equal the literal `True`.
pub fn is_read_the_docs_with_env<F>(env: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    env(READTHEDOCS_ENV_VAR).as_deref() == Some("True")
}

pub fn is_read_the_docs() -> bool {
    is_read_the_docs_with_env(|name| std::env::var(name).ok())
}

/// Build the configuration for this build environment, applying the
/// overrides file when given.
pub fn load_docs_config(
    fs: &dyn FileSystem,
    overrides: Option<&Path>,
    read_the_docs: bool,
) -> Result<DocsConfig> {
    let mut config = DocsConfig::for_build(read_the_docs);
    if let Some(path) = overrides {
        let contents = fs
            .read_to_string(path)
            .map_err(|e| RawToAcesError::ConfigError(format!("{e:#}")))?;
        let parsed: DocsOverrides = toml::from_str(&contents)?;
        config = config.with_overrides(parsed);
        debug!(path = %path.display(), "applied documentation overrides");
    }
    config.validate()?;
    Ok(config)
}

/// Run `<program> docs/Doxyfile` from `docs_dir/..` and wait for
/// it. Output is not captured and the exit status is only logged; failing
/// to start the program is logged too.
pub fn regenerate_xml_with(program: &str, docs_dir: &Path) -> Option<ExitStatus> {
    let root = docs_dir.join("..");
    info!(root = %root.display(), "running {program} {DOXYFILE}");

    match Command::new(program).arg(DOXYFILE).current_dir(&root).status() {
        Ok(status) => {
            debug!(%status, "{program} finished");
            Some(status)
        }
        Err(e) => {
            warn!("failed to run {program}: {e}");
            None
        }
    }
}

pub fn regenerate_xml(docs_dir: &Path) -> Option<ExitStatus> {
    regenerate_xml_with(DOXYGEN_PROGRAM, docs_dir)
}
