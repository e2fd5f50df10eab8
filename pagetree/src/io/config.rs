//! Host configuration stored as `<dir>/config.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::app::{App, PageDef};
use crate::error::StructuralError;
use crate::io::file_store::write_atomic;
use crate::page::{HookConfig, TextPage, WELCOME_LINES};
use crate::tree::{DEFAULT_ROOT_ID, DEFAULT_ROOT_TAG, DataMap};

/// Engine configuration (TOML).
///
/// Intended to be edited by hand. Missing fields fall back to defaults, so an
/// empty file describes an app with only the default start page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Attach the rendered debug view to every cycle report.
    pub debug: bool,

    pub root: RootConfig,

    /// Seed values for the global scope of new sessions.
    pub globals: DataMap,

    /// Pages declared under the root, parents before children.
    pub pages: Vec<PageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RootConfig {
    pub id: String,
    pub tag: String,
    /// Header lines of the start page. Empty disables the header.
    pub header: Vec<String>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_ROOT_ID.to_string(),
            tag: DEFAULT_ROOT_TAG.to_string(),
            header: WELCOME_LINES.iter().map(|line| line.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub id: String,
    pub tag: String,
    /// Parent page id. Defaults to the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub footer: Vec<String>,
    /// Initial page data.
    #[serde(skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.root.id.trim().is_empty() {
            return Err(anyhow!("root.id must not be empty"));
        }
        let mut seen = HashSet::from([self.root.id.as_str()]);
        for page in &self.pages {
            if page.id.trim().is_empty() {
                return Err(anyhow!("pages: id must not be empty"));
            }
            if !seen.insert(page.id.as_str()) {
                return Err(anyhow!("pages: duplicate id '{}'", page.id));
            }
            if let Some(parent) = page.parent.as_deref()
                && !seen.contains(parent)
            {
                return Err(anyhow!(
                    "pages: parent '{}' of '{}' must be declared before it",
                    parent,
                    page.id
                ));
            }
        }
        Ok(())
    }

    /// Build the app definition described by this configuration.
    ///
    /// Every configured page renders its `header`/`footer` lines as text.
    pub fn to_app(&self) -> Result<App, StructuralError> {
        let mut builder = App::builder()
            .start_page(text_page(&self.root.id, &self.root.tag, &self.root.header, &[]))
            .globals(self.globals.clone())
            .debug(self.debug);
        for page in &self.pages {
            let mut def = text_page(&page.id, &page.tag, &page.header, &page.footer);
            if let Some(parent) = &page.parent {
                def = def.under(parent.clone());
            }
            for (key, value) in &page.data {
                def = def.data(key.clone(), value.clone());
            }
            builder = builder.page(def);
        }
        builder.build()
    }
}

fn text_page(id: &str, tag: &str, header: &[String], footer: &[String]) -> PageDef {
    let mut def = PageDef::new(id, tag).page(TextPage);
    if !header.is_empty() {
        def = def.header(HookConfig::lines(header.iter().cloned()));
    }
    if !footer.is_empty() {
        def = def.footer(HookConfig::lines(footer.iter().cloned()));
    }
    def
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = EngineConfig::default();
        cfg.pages.push(PageConfig {
            id: "reports".to_string(),
            tag: "Reports".to_string(),
            header: vec!["Reports".to_string()],
            ..PageConfig::default()
        });
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn parses_pages_and_globals() {
        let raw = r#"
debug = true

[globals]
rate = 2.5

[[pages]]
id = "B"
tag = "Backtests"

[[pages]]
id = "D"
tag = "Detail"
parent = "B"
footer = ["done"]

[pages.data]
window = 20
"#;
        let cfg: EngineConfig = toml::from_str(raw).expect("parse");
        cfg.validate().expect("valid");
        assert!(cfg.debug);
        assert_eq!(cfg.globals.get("rate"), Some(&json!(2.5)));

        let app = cfg.to_app().expect("app");
        let tree = app.template();
        assert_eq!(tree.parent_id("D").expect("D"), Some("B"));
        assert_eq!(tree.get("D").expect("D").data.get("window"), Some(&json!(20)));
        assert!(app.binding("D").expect("binding").footer.enabled);
        assert!(!app.binding("B").expect("binding").header.enabled);
    }

    #[test]
    fn validate_rejects_duplicates_and_forward_parents() {
        let mut cfg = EngineConfig::default();
        cfg.pages.push(PageConfig {
            id: "root".to_string(),
            ..PageConfig::default()
        });
        assert!(cfg.validate().is_err());

        cfg.pages[0] = PageConfig {
            id: "child".to_string(),
            parent: Some("later".to_string()),
            ..PageConfig::default()
        };
        let err = cfg.validate().expect_err("forward parent");
        assert!(err.to_string().contains("declared before"));
    }
}
