//! Session store backed by one JSON document per session.
//!
//! Layout: `<dir>/<session>.json`. Commits write a temp file and rename it over
//! the target, so a reader never observes a partially written snapshot. Loads
//! validate against the bundled schema before rebuilding the tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::io::store::SessionStore;
use crate::snapshot::SessionSnapshot;

const SNAPSHOT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/session_snapshot.v1.schema.json"
));

static SESSION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("session name pattern is valid"));

/// Validate that a session name is safe to use as a file stem.
pub fn validate_session_name(name: &str) -> Result<()> {
    if name.starts_with('.') {
        return Err(anyhow!("session name must not start with '.' (got '{name}')"));
    }
    if !SESSION_NAME_RE.is_match(name) {
        return Err(anyhow!(
            "session name must be [A-Za-z0-9._-] only (got '{name}')"
        ));
    }
    Ok(())
}

pub struct FileStore {
    dir: PathBuf,
    validator: Validator,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let schema: Value =
            serde_json::from_str(SNAPSHOT_SCHEMA).context("parse bundled snapshot schema")?;
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&schema)
            .map_err(|err| anyhow!("invalid snapshot schema: {err}"))?;
        Ok(Self {
            dir: dir.into(),
            validator,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self, name: &str) -> Result<PathBuf> {
        validate_session_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Names of stored sessions, sorted.
    pub fn sessions(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("read entry in {}", self.dir.display()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
                && validate_session_name(stem).is_ok()
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn validate_schema(&self, path: &Path, value: &Value) -> Result<()> {
        let messages: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect();
        if messages.is_empty() {
            return Ok(());
        }
        Err(anyhow!(
            "snapshot {} failed schema validation: {}",
            path.display(),
            messages.join("; ")
        ))
    }
}

impl SessionStore for FileStore {
    fn load(&self, name: &str) -> Result<Option<SessionSnapshot>> {
        let path = self.snapshot_path(name)?;
        if !path.exists() {
            debug!(session = name, "no stored snapshot");
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("parse snapshot {}", path.display()))?;
        self.validate_schema(&path, &value)?;
        let snapshot: SessionSnapshot = serde_json::from_value(value)
            .with_context(|| format!("deserialize snapshot {}", path.display()))?;
        debug!(session = name, active = %snapshot.active_id, pages = snapshot.tree.len(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    fn commit(&self, name: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let path = self.snapshot_path(name)?;
        let mut buf = serde_json::to_string_pretty(snapshot).context("serialize snapshot")?;
        buf.push('\n');
        write_atomic(&path, &buf)?;
        debug!(session = name, active = %snapshot.active_id, path = %path.display(), "snapshot committed");
        Ok(())
    }
}

/// Write `contents` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents).with_context(|| format!("write temp {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("replace {}", path.display()));
    }
    Ok(())
}
