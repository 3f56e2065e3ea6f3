// src/seen.rs
//! Durable record of report ids that were already delivered.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored id set. A missing file is a normal first run; an
    /// unreadable or corrupt file degrades to "everything is new" with a
    /// warning. Loading never fails.
    pub fn load(&self) -> HashSet<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no seen-state file yet");
                return HashSet::new();
            }
            Err(e) => {
                tracing::warn!(error = ?e, path = %self.path.display(), "seen-state unreadable");
                return HashSet::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = ?e, path = %self.path.display(), "seen-state corrupt");
                HashSet::new()
            }
        }
    }

    /// Replace the stored set. Ids are written sorted (stable diffs for the
    /// git mirror) to a sibling temp file which then renames over the
    /// target, so a crash mid-write cannot leave a torn file.
    pub fn save(&self, seen: &HashSet<String>) -> Result<()> {
        let mut ids: Vec<&str> = seen.iter().map(String::as_str).collect();
        ids.sort_unstable();
        let json = serde_json::to_string(&ids).context("serializing seen-state")?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Best-effort secondary durable channel for the state file. Failures are
/// logged by the caller, never raised past the primary persistence path.
#[async_trait::async_trait]
pub trait MirrorSink: Send + Sync {
    async fn store(&self, path: &Path) -> Result<()>;
}

/// Commits and pushes the state file in its own working directory, for
/// deployments where the checkout itself is the durable remote copy
/// (scheduled CI runs). Committer identity is set for headless runners;
/// "nothing to commit" is not an error.
pub struct GitMirror {
    message: String,
}

impl GitMirror {
    pub fn new() -> Self {
        Self {
            message: "update seen ids".to_string(),
        }
    }
}

impl Default for GitMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MirrorSink for GitMirror {
    async fn store(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = path
            .file_name()
            .context("state path has no file name")?
            .to_owned();

        let _ = run_git(&dir, &["config", "user.name", "github-actions"]).await;
        let _ = run_git(&dir, &["config", "user.email", "actions@github.com"]).await;

        let add = tokio::process::Command::new("git")
            .args(["add", "--"])
            .arg(&file)
            .current_dir(&dir)
            .output()
            .await
            .context("running git add")?;
        if !add.status.success() {
            anyhow::bail!(
                "git add failed: {}",
                String::from_utf8_lossy(&add.stderr).trim()
            );
        }

        let commit = run_git(&dir, &["commit", "-m", self.message.as_str()]).await?;
        if !commit.status.success() {
            tracing::debug!("git commit made no change (nothing new to mirror)");
            return Ok(());
        }

        let push = run_git(&dir, &["push"]).await?;
        if !push.status.success() {
            anyhow::bail!(
                "git push failed: {}",
                String::from_utf8_lossy(&push.stderr).trim()
            );
        }
        Ok(())
    }
}

async fn run_git(dir: &Path, args: &[&str]) -> Result<std::process::Output> {
    tokio::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .with_context(|| format!("running git {}", args.first().copied().unwrap_or_default()))
}

// --- Test helper ---
pub struct MockSink {
    pub calls: std::sync::Mutex<Vec<PathBuf>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MirrorSink for MockSink {
    async fn store(&self, path: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen_ids.json"));

        let mut seen = HashSet::new();
        seen.insert("b".to_string());
        seen.insert("a".to_string());
        store.save(&seen).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"["a","b"]"#);
        assert_eq!(store.load(), seen);
    }

    #[test]
    fn missing_and_corrupt_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen_ids.json"));
        assert!(store.load().is_empty());

        fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_empty());
    }
}
