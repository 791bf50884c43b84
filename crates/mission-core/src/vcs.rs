//! Narrow façade over git used by the checkpoint engine.
//!
//! [`Vcs`] names the handful of operations checkpoints need; [`GitCli`]
//! implements them by shelling out to the `git` executable in a working
//! directory.

use crate::config::GitConfig;
use crate::error::{MissionError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

pub trait Vcs {
    /// Commit id of `HEAD`, or `None` in a repository without commits.
    fn head(&self) -> Result<Option<String>>;

    /// Stage every working-tree change, including untracked files.
    fn stage_all(&self) -> Result<()>;

    /// Commit the index and return the new commit id.
    fn commit(&self, message: &str) -> Result<String>;

    /// Point `name` at `commit`, creating or overwriting the ref.
    fn create_ref(&self, name: &str, commit: &str) -> Result<()>;

    /// Commit id `name` points at, or `None` if the ref does not exist.
    fn resolve_ref(&self, name: &str) -> Result<Option<String>>;

    /// Full names of every ref starting with `prefix`.
    fn list_refs(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete `name`. Returns `false` when it did not exist.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// Move `HEAD`, the index and the working tree to `commit`.
    fn reset_hard(&self, commit: &str) -> Result<()>;

    /// Move `HEAD` and the index to `commit`, leaving the working tree alone.
    fn reset_mixed(&self, commit: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

pub struct GitCli {
    working_dir: PathBuf,
    binary: String,
    author_name: String,
    author_email: String,
}

impl GitCli {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(working_dir, &GitConfig::default())
    }

    pub fn with_config(working_dir: impl Into<PathBuf>, config: &GitConfig) -> Self {
        Self {
            working_dir: working_dir.into(),
            binary: config.binary.clone(),
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, dir = %self.working_dir.display(), "running git");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.working_dir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(args = ?args, stderr = %stderr.trim(), "git exited non-zero");
        }
        Ok(output)
    }

    /// Run git and fail on a non-zero exit; returns trimmed stdout.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(args = ?args, stderr = %stderr, "git command failed");
            return Err(MissionError::Git {
                args: args.join(" "),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for GitCli {
    fn head(&self) -> Result<Option<String>> {
        self.resolve_ref("HEAD")
    }

    fn stage_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let name = format!("user.name={}", self.author_name);
        let email = format!("user.email={}", self.author_email);
        self.run_checked(&[
            "-c",
            &name,
            "-c",
            &email,
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            "--allow-empty",
            "--no-verify",
            "-m",
            message,
        ])?;
        self.head()?.ok_or(MissionError::NoHead)
    }

    fn create_ref(&self, name: &str, commit: &str) -> Result<()> {
        self.run_checked(&["update-ref", name, commit])?;
        Ok(())
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<String>> {
        let spec = format!("{name}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if output.status.success() {
            let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Ok(Some(id));
        }
        // `--quiet` turns "no such ref" into a bare exit status 1; anything
        // else (not a repository, bad binary) is a real failure.
        if output.status.code() == Some(1) {
            return Ok(None);
        }
        Err(MissionError::Git {
            args: format!("rev-parse --verify {spec}"),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<String>> {
        // for-each-ref only matches whole path components, so list the
        // enclosing directory and filter by the full prefix here.
        let dir = match prefix.rfind('/') {
            Some(i) => &prefix[..=i],
            None => "refs/",
        };
        let out = self.run_checked(&["for-each-ref", "--format=%(refname)", dir])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|r| r.starts_with(prefix))
            .map(str::to_string)
            .collect())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        if self.resolve_ref(name)?.is_none() {
            return Ok(false);
        }
        self.run_checked(&["update-ref", "-d", name])?;
        Ok(true)
    }

    fn reset_hard(&self, commit: &str) -> Result<()> {
        self.run_checked(&["reset", "--hard", "--quiet", commit])?;
        Ok(())
    }

    fn reset_mixed(&self, commit: &str) -> Result<()> {
        self.run_checked(&["reset", "--mixed", "--quiet", commit])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
