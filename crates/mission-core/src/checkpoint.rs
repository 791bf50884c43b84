//! Working-tree snapshots stored as `refs/checkpoints/<mission>-<N>`.
//!
//! A checkpoint is an ordinary commit that no branch points at. Creating
//! one stages everything, commits, records the ref and then moves `HEAD`
//! back with a mixed reset, so neither the branch nor the working tree
//! changes. Numbering is `max(existing) + 1` per mission.

use crate::error::{MissionError, Result};
use crate::paths;
use crate::vcs::Vcs;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// `<mission>-<N>`, the handle callers pass to [`revert`].
    pub name: String,
    pub number: u32,
    #[serde(rename = "ref")]
    pub reference: String,
    pub commit: String,
}

/// Checkpoints of `mission_id`, ordered by number.
pub fn list(vcs: &dyn Vcs, mission_id: &str) -> Result<Vec<Checkpoint>> {
    paths::validate_mission_id(mission_id)?;
    let prefix = paths::checkpoint_ref_prefix(mission_id);
    let mut found = Vec::new();
    for reference in vcs.list_refs(&prefix)? {
        let Some(number) = reference.strip_prefix(&prefix).and_then(suffix_number) else {
            continue;
        };
        // Deleted between listing and resolving; skip it.
        let Some(commit) = vcs.resolve_ref(&reference)? else {
            continue;
        };
        found.push(Checkpoint {
            name: format!("{mission_id}-{number}"),
            number,
            reference,
            commit,
        });
    }
    found.sort_by_key(|c| c.number);
    Ok(found)
}

/// `m1-7` belongs to mission `m1`; `m1-x-7` does not.
fn suffix_number(suffix: &str) -> Option<u32> {
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Split `<mission>-<N>` and return `N`. Nothing else is passed to git.
fn parse_name(name: &str) -> Result<u32> {
    let invalid = || {
        MissionError::InvalidArgument(format!(
            "checkpoint name '{name}' must look like <mission>-<N>"
        ))
    };
    let (mission_id, suffix) = name.rsplit_once('-').ok_or_else(invalid)?;
    paths::validate_mission_id(mission_id).map_err(|_| invalid())?;
    suffix_number(suffix).ok_or_else(invalid)
}

/// Snapshot the working tree and return the checkpoint name.
pub fn create(vcs: &dyn Vcs, mission_id: &str) -> Result<String> {
    let next = match list(vcs, mission_id)?.last() {
        Some(c) => c
            .number
            .checked_add(1)
            .ok_or_else(|| MissionError::CounterOverflow(c.name.clone()))?,
        None => 1,
    };
    let name = format!("{mission_id}-{next}");
    let reference = paths::checkpoint_ref(&name);

    let head = vcs.head()?.ok_or(MissionError::NoHead)?;
    if let Err(e) = vcs.stage_all() {
        restore_head(vcs, &head);
        return Err(e);
    }
    let commit = match vcs.commit(&format!("checkpoint: {name}")) {
        Ok(commit) => commit,
        Err(e) => {
            restore_head(vcs, &head);
            return Err(e);
        }
    };
    if let Err(e) = vcs.create_ref(&reference, &commit) {
        restore_head(vcs, &head);
        return Err(e);
    }
    vcs.reset_mixed(&head)?;

    info!(checkpoint = %name, commit = %commit, "checkpoint created");
    Ok(name)
}

/// Restore the working tree to checkpoint `name` and delete its ref.
/// The branch stays where it is; the restored files show up as changes.
pub fn revert(vcs: &dyn Vcs, name: &str) -> Result<Checkpoint> {
    let number = parse_name(name)?;
    let reference = paths::checkpoint_ref(name);
    let commit = vcs
        .resolve_ref(&reference)?
        .ok_or_else(|| MissionError::CheckpointNotFound(name.to_string()))?;
    let head = vcs.head()?.ok_or(MissionError::NoHead)?;

    if let Err(e) = vcs.reset_hard(&commit) {
        restore_head(vcs, &head);
        return Err(e);
    }
    vcs.reset_mixed(&head)?;
    vcs.delete_ref(&reference)?;

    info!(checkpoint = %name, commit = %commit, "checkpoint reverted");
    Ok(Checkpoint {
        name: name.to_string(),
        number,
        reference,
        commit,
    })
}

/// Delete every checkpoint of `mission_id`. Refs that vanished in the
/// meantime are not an error. Returns how many were deleted.
pub fn clear(vcs: &dyn Vcs, mission_id: &str) -> Result<usize> {
    let mut deleted = 0;
    for checkpoint in list(vcs, mission_id)? {
        if vcs.delete_ref(&checkpoint.reference)? {
            deleted += 1;
        }
    }
    info!(mission = %mission_id, deleted, "checkpoints cleared");
    Ok(deleted)
}

fn restore_head(vcs: &dyn Vcs, head: &str) {
    if let Err(e) = vcs.reset_mixed(head) {
        warn!(head = %head, error = %e, "could not move HEAD back after failed checkpoint step");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::test_support::*;
    use crate::vcs::GitCli;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn status(dir: &Path) -> String {
        git(dir, &["status", "--porcelain"])
    }

    #[test]
    fn create_then_revert_restores_files() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        let head = git.head().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "v1").unwrap();

        let name = create(&git, "m1").unwrap();
        assert_eq!(name, "m1-1");
        assert_eq!(git.head().unwrap(), head, "branch must not move");
        assert_eq!(fs::read_to_string(&a).unwrap(), "v1");
        assert_eq!(
            status(dir.path()),
            "?? a.txt",
            "working tree left as found"
        );

        fs::write(&a, "v2").unwrap();
        let reverted = revert(&git, "m1-1").unwrap();
        assert_eq!(reverted.number, 1);
        assert_eq!(fs::read_to_string(&a).unwrap(), "v1");
        assert_eq!(git.head().unwrap(), head);
        assert_eq!(git.resolve_ref("refs/checkpoints/m1-1").unwrap(), None);

        assert!(matches!(
            revert(&git, "m1-1"),
            Err(MissionError::CheckpointNotFound(_))
        ));
    }

    #[test]
    fn tracked_modifications_are_snapshotted() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        let readme = dir.path().join("README.md");
        fs::write(&readme, "# changed\n").unwrap();

        create(&git, "m1").unwrap();
        fs::write(&readme, "# changed again\n").unwrap();
        revert(&git, "m1-1").unwrap();
        assert_eq!(fs::read_to_string(&readme).unwrap(), "# changed\n");
        assert_eq!(status(dir.path()), "M README.md");
    }

    #[test]
    fn numbering_is_max_plus_one() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        for expected in ["m1-1", "m1-2", "m1-3"] {
            assert_eq!(create(&git, "m1").unwrap(), expected);
        }
        revert(&git, "m1-2").unwrap();
        assert_eq!(create(&git, "m1").unwrap(), "m1-4");

        let numbers: Vec<u32> = list(&git, "m1").unwrap().iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 3, 4]);
    }

    #[test]
    fn missions_do_not_share_numbers() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        let head = git.head().unwrap().unwrap();
        git.create_ref("refs/checkpoints/m1-x-9", &head).unwrap();
        git.create_ref("refs/checkpoints/m10-5", &head).unwrap();

        assert_eq!(create(&git, "m1").unwrap(), "m1-1");
        assert_eq!(list(&git, "m1").unwrap().len(), 1);
    }

    #[test]
    fn clear_removes_only_that_mission() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        create(&git, "m1").unwrap();
        create(&git, "m1").unwrap();
        create(&git, "m2").unwrap();

        assert_eq!(clear(&git, "m1").unwrap(), 2);
        assert!(list(&git, "m1").unwrap().is_empty());
        assert_eq!(list(&git, "m2").unwrap().len(), 1);
        assert_eq!(clear(&git, "m1").unwrap(), 0);
    }

    #[test]
    fn checkpoint_needs_a_commit() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "--quiet"]);
        let cli = GitCli::new(dir.path());
        assert!(matches!(create(&cli, "m1"), Err(MissionError::NoHead)));
    }

    #[test]
    fn unsafe_mission_id_is_rejected() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        assert!(matches!(
            create(&git, "../m1"),
            Err(MissionError::InvalidMissionId(_))
        ));
    }

    #[test]
    fn suffix_must_be_numeric() {
        assert_eq!(suffix_number("12"), Some(12));
        assert_eq!(suffix_number(""), None);
        assert_eq!(suffix_number("x-1"), None);
        assert_eq!(suffix_number("+1"), None);
    }

    #[test]
    fn revert_rejects_revision_expressions() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        fs::write(dir.path().join("a.txt"), "v1").unwrap();
        create(&git, "m1").unwrap();
        let readme = dir.path().join("README.md");
        fs::write(&readme, "tracked edit\n").unwrap();

        for name in ["m1-1^", "m1-1~1", "m1-1^{commit}", "m1-", "-1", "../m1-1", "m1"] {
            let err = revert(&git, name).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument, "{name}");
        }
        assert_eq!(fs::read_to_string(&readme).unwrap(), "tracked edit\n");
        assert_eq!(list(&git, "m1").unwrap().len(), 1);
    }

    #[test]
    fn checkpoint_names_parse() {
        assert_eq!(parse_name("m1-3").unwrap(), 3);
        assert_eq!(parse_name("fix-login-12").unwrap(), 12);
        assert!(parse_name("m1-1^").is_err());
        assert!(parse_name("m1-99999999999").is_err());
    }

    #[test]
    fn numbering_stops_at_the_counter_limit() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = init_repo(dir.path());
        let head = git.head().unwrap().unwrap();
        git.create_ref(&format!("refs/checkpoints/m1-{}", u32::MAX), &head)
            .unwrap();
        let err = create(&git, "m1").unwrap_err();
        assert!(matches!(err, MissionError::CounterOverflow(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    }

    /// In-memory double that fails `create_ref`, to exercise rollback.
    struct FailingRef {
        head: RefCell<String>,
        resets: RefCell<Vec<String>>,
    }

    impl Vcs for FailingRef {
        fn head(&self) -> Result<Option<String>> {
            Ok(Some(self.head.borrow().clone()))
        }
        fn stage_all(&self) -> Result<()> {
            Ok(())
        }
        fn commit(&self, _message: &str) -> Result<String> {
            *self.head.borrow_mut() = "c1".to_string();
            Ok("c1".to_string())
        }
        fn create_ref(&self, name: &str, _commit: &str) -> Result<()> {
            Err(MissionError::Git {
                args: format!("update-ref {name}"),
                stderr: "locked".to_string(),
            })
        }
        fn resolve_ref(&self, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn list_refs(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn delete_ref(&self, _name: &str) -> Result<bool> {
            Ok(false)
        }
        fn reset_hard(&self, commit: &str) -> Result<()> {
            *self.head.borrow_mut() = commit.to_string();
            Ok(())
        }
        fn reset_mixed(&self, commit: &str) -> Result<()> {
            self.resets.borrow_mut().push(commit.to_string());
            *self.head.borrow_mut() = commit.to_string();
            Ok(())
        }
    }

    #[test]
    fn failed_ref_creation_rolls_head_back() {
        let vcs = FailingRef {
            head: RefCell::new("h0".to_string()),
            resets: RefCell::new(Vec::new()),
        };
        let err = create(&vcs, "m1").unwrap_err();
        assert!(matches!(err, MissionError::Git { .. }));
        assert_eq!(vcs.head().unwrap().as_deref(), Some("h0"));
        assert_eq!(*vcs.resets.borrow(), vec!["h0".to_string()]);
    }
}
