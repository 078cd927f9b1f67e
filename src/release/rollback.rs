//! Compensating actions for failed releases.
//!
//! Every mutation the release flow performs records its inverse here; on
//! failure the stack unwinds newest-first, restoring the pre-release
//! branch heads and tag state.

use crate::error::Result;
use crate::repo::Repository;

/// Inverse of a single mutation performed during the release flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Hard-reset `branch` to the commit it pointed at before mutation.
    ResetBranch { branch: String, commit: String },
    /// Delete a tag the flow created.
    DeleteTag { name: String },
    /// Recreate a tag the flow deleted, at its recorded commit.
    RestoreTag { name: String, commit: String },
}

/// Records inverse actions as mutations happen and replays them in
/// reverse order when the release fails.
#[derive(Debug, Default)]
pub struct Rollback {
    actions: Vec<Compensation>,
}

impl Rollback {
    pub fn new() -> Self {
        Rollback {
            actions: Vec::new(),
        }
    }

    /// Record the inverse of a mutation that just happened.
    pub fn push(&mut self, action: Compensation) {
        self.actions.push(action);
    }

    /// Undo every recorded mutation, newest first.
    ///
    /// Tag compensations are best-effort: a tag that cannot be deleted or
    /// recreated is swallowed. A failed branch reset leaves the
    /// repository in an unknown state and is surfaced through the
    /// returned error instead.
    pub fn unwind(self, repo: &Repository) -> Result<()> {
        for action in self.actions.into_iter().rev() {
            match action {
                Compensation::ResetBranch { branch, commit } => {
                    repo.checkout_force(&branch)?;
                    repo.reset(&commit, true)?;
                }
                Compensation::DeleteTag { name } => {
                    let _ = repo.delete_tag(&name);
                }
                Compensation::RestoreTag { name, commit } => {
                    let _ = repo.create_tag(&name, &commit);
                }
            }
        }
        Ok(())
    }
}
