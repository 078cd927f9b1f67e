//! Release orchestration.
//!
//! The flow runs as a small state machine: validate preconditions,
//! resolve the target version, commit the bump on the main branch, move
//! the release onto the publish branch, strip non-published files, run
//! the external build and publish commands, and end back on the main
//! branch. Every mutation after the bump records its inverse on a
//! [rollback::Rollback] stack; any failure unwinds it before the error is
//! re-raised, so a failed release leaves the repository exactly where it
//! started.

pub mod rollback;

use crate::config::Config;
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::ignore;
use crate::repo::{LogSink, Repository};
use crate::version;
use self::rollback::{Compensation, Rollback};
use semver::Version;
use std::path::Path;

/// Options controlling one release invocation.
pub struct ReleaseOptions {
    /// Explicit version or increment keyword; required unless rebasing.
    pub target: Option<String>,

    /// Re-publish the latest released version without bumping.
    pub rebase: bool,

    /// Tolerate a dirty tree by stashing around the release.
    pub stash: bool,

    /// Extra exclude patterns merged with the configured ones.
    pub exclude: Vec<String>,

    /// Log every state-mutating step instead of running it.
    pub dry_run: bool,

    /// Progress sink; defaults to discarding lines.
    pub log: LogSink,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        ReleaseOptions {
            target: None,
            rebase: false,
            stash: false,
            exclude: Vec::new(),
            dry_run: false,
            log: LogSink::null(),
        }
    }
}

/// What a completed release did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Latest version before this release, if any.
    pub previous: Option<Version>,
    /// The released version.
    pub version: Version,
    pub rebased: bool,
    pub dry_run: bool,
}

/// Run the whole release flow in `dir`.
pub fn release(dir: &Path, config: &Config, opts: ReleaseOptions) -> Result<ReleaseOutcome> {
    release_with_runner(dir, config, opts, Box::new(ProcessRunner))
}

/// As [release], with a caller-supplied command runner.
pub fn release_with_runner(
    dir: &Path,
    config: &Config,
    opts: ReleaseOptions,
    runner: Box<dyn CommandRunner>,
) -> Result<ReleaseOutcome> {
    // Rejected before any repository inspection.
    if opts.rebase && opts.target.is_some() {
        return Err(ReleaseError::ConflictingMode);
    }

    let mut repo = Repository::open(dir, runner, opts.dry_run, opts.log.clone())?;

    // 1. Preconditions. A rebase always requires a clean tree; otherwise
    //    dirtiness is tolerated only behind the stash escape.
    if (!opts.stash || opts.rebase) && !repo.is_clean()? {
        return Err(ReleaseError::NotClean);
    }

    // 2. Version resolution.
    let latest = repo.tags()?.into_iter().max();
    let target = if opts.rebase {
        latest.clone().ok_or(ReleaseError::NoRebaseTarget)?
    } else {
        version::resolve(opts.target.as_deref(), latest.as_ref())?
    };

    // 3. Change detection. A rebase only amends the most recent release;
    //    a normal release needs something new to publish.
    if let Some(prev) = latest.as_ref() {
        let tagged = repo
            .find_commit(&prev.to_string())?
            .ok_or_else(|| ReleaseError::MissingTagCommit(prev.to_string()))?;
        let head = repo.head()?;
        if opts.rebase {
            if head != tagged {
                return Err(ReleaseError::NotAtLatestRelease(prev.to_string()));
            }
        } else if head == tagged {
            return Err(ReleaseError::NoChanges(prev.to_string()));
        }
    }

    // Everything past this point mutates. The stash pop is the outermost
    // guaranteed cleanup; the rollback stack is the inner one.
    if opts.stash {
        repo.stash_push()?;
    }
    let result = execute(&mut repo, config, &opts, latest.as_ref(), &target);
    if opts.stash {
        let popped = repo.stash_pop();
        result.and(popped)?;
    } else {
        result?;
    }

    // 11. Rebuild on the main branch so compiled artifacts match the
    //     released version in the developer's tree. Outside the rollback
    //     scope: the release itself already succeeded.
    if repo.manifest().is_some() {
        run_command(&repo, &opts, &config.commands.build, &[])?;
    }

    Ok(ReleaseOutcome {
        previous: latest,
        version: target,
        rebased: opts.rebase,
        dry_run: opts.dry_run,
    })
}

/// Steps 4-10: from the bump commit to the return to the main branch,
/// guarded by the compensating-action stack.
fn execute(
    repo: &mut Repository,
    config: &Config,
    opts: &ReleaseOptions,
    latest: Option<&Version>,
    target: &Version,
) -> Result<()> {
    let main = repo.current_branch()?;
    let start = repo.head()?;
    let mut undo = Rollback::new();

    // 4. Bump or re-tag.
    let result = if opts.rebase {
        opts.log.line(&format!("{} (rebase)", target));
        undo.push(Compensation::RestoreTag {
            name: target.to_string(),
            commit: start.clone(),
        });
        repo.delete_tag(&target.to_string())
    } else {
        let from = latest.cloned().unwrap_or_else(version::zero);
        opts.log.line(&format!("{} -> {}", from, target));
        undo.push(Compensation::ResetBranch {
            branch: main.clone(),
            commit: start.clone(),
        });
        repo.bump(target)
    };

    let result = match result {
        Ok(()) => publish(repo, config, opts, target, &main, &start, &mut undo),
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => match undo.unwind(repo) {
            Ok(()) => Err(err),
            Err(cause) => Err(ReleaseError::RollbackFailed {
                original: Box::new(err),
                cause: Box::new(cause),
            }),
        },
    }
}

/// Steps 5-10: the publish-branch choreography. Hooks are renamed aside
/// for the duration and restored no matter how this returns.
fn publish(
    repo: &mut Repository,
    config: &Config,
    opts: &ReleaseOptions,
    target: &Version,
    main: &str,
    start: &str,
    undo: &mut Rollback,
) -> Result<()> {
    // 5. Move the release onto the publish branch, discarding any drift
    //    it accumulated from prior filtered commits.
    let branch = config.publish_branch.as_str();
    if repo.branches()?.iter().any(|b| b == branch) {
        let tip = repo.branch_tip(branch)?;
        repo.checkout(branch, false)?;
        undo.push(Compensation::ResetBranch {
            branch: branch.to_string(),
            commit: tip,
        });
        repo.reset(main, true)?;
    } else {
        repo.checkout(branch, true)?;
        undo.push(Compensation::ResetBranch {
            branch: branch.to_string(),
            commit: start.to_string(),
        });
    }

    let hooks = disable_hooks(repo)?;
    let result = on_publish_branch(repo, config, opts, target, main, undo);
    let restored = restore_hooks(repo, &hooks);
    result.and(restored)
}

/// Steps 6-10, with hooks already out of the way.
fn on_publish_branch(
    repo: &mut Repository,
    config: &Config,
    opts: &ReleaseOptions,
    target: &Version,
    main: &str,
    undo: &mut Rollback,
) -> Result<()> {
    // 6. Build for publication.
    if repo.manifest().is_some() {
        run_command(repo, opts, &config.commands.build, &[])?;
    }

    // 7. Strip non-published files out of the bump commit.
    let mut excludes = config.exclude.clone();
    excludes.extend(opts.exclude.iter().cloned());
    if let Some(paths) = ignore::plan(repo, &excludes)? {
        if !paths.is_empty() {
            repo.exclude_from_commit(&paths)?;
        }
    }

    // 8. Resolve the push target: explicit upstream, or the default
    //    remote/branch pair.
    let upstream = repo
        .upstream()?
        .unwrap_or_else(|| format!("{}/{}", config.remote, config.publish_branch));
    opts.log.line(&format!("Pushing to: {}", upstream));
    let (remote, branch) = upstream
        .split_once('/')
        .unwrap_or((config.remote.as_str(), config.publish_branch.as_str()));

    // 9. Publish. The external command pushes the commit and creates the
    //    version tag.
    let version = target.to_string();
    undo.push(Compensation::DeleteTag {
        name: version.clone(),
    });
    run_command(
        repo,
        opts,
        &config.commands.publish,
        &[version.as_str(), remote, branch],
    )?;

    // 10. End on the main branch with a tree matching the bump commit.
    repo.checkout_force(main)?;
    repo.reset("HEAD", true)?;
    Ok(())
}

/// Rename every installed hook aside, undoing what was already moved if
/// one rename fails.
fn disable_hooks(repo: &Repository) -> Result<Vec<String>> {
    let mut disabled = Vec::new();
    for name in repo.hooks()? {
        if let Err(err) = repo.disable_hook(&name) {
            let _ = restore_hooks(repo, &disabled);
            return Err(err);
        }
        disabled.push(name);
    }
    Ok(disabled)
}

/// Put disabled hooks back, reporting the first failure after attempting
/// every restore.
fn restore_hooks(repo: &Repository, names: &[String]) -> Result<()> {
    let mut result = Ok(());
    for name in names {
        if let Err(err) = repo.restore_hook(name) {
            if result.is_ok() {
                result = Err(err);
            }
        }
    }
    result
}

/// Run an external build or publish command in the repository root,
/// honoring dry-run mode.
fn run_command(
    repo: &Repository,
    opts: &ReleaseOptions,
    command: &[String],
    extra: &[&str],
) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };
    let mut argv: Vec<String> = args.to_vec();
    argv.extend(extra.iter().map(|s| s.to_string()));
    if opts.dry_run {
        let line = format!("dry-run: {} {}", program, argv.join(" "));
        opts.log.line(line.trim_end());
        return Ok(());
    }
    repo.run(program, &argv)?;
    Ok(())
}
