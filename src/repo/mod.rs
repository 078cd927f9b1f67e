//! Repository handle: git operations and manifest access.
//!
//! [Repository] wraps the command runner with the narrow set of
//! version-control operations the release flow needs. It owns the
//! manifest and the dry-run mode: state-mutating git subcommands and file
//! writes are logged and skipped in a dry run, while read-only queries
//! execute normally so version and branch resolution reflect real
//! repository state.

pub mod mock;

use crate::error::{ReleaseError, Result};
use crate::exec::CommandRunner;
use crate::manifest::{Manifest, MANIFEST_FILE};
use regex::Regex;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Progress sink shared by the repository handle and the orchestrator.
///
/// The default sink discards everything; the CLI wires one to stdout.
#[derive(Clone)]
pub struct LogSink(Rc<dyn Fn(&str)>);

impl LogSink {
    /// Sink that forwards lines to `f`.
    pub fn new(f: impl Fn(&str) + 'static) -> Self {
        LogSink(Rc::new(f))
    }

    /// Sink that discards all progress lines.
    pub fn null() -> Self {
        LogSink(Rc::new(|_| {}))
    }

    /// Emit one progress line.
    pub fn line(&self, message: &str) {
        self.0.as_ref()(message)
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::null()
    }
}

/// Git subcommands that mutate repository state.
///
/// In dry-run mode these are logged and skipped; everything else runs.
const MUTATING: &[&str] = &[
    "add", "checkout", "commit", "rebase", "reset", "revert", "rm", "stash", "tag",
];

/// Suffix hooks are renamed to while release commits are being made.
const HOOK_OFF_SUFFIX: &str = ".off";

/// Handle on the working tree being released.
pub struct Repository {
    dir: PathBuf,
    manifest: Option<Manifest>,
    runner: Box<dyn CommandRunner>,
    dry_run: bool,
    log: LogSink,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("dir", &self.dir)
            .field("manifest", &self.manifest)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Open `dir`, reading the manifest if one exists.
    ///
    /// Fails with `NOT_GIT` when `dir` has no `.git` directory.
    pub fn open(
        dir: impl Into<PathBuf>,
        runner: Box<dyn CommandRunner>,
        dry_run: bool,
        log: LogSink,
    ) -> Result<Self> {
        let dir = dir.into();
        if !dir.join(".git").is_dir() {
            return Err(ReleaseError::NotGit(dir.display().to_string()));
        }
        let manifest = Manifest::load(&dir)?;
        Ok(Repository {
            dir,
            manifest,
            runner,
            dry_run,
            log,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Run a git command, skipping state mutation in dry-run mode.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        if self.dry_run && args.first().is_some_and(|sub| MUTATING.contains(sub)) {
            self.log.line(&format!("dry-run: git {}", args.join(" ")));
            return Ok(String::new());
        }
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.runner.run("git", &owned, &self.dir)
    }

    /// Run an arbitrary external command in the repository root.
    pub fn run(&self, program: &str, args: &[String]) -> Result<String> {
        self.runner.run(program, args, &self.dir)
    }

    /// True iff a porcelain status query returns no output.
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.git(&["status", "--porcelain"])?.is_empty())
    }

    /// All syntactically valid version tags.
    pub fn tags(&self) -> Result<Vec<Version>> {
        let names = self.list_dir(".git/refs/tags")?;
        Ok(names
            .iter()
            .filter_map(|name| crate::version::clean_tag(name))
            .collect())
    }

    /// Local branch names.
    pub fn branches(&self) -> Result<Vec<String>> {
        self.list_dir(".git/refs/heads")
    }

    /// Installed hook names, samples and already-disabled hooks excluded.
    pub fn hooks(&self) -> Result<Vec<String>> {
        Ok(self
            .list_dir(".git/hooks")?
            .into_iter()
            .filter(|name| !name.ends_with(".sample") && !name.ends_with(HOOK_OFF_SUFFIX))
            .collect())
    }

    /// Sorted file names of a directory inside the repository.
    fn list_dir(&self, sub: &str) -> Result<Vec<String>> {
        let path = self.dir.join(sub);
        if !path.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            if let Ok(name) = entry?.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Current HEAD commit id.
    pub fn head(&self) -> Result<String> {
        self.git(&["rev-list", "-n", "1", "HEAD"])
    }

    /// Name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Tip commit of a branch without checking it out.
    pub fn branch_tip(&self, branch: &str) -> Result<String> {
        self.git(&["rev-parse", branch])
    }

    /// Find the commit whose message is exactly `subject`.
    pub fn find_commit(&self, subject: &str) -> Result<Option<String>> {
        let pattern = format!("^{}$", regex::escape(subject));
        let out = self.git(&["log", "--grep", &pattern, "--pretty=format:%H"])?;
        Ok(out.lines().next().map(|line| line.to_string()))
    }

    /// Switch branches, optionally creating the target first.
    ///
    /// Git reports the switch itself on stderr; that message is success,
    /// anything else is re-raised.
    pub fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        let result = if create {
            self.git(&["checkout", "-b", branch])
        } else {
            self.git(&["checkout", branch])
        };
        match result {
            Ok(_) => Ok(()),
            Err(ReleaseError::Execution(msg)) if msg.starts_with("Switched to") => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Forcibly switch branches, discarding working-tree conflicts.
    pub fn checkout_force(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", branch, "-f"]).map(|_| ())
    }

    /// Tracking ref of the current branch, or `None` when unset.
    pub fn upstream(&self) -> Result<Option<String>> {
        match self.git(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"]) {
            Ok(output) if output.is_empty() => Ok(None),
            Ok(output) => Ok(Some(output)),
            Err(ReleaseError::Execution(msg)) if msg.contains("no upstream") => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Move the current branch pointer to `target`, discarding the
    /// working tree when `hard` is set.
    pub fn reset(&self, target: &str, hard: bool) -> Result<()> {
        let mode = if hard { "--hard" } else { "--soft" };
        self.git(&["reset", mode, target]).map(|_| ())
    }

    /// Stash tracked and untracked changes.
    pub fn stash_push(&self) -> Result<()> {
        self.git(&["stash", "-u"]).map(|_| ())
    }

    /// Restore the most recent stash.
    pub fn stash_pop(&self) -> Result<()> {
        self.git(&["stash", "pop"]).map(|_| ())
    }

    pub fn delete_tag(&self, name: &str) -> Result<()> {
        self.git(&["tag", "-d", name]).map(|_| ())
    }

    /// Recreate a tag at a recorded commit.
    pub fn create_tag(&self, name: &str, target: &str) -> Result<()> {
        self.git(&["tag", name, target]).map(|_| ())
    }

    /// Commit the version bump.
    ///
    /// Rewrites the manifest version (no-op if unchanged) and a
    /// `<name> v<previous>` marker in README.md, stages everything, and
    /// commits with the version string as the message. The commit is
    /// created even when nothing changed; downstream steps key off its
    /// existence, not its diff.
    pub fn bump(&mut self, version: &Version) -> Result<()> {
        if let Some(mut manifest) = self.manifest.take() {
            let previous = manifest.version.clone();
            let next = version.to_string();
            if previous != next {
                manifest.version = next.clone();
                self.write_file(MANIFEST_FILE, &manifest.to_json()?)?;
            }
            self.rewrite_readme(manifest.bare_name(), &previous, &next)?;
            self.manifest = Some(manifest);
        }
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-m", &version.to_string(), "--allow-empty"])?;
        Ok(())
    }

    /// Rewrite a `<name> v<previous>` marker in README.md, if present.
    ///
    /// Scoped to the previous version so unrelated version-like text is
    /// left alone.
    fn rewrite_readme(&self, name: &str, previous: &str, next: &str) -> Result<()> {
        let path = self.dir.join("README.md");
        if !path.is_file() {
            return Ok(());
        }
        let readme = fs::read_to_string(&path)?;
        let marker = Regex::new(&format!(
            "{} v{}",
            regex::escape(name),
            regex::escape(previous)
        ))
        .map_err(|e| ReleaseError::manifest(e.to_string()))?;
        let replacement = format!("{} v{}", name, next);
        let replaced = marker.replace(&readme, regex::NoExpand(&replacement));
        if replaced != readme {
            self.write_file("README.md", &replaced)?;
        }
        Ok(())
    }

    /// Re-stage everything under an ignore file listing `paths` and fold
    /// the result into the bump commit, leaving the ignore file itself
    /// untracked.
    pub fn exclude_from_commit(&self, paths: &[String]) -> Result<()> {
        self.write_file(".gitignore", &paths.join("\n"))?;
        self.git(&["rm", "-r", "--cached", "."])?;
        self.git(&["add", "-A"])?;
        self.git(&["rm", "--cached", ".gitignore"])?;
        self.git(&["commit", "--amend", "--no-edit"])?;
        Ok(())
    }

    /// Rename a hook out of the way so release commits do not trigger it.
    pub fn disable_hook(&self, name: &str) -> Result<()> {
        self.rename_hook(name, &format!("{}{}", name, HOOK_OFF_SUFFIX))
    }

    /// Put a disabled hook back.
    pub fn restore_hook(&self, name: &str) -> Result<()> {
        self.rename_hook(&format!("{}{}", name, HOOK_OFF_SUFFIX), name)
    }

    fn rename_hook(&self, from: &str, to: &str) -> Result<()> {
        if self.dry_run {
            self.log
                .line(&format!("dry-run: rename hook {} -> {}", from, to));
            return Ok(());
        }
        let hooks = self.dir.join(".git/hooks");
        fs::rename(hooks.join(from), hooks.join(to))?;
        Ok(())
    }

    /// Write a file inside the repository, honoring dry-run mode.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<()> {
        if self.dry_run {
            self.log.line(&format!("dry-run: write {}", name));
            return Ok(());
        }
        fs::write(self.dir.join(name), contents)?;
        Ok(())
    }
}
