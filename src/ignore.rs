//! File-exclusion planning for the publish branch.
//!
//! Given the manifest's `files` allowlist and any extra exclude patterns,
//! computes the set of paths to strip out of the release commit. The
//! crawl decides whole directories at the first boundary it can: a
//! directory no pattern reaches is emitted with a trailing slash and
//! never descended into.

use crate::error::{ReleaseError, Result};
use crate::manifest::MANIFEST_FILE;
use crate::repo::Repository;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;

/// Directories never descended into; always emitted as excluded.
const SKIP_DIRS: &[&str] = &[".git", "node_modules"];

/// Administrative files kept in every release.
fn administrative_files() -> Vec<String> {
    let mut keep = vec![".gitignore".to_string(), MANIFEST_FILE.to_string()];
    for name in [
        "README",
        "CHANGES",
        "CHANGELOG",
        "HISTORY",
        "LICENSE",
        "LICENCE",
        "NOTICE",
    ] {
        let lower = name.to_lowercase();
        keep.push(name.to_string());
        keep.push(format!("{}.*", name));
        keep.push(lower.clone());
        keep.push(format!("{}.*", lower));
    }
    keep
}

/// Compute the paths to exclude before publishing.
///
/// Returns `None` when nothing should be filtered. With an allowlist,
/// every path the allowlist (plus administrative files and the entry
/// point) does not keep is excluded; extra exclude patterns knock entries
/// out of the keep set first. Without an allowlist, exclude patterns
/// invert into an "only exclude these" plan that still keeps the
/// administrative files. Every emitted path is slash-prefixed and
/// relative to the repository root, in deterministic order.
pub fn plan(repo: &Repository, extra_excludes: &[String]) -> Result<Option<Vec<String>>> {
    let allowlist = repo.manifest().and_then(|m| m.files.clone());

    let mut keep: Vec<String>;
    let mut only: Vec<String> = Vec::new();

    if let Some(files) = allowlist {
        keep = files;
        keep.extend(administrative_files());
        if !extra_excludes.is_empty() {
            let exclude = build_globset(extra_excludes)?;
            keep.retain(|name| !exclude.is_match(name.trim_start_matches('/')));
        }
    } else if !extra_excludes.is_empty() {
        only = extra_excludes.to_vec();
        keep = administrative_files();
    } else {
        return Ok(None);
    }

    if let Some(entry) = entry_point(repo) {
        keep.push(entry);
    }

    let keep_set = build_globset(&keep)?;
    let only_set = if only.is_empty() {
        None
    } else {
        Some(build_globset(&only)?)
    };

    let mut excluded = Vec::new();
    walk(
        repo.dir(),
        "",
        &keep,
        &keep_set,
        only_set.as_ref(),
        &mut excluded,
    )?;
    Ok(Some(excluded))
}

/// Resolved entry-point file, slash-prefixed, when it exists on disk.
fn entry_point(repo: &Repository) -> Option<String> {
    let manifest = repo.manifest()?;
    let main = manifest.main.clone().unwrap_or_else(|| "index".to_string());
    let candidates = [
        main.clone(),
        format!("{}.js", main),
        format!("{}/index.js", main),
    ];
    for candidate in candidates {
        if repo.dir().join(&candidate).is_file() {
            return Some(format!("/{}", candidate));
        }
    }
    None
}

/// Compile patterns into a matcher over repository-relative paths.
///
/// A leading slash anchors a pattern at the root; slash-free patterns
/// also match at any depth and as whole directories.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let anchored = pattern.trim_start_matches('/');
        let mut variants = vec![anchored.to_string(), format!("{}/**", anchored)];
        if !pattern.contains('/') {
            variants.push(format!("**/{}", anchored));
        }
        for variant in variants {
            let glob = Glob::new(&variant).map_err(|e| {
                ReleaseError::config(format!("Invalid pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
    }
    builder
        .build()
        .map_err(|e| ReleaseError::config(e.to_string()))
}

/// True when a keep pattern names something inside `dir`, so the crawl
/// must look deeper before deciding.
fn reaches_into(patterns: &[String], dir: &str) -> bool {
    patterns
        .iter()
        .any(|p| p.trim_start_matches('/').starts_with(&format!("{}/", dir)))
}

fn walk(
    root: &Path,
    rel: &str,
    keep_patterns: &[String],
    keep: &GlobSet,
    only: Option<&GlobSet>,
    out: &mut Vec<String>,
) -> Result<()> {
    let dir = if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    };

    let mut entries: Vec<(String, bool)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let is_dir = entry.file_type()?.is_dir();
        entries.push((name, is_dir));
    }
    entries.sort();

    for (name, is_dir) in entries {
        let path = if rel.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", rel, name)
        };

        if is_dir {
            if SKIP_DIRS.contains(&name.as_str()) {
                out.push(format!("/{}", path));
                continue;
            }
            if only.is_some() {
                // only-mode decides per file; always look inside
                walk(root, &path, keep_patterns, keep, only, out)?;
            } else if keep.is_match(&path) {
                // wholly kept
            } else if reaches_into(keep_patterns, &path) {
                walk(root, &path, keep_patterns, keep, only, out)?;
            } else {
                out.push(format!("/{}/", path));
            }
        } else if keep.is_match(&path) {
            // kept
        } else if let Some(only_set) = only {
            if only_set.is_match(&path) {
                out.push(format!("/{}", path));
            }
        } else {
            out.push(format!("/{}", path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_administrative_files_cover_case_and_extensions() {
        let admin = administrative_files();
        assert!(admin.contains(&"README".to_string()));
        assert!(admin.contains(&"readme.*".to_string()));
        assert!(admin.contains(&"LICENSE.*".to_string()));
        assert!(admin.contains(&MANIFEST_FILE.to_string()));
    }

    #[test]
    fn test_globset_anchors_and_depth() {
        let set = build_globset(&["lib".to_string(), "/index.js".to_string()]).unwrap();
        assert!(set.is_match("lib"));
        assert!(set.is_match("lib/util/deep.js"));
        assert!(set.is_match("index.js"));
        assert!(!set.is_match("docs/guide.md"));
    }

    #[test]
    fn test_invalid_pattern_is_a_config_error() {
        let err = build_globset(&["a{".to_string()]).unwrap_err();
        assert!(matches!(err, ReleaseError::Config(_)));
    }

    #[test]
    fn test_reaches_into() {
        let patterns = vec!["lib/core".to_string(), "*.js".to_string()];
        assert!(reaches_into(&patterns, "lib"));
        assert!(!reaches_into(&patterns, "docs"));
    }
}
