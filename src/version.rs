//! Version resolution: tag cleaning, increment keywords, and target
//! validation.
//!
//! Versions follow the semantic versioning specification; ordering and
//! syntax come from the `semver` crate, increment keywords implement the
//! conventional `major`/`minor`/`patch`/`pre*` rules on top of it.

use crate::error::{ReleaseError, Result};
use semver::{BuildMetadata, Prerelease, Version};

/// The zero sentinel used when no version has been released yet.
///
/// It is never itself a valid release target.
pub fn zero() -> Version {
    Version::new(0, 0, 0)
}

/// Parse a version from a tag name, tolerating a `v`/`V` prefix.
///
/// Invalid or non-version tags yield `None`; they are not release
/// candidates and are silently dropped from the tag history.
pub fn clean_tag(tag: &str) -> Option<Version> {
    let clean = tag.trim().trim_start_matches(['v', 'V']);
    Version::parse(clean).ok()
}

/// An increment keyword from a release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    Major,
    Minor,
    Patch,
    PreMajor,
    PreMinor,
    PrePatch,
    PreRelease,
}

impl Increment {
    /// Parse an increment keyword; `None` when `s` is not a keyword.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "major" => Some(Increment::Major),
            "minor" => Some(Increment::Minor),
            "patch" => Some(Increment::Patch),
            "premajor" => Some(Increment::PreMajor),
            "preminor" => Some(Increment::PreMinor),
            "prepatch" => Some(Increment::PrePatch),
            "prerelease" => Some(Increment::PreRelease),
            _ => None,
        }
    }

    /// Apply this increment to `current`.
    ///
    /// Follows the standard semantic-version increment rules:
    /// - `major`/`minor`/`patch` first finalize a matching pre-release
    ///   (`1.2.0-rc.1` + `minor` -> `1.2.0`), otherwise bump and reset the
    ///   lower components (`1.2.3` + `patch` -> `1.2.4`).
    /// - `premajor`/`preminor`/`prepatch` always bump and start a fresh
    ///   numeric pre-release (`1.2.3` + `prepatch` -> `1.2.4-0`).
    /// - `prerelease` advances an existing pre-release (`1.2.3-beta.1` ->
    ///   `1.2.3-beta.2`) or behaves like `prepatch` on a final version.
    pub fn apply(self, current: &Version) -> Result<Version> {
        let next = match self {
            Increment::Major => {
                if !current.pre.is_empty() && current.minor == 0 && current.patch == 0 {
                    Version::new(current.major, 0, 0)
                } else {
                    Version::new(current.major + 1, 0, 0)
                }
            }
            Increment::Minor => {
                if !current.pre.is_empty() && current.patch == 0 {
                    Version::new(current.major, current.minor, 0)
                } else {
                    Version::new(current.major, current.minor + 1, 0)
                }
            }
            Increment::Patch => {
                if !current.pre.is_empty() {
                    Version::new(current.major, current.minor, current.patch)
                } else {
                    Version::new(current.major, current.minor, current.patch + 1)
                }
            }
            Increment::PreMajor => {
                with_pre(Version::new(current.major + 1, 0, 0), "0")?
            }
            Increment::PreMinor => {
                with_pre(Version::new(current.major, current.minor + 1, 0), "0")?
            }
            Increment::PrePatch => with_pre(
                Version::new(current.major, current.minor, current.patch + 1),
                "0",
            )?,
            Increment::PreRelease => {
                if current.pre.is_empty() {
                    with_pre(
                        Version::new(current.major, current.minor, current.patch + 1),
                        "0",
                    )?
                } else {
                    with_pre(
                        Version::new(current.major, current.minor, current.patch),
                        &bumped_pre(&current.pre),
                    )?
                }
            }
        };
        Ok(next)
    }
}

/// Attach a pre-release identifier to a bare version.
fn with_pre(mut version: Version, pre: &str) -> Result<Version> {
    version.pre = Prerelease::new(pre)
        .map_err(|_| ReleaseError::InvalidVersion(format!("-{}", pre)))?;
    version.build = BuildMetadata::EMPTY;
    Ok(version)
}

/// Advance a pre-release: increment a trailing numeric component, or
/// append `.0` when there is none.
fn bumped_pre(pre: &Prerelease) -> String {
    let mut parts: Vec<String> = pre.as_str().split('.').map(String::from).collect();
    match parts.last().and_then(|p| p.parse::<u64>().ok()) {
        Some(n) => {
            let last = parts.len() - 1;
            parts[last] = (n + 1).to_string();
        }
        None => parts.push("0".to_string()),
    }
    parts.join(".")
}

/// Resolve a release request against the latest released version.
///
/// `target` is an increment keyword or an explicit version. Explicit
/// versions must be syntactically valid, must not be less than `latest`,
/// and must differ from both `latest` and the zero sentinel.
pub fn resolve(target: Option<&str>, latest: Option<&Version>) -> Result<Version> {
    let base = latest.cloned().unwrap_or_else(zero);
    let target = target.ok_or_else(|| {
        ReleaseError::InvalidVersion("no version or release type given".to_string())
    })?;

    if let Some(increment) = Increment::parse(target) {
        return increment.apply(&base);
    }

    let requested = Version::parse(target.trim_start_matches('v'))
        .map_err(|_| ReleaseError::InvalidVersion(target.to_string()))?;

    if base > requested {
        return Err(ReleaseError::VersionRegression {
            latest: base.to_string(),
            requested: requested.to_string(),
        });
    }
    if requested == base || requested == zero() {
        return Err(ReleaseError::AlreadyReleased(requested.to_string()));
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_clean_tag() {
        assert_eq!(clean_tag("v1.2.3"), Some(v("1.2.3")));
        assert_eq!(clean_tag("V1.2.3"), Some(v("1.2.3")));
        assert_eq!(clean_tag("1.2.3-beta.1"), Some(v("1.2.3-beta.1")));
        assert_eq!(clean_tag("release-1"), None);
        assert_eq!(clean_tag("1.2"), None);
    }

    #[test]
    fn test_increment_parse() {
        assert_eq!(Increment::parse("patch"), Some(Increment::Patch));
        assert_eq!(Increment::parse("premajor"), Some(Increment::PreMajor));
        assert_eq!(Increment::parse("1.2.3"), None);
        assert_eq!(Increment::parse("Patch"), None);
    }

    #[test]
    fn test_apply_major() {
        assert_eq!(Increment::Major.apply(&v("1.2.3")).unwrap(), v("2.0.0"));
        assert_eq!(Increment::Major.apply(&v("2.0.0-rc.1")).unwrap(), v("2.0.0"));
        assert_eq!(Increment::Major.apply(&v("1.2.3-rc.1")).unwrap(), v("2.0.0"));
    }

    #[test]
    fn test_apply_minor() {
        assert_eq!(Increment::Minor.apply(&v("1.2.3")).unwrap(), v("1.3.0"));
        assert_eq!(Increment::Minor.apply(&v("1.3.0-rc.1")).unwrap(), v("1.3.0"));
        assert_eq!(Increment::Minor.apply(&v("1.3.1-rc.1")).unwrap(), v("1.4.0"));
    }

    #[test]
    fn test_apply_patch() {
        assert_eq!(Increment::Patch.apply(&v("1.2.3")).unwrap(), v("1.2.4"));
        assert_eq!(Increment::Patch.apply(&v("1.2.3-rc.1")).unwrap(), v("1.2.3"));
    }

    #[test]
    fn test_apply_pre_increments() {
        assert_eq!(Increment::PreMajor.apply(&v("1.2.3")).unwrap(), v("2.0.0-0"));
        assert_eq!(Increment::PreMinor.apply(&v("1.2.3")).unwrap(), v("1.3.0-0"));
        assert_eq!(Increment::PrePatch.apply(&v("1.2.3")).unwrap(), v("1.2.4-0"));
    }

    #[test]
    fn test_apply_prerelease() {
        assert_eq!(
            Increment::PreRelease.apply(&v("1.2.3")).unwrap(),
            v("1.2.4-0")
        );
        assert_eq!(
            Increment::PreRelease.apply(&v("1.2.4-0")).unwrap(),
            v("1.2.4-1")
        );
        assert_eq!(
            Increment::PreRelease.apply(&v("1.2.4-beta")).unwrap(),
            v("1.2.4-beta.0")
        );
        assert_eq!(
            Increment::PreRelease.apply(&v("1.2.4-beta.1")).unwrap(),
            v("1.2.4-beta.2")
        );
    }

    #[test]
    fn test_resolve_keyword_from_latest() {
        let latest = v("1.1.0");
        assert_eq!(
            resolve(Some("patch"), Some(&latest)).unwrap(),
            v("1.1.1")
        );
        assert_eq!(
            resolve(Some("major"), Some(&latest)).unwrap(),
            v("2.0.0")
        );
    }

    #[test]
    fn test_resolve_keyword_without_latest_uses_zero() {
        assert_eq!(resolve(Some("patch"), None).unwrap(), v("0.0.1"));
        assert_eq!(resolve(Some("minor"), None).unwrap(), v("0.1.0"));
        assert_eq!(resolve(Some("prerelease"), None).unwrap(), v("0.0.1-0"));
    }

    #[test]
    fn test_resolve_explicit_version() {
        let latest = v("1.1.0");
        assert_eq!(
            resolve(Some("1.2.0"), Some(&latest)).unwrap(),
            v("1.2.0")
        );
        assert_eq!(
            resolve(Some("v1.2.0"), Some(&latest)).unwrap(),
            v("1.2.0")
        );
    }

    #[test]
    fn test_resolve_rejects_invalid() {
        let err = resolve(Some("not-a-version"), None).unwrap_err();
        assert_eq!(err.code(), Some("BAD_VER"));
        let err = resolve(None, None).unwrap_err();
        assert_eq!(err.code(), Some("BAD_VER"));
    }

    #[test]
    fn test_resolve_rejects_regression() {
        let latest = v("1.1.0");
        let err = resolve(Some("1.0.5"), Some(&latest)).unwrap_err();
        assert!(matches!(err, ReleaseError::VersionRegression { .. }));
        assert_eq!(err.code(), Some("BAD_VER"));
    }

    #[test]
    fn test_resolve_rejects_already_released() {
        let latest = v("1.1.0");
        let err = resolve(Some("1.1.0"), Some(&latest)).unwrap_err();
        assert!(matches!(err, ReleaseError::AlreadyReleased(_)));

        let err = resolve(Some("0.0.0"), None).unwrap_err();
        assert!(matches!(err, ReleaseError::AlreadyReleased(_)));
    }

    #[test]
    fn test_resolve_allows_prerelease_targets() {
        let latest = v("1.1.0");
        assert_eq!(
            resolve(Some("1.2.0-rc.1"), Some(&latest)).unwrap(),
            v("1.2.0-rc.1")
        );
        // pre-release of the latest version orders below it
        let err = resolve(Some("1.1.0-rc.1"), Some(&latest)).unwrap_err();
        assert!(matches!(err, ReleaseError::VersionRegression { .. }));
    }
}
