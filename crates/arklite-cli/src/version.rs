//! Build metadata baked in by `build.rs`.

use std::fmt;

/// Immutable description of this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Git-derived version (e.g. 0.3.0 or 0.3.0-4-g1a2b3c4)
    pub version: &'static str,
    pub git_branch: &'static str,
    /// Short commit hash
    pub git_rev: &'static str,
    /// Build time (UTC)
    pub build_date: &'static str,
    /// Target triple
    pub target: &'static str,
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    version: env!("GIT_VERSION"),
    git_branch: env!("GIT_BRANCH"),
    git_rev: env!("GIT_HASH"),
    build_date: env!("BUILD_DATE"),
    target: env!("BUILD_TARGET"),
};

/// One-line version string for log output
pub const VERSION: &str = concat!(
    env!("GIT_VERSION"),
    " (",
    env!("GIT_BRANCH"),
    "@",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arklite {}\n  Branch:  {}\n  Commit:  {}\n  Built:   {}\n  Target:  {}",
            self.version, self.git_branch, self.git_rev, self.build_date, self.target
        )
    }
}
