//! Build identification
//!
//! Commit, branch, tree state and build date are stamped in at compile time
//! through `GIT_COMMIT`, `GIT_BRANCH`, `GIT_STATE` and `BUILD_DATE`. Any that
//! are missing read as `unknown`.

use std::fmt;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub git_branch: &'static str,
    pub git_state: &'static str,
    pub build_date: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("GIT_COMMIT").unwrap_or(UNKNOWN),
            git_branch: option_env!("GIT_BRANCH").unwrap_or(UNKNOWN),
            git_state: option_env!("GIT_STATE").unwrap_or(UNKNOWN),
            build_date: option_env!("BUILD_DATE").unwrap_or(UNKNOWN),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    pub fn platform(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }

    /// One line, e.g. `v0.1.0 (abc1234, 2024-01-01T00:00:00Z, linux/x86_64)`
    pub fn short(&self) -> String {
        format!(
            "v{} ({}, {}, {})",
            self.version,
            self.git_commit,
            self.build_date,
            self.platform()
        )
    }

    /// Multi-line report for `--version-full`
    pub fn full(&self) -> String {
        format!(
            "Version:    v{}\n\
             Build date: {}\n\
             Git commit: {}\n\
             Git branch: {}\n\
             Git state:  {}\n\
             Platform:   {}",
            self.version,
            self.build_date,
            self.git_commit,
            self.git_branch,
            self.git_state,
            self.platform()
        )
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

pub fn short() -> String {
    VersionInfo::current().short()
}

pub fn full() -> String {
    VersionInfo::current().full()
}
