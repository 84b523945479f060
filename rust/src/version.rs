//! Build information for `fortify version`.
//!
//! The commit hash and build time are stamped at compile time through the
//! `FORTIFY_COMMIT` and `FORTIFY_BUILD_TIME` environment variables; plain
//! `cargo build` leaves them as `-`.

use std::fmt::Write as _;

use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT_HASH: &str = match option_env!("FORTIFY_COMMIT") {
    Some(commit) => commit,
    None => "-",
};
pub const BUILD_TIME: &str = match option_env!("FORTIFY_BUILD_TIME") {
    Some(time) => time,
    None => "-",
};

/// `1.2.3` or `1.2.3 (abc1234)` when the commit is known.
pub fn version_string() -> String {
    if COMMIT_HASH == "-" {
        VERSION.to_string()
    } else {
        format!("{VERSION} ({COMMIT_HASH})")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionDetail {
    pub version: String,
    pub commit_hash: String,
    pub build_time: String,
    pub package: String,
    pub target_os: String,
    pub target_arch: String,
    pub profile: String,
}

impl VersionDetail {
    pub fn current() -> Self {
        Self {
            version: VERSION.to_string(),
            commit_hash: COMMIT_HASH.to_string(),
            build_time: BUILD_TIME.to_string(),
            package: env!("CARGO_PKG_NAME").to_string(),
            target_os: std::env::consts::OS.to_string(),
            target_arch: std::env::consts::ARCH.to_string(),
            profile: if cfg!(debug_assertions) { "debug" } else { "release" }.to_string(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Version    : {}", self.version);
        let _ = writeln!(out, "Git Commit : {}", self.commit_hash);
        let _ = writeln!(out, "Build Time : {}", self.build_time);
        let _ = writeln!(out, "Target     : {}-{}", self.target_arch, self.target_os);
        let _ = writeln!(out, "Profile    : {}", self.profile);
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_package_version() {
        assert!(version_string().starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn detail_renders_as_text_and_json() {
        let detail = VersionDetail::current();
        let text = detail.to_text();
        assert!(text.starts_with(&format!("Version    : {VERSION}\n")));
        assert!(text.contains("Git Commit : "));

        let json: serde_json::Value = serde_json::from_str(&detail.to_json().unwrap()).unwrap();
        assert_eq!(json["version"], VERSION);
        assert_eq!(json["package"], "fortify");
    }
}
