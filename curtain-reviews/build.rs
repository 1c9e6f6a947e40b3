//! Embeds the identity of this build into curtain-reviews
//!
//! Sets `CURTAIN_GIT_REV`, `CURTAIN_BUILD_TIME` and `CURTAIN_BUILD_PROFILE`
//! for `report::BuildInfo`. Outside a git checkout the revision is "unknown".

use std::process::Command;

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}

fn git_revision() -> String {
    let Some(rev) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return "unknown".to_string();
    };
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"]).is_some_and(|s| !s.is_empty());
    if dirty {
        format!("{}-dirty", rev)
    } else {
        rev
    }
}

fn main() {
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("CURTAIN_GIT_REV", git_revision()),
        ("CURTAIN_BUILD_TIME", built_at),
        ("CURTAIN_BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
}
