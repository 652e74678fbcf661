//! Embeds the git version and commit of the build.
//!
//! `HEALTHLOG_VERSION` is `git describe` output (falling back to the crate
//! version outside a checkout) and `HEALTHLOG_COMMIT` the short commit hash.

use std::path::PathBuf;
use std::process::Command;

fn main() {
    let git_dir = git(&["rev-parse", "--git-dir"]).map(PathBuf::from);
    if let Some(ref dir) = git_dir {
        println!("cargo:rerun-if-changed={}", dir.join("HEAD").display());
        println!("cargo:rerun-if-changed={}", dir.join("refs").display());
        println!("cargo:rerun-if-changed={}", dir.join("index").display());
    }

    let version = git(&["describe", "--tags", "--always", "--dirty"])
        .map(|v| v.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=HEALTHLOG_VERSION={version}");
    println!("cargo:rustc-env=HEALTHLOG_COMMIT={commit}");
}

/// Run git in the crate directory, returning trimmed stdout on success.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8(output.stdout).ok()?;
    let trimmed = stdout.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
