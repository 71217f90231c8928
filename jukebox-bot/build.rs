//! Build script for jukebox-bot
//!
//! Stamps the binary with the short git hash and the build time. Both are
//! printed in the startup banner so chat logs can be matched to a build.

use std::process::Command;

fn main() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=JUKEBOX_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=JUKEBOX_BUILT_AT={}", built_at);
}
