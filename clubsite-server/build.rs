//! Embeds build identification for `/health` and the startup banner
//!
//! Exposes `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` via `env!`.
//! Container builds without a `.git` directory can pass the commit in
//! `CLUBSITE_GIT_HASH`; `SOURCE_DATE_EPOCH` pins the timestamp for
//! reproducible builds.

use chrono::{DateTime, SecondsFormat, Utc};
use std::env;
use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn commit_hash() -> String {
    if let Ok(hash) = env::var("CLUBSITE_GIT_HASH") {
        if !hash.trim().is_empty() {
            return hash.trim().to_string();
        }
    }

    let output = match Command::new("git").args(["rev-parse", "--short=8", "HEAD"]).output() {
        Ok(output) if output.status.success() => output,
        _ => return UNKNOWN.to_string(),
    };
    match String::from_utf8(output.stdout) {
        Ok(hash) if !hash.trim().is_empty() => hash.trim().to_string(),
        _ => UNKNOWN.to_string(),
    }
}

fn build_time() -> DateTime<Utc> {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|epoch| epoch.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

fn main() {
    println!("cargo:rerun-if-env-changed=CLUBSITE_GIT_HASH");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    // Rebuild on commit or branch switch when built from a checkout
    for head in ["../.git/HEAD", "../.git/refs/heads"] {
        if Path::new(head).exists() {
            println!("cargo:rerun-if-changed={}", head);
        }
    }

    let timestamp = build_time().to_rfc3339_opts(SecondsFormat::Secs, true);
    let profile = env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string());

    println!("cargo:rustc-env=GIT_HASH={}", commit_hash());
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
