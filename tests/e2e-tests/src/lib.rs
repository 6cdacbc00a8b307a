//! E2E test support: locates the `testexe` helper and stages binaries
//! directories for the harness to spawn.
//!
//! `testexe` is a workspace binary, so a workspace-level `cargo test` builds
//! it into the same target directory as the test executables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Path to the compiled `testexe` helper next to the test binary.
pub fn testexe_path() -> PathBuf {
    let mut path = env::current_exe()
        .expect("current_exe")
        .parent()
        .expect("target dir")
        .to_path_buf();
    // Test binaries live in target/<profile>/deps; testexe one level up.
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("testexe");
    assert!(
        path.exists(),
        "testexe not built at {} (run `cargo test` from the workspace root)",
        path.display()
    );
    path
}

/// Stage a binaries directory holding `ss-server` and `ss-tunnel` copies of
/// `testexe`.
pub fn stage_bin_dir(dir: &Path) {
    let exe = testexe_path();
    fs::copy(&exe, dir.join("ss-server")).expect("copy ss-server");
    fs::copy(&exe, dir.join("ss-tunnel")).expect("copy ss-tunnel");
}
