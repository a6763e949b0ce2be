use std::env;
use std::process::Command;

fn main() {
    set_build_info();
    set_platform_config();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}

fn set_build_info() {
    let build_time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    // Commit hash only when building from a checkout
    if let Ok(output) = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output() {
        if output.status.success() {
            let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=GIT_COMMIT={}", commit);
        }
    }

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET_TRIPLE={}", target);
}

fn set_platform_config() {
    println!("cargo::rustc-check-cfg=cfg(release_build)");

    // The timed loop is only meaningful in optimized builds
    if env::var("PROFILE").unwrap_or_default() == "release" {
        println!("cargo:rustc-cfg=release_build");
    }
}
