//! Build script recording the build environment and checking for an X11
//! display when the `x11` feature is enabled.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=DISPLAY");

    if env::var_os("CARGO_FEATURE_X11").is_some() {
        check_x11();
    }

    // Print detected environment
    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
    println!("cargo:rustc-env=BUILD_HOST={}", env::var("HOST").unwrap_or_default());
}

fn check_x11() {
    let target = env::var("TARGET").unwrap_or_default();
    if !(target.contains("linux") || target.contains("bsd")) {
        println!("cargo:warning=The x11 feature targets X11 desktops; {target} may not have one.");
        return;
    }
    if env::var_os("DISPLAY").is_none() {
        println!("cargo:warning=DISPLAY is not set. The X11 cursor sink needs a running X server at runtime.");
    }
}
