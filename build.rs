use std::process::Command;

fn main() {
    let build_time = command_stdout("date", &["+%Y-%m-%d %H:%M:%S"]);
    let revision = command_stdout("git", &["rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_time);
    println!("cargo:rustc-env=BUILD_REVISION={}", revision);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/tui/theme.toml");
}

fn command_stdout(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
