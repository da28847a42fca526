//! Exports the git revision for `--version` and checks the source tree
//! against the project's lint policy.

use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "toml"];

const SKIPPED_DIRS: &[&str] = &["target", ".git", "examples"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=src");

    let sha = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=CLAUDEBAR_GIT_SHA={}", sha.trim());

    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect(&root, &mut files);

    let mut problems = Vec::new();
    for path in &files {
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        let rel = path.strip_prefix(&root).unwrap_or(path).display().to_string();
        problems.extend(check_file(&rel, &content));
    }

    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {}", problem);
        }
        panic!("{} source policy violation(s)", problems.len());
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if path.is_dir() {
            if !SKIPPED_DIRS.contains(&name) {
                collect(&path, files);
            }
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| CHECKED_EXTENSIONS.contains(&ext))
        {
            files.push(path);
        }
    }
}

/// Line limit for every checked file; for Rust sources, also no
/// `allow(dead_code)` and no env mutation in a test lacking `#[serial]`.
fn check_file(rel: &str, content: &str) -> Vec<String> {
    let mut problems = Vec::new();

    let lines = content.lines().filter(|l| !l.trim().is_empty()).count();
    if lines > MAX_LINES {
        problems.push(format!("{}: {} lines (max {}), split it up", rel, lines, MAX_LINES));
    }

    if !rel.ends_with(".rs") || rel == "build.rs" {
        return problems;
    }

    let mut serial = false;
    let mut test_depth: Option<i32> = None;
    for (n, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            continue;
        }
        let is_allow = trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow(");
        if is_allow && trimmed.contains("dead_code") {
            problems.push(format!("{}:{}: remove the dead code instead", rel, n + 1));
        }
        if trimmed == "#[serial]" {
            serial = true;
        }
        if trimmed == "#[test]" || trimmed.starts_with("#[tokio::test") {
            test_depth = Some(0);
        }

        let Some(depth) = test_depth.as_mut() else {
            continue;
        };
        if !serial && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var")) {
            problems.push(format!("{}:{}: env mutation in a test without #[serial]", rel, n + 1));
        }
        let opened = line.matches('{').count() as i32;
        let closed = line.matches('}').count() as i32;
        *depth += opened - closed;
        if *depth <= 0 && closed > 0 {
            test_depth = None;
            serial = false;
        }
    }

    problems
}
