// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use walkdir::WalkDir;

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("demos")
}

fn get_demos(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry.file_type().is_file() && entry.path().extension() == Some(OsStr::new("slice"))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

fn slicer(args: &[&str], file: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_slicer"))
        .arg("--color=never")
        .args(args)
        .arg(file.as_os_str())
        .output()
        .expect("could not run slicer")
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).expect("non-utf8 output")
}

fn stderr(out: &Output) -> String {
    String::from_utf8(out.stderr.clone()).expect("non-utf8 output")
}

const BOUNDED: [&str; 2] = ["--solver=bounded", "--int-bound=16"];

#[test]
fn print_roundtrip() {
    let demos = get_demos(&demos_dir());
    assert!(!demos.is_empty());
    for path in demos {
        println!("Printing {}", path.display());
        let out = slicer(&["print"], &path);
        assert!(out.status.success(), "could not print {}", path.display());
        let reprinted = std::env::temp_dir().join(format!(
            "slicer-{}-{}",
            std::process::id(),
            path.file_name().unwrap().to_string_lossy()
        ));
        std::fs::write(&reprinted, stdout(&out)).unwrap();
        let again = slicer(&["print"], &reprinted);
        std::fs::remove_file(&reprinted).unwrap();
        assert_eq!(stdout(&out), stdout(&again));
    }
}

#[test]
fn weaken_demos() {
    let cases: [(&str, &[&str], &str); 7] = [
        ("decrement.slice", &[], "y = 5"),
        ("decrement.slice", &["--strategy=syntactic"], "y = 5"),
        ("decrement.slice", &["--strategy=destructive"], "y = 5"),
        ("swap.slice", &[], "(a | b) & c >= 0"),
        ("swap.slice", &["--removal=first"], "(a | b) & c >= 0"),
        ("accumulate.slice", &[], "x > 0 & y > 0 & x > y"),
        ("factor.slice", &["--strategy=factorization"], "y = 5"),
    ];
    for (demo, flags, expected) in cases {
        let path = demos_dir().join(demo);
        println!("Weakening {demo} with {flags:?}");
        let args = [&["weaken"][..], &BOUNDED[..], flags].concat();
        let out = slicer(&args, &path);
        assert!(out.status.success(), "{demo} failed: {}", stderr(&out));
        assert_eq!(stdout(&out).trim(), expected, "{demo} with {flags:?}");
    }
}

#[test]
fn clause_demos() {
    let cases = [
        ("counter_clauses.slice", "x >= 0"),
        ("bounded_counter.slice", "x < 10 | x = 10\nx >= 0"),
    ];
    for (demo, expected) in cases {
        let path = demos_dir().join(demo);
        let args = [&["clauses"][..], &BOUNDED[..]].concat();
        let out = slicer(&args, &path);
        assert!(out.status.success(), "{demo} failed: {}", stderr(&out));
        assert_eq!(stdout(&out).trim(), expected, "{demo}");
    }
}

#[test]
fn statistics() {
    let path = demos_dir().join("decrement.slice");
    let args = [&["weaken"][..], &BOUNDED[..], &["--json"][..]].concat();
    let out = slicer(&args, &path);
    assert!(out.status.success());
    let stdout = stdout(&out);
    let (weakened, json) = stdout.split_once('\n').unwrap();
    assert_eq!(weakened, "y = 5");
    assert!(json.contains("\"queries\": 2"), "{json}");
    assert!(json.contains("\"guards\": 2"), "{json}");
}

#[test]
fn failures() {
    let fail = demos_dir().join("fail");
    for path in get_demos(&fail) {
        println!("Running {}", path.display());
        let out = slicer(&["weaken", "--solver=bounded"], &path);
        assert!(!out.status.success(), "{} succeeded", path.display());
    }

    let out = slicer(&["weaken"], &fail.join("sort_error.slice"));
    let message = stderr(&out);
    assert!(message.contains("sort checking error"), "{message}");

    let out = slicer(&["weaken"], &fail.join("parse_error.slice"));
    assert!(stderr(&out).contains("could not parse file"));

    // clauses only
    let out = slicer(
        &["weaken", "--solver=bounded"],
        &demos_dir().join("counter_clauses.slice"),
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("has no candidate"));

    let out = slicer(
        &["weaken", "--solver=bounded", "--strategy=syntactic", "--removal=all"],
        &demos_dir().join("decrement.slice"),
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unsupported configuration"));
}
