// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Record the SMT-LIB input sent to a solver so it can be replayed.

use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    io,
    path::{Path, PathBuf},
};

use crate::sexp::Sexp;

/// The commands sent to one solver process so far, saved on demand under a
/// directory.
#[derive(Debug)]
pub struct Tee {
    dir: PathBuf,
    lines: Vec<String>,
}

impl Tee {
    /// Create a new empty `Tee` that saves into `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lines: vec![],
        }
    }

    /// Record an s-expression sent to the solver. Comments are written as
    /// SMT-LIB comments, and an empty comment as a blank line.
    pub fn append(&mut self, s: &Sexp) {
        let line = match s {
            Sexp::Comment(c) if c.is_empty() => String::new(),
            Sexp::Comment(c) => format!(";; {c}"),
            _ => s.to_string(),
        };
        self.lines.push(line);
    }

    /// Write the recorded input to `query-<hash>.smt2` in the directory, where
    /// the hash is of the contents. Returns the path of the written file.
    pub fn save(&self) -> io::Result<PathBuf> {
        let contents = self.lines.join("\n") + "\n";
        let mut hasher = DefaultHasher::new();
        contents.hash(&mut hasher);
        let hash = format!("{:016x}", hasher.finish());
        fs::create_dir_all(&self.dir)?;
        let dest = self.dir.join(format!("query-{}.smt2", &hash[..8]));
        fs::write(&dest, contents)?;
        Ok(dest)
    }
}
