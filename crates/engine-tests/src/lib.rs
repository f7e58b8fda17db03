#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

pub mod utils;

/// Writes `contents` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

pub fn read_file(path: &Path) -> String {
    fs::read_to_string(path).expect("read fixture")
}
