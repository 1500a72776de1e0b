//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use stash::NamingPolicy;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Entry names of a zip archive, in stored order.
pub fn zip_entries(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Read one entry of a zip archive as a string.
pub fn zip_entry(path: &Path, name: &str) -> String {
    use std::io::Read;

    let file = fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut contents = String::new();
    entry.read_to_string(&mut contents).unwrap();
    contents
}

/// A naming policy with sub-second resolution, so back-to-back runs of one
/// job never collide on the artifact name.
pub fn fine_naming(prefix: &str) -> NamingPolicy {
    NamingPolicy::new()
        .with_prefix(prefix)
        .with_time_format("%Y%m%d-%H%M%S%.6f")
        .unwrap()
        .with_time_zone("UTC")
        .unwrap()
}

/// Files directly inside `dir`, sorted.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// Poll `condition` every 10ms until it holds.
///
/// # Panics
///
/// Panics if the timeout is reached first.
pub async fn wait_until<F>(what: &str, timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    loop {
        if condition() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
