//! Shared test utilities for integration tests
//!
//! Builds small on-disk fixture trees of rename candidates.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Create a temp tree containing `files` (relative paths, empty contents)
pub fn make_tree(files: &[&str]) -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    for rel in files
    {
        tmp.child(rel)
            .write_str("")
            .expect("write fixture file");
    }

    tmp
}

/// Two scan folders whose files share names, plus a numbered series
/// that collapses onto one name under a prefix-stripping rule.
pub fn make_scans_fixture() -> assert_fs::TempDir
{
    make_tree(&[
        "Invoices/scan.pdf",
        "Receipts/scan.pdf",
        "Series/01_part.txt",
        "Series/02_part.txt",
        "Series/notes.txt",
    ])
}

/// Write a rendiff.toml at the root of `tmp`
pub fn write_config(
    tmp: &assert_fs::TempDir,
    body: &str,
)
{
    tmp.child("rendiff.toml")
        .write_str(body)
        .expect("write rendiff.toml");
}
