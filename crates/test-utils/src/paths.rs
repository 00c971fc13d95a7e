//! Scratch locations for files written by tests.

use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary directory removed when the returned guard drops.
pub fn temp_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Temporary directory with a name prefix.
pub fn temp_test_dir_with_prefix(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// A file path inside a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the path is used.
pub fn temp_output_path(file_name: &str) -> (TempDir, PathBuf) {
    let dir = temp_test_dir();
    let path = dir.path().join(file_name);
    (dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_output_path() {
        let (dir, path) = temp_output_path("out.tif");
        assert!(dir.path().exists());
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("out.tif"));
    }

    #[test]
    fn test_temp_test_dir_with_prefix() {
        let dir = temp_test_dir_with_prefix("geoimage_test_");
        assert!(dir.path().to_string_lossy().contains("geoimage_test_"));
    }
}
