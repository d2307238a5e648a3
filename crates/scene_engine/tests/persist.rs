use std::fs;

use scene_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_creates_folder_and_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("batch/Scene 1 Image 1.png", b"first").unwrap();
    assert_eq!(first, temp.path().join("batch").join("Scene 1 Image 1.png"));
    assert_eq!(fs::read(&first).unwrap(), b"first");

    let second = writer.write("batch/Scene 1 Image 1.png", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");
}

#[test]
fn rejects_paths_that_escape_the_root() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("root"));

    for bad in ["../escape.png", "/abs.png", ""] {
        let err = writer.write(bad, b"x").unwrap_err();
        assert!(matches!(err, PersistError::InvalidPath(_)), "{bad}: {err}");
    }
    assert!(!temp.path().join("escape.png").exists());
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("state.ron", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("state.ron").exists());
}
