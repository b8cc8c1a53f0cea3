//! File helpers shared by the store documents and the journal.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::store::{StoreError, StoreResult};

/// Reads a file, mapping a missing file to `None`.
pub fn read_optional(path: &Path) -> StoreResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Writes `bytes` next to `path` and renames over it.
///
/// Readers see either the old or the new content, never a torn file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    ensure_parent(path)?;

    let file_name = path.file_name().and_then(|v| v.to_str()).unwrap_or("file");
    let tmp_path = path.with_file_name(format!("{file_name}.ccmcp-tmp"));

    let mut file = fs::File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| StoreError::io(&tmp_path, e))?;
    drop(file);

    // Windows rename requires the target not to exist.
    #[cfg(windows)]
    {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }

    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))
}

/// Appends one line, creating the file when missing.
pub fn append_line(path: &Path, line: &str) -> StoreResult<()> {
    ensure_parent(path)?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(line.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .and_then(|_| file.sync_data())
        .map_err(|e| StoreError::io(path, e))
}

fn ensure_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_optional_missing_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let out = read_optional(&dir.path().join("missing.json")).expect("read");
        assert!(out.is_none());
    }

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("a").join("b").join("doc.json");
        write_atomic(&path, b"{}\n").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}\n");
        assert!(!dir.path().join("a/b/doc.json.ccmcp-tmp").exists());

        write_atomic(&path, b"[]\n").expect("overwrite");
        assert_eq!(fs::read_to_string(&path).expect("read"), "[]\n");
    }

    #[test]
    fn append_line_accumulates() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("log.jsonl");
        append_line(&path, "one").expect("append");
        append_line(&path, "two").expect("append");
        assert_eq!(fs::read_to_string(&path).expect("read"), "one\ntwo\n");
    }
}
