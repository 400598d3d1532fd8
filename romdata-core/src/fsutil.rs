use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dest.with_file_name(format!(".{}.tmp{}", name, std::process::id()))
}

/// Writes `bytes` to `dest` through a sibling temp file and a rename, so an
/// interrupted save leaves the previous file untouched.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_path_for(dest);
    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, dest)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

/// Plain or atomic write depending on the session's save mode.
pub fn write_file(dest: &Path, bytes: &[u8], atomic: bool) -> Result<()> {
    if atomic {
        return write_atomic(dest, bytes);
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(dest, bytes)?;
    Ok(())
}
