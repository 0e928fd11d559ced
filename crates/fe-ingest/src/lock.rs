//! Advisory lock test for files the engine may still be writing.

use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::Path;

/// True when another handle holds `path` exclusively or it cannot be opened
/// for writing at all (Windows sharing violations surface this way).
pub fn is_locked(path: &Path) -> bool {
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(_) => return true,
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}
