use anyhow::anyhow;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::error::JudgeCoreError;

/// Copies a single file into `dest_dir`, keeping its file name.
pub fn copy_into_dir(src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    let file_name = src.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no file name in {:?}", src),
        )
    })?;
    let dest = dest_dir.join(file_name);
    log::debug!("copying {:?} to {:?}", src, dest);
    fs::copy(src, &dest)?;
    Ok(dest)
}

/// Leading and trailing whitespace is insignificant, the rest must match byte for byte.
pub fn trimmed_eq(output: &[u8], answer: &[u8]) -> bool {
    output.trim_ascii() == answer.trim_ascii()
}

pub fn get_pathbuf_str(path: &Path) -> Result<String, JudgeCoreError> {
    match path.to_str() {
        Some(path_str) => Ok(path_str.to_owned()),
        None => Err(JudgeCoreError::AnyhowError(anyhow!(
            "PathBuf to str failed: {:?}",
            path
        ))),
    }
}
