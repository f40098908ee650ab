//! Atomic file replacement
//!
//! Data is written to a sibling `.tmp` file and renamed over the target on
//! commit, so readers only ever see the previous or the complete new
//! contents.

use crate::error::Result;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Atomic file writer that writes to a temporary file and renames on success
#[derive(Debug)]
pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: BufWriter<File>,
}

impl AtomicWriter {
    /// Create a new atomic writer for the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();

        if let Some(parent) = final_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp_path = Self::temp_path(&final_path);
        let file = BufWriter::new(File::create(&temp_path)?);

        Ok(Self {
            temp_path,
            final_path,
            file,
        })
    }

    /// Replace `path` with `data` in one step
    pub fn replace<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
        let mut writer = Self::new(path)?;
        writer.file.write_all(data)?;
        writer.commit()
    }

    /// Final destination of this writer
    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, sync and rename the temp file over the final path
    pub fn commit(mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;

        // Drop would otherwise delete the temp file
        let temp_path = std::mem::take(&mut self.temp_path);
        let final_path = std::mem::take(&mut self.final_path);

        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // Uncommitted writes are discarded
        if !self.temp_path.as_os_str().is_empty() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
