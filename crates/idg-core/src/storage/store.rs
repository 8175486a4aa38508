use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const BUFFER_BYTES: usize = 64 * 1024;

/// Sequential writer for one segment's temp file. Owned by exactly one worker.
pub struct SegmentStore {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl SegmentStore {
    /// Create (or truncate) the temp file at `path` for writing.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(BUFFER_BYTES, file),
            written: 0,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered bytes and sync to disk. Returns the total bytes written.
    pub fn finalize(self) -> io::Result<u64> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;
        Ok(self.written)
    }

    /// Drop the writer and delete the temp file.
    pub fn discard(self) -> io::Result<()> {
        drop(self.writer);
        remove_if_exists(&self.path)
    }
}

/// Delete `path`, treating "not found" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
