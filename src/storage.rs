//! On-disk storage artifact.
//!
//! The artifact is a single file the server appends the received message
//! to and then streams back to the client. It lives for one session:
//! created on first append, removed before the process exits.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Chunk size for streaming the artifact back to the client.
pub const CHUNK_SIZE: usize = 1024;

/// Handle to the storage artifact at a fixed path.
#[derive(Debug, Clone)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `data` to the artifact, creating it if it does not exist.
    ///
    /// An empty `data` still creates the file, matching the append-mode
    /// open happening before anything is written.
    pub fn append(&self, data: &[u8]) -> Result<(), ArtifactError> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(ArtifactError::Open)?;
        file.write_all(data).map_err(ArtifactError::Write)?;
        debug!(path = %self.path.display(), bytes = data.len(), "Appended to artifact");
        Ok(())
    }

    /// Stream the artifact's full contents into `out` in fixed-size
    /// chunks, one write per chunk read. Returns the total byte count.
    pub fn stream_to<W: Write>(&self, out: &mut W) -> Result<u64, ArtifactError> {
        let mut file = File::open(&self.path).map_err(ArtifactError::Open)?;
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let n = file.read(&mut chunk).map_err(ArtifactError::Read)?;
            if n == 0 {
                break;
            }
            out.write_all(&chunk[..n]).map_err(ArtifactError::Write)?;
            total += n as u64;
        }

        Ok(total)
    }

    /// Delete the artifact from disk.
    pub fn remove(&self) -> io::Result<()> {
        std::fs::remove_file(&self.path)
    }
}

/// Artifact I/O errors, tagged with the phase that failed.
///
/// `Open` is kept separate so the server can report an artifact that
/// cannot be opened differently from a transfer that failed midway.
#[derive(Debug)]
pub enum ArtifactError {
    Open(io::Error),
    Read(io::Error),
    Write(io::Error),
}

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactError::Open(e) => write!(f, "Failed to open artifact: {e}"),
            ArtifactError::Read(e) => write!(f, "Failed to read artifact: {e}"),
            ArtifactError::Write(e) => write!(f, "Failed to write artifact data: {e}"),
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactError::Open(e) | ArtifactError::Read(e) | ArtifactError::Write(e) => Some(e),
        }
    }
}
