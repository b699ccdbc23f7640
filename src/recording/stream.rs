//! JSON Lines writer and reader for snapshot recordings.

use crate::core::Snapshot;
use crate::error::{Result, TrackingError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// Value of the header's `format` field.
pub const FORMAT_NAME: &str = "contour-tracking";
/// Current recording format version.
pub const FORMAT_VERSION: u32 = 1;

/// First line of every recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingHeader {
    pub format: String,
    pub version: u32,
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RecordingHeader {
    fn new() -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

/// Appends snapshots to a recording file.
pub struct RecordingWriter {
    out: BufWriter<File>,
    header: RecordingHeader,
    written: usize,
}

impl RecordingWriter {
    /// Create (or truncate) a recording and write its header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut out = BufWriter::new(File::create(path)?);
        let header = RecordingHeader::new();
        write_line(&mut out, &header)?;
        tracing::info!(path = %path.display(), session = %header.session_id, "recording started");

        Ok(Self {
            out,
            header,
            written: 0,
        })
    }

    pub fn append(&mut self, snapshot: &Snapshot) -> Result<()> {
        write_line(&mut self.out, snapshot)?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Number of snapshots appended so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn session_id(&self) -> Uuid {
        self.header.session_id
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }
}

impl Drop for RecordingWriter {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::warn!("failed to flush recording: {e}");
        }
    }
}

fn write_line<T: Serialize>(out: &mut BufWriter<File>, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).map_err(std::io::Error::from)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// A loaded recording.
#[derive(Debug, Clone)]
pub struct Recording {
    pub header: RecordingHeader,
    /// Snapshots in recorded order, up to the first unreadable line.
    pub snapshots: Vec<Snapshot>,
    /// Why reading stopped early, if it did.
    pub truncated: Option<String>,
}

impl Recording {
    pub fn is_complete(&self) -> bool {
        self.truncated.is_none()
    }
}

/// Load a recording.
///
/// Fails only when the file cannot be opened or the header is unusable. A
/// damaged or cut-off tail ends the snapshot list and is reported in
/// [`Recording::truncated`].
pub fn read_recording(path: impl AsRef<Path>) -> Result<Recording> {
    let path = path.as_ref();
    let mut lines = BufReader::new(File::open(path)?).lines();

    let header_line = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(TrackingError::Decode {
                line: 1,
                message: "empty recording".to_string(),
            })
        }
    };
    let header: RecordingHeader =
        serde_json::from_str(&header_line).map_err(|e| TrackingError::Decode {
            line: 1,
            message: e.to_string(),
        })?;
    if header.format != FORMAT_NAME || header.version > FORMAT_VERSION {
        return Err(TrackingError::Decode {
            line: 1,
            message: format!("unsupported format {} v{}", header.format, header.version),
        });
    }

    let mut snapshots = Vec::new();
    let mut truncated = None;

    for (index, line) in lines.enumerate() {
        let line_no = index + 2;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                truncated = Some(format!("line {line_no}: {e}"));
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Snapshot>(&line) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                truncated = Some(format!("line {line_no}: {e}"));
                break;
            }
        }
    }

    if let Some(reason) = &truncated {
        tracing::warn!(
            path = %path.display(),
            loaded = snapshots.len(),
            "recording truncated: {reason}"
        );
    }

    Ok(Recording {
        header,
        snapshots,
        truncated,
    })
}
