//! The local file handed to an upload.
//!
//! A source is either an in-memory buffer or a path on disk. File-backed
//! sources are never buffered whole: each chunk is read with a seek and an
//! exact read, so memory stays bounded by the chunk size.

use bytes::Bytes;
use std::{
    io::{self, ErrorKind, SeekFrom},
    ops::Range,
    path::{Path, PathBuf},
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};

/// MIME type used when neither the caller nor the file extension says otherwise.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug)]
enum Content {
    Memory(Bytes),
    File(PathBuf),
}

/// An immutable, randomly addressable byte sequence with a name and a MIME type.
#[derive(Clone, Debug)]
pub struct UploadSource {
    name: String,
    mime_type: String,
    total_bytes: u64,
    content: Content,
}

impl UploadSource {
    /// Wrap an in-memory buffer.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            total_bytes: data.len() as u64,
            content: Content::Memory(data),
        }
    }

    /// Describe a file on disk. The length is taken from its metadata now;
    /// bytes are only read chunk by chunk during the upload.
    ///
    /// When `mime_type` is `None` the type is guessed from the extension.
    pub async fn from_path(path: impl AsRef<Path>, mime_type: Option<String>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_type.unwrap_or_else(|| guess_mime_type(path).to_string());

        Ok(Self {
            name,
            mime_type,
            total_bytes: meta.len(),
            content: Content::File(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Open a reader for range reads. File-backed sources open the file once
    /// per reader.
    pub async fn reader(&self) -> io::Result<SourceReader> {
        let inner = match &self.content {
            Content::Memory(bytes) => ReaderInner::Memory(bytes.clone()),
            Content::File(path) => ReaderInner::File(File::open(path).await?),
        };
        Ok(SourceReader { inner })
    }
}

enum ReaderInner {
    Memory(Bytes),
    File(File),
}

/// Reads byte ranges out of an [`UploadSource`].
pub struct SourceReader {
    inner: ReaderInner,
}

impl SourceReader {
    /// Read exactly the bytes in `range`. A range past the end of the source
    /// fails with `UnexpectedEof`, which covers files truncated mid-upload.
    pub async fn read_range(&mut self, range: Range<u64>) -> io::Result<Bytes> {
        if range.start > range.end {
            return Err(io::Error::new(ErrorKind::InvalidInput, "inverted byte range"));
        }

        match &mut self.inner {
            ReaderInner::Memory(bytes) => {
                let start = to_usize(range.start)?;
                let end = to_usize(range.end)?;
                if end > bytes.len() {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("range ends at {end} but source holds {} bytes", bytes.len()),
                    ));
                }
                Ok(bytes.slice(start..end))
            }
            ReaderInner::File(file) => {
                let len = to_usize(range.end - range.start)?;
                file.seek(SeekFrom::Start(range.start)).await?;
                let mut buffer = vec![0; len];
                file.read_exact(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

fn to_usize(value: u64) -> io::Result<usize> {
    usize::try_from(value)
        .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "byte offset exceeds address space"))
}

/// Guess a video MIME type from a file extension (case-insensitive).
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("ogv") => "video/ogg",
        _ => FALLBACK_MIME_TYPE,
    }
}
