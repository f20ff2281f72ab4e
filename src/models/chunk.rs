//! Chunk planning and the per-chunk request.
//!
//! A file of `total_bytes` is cut into `ceil(total_bytes / chunk_size)`
//! contiguous ranges. Every range is `chunk_size` long except possibly the
//! last, which holds the remainder. An exact division never yields a
//! trailing empty range.

use bytes::Bytes;
use std::num::NonZeroU64;
use std::ops::Range;
use uuid::Uuid;

/// Header names understood by the ingest endpoint.
pub mod headers {
    pub const FILE_NAME: &str = "file-name";
    pub const FILE_SIZE: &str = "file-size";
    pub const FIRST_CHUNK: &str = "first-chunk";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
}

/// One contiguous byte range `[start, end)` of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn as_range(&self) -> Range<u64> {
        self.start..self.end
    }
}

/// Partition of `[0, total_bytes)` into chunk ranges. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_bytes: u64,
    chunk_size: NonZeroU64,
}

impl ChunkPlan {
    pub fn new(total_bytes: u64, chunk_size: NonZeroU64) -> Self {
        Self {
            total_bytes,
            chunk_size,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size.get()
    }

    pub fn chunk_count(&self) -> u64 {
        self.total_bytes.div_ceil(self.chunk_size.get())
    }

    /// The range for chunk `index`, or `None` past the last chunk.
    pub fn range(&self, index: u64) -> Option<ChunkRange> {
        if index >= self.chunk_count() {
            return None;
        }
        let size = self.chunk_size.get();
        let start = index * size;
        let end = start.saturating_add(size).min(self.total_bytes);
        Some(ChunkRange { index, start, end })
    }

    /// Ranges in strictly increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkRange> + '_ {
        (0..self.chunk_count()).filter_map(move |i| self.range(i))
    }
}

/// One outbound transmission: a chunk body plus the session metadata that
/// is repeated on every chunk of the session.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub upload_id: Uuid,
    pub range: ChunkRange,
    pub total_size: u64,
    pub title: String,
    pub description: String,
    pub body: Bytes,
}

impl ChunkRequest {
    pub fn index(&self) -> u64 {
        self.range.index
    }

    pub fn is_first_chunk(&self) -> bool {
        self.range.is_first()
    }

    /// Header pairs sent with this chunk, excluding `content-type` and
    /// `content-length` which the transport derives from the body.
    pub fn header_pairs(&self) -> [(&'static str, String); 5] {
        [
            (headers::FILE_NAME, self.upload_id.to_string()),
            (headers::FILE_SIZE, self.total_size.to_string()),
            (headers::FIRST_CHUNK, self.is_first_chunk().to_string()),
            (headers::TITLE, self.title.clone()),
            (headers::DESCRIPTION, self.description.clone()),
        ]
    }
}
