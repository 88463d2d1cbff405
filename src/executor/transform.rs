//! Content transforms applied while copying a file

use crate::types::FileMeta;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Readable side handed to a transform
pub type SourceReader<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Writable side handed to a transform
pub type DestinationWriter<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Produces destination bytes from source bytes.
///
/// The executor opens both handles, flushes and closes the writer once the
/// transform returns, and only then considers the file copied. An error
/// returned here fails the entry and no destination file is left behind.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Returns the number of bytes written to `writer`.
    async fn transform(
        &self,
        reader: SourceReader<'_>,
        writer: DestinationWriter<'_>,
        meta: &FileMeta,
    ) -> io::Result<u64>;
}

/// Default transform: raw byte-for-byte stream copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCopy;

#[async_trait]
impl Transform for RawCopy {
    async fn transform(
        &self,
        reader: SourceReader<'_>,
        writer: DestinationWriter<'_>,
        _meta: &FileMeta,
    ) -> io::Result<u64> {
        tokio::io::copy(reader, writer).await
    }
}
