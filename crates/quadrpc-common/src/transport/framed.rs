use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::protocol::error::{QuadrpcError, Result};
use crate::protocol::Frame;
use crate::transport::codec::{JsonCodec, MAX_FRAME_SIZE};

/// Splits a byte stream into a frame reader and a frame writer.
///
/// The halves can be driven from different tasks, which is what lets the
/// two directions of a call progress independently.
pub fn framed<S>(stream: S) -> (FrameReader<ReadHalf<S>>, FrameWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (read, write) = tokio::io::split(stream);
    (FrameReader::new(read), FrameWriter::new(write))
}

/// Reads length-prefixed frames.
///
/// Wire format: `[4-byte length as u32 big-endian] + [JSON frame]`
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly on a frame
    /// boundary. A stream that ends inside a frame is a connection error.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut len_buf = [0u8; 4];
        let mut filled = 0;
        while filled < len_buf.len() {
            let n = self
                .inner
                .read(&mut len_buf[filled..])
                .await
                .map_err(|e| map_io_error(e, "reading length prefix"))?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(QuadrpcError::Connection(
                    "stream ended inside a length prefix".to_string(),
                ));
            }
            filled += n;
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(QuadrpcError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .await
            .map_err(|e| map_io_error(e, "reading frame body"))?;

        let frame = JsonCodec::decode_frame(&buf)?;
        tracing::trace!(kind = frame.kind(), len, "read frame");
        Ok(Some(frame))
    }
}

/// Writes length-prefixed frames.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let encoded = JsonCodec::encode_frame(frame)?;
        let len = encoded.len() as u32;

        self.inner
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| map_io_error(e, "writing length prefix"))?;
        self.inner
            .write_all(&encoded)
            .await
            .map_err(|e| map_io_error(e, "writing frame body"))?;
        self.inner
            .flush()
            .await
            .map_err(|e| map_io_error(e, "flushing stream"))?;

        tracing::trace!(kind = frame.kind(), len, "wrote frame");
        Ok(())
    }

    /// Shuts down the write half so the peer observes end of stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| map_io_error(e, "shutting down stream"))
    }
}

/// Map IO errors to `QuadrpcError` variants.
///
/// - Peer went away -> `Connection`
/// - Other IO errors -> `Io`
fn map_io_error(err: std::io::Error, context: &str) -> QuadrpcError {
    match err.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::UnexpectedEof => {
            QuadrpcError::Connection(format!("{}: connection lost", context))
        }
        _ => QuadrpcError::Io(err),
    }
}
