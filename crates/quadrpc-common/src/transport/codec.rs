use crate::protocol::error::{QuadrpcError, Result};
use crate::protocol::Frame;

/// Largest frame body accepted from the wire (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// JSON codec for wire frames.
///
/// # Example
///
/// ```
/// use quadrpc_common::transport::JsonCodec;
/// use quadrpc_common::Frame;
/// use serde_json::json;
///
/// let frame = Frame::message(json!({"number": 12}));
/// let encoded = JsonCodec::encode_frame(&frame).unwrap();
/// let decoded = JsonCodec::decode_frame(&encoded).unwrap();
/// assert_eq!(frame, decoded);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a frame body. Fails when the encoded body would not be
    /// accepted by the peer.
    pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>> {
        let encoded = serde_json::to_vec(frame)?;
        if encoded.len() > MAX_FRAME_SIZE {
            return Err(QuadrpcError::FrameTooLarge {
                size: encoded.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(encoded)
    }

    pub fn decode_frame(data: &[u8]) -> Result<Frame> {
        Ok(serde_json::from_slice(data)?)
    }
}
