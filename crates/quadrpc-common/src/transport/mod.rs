//! QuadRPC Transport Layer
//!
//! Frames travel over any ordered byte stream using a fixed wire format:
//!
//! ```text
//! [4-byte length as u32 big-endian] [JSON frame]
//! ```
//!
//! # Components
//!
//! - **[`JsonCodec`]**: encode/decode frame bodies
//! - **[`FrameReader`]** / **[`FrameWriter`]**: async length-prefixed framing
//! - **[`framed`]**: split a duplex stream into a reader and a writer
//!
//! # Frame Size Limits
//!
//! Frames larger than [`MAX_FRAME_SIZE`] are refused in both directions.
//!
//! # Example
//!
//! ```
//! use quadrpc_common::transport::framed;
//! use quadrpc_common::Frame;
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (a, b) = tokio::io::duplex(1024);
//! let (_, mut writer) = framed(a);
//! let (mut reader, _) = framed(b);
//!
//! writer.write_frame(&Frame::message(json!({"number": 3}))).await.unwrap();
//! let frame = reader.read_frame().await.unwrap();
//! assert_eq!(frame, Some(Frame::message(json!({"number": 3}))));
//! # });
//! ```

pub mod codec;
pub mod framed;

pub use codec::{JsonCodec, MAX_FRAME_SIZE};
pub use framed::{framed, FrameReader, FrameWriter};
