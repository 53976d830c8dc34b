//! Wire-level value types for the mtlink RPC client.
//!
//! Everything the client puts on the wire, or reads back from it, lives here:
//! the nested [`Request`] tree, the [`Response`] variants, the
//! [`ClientAppInfo`] identity sent with the handshake, and the length-prefixed
//! CBOR framing in [`codec`].
//!
//! Requests compose by nesting. The handshake is a layer declaration wrapping
//! a connection init wrapping a config fetch, and each wrapping variant carries
//! its inner query as a boxed [`Request`]. Nothing in this crate knows which
//! combinations are meaningful; that is the client's job.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app_info;
pub mod codec;
pub mod errors;
pub mod request;
pub mod response;

pub use app_info::ClientAppInfo;
pub use codec::{Envelope, MAX_FRAME_SIZE};
pub use errors::{ProtocolError, Result};
pub use request::{LAYER, Request};
pub use response::{DcOption, Response, ServerConfig};
