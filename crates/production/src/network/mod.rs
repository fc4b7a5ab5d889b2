//! Transport seam and wire codec.

pub mod codec;
mod transport;

pub use codec::CodecError;
pub use transport::{MessageHandler, Transport, TransportError};
