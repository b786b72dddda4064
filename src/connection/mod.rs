//! Transport and framing: plain/TLS streams, in-place upgrade, and
//! CRLF-framed buffered I/O.

mod config;
mod framed;
mod stream;

pub use config::{Config, Security};
pub use framed::FramedStream;
pub use stream::Transport;
