//! Outgoing command primitives: tag issuance, argument model, and literal
//! framing negotiation.

mod argument;
mod literal;
mod tag;

pub use argument::Argument;
pub use literal::{LiteralForm, LiteralMode, LiteralOptions, SyncMode, resolve};
pub use tag::TagSequence;

pub(crate) use argument::{LiteralPayload, WireChunk, render_command, write_astring};
