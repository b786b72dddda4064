//! Core protocol types: capabilities, statuses, response codes, and the
//! live state of the selected mailbox.

mod authority;
mod capability;
mod flags;
mod mailbox;
mod response_code;
mod status;

pub use authority::Authority;
pub use capability::{Capability, CapabilitySet};
pub use flags::Flag;
pub use mailbox::SelectedMailbox;
pub use response_code::ResponseCode;
pub use status::Status;
