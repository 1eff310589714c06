pub mod cli;
pub mod common;
pub mod error;
pub mod listener;
pub mod transport;

pub use common::*;
pub use listener::ReplyListener;
pub use transport::{HttpTransport, TargetConfig};
