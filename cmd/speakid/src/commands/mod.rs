//! CLI commands module.

mod config;
mod enroll;
mod forget;
mod list;
mod util;
mod verify;

pub use config::ConfigCommand;
pub use enroll::EnrollCommand;
pub use forget::ForgetCommand;
pub use list::ListCommand;
pub use verify::VerifyCommand;

// Re-export utils for use in commands
pub(crate) use util::*;
