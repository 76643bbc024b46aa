//! SQLite persistence: pool bootstrap and table accessors

pub mod frameworks;
pub mod init;
pub mod settings;
pub mod shares;

pub use init::*;
