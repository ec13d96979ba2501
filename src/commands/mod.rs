//! Command handlers that sit on top of the build core.

pub mod doctor;
pub mod init;
pub mod list;
