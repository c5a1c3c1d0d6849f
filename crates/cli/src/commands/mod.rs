pub mod delete;
pub mod init;
pub mod list;
pub mod sandbox;
pub mod scan;
pub mod sweep;
pub mod upload;
pub mod write;
