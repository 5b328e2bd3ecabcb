pub mod backup;
pub mod daemon;
pub mod health;
pub mod init;
pub mod logs;
pub mod status;
pub mod sync;
