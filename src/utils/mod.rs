pub mod format;
pub mod retry;
