//! healthlog-store - File-backed session persistence.

mod file;

pub use file::FileSessionStore;
