//! Filesystem helpers for the state directory.

pub mod atomic;

pub use atomic::atomic_write;
