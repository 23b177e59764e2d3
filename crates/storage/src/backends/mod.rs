//! Backend implementations for the local package store.

pub mod filesystem;

pub use filesystem::FilesystemPackageStore;
