//! Object storage for published render artifacts.
//!
//! [`ObjectStore`] is the three-step contract the publisher relies on:
//! store bytes under a key, make them publicly readable, issue a URL.
//! [`s3::S3ObjectStore`] talks to any S3-compatible service;
//! [`memory::InMemoryObjectStore`] backs tests and local development.

pub mod memory;
pub mod s3;
pub mod storage;

pub use storage::{ObjectStore, StorageError, StoredObject};
