//! Scheme-routed stream wrappers.
//!
//! A stream URI has the form `scheme://target`. Each scheme is served by a
//! [`StreamWrapper`] registered with the process-wide [`Registry`]; the
//! wrapper decides what a target means. Most wrappers map targets onto a
//! native directory through [`local::LocalStreamWrapper`].
//!
//! ## Layers
//!
//! - [`streamfs_uri`] - URI parsing with no registry semantics
//! - [`registry`] - scheme to wrapper mapping, built once per process
//! - [`wrapper`] - the capability set every wrapper implements
//! - [`local`] - wrappers over a native directory
//! - [`file`] / [`file_api`] - what callers use day to day
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::{Read, Write};
//! use streamfs::{file_api, StreamFile};
//!
//! let mut file = StreamFile::open("local://greeting.txt", "w")?;
//! file.write_all(b"hello")?;
//! file.close()?;
//!
//! let mut text = String::new();
//! StreamFile::open("local://greeting.txt", "r")?.read_to_string(&mut text)?;
//! assert_eq!(text, "hello");
//!
//! // Helpers take URIs and native paths alike.
//! assert!(file_api::exists("local://greeting.txt"));
//! assert!(file_api::exists("/tmp"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod file;
pub mod file_api;
pub mod local;
pub mod registry;
pub mod stream;
pub mod wrapper;

pub use config::ContentConfig;
pub use error::Error;
pub use file::{DirStream, StreamFile};
pub use registry::{get_registry, Registry, WrapperDescriptor, WrapperFactory, WrapperInfo};
pub use stream::{normalize, scheme_valid, wrapper_instance, wrapper_type};
pub use wrapper::{
    LockKind, LockOperation, OpenMode, StreamOption, StreamOptions, StreamStat, StreamWrapper,
};
