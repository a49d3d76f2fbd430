//! StreamFS URI model.
//!
//! A stream is addressed as `scheme://target`. This crate knows how to take
//! such a string apart and put it back together; it knows nothing about
//! which schemes have a wrapper behind them. That belongs to the registry in
//! the `streamfs` crate.
//!
//! ```rust
//! use streamfs_uri::{clean_target, join, scheme, target};
//!
//! assert_eq!(scheme("local://foo/bar.txt"), Some("local"));
//! assert_eq!(target("local:///foo/bar.txt/"), Some("foo/bar.txt"));
//! assert_eq!(join("local", &clean_target("/foo//bar.txt")), "local://foo/bar.txt");
//! ```

mod error;
mod uri;

pub use error::UriError;
pub use uri::{
    clean_target, dirname, file_name, join, parent_target, scheme, target, validate_scheme,
    SCHEME_SEPARATOR,
};
