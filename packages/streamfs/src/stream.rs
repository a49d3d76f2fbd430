//! Free-standing stream URI helpers backed by the global registry.

use crate::registry::get_registry;
use crate::wrapper::StreamWrapper;
use crate::Error;

/// Normalize `uri` against the global registry. See [`crate::Registry::normalize`].
pub fn normalize(uri: &str) -> String {
    get_registry().normalize(uri)
}

/// True iff a wrapper is registered for `scheme`.
pub fn scheme_valid(scheme: &str) -> bool {
    get_registry().scheme_valid(scheme)
}

/// A fresh wrapper bound to `uri`, or `None` for plain paths, bare schemes
/// and unknown schemes.
pub fn wrapper_instance(uri: &str) -> Option<Box<dyn StreamWrapper>> {
    get_registry().wrapper_instance(uri)
}

/// Type name of the wrapper serving `scheme`.
pub fn wrapper_type(scheme: &str) -> Option<String> {
    get_registry().wrapper_type(scheme)
}

/// True iff `path` has the `scheme://` form, registered or not.
pub fn is_stream_uri(path: &str) -> bool {
    streamfs_uri::scheme(path).is_some()
}

/// Like [`wrapper_instance`], but says why no wrapper is available.
pub(crate) fn require_wrapper(uri: &str) -> Result<Box<dyn StreamWrapper>, Error> {
    let scheme = streamfs_uri::scheme(uri).ok_or_else(|| Error::NotAUri {
        uri: uri.to_string(),
    })?;
    wrapper_instance(uri).ok_or_else(|| Error::UnknownScheme {
        scheme: scheme.to_string(),
    })
}
