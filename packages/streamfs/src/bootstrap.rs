//! Built-in wrapper registrations.
//!
//! Every function in [`BUILTIN_WRAPPERS`] runs exactly once, when the
//! registry is first reached through [`crate::get_registry`]. Each receives
//! the registry under construction.

use crate::local::{ContentRoot, ContentWrapper};
use crate::registry::{Registry, WrapperDescriptor};
use crate::Error;

/// Registers one wrapper with the registry being built.
pub type RegisterFn = fn(&Registry) -> Result<(), Error>;

/// Registration hooks run when the registry is built.
pub const BUILTIN_WRAPPERS: &[RegisterFn] = &[register_local_wrapper];

/// Scheme of the built-in content directory wrapper.
pub const LOCAL_SCHEME: &str = "local";

/// Register [`ContentWrapper`] as `local://`, rooted at the configured
/// content directory.
pub fn register_local_wrapper(registry: &Registry) -> Result<(), Error> {
    registry.register(
        LOCAL_SCHEME,
        WrapperDescriptor::new(
            "Local Files",
            "Files under the content directory.",
            || ContentWrapper::new(ContentRoot::default()),
        ),
    )
}
