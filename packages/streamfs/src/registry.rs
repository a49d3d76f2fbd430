//! The stream wrapper registry.
//!
//! The registry maps each scheme to the wrapper that serves it. There is
//! exactly one per process, reached through [`get_registry`]; the first call
//! builds it and runs every registration function in
//! [`crate::bootstrap::BUILTIN_WRAPPERS`].
//!
//! Registrations live at two levels. The descriptor table is what callers
//! list and inspect; the stream layer holds the factories that actually
//! produce wrapper instances. A scheme is only usable once it is installed in
//! the stream layer, and the stream layer is what rejects malformed schemes.
//!
//! There is no way to obtain a second `Registry`; it is not `Clone`.
//!
//! ```compile_fail
//! let registry = streamfs::get_registry();
//! let copy: streamfs::Registry = (*registry).clone();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::bootstrap;
use crate::wrapper::StreamWrapper;
use crate::Error;

/// Produces a fresh, unbound wrapper instance.
pub type WrapperFactory = Arc<dyn Fn() -> Box<dyn StreamWrapper> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Registry = Registry::collect();
}

/// The process-wide registry.
pub fn get_registry() -> &'static Registry {
    &REGISTRY
}

/// What a scheme is registered as, plus the factory that serves it.
///
/// `scheme` is empty until [`Registry::register`] stores the descriptor.
#[derive(Clone)]
pub struct WrapperDescriptor {
    pub scheme: String,
    pub backend_type: String,
    pub name: String,
    pub description: String,
    factory: WrapperFactory,
}

impl WrapperDescriptor {
    /// Describe a wrapper type `W`. `backend_type` is `W`'s type name.
    pub fn new<W, F>(name: impl Into<String>, description: impl Into<String>, factory: F) -> Self
    where
        W: StreamWrapper + 'static,
        F: Fn() -> W + Send + Sync + 'static,
    {
        Self {
            scheme: String::new(),
            backend_type: std::any::type_name::<W>().to_string(),
            name: name.into(),
            description: description.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn StreamWrapper>),
        }
    }

    /// Build a fresh wrapper bound to no URI.
    pub fn instantiate(&self) -> Box<dyn StreamWrapper> {
        (self.factory)()
    }
}

impl fmt::Debug for WrapperDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperDescriptor")
            .field("scheme", &self.scheme)
            .field("backend_type", &self.backend_type)
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PartialEq for WrapperDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.backend_type == other.backend_type
            && self.name == other.name
            && self.description == other.description
            && Arc::ptr_eq(&self.factory, &other.factory)
    }
}

/// A registration as reported by [`Registry::list_wrappers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperInfo {
    pub scheme: String,
    pub backend_type: String,
    pub name: String,
    pub description: String,
}

/// Factories that are wired up and able to serve a scheme.
#[derive(Default)]
struct StreamLayer {
    factories: HashMap<String, WrapperFactory>,
}

impl StreamLayer {
    fn install(&mut self, scheme: &str, factory: WrapperFactory) -> Result<(), Error> {
        streamfs_uri::validate_scheme(scheme).map_err(|e| Error::RegistrationRejected {
            scheme: scheme.to_string(),
            message: e.to_string(),
        })?;

        if self.factories.contains_key(scheme) {
            return Err(Error::RegistrationRejected {
                scheme: scheme.to_string(),
                message: "scheme is already installed".to_string(),
            });
        }

        self.factories.insert(scheme.to_string(), factory);
        Ok(())
    }

    fn uninstall(&mut self, scheme: &str) -> bool {
        self.factories.remove(scheme).is_some()
    }

    fn get(&self, scheme: &str) -> Option<&WrapperFactory> {
        self.factories.get(scheme)
    }
}

#[derive(Default)]
struct RegistryState {
    descriptors: HashMap<String, WrapperDescriptor>,
    layer: StreamLayer,
}

/// Scheme to wrapper mapping. See the module docs.
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    fn empty() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Build the registry and let every built-in wrapper register itself.
    ///
    /// Registration functions receive the registry under construction and
    /// must not call [`get_registry`].
    fn collect() -> Self {
        let registry = Self::empty();
        for register in bootstrap::BUILTIN_WRAPPERS {
            if let Err(e) = register(&registry) {
                log::warn!("Built-in wrapper failed to register: {}", e);
            }
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install or replace the wrapper for `scheme`.
    ///
    /// An existing registration is torn down before the new one is
    /// installed. If the stream layer rejects the scheme, nothing is
    /// registered and the previous wrapper (if any) stays removed.
    pub fn register(&self, scheme: &str, mut descriptor: WrapperDescriptor) -> Result<(), Error> {
        let mut state = self.write();

        if state.layer.uninstall(scheme) {
            log::info!("Replacing stream wrapper for '{}://'", scheme);
        }
        state.descriptors.remove(scheme);

        state.layer.install(scheme, descriptor.factory.clone())?;
        descriptor.scheme = scheme.to_string();
        log::info!(
            "Registered stream wrapper '{}' ({}) for '{}://'",
            descriptor.name,
            descriptor.backend_type,
            scheme
        );
        state.descriptors.insert(scheme.to_string(), descriptor);

        Ok(())
    }

    /// Remove the wrapper for `scheme`. Returns false if none was registered.
    pub fn unregister(&self, scheme: &str) -> bool {
        let mut state = self.write();
        let installed = state.layer.uninstall(scheme);
        let described = state.descriptors.remove(scheme).is_some();

        if installed || described {
            log::info!("Unregistered stream wrapper for '{}://'", scheme);
        }
        installed || described
    }

    /// Snapshot of every registration.
    pub fn get_backends(&self) -> HashMap<String, WrapperDescriptor> {
        self.read().descriptors.clone()
    }

    /// Registrations as serializable rows, sorted by scheme.
    pub fn list_wrappers(&self) -> Vec<WrapperInfo> {
        let mut rows: Vec<WrapperInfo> = self
            .read()
            .descriptors
            .values()
            .map(|descriptor| WrapperInfo {
                scheme: descriptor.scheme.clone(),
                backend_type: descriptor.backend_type.clone(),
                name: descriptor.name.clone(),
                description: descriptor.description.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.scheme.cmp(&b.scheme));
        rows
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.read().descriptors.contains_key(scheme)
    }

    pub fn descriptor(&self, scheme: &str) -> Option<WrapperDescriptor> {
        self.read().descriptors.get(scheme).cloned()
    }

    /// True iff a live, instantiable wrapper serves `scheme`.
    pub fn scheme_valid(&self, scheme: &str) -> bool {
        !scheme.is_empty() && self.read().layer.get(scheme).is_some()
    }

    /// The registered wrapper's type name.
    pub fn wrapper_type(&self, scheme: &str) -> Option<String> {
        self.read()
            .descriptors
            .get(scheme)
            .map(|d| d.backend_type.clone())
    }

    /// A fresh wrapper bound to `uri`.
    ///
    /// `None` unless `uri` has the `scheme://` form and its scheme is
    /// installed. A bare scheme name such as `"local"` is not enough.
    pub fn wrapper_instance(&self, uri: &str) -> Option<Box<dyn StreamWrapper>> {
        let scheme = streamfs_uri::scheme(uri)?;
        let factory = self.read().layer.get(scheme).cloned()?;

        let mut wrapper = factory();
        wrapper.set_uri(uri);
        Some(wrapper)
    }

    /// Normalize a stream URI.
    ///
    /// Inputs whose scheme has no wrapper, malformed ones included, pass
    /// through untouched. Otherwise the target loses duplicate, leading and
    /// trailing separators.
    pub fn normalize(&self, uri: &str) -> String {
        match (streamfs_uri::scheme(uri), streamfs_uri::target(uri)) {
            (Some(scheme), Some(target)) if self.scheme_valid(scheme) => {
                streamfs_uri::join(scheme, &streamfs_uri::clean_target(target))
            }
            _ => uri.to_string(),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("wrappers", &self.list_wrappers())
            .finish()
    }
}
