// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic, type-safe service locator for engine subsystems.
//!
//! The [`ServiceRegistry`] is a type-map where the engine stores shared
//! instances (the frame pipeline, the clock, ...) and from which subsystems
//! fetch only the services they need.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure to resolve a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No service of the requested type was provided.
    NotRegistered {
        /// Name of the requested type.
        type_name: &'static str,
    },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotRegistered { type_name } => {
                write!(f, "No service registered for type '{type_name}'")
            }
        }
    }
}

impl std::error::Error for ServiceError {}

/// A service registry keyed by [`TypeId`].
///
/// Services are stored as `Arc<T>`; every resolution hands out a new strong
/// reference to the same instance.
///
/// # Example
///
/// ```rust
/// use khora_core::service_registry::ServiceRegistry;
///
/// struct MyService { value: i32 }
///
/// let mut registry = ServiceRegistry::new();
/// registry.provide(MyService { value: 42 });
///
/// let svc = registry.resolve::<MyService>().unwrap();
/// assert_eq!(svc.value, 42);
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Creates an empty service registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registers a service, replacing any previous service of the same type.
    pub fn provide<T: Send + Sync + 'static>(&mut self, service: T) -> Arc<T> {
        self.provide_shared(Arc::new(service))
    }

    /// Registers an already shared service.
    pub fn provide_shared<T: Send + Sync + 'static>(&mut self, service: Arc<T>) -> Arc<T> {
        if self
            .services
            .insert(TypeId::of::<T>(), service.clone())
            .is_some()
        {
            log::debug!("Replaced service '{}'.", type_name::<T>());
        }
        service
    }

    /// Returns the service of type `T`.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ServiceError> {
        self.get::<T>().ok_or(ServiceError::NotRegistered {
            type_name: type_name::<T>(),
        })
    }

    /// Returns the service of type `T`, or `None` if it was never provided.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
    }

    /// Returns `true` if a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .finish()
    }
}
