//! Current-route observation
//!
//! The guard only ever reads the route; navigation is owned by the router.

use std::sync::{Arc, RwLock};

/// Reports the route currently shown to the operator
pub trait RouteProvider: Send + Sync {
    fn current_path(&self) -> String;
}

/// Route that never changes
#[derive(Clone, Debug)]
pub struct FixedRoute(pub String);

impl FixedRoute {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }
}

impl RouteProvider for FixedRoute {
    fn current_path(&self) -> String {
        self.0.clone()
    }
}

/// Route shared between the router (writer) and guards (readers)
#[derive(Clone, Debug, Default)]
pub struct SharedRoute {
    path: Arc<RwLock<String>>,
}

impl SharedRoute {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Arc::new(RwLock::new(path.into())),
        }
    }

    /// Record a navigation
    pub fn set(&self, path: impl Into<String>) {
        let path = path.into();
        match self.path.write() {
            Ok(mut current) => *current = path,
            Err(poisoned) => *poisoned.into_inner() = path,
        }
    }
}

impl RouteProvider for SharedRoute {
    fn current_path(&self) -> String {
        match self.path.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
