//! The `Factory` trait: how the pool manufactures, health-checks and tears down
//! individual resources.

use std::future::Future;

use crate::error::FactoryError;

/// Creates, health-checks and destroys the resources held by a
/// [`Pool`](crate::Pool).
///
/// The pool never looks inside a resource. It only asks the factory for a
/// new one, whether an idle one is still usable, and to dispose of one it no
/// longer wants.
///
/// ```
/// use nebula_pool::{Factory, FactoryError};
///
/// struct Numbers;
///
/// impl Factory for Numbers {
///     type Resource = u64;
///
///     async fn create(&self) -> Result<u64, FactoryError> {
///         Ok(7)
///     }
/// }
/// ```
pub trait Factory: Send + Sync + 'static {
    /// The pooled resource type (e.g. a database connection).
    type Resource: Send + 'static;

    /// Create a new resource instance.
    ///
    /// Called during construction and from the background grow task; it is
    /// never awaited while the pool's lock is held.
    fn create(&self) -> impl Future<Output = Result<Self::Resource, FactoryError>> + Send;

    /// Check whether an idle resource is still usable before handing it out.
    ///
    /// Resources reported dead are destroyed and never returned to a caller.
    fn is_alive(&self, _resource: &Self::Resource) -> impl Future<Output = bool> + Send {
        async { true }
    }

    /// Release the resource's underlying handles.
    ///
    /// Failures are logged by the pool and otherwise ignored.
    fn destroy(
        &self,
        resource: Self::Resource,
    ) -> impl Future<Output = Result<(), FactoryError>> + Send {
        async move {
            drop(resource);
            Ok(())
        }
    }
}
