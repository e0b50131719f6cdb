//! RAII lease over a checked-out resource

use std::fmt;
use std::sync::Arc;

use crate::factory::Factory;
use crate::pool::Shared;

/// Identifier of a resource while it is tracked by a pool.
///
/// Ids are unique within one pool and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(u64);

impl LeaseId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource checked out of a [`Pool`](crate::Pool).
///
/// Dereferences to the resource. Hand it back with
/// [`Pool::release`](crate::Pool::release); a lease that is simply dropped
/// is checked back in the same way. Leases that outlive
/// [`Pool::shutdown`](crate::Pool::shutdown) are destroyed instead of
/// returned.
pub struct Lease<F: Factory> {
    id: LeaseId,
    resource: Option<F::Resource>,
    shared: Arc<Shared<F>>,
}

impl<F: Factory> Lease<F> {
    pub(crate) fn new(shared: Arc<Shared<F>>, id: LeaseId, resource: F::Resource) -> Self {
        Self {
            id,
            resource: Some(resource),
            shared,
        }
    }

    /// The id the pool tracks this resource under.
    #[must_use]
    pub fn id(&self) -> LeaseId {
        self.id
    }

    /// Take the resource out of the pool for good.
    ///
    /// The pool forgets the resource and its capacity slot becomes free for
    /// growth; the caller becomes responsible for tearing it down.
    #[must_use]
    pub fn detach(mut self) -> F::Resource {
        let resource = self.take();
        self.shared.forget(self.id);
        resource
    }

    pub(crate) fn is_from(&self, shared: &Arc<Shared<F>>) -> bool {
        Arc::ptr_eq(&self.shared, shared)
    }

    /// Move the resource out, leaving `Drop` with nothing to check in.
    pub(crate) fn take(&mut self) -> F::Resource {
        self.resource.take().expect("lease used after its resource was taken")
    }
}

impl<F: Factory> std::ops::Deref for Lease<F> {
    type Target = F::Resource;

    fn deref(&self) -> &F::Resource {
        self.resource
            .as_ref()
            .expect("lease used after its resource was taken")
    }
}

impl<F: Factory> std::ops::DerefMut for Lease<F> {
    fn deref_mut(&mut self) -> &mut F::Resource {
        self.resource
            .as_mut()
            .expect("lease used after its resource was taken")
    }
}

impl<F: Factory> Drop for Lease<F> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take()
            && let Err(resource) = self.shared.check_in(self.id, resource)
        {
            self.shared.dispose(resource);
        }
    }
}

impl<F> fmt::Debug for Lease<F>
where
    F: Factory,
    F::Resource: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .finish()
    }
}
