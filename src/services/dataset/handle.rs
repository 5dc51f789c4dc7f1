use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased, shared reference to caller-owned tabular data.
///
/// The concrete type is only inspected to pick an adapter; the data itself is
/// never mutated.
#[derive(Clone)]
pub struct DatasetHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl DatasetHandle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Share an existing allocation with the caller
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// `TypeId` of the wrapped value, not of the `Arc`
    pub fn type_id(&self) -> TypeId {
        Any::type_id(self.inner.as_ref())
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.as_ref().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_ref().downcast_ref::<T>()
    }

    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("type_name", &self.type_name)
            .finish()
    }
}
