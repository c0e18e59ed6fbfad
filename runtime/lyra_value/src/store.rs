//! The object-loading seam.

use crate::object::Object;
use crate::value::Ref;

/// Read access to heap objects.
///
/// The registry's printer and comparator callbacks need to follow refs, but
/// this crate sits below the heap in the dependency order. The heap
/// implements this trait; callbacks receive it as `&dyn ValueStore`.
pub trait ValueStore {
    /// Load the object at `r`.
    ///
    /// `r` must be a live ref issued by this store; anything else is an
    /// internal invariant violation.
    fn object(&self, r: Ref) -> &Object;
}
