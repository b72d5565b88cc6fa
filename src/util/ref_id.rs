use stable_deref_trait::StableDeref;
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Wrapper type whose "identity" for equality and hashing is determined from the reference itself
/// (ie. the pointer) and not from the underlying data.
///
/// The class graph hands these out for classes allocated in its arena, so two handles are equal
/// exactly when they point at the same class entry.
#[derive(Debug)]
pub struct RefId<'a, T: ?Sized>(pub &'a T);

impl<'a, T: ?Sized> Clone for RefId<'a, T> {
    fn clone(&self) -> Self {
        RefId(self.0)
    }
}

impl<'a, T: ?Sized> Copy for RefId<'a, T> {}

impl<'a, T> Hash for RefId<'a, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state)
    }
}

impl<'a, 'b, T> PartialEq<RefId<'b, T>> for RefId<'a, T> {
    fn eq(&self, other: &RefId<'b, T>) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'a, T> Eq for RefId<'a, T> {}

impl<'a, T: ?Sized> Deref for RefId<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

impl<'a, T: ?Sized> Borrow<T> for RefId<'a, T> {
    fn borrow(&self) -> &T {
        self.0
    }
}

// Dereferencing always yields the same arena allocation, no matter where the handle moves
unsafe impl<'a, T: ?Sized> StableDeref for RefId<'a, T> {}
