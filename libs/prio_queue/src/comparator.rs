/// Strict "comes before" relation deciding which element surfaces first.
///
/// Implementations must be a strict weak ordering, otherwise the heap invariant is not
/// well-defined. Elements the comparator considers equal leave the queue in no particular order.
pub trait Comparator<T> {
    fn precedes(&self, a: &T, b: &T) -> bool;
}

/// Natural less-than: the smallest element surfaces first.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ascending;

/// Natural greater-than: the largest element surfaces first.
#[derive(Debug, Default, Clone, Copy)]
pub struct Descending;

impl<T: PartialOrd> Comparator<T> for Ascending {
    #[inline]
    fn precedes(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

impl<T: PartialOrd> Comparator<T> for Descending {
    #[inline]
    fn precedes(&self, a: &T, b: &T) -> bool {
        a > b
    }
}

impl<T, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn precedes(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}
