//! Constraint scoping - per-instance toggle with a scoped suppression guard
//!
//! The toggle is operation-scoped state on each relation, never a process-wide
//! static, so concurrent units of work cannot leak scoping into each other.

/// Relations expose their constraint toggle through this trait
pub trait Constrained {
    /// Whether default parent-scoping constraints are applied
    fn constraints_enabled(&self) -> bool;

    /// Flip the constraint toggle
    fn set_constraints_enabled(&mut self, enabled: bool);
}

/// Run `f` with the relation's default constraints suppressed
///
/// The previous toggle value is restored on every exit path, including a
/// panic inside `f`.
pub fn without_constraints<T, R>(target: &mut T, f: impl FnOnce(&mut T) -> R) -> R
where
    T: Constrained,
{
    struct Restore<'a, T: Constrained> {
        target: &'a mut T,
        previous: bool,
    }

    impl<T: Constrained> Drop for Restore<'_, T> {
        fn drop(&mut self) {
            self.target.set_constraints_enabled(self.previous);
        }
    }

    let previous = target.constraints_enabled();
    target.set_constraints_enabled(false);
    let restore = Restore { target, previous };
    f(restore.target)
}
