use std::fmt::Debug;

/// A trait for values assumed to uphold an invariant.
pub trait Assume {
    /// The type of the assumed value.
    type Assumed;

    /// Assume `Self` upholds the invariant and unwrap it.
    fn assume(self) -> Self::Assumed;
}

impl Assume for bool {
    type Assumed = ();

    #[track_caller]
    #[inline(always)]
    fn assume(self) -> Self::Assumed {
        debug_assert!(self, "expected invariant to hold");
    }
}

impl<T> Assume for Option<T> {
    type Assumed = T;

    #[track_caller]
    #[inline(always)]
    fn assume(self) -> Self::Assumed {
        match self {
            Some(t) => t,
            None => unreachable!("expected `Some`"),
        }
    }
}

impl<T, E: Debug> Assume for Result<T, E> {
    type Assumed = T;

    #[track_caller]
    #[inline(always)]
    fn assume(self) -> Self::Assumed {
        match self {
            Ok(t) => t,
            Err(e) => unreachable!("expected `Ok`, got `Err({e:?})`"),
        }
    }
}
