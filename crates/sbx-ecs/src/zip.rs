//! Positional zip over equal-length sequences.
//!
//! [`zip`] takes a tuple of 2 to 7 sources whose iterators report an exact
//! length and yields tuples of their items in lockstep. Unlike
//! [`Iterator::zip`] it refuses sources of different lengths instead of
//! silently truncating to the shortest one.
//!
//! ```
//! let names = ["a", "b", "c"];
//! let scores = vec![3, 1, 2];
//!
//! let pairs: Vec<_> = sbx_ecs::zip((names, scores.iter())).unwrap().collect();
//! assert_eq!(pairs, vec![("a", &3), ("b", &1), ("c", &2)]);
//!
//! assert!(sbx_ecs::zip((names, &scores[..2])).is_err());
//! ```
//!
//! Views use it to walk component stores that hold exactly the same entities
//! in the same order, skipping the per-entity membership probe.

use crate::error::{EcsError, EcsResult};

/// A tuple of sources that can be zipped positionally.
pub trait IntoZip {
    /// The zipped iterator.
    type Zip: ExactSizeIterator;

    /// Check the source lengths and build the zipped iterator.
    fn into_zip(self) -> EcsResult<Self::Zip>;
}

/// Iterator produced by [`zip`].
#[derive(Debug, Clone)]
pub struct Zip<I> {
    iters: I,
    remaining: usize,
}

/// Zip equal-length sources into one iterator of tuples.
///
/// Fails with [`EcsError::LengthMismatch`] naming the first source's length
/// and the first differing length.
pub fn zip<S: IntoZip>(sources: S) -> EcsResult<S::Zip> {
    sources.into_zip()
}

fn check_lengths(lengths: &[usize]) -> EcsResult<usize> {
    let expected = lengths.first().copied().unwrap_or(0);
    match lengths.iter().copied().find(|&len| len != expected) {
        Some(found) => Err(EcsError::LengthMismatch { expected, found }),
        None => Ok(expected),
    }
}

macro_rules! impl_zip {
    ($($name:ident),+) => {
        impl<$($name),+> IntoZip for ($($name,)+)
        where
            $($name: IntoIterator, $name::IntoIter: ExactSizeIterator,)+
        {
            type Zip = Zip<($($name::IntoIter,)+)>;

            #[allow(non_snake_case)]
            fn into_zip(self) -> EcsResult<Self::Zip> {
                let ($($name,)+) = self;
                $(let $name = $name.into_iter();)+
                let remaining = check_lengths(&[$($name.len()),+])?;
                Ok(Zip {
                    iters: ($($name,)+),
                    remaining,
                })
            }
        }

        impl<$($name: Iterator),+> Iterator for Zip<($($name,)+)> {
            type Item = ($($name::Item,)+);

            #[allow(non_snake_case)]
            fn next(&mut self) -> Option<Self::Item> {
                if self.remaining == 0 {
                    return None;
                }
                let ($($name,)+) = &mut self.iters;
                let item = ($($name.next()?,)+);
                self.remaining -= 1;
                Some(item)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                (self.remaining, Some(self.remaining))
            }
        }

        impl<$($name: Iterator),+> ExactSizeIterator for Zip<($($name,)+)> {}
    };
}

impl_zip!(A, B);
impl_zip!(A, B, C);
impl_zip!(A, B, C, D);
impl_zip!(A, B, C, D, E);
impl_zip!(A, B, C, D, E, F);
impl_zip!(A, B, C, D, E, F, G);
