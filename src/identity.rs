//! Instance identity tokens.
//!
//! Zero-argument calls are keyed by the instance's identity token. By
//! default the token comes from the instance's [`Identity`] impl (its own
//! id); an attribute may install a custom, fallible identifier instead.

use std::sync::Arc;

use crate::error::BoxError;
use crate::{CachetError, Result};

/// An object with a stable primary identity, e.g. a database row id.
pub trait Identity {
    /// Token distinguishing this instance from others of the same type.
    fn identity(&self) -> String;
}

macro_rules! display_identity {
    ($($t:ty),* $(,)?) => {
        $(
            impl Identity for $t {
                fn identity(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_identity!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String, str);

impl<T: Identity + ?Sized> Identity for &T {
    fn identity(&self) -> String {
        (**self).identity()
    }
}

impl<T: Identity + ?Sized> Identity for Arc<T> {
    fn identity(&self) -> String {
        (**self).identity()
    }
}

type IdentifierFn<I> = dyn Fn(&I) -> std::result::Result<String, BoxError> + Send + Sync;

/// Maps an instance to its identity token.
pub struct Identifier<I> {
    inner: Arc<IdentifierFn<I>>,
}

impl<I> Identifier<I> {
    /// Use a custom identifier. Failures propagate to the caller of the
    /// attribute as [`CachetError::Identifier`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&I) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn resolve(&self, instance: &I) -> Result<String> {
        (self.inner)(instance).map_err(CachetError::Identifier)
    }
}

impl<I: Identity + 'static> Identifier<I> {
    /// Use the instance's own [`Identity`].
    pub fn own() -> Self {
        Self::custom(|instance: &I| Ok(instance.identity()))
    }
}

impl<I> Clone for Identifier<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I> std::fmt::Debug for Identifier<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identifier").finish_non_exhaustive()
    }
}
