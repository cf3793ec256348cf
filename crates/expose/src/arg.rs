//! The contract every typed argument of an exposed method satisfies.
//!
//! An argument is built from the raw string value of a request parameter, then
//! [`Arg::check`] is called exactly once before the provider method is invoked. A failed
//! check aborts the request; the method never runs.
//!
//! Types implementing [`FromParam`] declare their own constructor, so they can be bound with
//! [`Param::new`](crate::Param::new) without passing a constructor explicitly.
//!
//! # Example
//! ```
//! use micro_expose::{Arg, Failure, FromParam};
//!
//! struct UserId(u32);
//!
//! impl Arg for UserId {
//!     fn check(&self) -> Result<(), Failure> {
//!         if self.0 == 0 { Err(Failure::generic("user id 0 is reserved")) } else { Ok(()) }
//!     }
//! }
//!
//! impl FromParam for UserId {
//!     fn from_param(raw: &str) -> Result<Self, Failure> {
//!         Ok(UserId(raw.parse()?))
//!     }
//! }
//! ```

use crate::Failure;
use std::fmt;
use std::ops::Deref;

/// A validated argument of an exposed method.
pub trait Arg: Sized + 'static {
    /// Validates the constructed value.
    fn check(&self) -> Result<(), Failure>;
}

/// An [`Arg`] that knows how to build itself from a raw parameter value.
pub trait FromParam: Arg {
    fn from_param(raw: &str) -> Result<Self, Failure>;
}

macro_rules! impl_arg_for_from_str {
    ($($ty:ty)*) => {
        $(
        impl Arg for $ty {
            #[inline]
            fn check(&self) -> Result<(), Failure> {
                Ok(())
            }
        }

        impl FromParam for $ty {
            fn from_param(raw: &str) -> Result<Self, Failure> {
                Ok(raw.parse::<$ty>()?)
            }
        }
        )*
    };
}

impl_arg_for_from_str! { i8 i16 i32 i64 u8 u16 u32 u64 usize isize f32 f64 bool }

impl Arg for String {
    #[inline]
    fn check(&self) -> Result<(), Failure> {
        Ok(())
    }
}

impl FromParam for String {
    fn from_param(raw: &str) -> Result<Self, Failure> {
        Ok(raw.to_owned())
    }
}

/// A string that is safe to echo back into markup or quoted contexts.
///
/// The check rejects quotes, angle brackets, backslashes and control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeString(String);

impl SafeString {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Arg for SafeString {
    fn check(&self) -> Result<(), Failure> {
        match self.0.chars().find(|c| matches!(c, '\'' | '"' | '<' | '>' | '\\') || c.is_control()) {
            Some(c) => Err(Failure::generic(format!("unsafe character {c:?} in string argument"))),
            None => Ok(()),
        }
    }
}

impl FromParam for SafeString {
    fn from_param(raw: &str) -> Result<Self, Failure> {
        Ok(SafeString::new(raw))
    }
}

impl Deref for SafeString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
