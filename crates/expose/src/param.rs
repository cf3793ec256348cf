//! Parameter schemas and argument binding.
//!
//! A [`Param`] pairs the name of a request parameter with a constructor for one typed
//! argument. A tuple of up to ten params is a [`ParamList`], which binds the ordered argument
//! tuple of an exposed method from a [`Lookup`] over the request parameters.
//!
//! Binding walks the params in declared order. A param whose name is not found is skipped, a
//! found param is constructed and checked, and the first failure stops the walk. Whether the
//! bound arguments are enough to call the method is decided by the dispatcher, which compares
//! [`Binding::bound`] against both the declared arity and the number of supplied values.

use crate::arg::{Arg, FromParam};
use crate::Failure;
use std::collections::HashMap;
use std::fmt;

/// Read access to the parameters of a request, by name.
pub trait Lookup {
    /// Returns the first value supplied for `name`.
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl Lookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

type Constructor<A> = Box<dyn Fn(&str) -> Result<A, Failure> + Send + Sync>;

/// A named parameter and the constructor of its argument.
pub struct Param<A> {
    name: String,
    constructor: Constructor<A>,
}

impl<A: FromParam> Param<A> {
    /// A param constructed by [`FromParam::from_param`].
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with(name, A::from_param)
    }
}

impl<A: Arg> Param<A> {
    /// A param constructed by `constructor`.
    pub fn with<S, F>(name: S, constructor: F) -> Self
    where
        S: Into<String>,
        F: Fn(&str) -> Result<A, Failure> + Send + Sync + 'static,
    {
        Self { name: name.into(), constructor: Box::new(constructor) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructs the argument from `raw` and checks it.
    pub fn build(&self, raw: &str) -> Result<A, Failure> {
        let arg = (self.constructor)(raw)?;
        arg.check()?;
        Ok(arg)
    }
}

impl<A> fmt::Debug for Param<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Shorthand for [`Param::new`].
pub fn param<A: FromParam, S: Into<String>>(name: S) -> Param<A> {
    Param::new(name)
}

/// The outcome of binding: the argument tuple if every param was found, and how many
/// params were bound.
#[derive(Debug)]
pub struct Binding<Args> {
    args: Option<Args>,
    bound: usize,
}

impl<Args> Binding<Args> {
    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn into_args(self) -> Option<Args> {
        self.args
    }
}

/// An ordered list of params, bound positionally to the arguments of a method.
pub trait ParamList: Send + Sync + 'static {
    type Args: 'static;

    fn arity(&self) -> usize;

    fn names(&self) -> Vec<&str>;

    /// Builds the arguments found through `lookup`, stopping at the first failure.
    fn bind(&self, lookup: &dyn Lookup) -> Result<Binding<Self::Args>, Failure>;
}

/// impl `ParamList` for tuples of `Param`, from 0 params to 10 params
///
/// for example, it will impl (Param<A>, Param<B>) like this:
///```ignore
/// impl<A, B> ParamList for (Param<A>, Param<B>)
/// where
///     A: Arg,
///     B: Arg,
/// {
///     type Args = (A, B);
///
///     fn bind(&self, lookup: &dyn Lookup) -> Result<Binding<Self::Args>, Failure> {
///         let (A, B) = self;
///         let mut bound = 0;
///         let A = match lookup.lookup(A.name()) {
///             Some(raw) => { let arg = A.build(raw)?; bound += 1; Some(arg) }
///             None => None,
///         };
///         // .. same for B
///         let args = match (A, B) {
///             (Some(A), Some(B)) => Some((A, B)),
///             _ => None,
///         };
///         Ok(Binding { args, bound })
///     }
/// }
///```
macro_rules! impl_param_list_for_tuple ({ $($param:ident)* } => {
    impl<$($param,)*> ParamList for ($(Param<$param>,)*)
    where
        $($param: Arg,)*
    {
        type Args = ($($param,)*);

        #[inline]
        fn arity(&self) -> usize {
            <[&str]>::len(&[$(stringify!($param),)*])
        }

        #[allow(non_snake_case, reason = "the type parameters double as bindings")]
        fn names(&self) -> Vec<&str> {
            let ($($param,)*) = self;
            vec![$($param.name(),)*]
        }

        #[allow(non_snake_case, reason = "the type parameters double as bindings")]
        #[allow(unused_mut, unused_variables, unreachable_patterns, reason = "the empty tuple binds nothing")]
        fn bind(&self, lookup: &dyn Lookup) -> Result<Binding<Self::Args>, Failure> {
            let ($($param,)*) = self;
            let mut bound = 0;
            $(
            let $param = match lookup.lookup($param.name()) {
                Some(raw) => {
                    let arg = $param.build(raw)?;
                    bound += 1;
                    Some(arg)
                }
                None => None,
            };
            )*
            let args = match ($($param,)*) {
                ($(Some($param),)*) => Some(($($param,)*)),
                _ => None,
            };
            Ok(Binding { args, bound })
        }
    }
});

impl_param_list_for_tuple! {}
impl_param_list_for_tuple! { A }
impl_param_list_for_tuple! { A B }
impl_param_list_for_tuple! { A B C }
impl_param_list_for_tuple! { A B C D }
impl_param_list_for_tuple! { A B C D E }
impl_param_list_for_tuple! { A B C D E F }
impl_param_list_for_tuple! { A B C D E F G }
impl_param_list_for_tuple! { A B C D E F G H }
impl_param_list_for_tuple! { A B C D E F G H I }
impl_param_list_for_tuple! { A B C D E F G H I J }
