use crate::invoke::IntoInvocation;

/// Represents a method of provider `P` taking the argument tuple `Args`
pub trait Method<P, Args>: Send + Sync + 'static {
    type Output: IntoInvocation;
    fn call(&self, provider: &P, args: Args) -> Self::Output;
}

/// impl `Fn` for `Method`, From 0 parameters to 10 parameters
///
/// for example, it will impl Fn(&P, A, B) like this:
///```ignore
/// impl<Func, P, R, A, B> Method<P, (A, B)> for Func
///    where
///        Func: Fn(&P, A, B) -> R + Send + Sync + 'static,
///        R: IntoInvocation,
/// {
///    type Output = R;
///
///    #[inline]
///    #[allow(non_snake_case)]
///    fn call(&self, provider: &P, (A, B): (A, B)) -> Self::Output {
///        (self)(provider, A, B)
///    }
/// }
///```
macro_rules! impl_method_for_fn ({ $($param:ident)* } => {
    impl<Func, P, R, $($param,)*> Method<P, ($($param,)*)> for Func
    where
        Func: Fn(&P, $($param),*) -> R + Send + Sync + 'static,
        R: IntoInvocation,
    {
        type Output = R;

        #[inline]
        #[allow(non_snake_case, reason = "the type parameters double as bindings")]
        fn call(&self, provider: &P, ($($param,)*): ($($param,)*)) -> Self::Output {
            (self)(provider, $($param,)*)
        }
    }
});

impl_method_for_fn! {}
impl_method_for_fn! { A }
impl_method_for_fn! { A B }
impl_method_for_fn! { A B C }
impl_method_for_fn! { A B C D }
impl_method_for_fn! { A B C D E }
impl_method_for_fn! { A B C D E F }
impl_method_for_fn! { A B C D E F G }
impl_method_for_fn! { A B C D E F G H }
impl_method_for_fn! { A B C D E F G H I }
impl_method_for_fn! { A B C D E F G H I J }
