use crate::error::CallbackError;
use crate::source::SourceKind;
use crate::value_type::{ArgumentError, FromArg, ValueType, convert_arg};
use crate::visitor::Nested;

/// What a callback invocation produced: nothing, or a visitor for the
/// matched scope.
pub type CallbackResult<K> = Result<Option<Nested<K>>, CallbackError>;

/// Declared shape of one callback parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub value_type: ValueType,
    pub optional: bool,
}

/// Return values a bound callback may produce.
pub trait IntoOutcome<K: SourceKind> {
    /// Whether the return type is able to carry a nested visitor.
    const YIELDS: bool;

    fn into_outcome(self) -> CallbackResult<K>;
}

impl<K: SourceKind> IntoOutcome<K> for () {
    const YIELDS: bool = false;

    fn into_outcome(self) -> CallbackResult<K> {
        Ok(None)
    }
}

impl<K: SourceKind> IntoOutcome<K> for Nested<K> {
    const YIELDS: bool = true;

    fn into_outcome(self) -> CallbackResult<K> {
        Ok(Some(self))
    }
}

impl<K: SourceKind> IntoOutcome<K> for Option<Nested<K>> {
    const YIELDS: bool = true;

    fn into_outcome(self) -> CallbackResult<K> {
        Ok(self)
    }
}

impl<K, T, E> IntoOutcome<K> for Result<T, E>
where
    K: SourceKind,
    T: IntoOutcome<K>,
    E: Into<CallbackError>,
{
    const YIELDS: bool = T::YIELDS;

    fn into_outcome(self) -> CallbackResult<K> {
        self.map_err(Into::into)?.into_outcome()
    }
}

/// A closure usable as a bound callback on visitor `V`.
///
/// Implemented for `Fn(&mut V, P1, .., Pn) -> R` with up to six parameters,
/// where every `Pi` converts from the source's argument type and `R` is an
/// [`IntoOutcome`]. `Params` only disambiguates the arities.
pub trait Handler<K: SourceKind, V, Params>: Send + Sync + 'static {
    const YIELDS: bool;

    fn parameters() -> Vec<ParamSpec>;

    fn handle(&self, visitor: &mut V, args: Vec<K::Arg>) -> CallbackResult<K>;
}

fn missing_argument<A, T: FromArg<A>>(index: usize) -> ArgumentError {
    ArgumentError { index, expected: T::VALUE_TYPE, found: "nothing" }
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<K, V, F, R, $($param,)*> Handler<K, V, ($($param,)*)> for F
        where
            K: SourceKind,
            F: Fn(&mut V, $($param),*) -> R + Send + Sync + 'static,
            R: IntoOutcome<K>,
            $($param: FromArg<K::Arg>,)*
        {
            const YIELDS: bool = <R as IntoOutcome<K>>::YIELDS;

            fn parameters() -> Vec<ParamSpec> {
                vec![$(ParamSpec {
                    value_type: <$param as FromArg<K::Arg>>::VALUE_TYPE,
                    optional: <$param as FromArg<K::Arg>>::OPTIONAL,
                }),*]
            }

            fn handle(&self, visitor: &mut V, args: Vec<K::Arg>) -> CallbackResult<K> {
                let mut args = args.into_iter();
                let mut index = 0usize;
                $(
                    let arg = args
                        .next()
                        .ok_or_else(|| missing_argument::<K::Arg, $param>(index))?;
                    let $param = convert_arg::<K::Arg, $param>(index, arg)?;
                    index += 1;
                )*
                (self)(visitor, $($param),*).into_outcome()
            }
        }
    };
}

impl_handler!();
impl_handler!(P1);
impl_handler!(P1, P2);
impl_handler!(P1, P2, P3);
impl_handler!(P1, P2, P3, P4);
impl_handler!(P1, P2, P3, P4, P5);
impl_handler!(P1, P2, P3, P4, P5, P6);
