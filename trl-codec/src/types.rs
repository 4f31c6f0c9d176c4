//! Runtime type identities and type-erased values.
//!
//! The codec moves values around as [`AnyValue`]s and describes types by
//! [`TypeKey`]. A decoded value always has exactly the concrete type its
//! [`TypeKey`] names; for the unconstrained target [`AnyValue`] itself
//! that means the natural value is boxed once more.
//!
//! [`Positional`] and [`ArgTuple`] bridge between typed Rust closures and
//! the erased world: a constructor closure `Fn(A, B) -> T` becomes a list
//! of parameter keys plus an invoker over `Vec<AnyValue>`, and a
//! deconstructor returning `(A, B)` becomes a list of erased arguments.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type-erased owned value. Also the type of the unconstrained target.
pub type AnyValue = Box<dyn Any>;

/// Identity of a Rust type, with its name kept for messages and term names.
///
/// Equality and hashing use the [`TypeId`] only.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[inline]
    pub fn of<T: ?Sized + Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type path, as reported by [`std::any::type_name`].
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without module path or generic arguments:
    /// `alloc::vec::Vec<i32>` becomes `Vec`, `dyn app::Shape` becomes
    /// `Shape`.
    pub fn short_name(&self) -> &'static str {
        let name = self.name.split('<').next().unwrap_or(self.name);
        let name = name.rsplit("::").next().unwrap_or(name);
        name.trim_start_matches("dyn ")
    }

    #[inline]
    pub fn is<T: ?Sized + Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A closure usable as a positional constructor.
///
/// Implemented for every `Fn(A1, ..., An) -> R` with `n <= 8` and `'static`
/// argument types. `Args` is the argument tuple and only drives impl
/// selection.
pub trait Positional<Args, R> {
    /// Parameter types, in order.
    fn params() -> Vec<TypeKey>;

    /// Calls the closure with erased arguments. Returns `None` if the
    /// argument count or any argument type does not match.
    fn invoke(&self, args: Vec<AnyValue>) -> Option<R>;
}

/// A tuple returned by a deconstructor.
///
/// Implemented for tuples of up to 8 `'static` elements.
pub trait ArgTuple {
    /// Element types, in order.
    fn types() -> Vec<TypeKey>;

    /// Splits the tuple into erased elements paired with their types.
    fn into_args(self) -> Vec<(AnyValue, TypeKey)>;
}

macro_rules! impl_positional {
    ( $( $A:ident ),* ) => {
        impl<Func, R, $( $A: Any ),*> Positional<( $( $A, )* ), R> for Func
        where
            Func: Fn( $( $A ),* ) -> R,
        {
            fn params() -> Vec<TypeKey> {
                vec![ $( TypeKey::of::<$A>() ),* ]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, args: Vec<AnyValue>) -> Option<R> {
                let arity = <[&str]>::len(&[ $( stringify!($A) ),* ]);
                if args.len() != arity {
                    return None;
                }
                let mut args = args.into_iter();
                $( let $A = *args.next()?.downcast::<$A>().ok()?; )*
                Some((self)( $( $A ),* ))
            }
        }

        impl< $( $A: Any ),* > ArgTuple for ( $( $A, )* ) {
            fn types() -> Vec<TypeKey> {
                vec![ $( TypeKey::of::<$A>() ),* ]
            }

            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<(AnyValue, TypeKey)> {
                let ( $( $A, )* ) = self;
                vec![ $( (Box::new($A) as AnyValue, TypeKey::of::<$A>()) ),* ]
            }
        }
    };
}

impl_positional!();
impl_positional!(A1);
impl_positional!(A1, A2);
impl_positional!(A1, A2, A3);
impl_positional!(A1, A2, A3, A4);
impl_positional!(A1, A2, A3, A4, A5);
impl_positional!(A1, A2, A3, A4, A5, A6);
impl_positional!(A1, A2, A3, A4, A5, A6, A7);
impl_positional!(A1, A2, A3, A4, A5, A6, A7, A8);
