//! Capability records describing how a Rust type maps to terms.
//!
//! A [`TypeDescriptor`] pairs a [`TypeKey`] with a [`Shape`]: what kind of
//! term the type is written as and the erased functions that read and
//! build its values. Descriptors for user types are assembled with
//! [`TypeDescriptor::composite`]:
//!
//! ```
//! use trl_codec::TypeDescriptor;
//!
//! #[derive(Default)]
//! struct Location {
//!     city: String,
//!     country: String,
//! }
//!
//! let descriptor = TypeDescriptor::composite::<Location>()
//!     .with_default()
//!     .member("City", |l: &Location| &l.city, |l: &mut Location, v| l.city = v)
//!     .member("Country", |l: &Location| &l.country, |l: &mut Location, v| l.country = v)
//!     .constructor(|city: String, country: String| Location { city, country })
//!     .build();
//! assert_eq!(descriptor.key().short_name(), "Location");
//! ```

use crate::{AnyValue, ArgTuple, Positional, TypeKey};
use downcast_rs::Downcast;
use smartstring::alias::String;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::str::FromStr;

type Text = std::string::String;

pub(crate) type Getter = Box<dyn Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync>;
pub(crate) type Setter = Box<dyn Fn(&mut dyn Any, AnyValue) -> Result<(), Text> + Send + Sync>;
pub(crate) type Invoker = Box<dyn Fn(Vec<AnyValue>) -> Result<AnyValue, Text> + Send + Sync>;
pub(crate) type Factory = Box<dyn Fn() -> AnyValue + Send + Sync>;
pub(crate) type Splitter = Box<dyn Fn(&dyn Any) -> Option<Vec<(AnyValue, TypeKey)>> + Send + Sync>;

fn erase_getter<F>(f: F) -> Getter
where
    F: Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

fn erase_setter<F>(f: F) -> Setter
where
    F: Fn(&mut dyn Any, AnyValue) -> Result<(), Text> + Send + Sync + 'static,
{
    Box::new(f)
}

fn erase_invoker<F>(f: F) -> Invoker
where
    F: Fn(Vec<AnyValue>) -> Result<AnyValue, Text> + Send + Sync + 'static,
{
    Box::new(f)
}

fn erase_splitter<F>(f: F) -> Splitter
where
    F: Fn(&dyn Any) -> Option<Vec<(AnyValue, TypeKey)>> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(crate) fn mismatch<T: ?Sized + Any>() -> Text {
    format!("value is not a {}", std::any::type_name::<T>())
}

/// How a sequence is built from decoded elements.
pub enum SequenceKind {
    /// Built in one step from all elements.
    Array {
        build: fn(Vec<AnyValue>) -> Result<AnyValue, Text>,
    },
    /// Created empty, then appended to element by element.
    Collection {
        new: fn() -> AnyValue,
        push: fn(&mut dyn Any, AnyValue) -> Result<(), Text>,
    },
}

/// The term shape of a type and its erased accessors.
pub enum Shape {
    /// Written as a string atom.
    Text {
        as_str: fn(&dyn Any) -> Option<&str>,
        from_str: fn(&str) -> AnyValue,
    },
    /// Written as a number atom. `format` fails for values that have no
    /// literal, such as non-finite floats.
    Number {
        format: fn(&dyn Any) -> Result<Text, Text>,
        parse: fn(&str) -> Result<AnyValue, Text>,
    },
    /// Values exist only as constants spelled by identifiers.
    Enumerated,
    /// Written as a list.
    Sequence {
        element: TypeKey,
        iterate: fn(&dyn Any) -> Option<Vec<&dyn Any>>,
        kind: SequenceKind,
    },
    /// `None` is written as the `null` identifier, `Some` as its content.
    Optional {
        inner: TypeKey,
        get: fn(&dyn Any) -> Option<Option<&dyn Any>>,
        some: fn(AnyValue) -> Option<AnyValue>,
        none: fn() -> AnyValue,
    },
    /// A boxed trait object or the unconstrained [`AnyValue`]. Encoding
    /// looks through to the concrete value; decoding needs a registered
    /// subtype, unless `accepts_all` is set.
    Abstract {
        project: fn(&dyn Any) -> Option<&dyn Any>,
        accepts_all: bool,
    },
    /// Written as a named term.
    Composite(Composite),
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Text { .. } => "text",
            Shape::Number { .. } => "number",
            Shape::Enumerated => "enumerated",
            Shape::Sequence { .. } => "sequence",
            Shape::Optional { .. } => "optional",
            Shape::Abstract { .. } => "abstract",
            Shape::Composite(_) => "composite",
        }
    }
}

/// A readable and writable named member of a composite.
pub struct Member {
    pub(crate) name: String,
    pub(crate) ty: TypeKey,
    pub(crate) get: Getter,
    pub(crate) set: Setter,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> TypeKey {
        self.ty
    }
}

/// A positional constructor candidate.
pub struct Constructor {
    pub(crate) params: Vec<TypeKey>,
    pub(crate) invoke: Invoker,
}

impl Constructor {
    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }
}

/// Splits a value into positional arguments.
pub struct Deconstructor {
    pub(crate) types: Vec<TypeKey>,
    pub(crate) split: Splitter,
}

impl Deconstructor {
    pub(crate) fn new<T, D, F>(f: F) -> Self
    where
        T: Any,
        D: ArgTuple + 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        Self {
            types: D::types(),
            split: erase_splitter(move |v: &dyn Any| v.downcast_ref::<T>().map(|t| f(t).into_args())),
        }
    }

    pub fn arity(&self) -> usize {
        self.types.len()
    }
}

/// Members, constructors and factory of a record-like type.
#[derive(Default)]
pub struct Composite {
    pub(crate) factory: Option<Factory>,
    pub(crate) members: Vec<Member>,
    pub(crate) constructors: Vec<Constructor>,
}

impl Composite {
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }
}

/// Describes how one Rust type is written as a term and read back.
pub struct TypeDescriptor {
    pub(crate) key: TypeKey,
    pub(crate) shape: Shape,
    pub(crate) deconstructors: Vec<Deconstructor>,
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key.name())
            .field("shape", &self.shape.kind_name())
            .field("deconstructors", &self.deconstructors.len())
            .finish()
    }
}

fn text_as_str(v: &dyn Any) -> Option<&str> {
    v.downcast_ref::<Text>().map(|s| s.as_str())
}

fn text_from_str(s: &str) -> AnyValue {
    Box::new(Text::from(s))
}

fn format_number<T: Any + Display>(v: &dyn Any) -> Result<Text, Text> {
    v.downcast_ref::<T>()
        .map(|n| n.to_string())
        .ok_or_else(mismatch::<T>)
}

fn format_float<T: Any + Display + Copy + Into<f64>>(v: &dyn Any) -> Result<Text, Text> {
    let n = *v.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
    if !Into::<f64>::into(n).is_finite() {
        return Err(format!("{n} has no number literal"));
    }
    Ok(n.to_string())
}

fn parse_number<T>(text: &str) -> Result<AnyValue, Text>
where
    T: Any + FromStr,
    T::Err: Display,
{
    text.parse::<T>()
        .map(|n| Box::new(n) as AnyValue)
        .map_err(|e| e.to_string())
}

fn iterate_vec<T: Any>(v: &dyn Any) -> Option<Vec<&dyn Any>> {
    v.downcast_ref::<Vec<T>>()
        .map(|v| v.iter().map(|x| x as &dyn Any).collect())
}

fn new_vec<T: Any>() -> AnyValue {
    Box::new(Vec::<T>::new())
}

fn push_vec<T: Any>(c: &mut dyn Any, item: AnyValue) -> Result<(), Text> {
    let c = c.downcast_mut::<Vec<T>>().ok_or_else(mismatch::<Vec<T>>)?;
    let item = item.downcast::<T>().map_err(|_| mismatch::<T>())?;
    c.push(*item);
    Ok(())
}

fn iterate_deque<T: Any>(v: &dyn Any) -> Option<Vec<&dyn Any>> {
    v.downcast_ref::<VecDeque<T>>()
        .map(|v| v.iter().map(|x| x as &dyn Any).collect())
}

fn new_deque<T: Any>() -> AnyValue {
    Box::new(VecDeque::<T>::new())
}

fn push_deque<T: Any>(c: &mut dyn Any, item: AnyValue) -> Result<(), Text> {
    let c = c
        .downcast_mut::<VecDeque<T>>()
        .ok_or_else(mismatch::<VecDeque<T>>)?;
    let item = item.downcast::<T>().map_err(|_| mismatch::<T>())?;
    c.push_back(*item);
    Ok(())
}

fn iterate_slice<T: Any>(v: &dyn Any) -> Option<Vec<&dyn Any>> {
    v.downcast_ref::<Box<[T]>>()
        .map(|v| v.iter().map(|x| x as &dyn Any).collect())
}

fn build_slice<T: Any>(items: Vec<AnyValue>) -> Result<AnyValue, Text> {
    let items = items
        .into_iter()
        .map(|item| item.downcast::<T>().map(|b| *b).map_err(|_| mismatch::<T>()))
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Box::new(items.into_boxed_slice()))
}

fn option_get<T: Any>(v: &dyn Any) -> Option<Option<&dyn Any>> {
    v.downcast_ref::<Option<T>>()
        .map(|o| o.as_ref().map(|x| x as &dyn Any))
}

fn option_some<T: Any>(v: AnyValue) -> Option<AnyValue> {
    v.downcast::<T>()
        .ok()
        .map(|x| Box::new(Some(*x)) as AnyValue)
}

fn option_none<T: Any>() -> AnyValue {
    Box::new(None::<T>)
}

fn project_boxed<T: ?Sized + Downcast>(v: &dyn Any) -> Option<&dyn Any> {
    v.downcast_ref::<Box<T>>().map(|b| Downcast::as_any(&**b))
}

fn project_any(v: &dyn Any) -> Option<&dyn Any> {
    v.downcast_ref::<AnyValue>().map(|b| &**b)
}

impl TypeDescriptor {
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    fn new(key: TypeKey, shape: Shape) -> Self {
        Self {
            key,
            shape,
            deconstructors: Vec::new(),
        }
    }

    /// `String`, written as a string atom.
    pub fn text() -> Self {
        Self::new(
            TypeKey::of::<Text>(),
            Shape::Text {
                as_str: text_as_str,
                from_str: text_from_str,
            },
        )
    }

    /// An integer or decimal type written with its `Display` text and read
    /// with `FromStr`.
    pub fn number<T>() -> Self
    where
        T: Any + Display + FromStr,
        T::Err: Display,
    {
        Self::new(
            TypeKey::of::<T>(),
            Shape::Number {
                format: format_number::<T>,
                parse: parse_number::<T>,
            },
        )
    }

    /// A floating point type. Non-finite values cannot be written.
    pub fn float<T>() -> Self
    where
        T: Any + Display + FromStr + Copy + Into<f64>,
        T::Err: Display,
    {
        Self::new(
            TypeKey::of::<T>(),
            Shape::Number {
                format: format_float::<T>,
                parse: parse_number::<T>,
            },
        )
    }

    /// A type whose values are all registered as identifier constants,
    /// such as `bool` or a fieldless enum.
    pub fn enumerated<T: Any>() -> Self {
        Self::new(TypeKey::of::<T>(), Shape::Enumerated)
    }

    /// `Vec<T>`, filled element by element.
    pub fn list<T: Any>() -> Self {
        Self::new(
            TypeKey::of::<Vec<T>>(),
            Shape::Sequence {
                element: TypeKey::of::<T>(),
                iterate: iterate_vec::<T>,
                kind: SequenceKind::Collection {
                    new: new_vec::<T>,
                    push: push_vec::<T>,
                },
            },
        )
    }

    /// `VecDeque<T>`, filled element by element.
    pub fn deque<T: Any>() -> Self {
        Self::new(
            TypeKey::of::<VecDeque<T>>(),
            Shape::Sequence {
                element: TypeKey::of::<T>(),
                iterate: iterate_deque::<T>,
                kind: SequenceKind::Collection {
                    new: new_deque::<T>,
                    push: push_deque::<T>,
                },
            },
        )
    }

    /// `Box<[T]>`, built in one step.
    pub fn boxed_slice<T: Any>() -> Self {
        Self::new(
            TypeKey::of::<Box<[T]>>(),
            Shape::Sequence {
                element: TypeKey::of::<T>(),
                iterate: iterate_slice::<T>,
                kind: SequenceKind::Array {
                    build: build_slice::<T>,
                },
            },
        )
    }

    /// `Option<T>`.
    pub fn optional<T: Any>() -> Self {
        Self::new(
            TypeKey::of::<Option<T>>(),
            Shape::Optional {
                inner: TypeKey::of::<T>(),
                get: option_get::<T>,
                some: option_some::<T>,
                none: option_none::<T>,
            },
        )
    }

    /// `Box<dyn Trait>` for a trait with [`Downcast`] as supertrait.
    pub fn boxed_trait<T: ?Sized + Downcast>() -> Self {
        Self::new(
            TypeKey::of::<Box<T>>(),
            Shape::Abstract {
                project: project_boxed::<T>,
                accepts_all: false,
            },
        )
    }

    /// The unconstrained target [`AnyValue`].
    pub fn any_value() -> Self {
        Self::new(
            TypeKey::of::<AnyValue>(),
            Shape::Abstract {
                project: project_any,
                accepts_all: true,
            },
        )
    }

    /// Starts a record-like type written as a named term.
    pub fn composite<T: Any>() -> CompositeBuilder<T> {
        CompositeBuilder {
            composite: Composite::default(),
            deconstructors: Vec::new(),
            _marker: PhantomData,
        }
    }
}

/// Builder returned by [`TypeDescriptor::composite`].
///
/// Members are written in name order. Constructors are tried in the order
/// they are added. When deconstructors are present, the one with the most
/// parameters is used for encoding instead of the members, and the term
/// is written positionally.
pub struct CompositeBuilder<T> {
    composite: Composite,
    deconstructors: Vec<Deconstructor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> CompositeBuilder<T> {
    /// Factory for the value that members are bound to.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.composite.factory = Some(Box::new(move || Box::new(f()) as AnyValue));
        self
    }

    /// Uses `T::default()` as the factory.
    pub fn with_default(self) -> Self
    where
        T: Default,
    {
        self.default_with(T::default)
    }

    /// A named member with its accessor pair.
    pub fn member<M, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        M: Any,
        G: Fn(&T) -> &M + Send + Sync + 'static,
        S: Fn(&mut T, M) + Send + Sync + 'static,
    {
        let getter = erase_getter(move |v: &dyn Any| v.downcast_ref::<T>().map(|t| get(t) as &dyn Any));
        let setter = erase_setter(move |target: &mut dyn Any, value: AnyValue| {
            let target = target.downcast_mut::<T>().ok_or_else(mismatch::<T>)?;
            let value = value.downcast::<M>().map_err(|_| mismatch::<M>())?;
            set(target, *value);
            Ok(())
        });
        self.composite.members.push(Member {
            name: name.into(),
            ty: TypeKey::of::<M>(),
            get: getter,
            set: setter,
        });
        self
    }

    /// A positional constructor candidate.
    pub fn constructor<Args, F>(mut self, f: F) -> Self
    where
        Args: 'static,
        F: Positional<Args, T> + Send + Sync + 'static,
    {
        let params = <F as Positional<Args, T>>::params();
        let invoke = erase_invoker(move |args| {
            Positional::<Args, T>::invoke(&f, args)
                .map(|t| Box::new(t) as AnyValue)
                .ok_or_else(|| "arguments do not match the parameters".into())
        });
        self.composite.constructors.push(Constructor { params, invoke });
        self
    }

    /// A positional constructor candidate that can reject its arguments.
    pub fn try_constructor<Args, E, F>(mut self, f: F) -> Self
    where
        Args: 'static,
        E: Display + 'static,
        F: Positional<Args, Result<T, E>> + Send + Sync + 'static,
    {
        let params = <F as Positional<Args, Result<T, E>>>::params();
        let invoke = erase_invoker(move |args| {
            match Positional::<Args, Result<T, E>>::invoke(&f, args) {
                Some(Ok(t)) => Ok(Box::new(t) as AnyValue),
                Some(Err(e)) => Err(e.to_string()),
                None => Err("arguments do not match the parameters".into()),
            }
        });
        self.composite.constructors.push(Constructor { params, invoke });
        self
    }

    /// A deconstructor: splits a value into positional arguments.
    pub fn deconstructor<D, F>(mut self, f: F) -> Self
    where
        D: ArgTuple + 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        self.deconstructors.push(Deconstructor::new::<T, D, F>(f));
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            key: TypeKey::of::<T>(),
            shape: Shape::Composite(self.composite),
            deconstructors: self.deconstructors,
        }
    }
}

impl<T: Any> From<CompositeBuilder<T>> for TypeDescriptor {
    fn from(builder: CompositeBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn point() -> TypeDescriptor {
        TypeDescriptor::composite::<Point>()
            .with_default()
            .member("X", |p: &Point| &p.x, |p: &mut Point, v| p.x = v)
            .member("Y", |p: &Point| &p.y, |p: &mut Point, v| p.y = v)
            .constructor(|x: i32, y: i32| Point { x, y })
            .deconstructor(|p: &Point| (p.x, p.y))
            .build()
    }

    #[test]
    fn composite_accessors() {
        let d = point();
        let Shape::Composite(c) = d.shape() else {
            panic!("not a composite")
        };
        let mut value = (c.factory.as_ref().unwrap())();
        (c.members[0].set)(&mut *value, Box::new(3i32)).unwrap();
        (c.members[1].set)(&mut *value, Box::new(4i32)).unwrap();
        assert_eq!(value.downcast_ref::<Point>(), Some(&Point { x: 3, y: 4 }));

        let y = (c.members[1].get)(&*value).unwrap();
        assert_eq!(y.downcast_ref::<i32>(), Some(&4));

        // wrong member type
        assert!((c.members[0].set)(&mut *value, Box::new(3i64)).is_err());
    }

    #[test]
    fn constructors_and_deconstructors() {
        let d = point();
        let Shape::Composite(c) = d.shape() else {
            panic!("not a composite")
        };
        assert_eq!(c.constructors[0].params(), &[TypeKey::of::<i32>(), TypeKey::of::<i32>()]);
        let p = (c.constructors[0].invoke)(vec![Box::new(1i32), Box::new(2i32)]).unwrap();
        assert_eq!(p.downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));

        let parts = (d.deconstructors[0].split)(&*p).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].0.downcast_ref::<i32>(), Some(&2));
    }

    #[test]
    fn try_constructor_reports_rejection() {
        let d: TypeDescriptor = TypeDescriptor::composite::<Point>()
            .try_constructor(|x: i32| {
                if x >= 0 {
                    Ok(Point { x, y: 0 })
                } else {
                    Err("negative")
                }
            })
            .into();
        let Shape::Composite(c) = d.shape() else {
            panic!("not a composite")
        };
        assert!((c.constructors[0].invoke)(vec![Box::new(1i32)]).is_ok());
        assert_eq!(
            (c.constructors[0].invoke)(vec![Box::new(-1i32)]).err(),
            Some("negative".to_string())
        );
    }

    #[test]
    fn numbers() {
        let Shape::Number { format, parse } = TypeDescriptor::float::<f64>().shape else {
            panic!("not a number")
        };
        assert_eq!(format(&1.5f64), Ok("1.5".to_string()));
        assert!(format(&f64::NAN).is_err());
        assert!(format(&f64::INFINITY).is_err());
        let v = parse("3.25e-2").unwrap();
        assert_eq!(v.downcast_ref::<f64>(), Some(&0.0325));
        assert!(parse("abc").is_err());
    }

    #[test]
    fn sequences_and_options() {
        let Shape::Sequence { iterate, kind, .. } = TypeDescriptor::list::<u8>().shape else {
            panic!("not a sequence")
        };
        let SequenceKind::Collection { new, push } = kind else {
            panic!("not a collection")
        };
        let mut v = new();
        push(&mut *v, Box::new(1u8)).unwrap();
        push(&mut *v, Box::new(2u8)).unwrap();
        assert_eq!(iterate(&*v).map(|items| items.len()), Some(2));
        assert_eq!(v.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2]));

        let Shape::Optional { get, some, none, .. } = TypeDescriptor::optional::<u8>().shape else {
            panic!("not an option")
        };
        let n = none();
        assert!(matches!(get(&*n), Some(None)));
        let s = some(Box::new(5u8)).unwrap();
        assert_eq!(s.downcast_ref::<Option<u8>>(), Some(&Some(5)));
    }
}
