//! The type registry: descriptors, term names, identifier constants,
//! subtype relations and deconstructor extensions.
//!
//! Registration happens up front on a mutable [`Registry`]; translation
//! only reads it, so a finished registry can be shared by any number of
//! encode and decode calls.

use crate::descriptor::{Deconstructor, Shape, TypeDescriptor};
use crate::{AnyValue, ArgTuple, CodecError, RegistrationError, TypeKey};
use bigdecimal::BigDecimal;
use downcast_rs::Downcast;
use indexmap::{IndexMap, IndexSet};
use smartstring::alias::String;
use std::any::{Any, TypeId};
use std::fmt;

/// Identifier spelling the absent value.
pub const NULL: &str = "null";

type Upcast = Box<dyn Fn(AnyValue) -> Result<AnyValue, AnyValue> + Send + Sync>;

/// A value that can be bound to an identifier.
///
/// Implemented for every `Clone + PartialEq` type that can be shared
/// between threads.
pub trait ConstantValue: Any + Send + Sync {
    /// `true` if `value` has the same type and compares equal.
    fn matches(&self, value: &dyn Any) -> bool;

    fn clone_value(&self) -> AnyValue;

    fn value_type(&self) -> TypeKey;
}

impl<T: Any + Clone + PartialEq + Send + Sync> ConstantValue for T {
    fn matches(&self, value: &dyn Any) -> bool {
        value.downcast_ref::<T>() == Some(self)
    }

    fn clone_value(&self) -> AnyValue {
        Box::new(self.clone())
    }

    fn value_type(&self) -> TypeKey {
        TypeKey::of::<T>()
    }
}

/// What an identifier stands for.
pub enum Constant {
    /// The reserved `null` identifier.
    Null,
    /// A fresh copy of a registered constant, with its type.
    Value { value: AnyValue, ty: TypeKey },
}

impl fmt::Debug for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("Null"),
            Constant::Value { ty, .. } => f.debug_struct("Value").field("ty", &ty.name()).finish(),
        }
    }
}

/// A named bundle of deconstructors for types registered elsewhere.
///
/// ```
/// use trl_codec::{ExtensionProvider, Extensions, Registry, TypeDescriptor};
///
/// #[derive(Default)]
/// struct Span {
///     start: u32,
///     end: u32,
/// }
///
/// struct SpanExtensions;
///
/// impl ExtensionProvider for SpanExtensions {
///     fn name(&self) -> &str {
///         "span"
///     }
///
///     fn register(&self, extensions: &mut Extensions) {
///         extensions.deconstructor(|s: &Span| (s.start, s.end));
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry
///     .register(TypeDescriptor::composite::<Span>().constructor(|start: u32, end: u32| Span { start, end }))
///     .unwrap();
/// registry.register_extensions(&SpanExtensions).unwrap();
/// assert!(registry.register_extensions(&SpanExtensions).is_err());
/// ```
pub trait ExtensionProvider {
    fn name(&self) -> &str;

    fn register(&self, extensions: &mut Extensions);
}

/// Collects the deconstructors contributed by an [`ExtensionProvider`].
#[derive(Default)]
pub struct Extensions {
    deconstructors: Vec<(TypeKey, Deconstructor)>,
}

impl Extensions {
    pub fn deconstructor<T, D, F>(&mut self, f: F) -> &mut Self
    where
        T: Any,
        D: ArgTuple + 'static,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        self.deconstructors
            .push((TypeKey::of::<T>(), Deconstructor::new::<T, D, F>(f)));
        self
    }

    pub fn len(&self) -> usize {
        self.deconstructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deconstructors.is_empty()
    }
}

/// Maps Rust types to and from terms.
///
/// [`Registry::new`] comes with `String`, all primitive numbers, `f32`,
/// `f64`, [`BigDecimal`], `bool` (as the constants `true` and `false`),
/// the unconstrained [`AnyValue`], and `Vec`, `VecDeque`, `Box<[_]>` and
/// `Option` of each of them.
pub struct Registry {
    descriptors: IndexMap<TypeId, TypeDescriptor>,
    term_names: IndexMap<String, TypeKey>,
    type_names: IndexMap<TypeId, String>,
    constants: IndexMap<String, Box<dyn ConstantValue>>,
    subtypes: IndexMap<(TypeId, TypeId), Upcast>,
    deconstructors: IndexMap<TypeId, Vec<Deconstructor>>,
    providers: IndexSet<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.descriptors.len())
            .field("term_names", &self.term_names.len())
            .field("constants", &self.constants.len())
            .field("subtypes", &self.subtypes.len())
            .field("providers", &self.providers)
            .finish()
    }
}

macro_rules! builtin_numbers {
    ( $registry:ident, $ctor:ident: $( $t:ty ),* ) => {
        $(
            $registry.insert(TypeDescriptor::$ctor::<$t>());
            $registry.insert_containers::<$t>();
        )*
    };
}

impl Registry {
    /// A registry without any types, not even the built-in ones.
    pub fn empty() -> Self {
        Self {
            descriptors: IndexMap::new(),
            term_names: IndexMap::new(),
            type_names: IndexMap::new(),
            constants: IndexMap::new(),
            subtypes: IndexMap::new(),
            deconstructors: IndexMap::new(),
            providers: IndexSet::new(),
        }
    }

    /// A registry with the built-in types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert(TypeDescriptor::text());
        registry.insert_containers::<std::string::String>();
        builtin_numbers!(registry, number: i8, i16, i32, i64, i128, isize);
        builtin_numbers!(registry, number: u8, u16, u32, u64, u128, usize);
        builtin_numbers!(registry, number: BigDecimal);
        builtin_numbers!(registry, float: f32, f64);
        registry.insert(TypeDescriptor::enumerated::<bool>());
        registry.insert_containers::<bool>();
        registry.constants.insert("true".into(), Box::new(true));
        registry.constants.insert("false".into(), Box::new(false));
        registry.insert(TypeDescriptor::any_value());
        registry.insert_containers::<AnyValue>();
        registry
    }

    fn insert(&mut self, mut descriptor: TypeDescriptor) {
        let id = descriptor.key.id();
        let deconstructors = std::mem::take(&mut descriptor.deconstructors);
        if !deconstructors.is_empty() {
            self.deconstructors.entry(id).or_default().extend(deconstructors);
        }
        self.descriptors.insert(id, descriptor);
    }

    fn ensure(&mut self, descriptor: TypeDescriptor) {
        if !self.descriptors.contains_key(&descriptor.key.id()) {
            self.insert(descriptor);
        }
    }

    fn insert_containers<T: Any>(&mut self) {
        self.ensure(TypeDescriptor::list::<T>());
        self.ensure(TypeDescriptor::deque::<T>());
        self.ensure(TypeDescriptor::boxed_slice::<T>());
        self.ensure(TypeDescriptor::optional::<T>());
    }

    /// Registers a type. Deconstructors carried by the descriptor are added
    /// to the type's deconstructor list.
    pub fn register(&mut self, descriptor: impl Into<TypeDescriptor>) -> Result<(), RegistrationError> {
        let descriptor = descriptor.into();
        if self.descriptors.contains_key(&descriptor.key.id()) {
            return Err(RegistrationError::DuplicateType(descriptor.key.name()));
        }
        log::trace!(
            "registering {} as {}",
            descriptor.key.name(),
            descriptor.shape.kind_name()
        );
        self.insert(descriptor);
        Ok(())
    }

    /// Makes `Vec<T>`, `VecDeque<T>` and `Box<[T]>` available. Already
    /// registered sequence types are left alone.
    pub fn register_list<T: Any>(&mut self) {
        self.ensure(TypeDescriptor::list::<T>());
        self.ensure(TypeDescriptor::deque::<T>());
        self.ensure(TypeDescriptor::boxed_slice::<T>());
    }

    /// Makes `Option<T>` available.
    pub fn register_optional<T: Any>(&mut self) {
        self.ensure(TypeDescriptor::optional::<T>());
    }

    /// Declares `S` a subtype of the trait object `B`: values of `S` are
    /// accepted wherever a `Box<B>` is expected, converted by `upcast`.
    /// Registers `Box<B>` as an abstract type if needed.
    pub fn map_subtype<S, B>(&mut self, upcast: impl Fn(S) -> Box<B> + Send + Sync + 'static)
    where
        S: Any,
        B: ?Sized + Downcast,
    {
        self.ensure(TypeDescriptor::boxed_trait::<B>());
        let convert: Upcast = Box::new(move |value: AnyValue| match value.downcast::<S>() {
            Ok(value) => Ok(Box::new(upcast(*value)) as AnyValue),
            Err(value) => Err(value),
        });
        self.subtypes
            .insert((TypeId::of::<S>(), TypeId::of::<Box<B>>()), convert);
    }

    /// `true` if a value of type `sub` can be used where `base` is expected.
    pub fn is_assignable(&self, sub: TypeKey, base: TypeKey) -> bool {
        if sub == base {
            return true;
        }
        if let Some(TypeDescriptor {
            shape: Shape::Abstract { accepts_all: true, .. },
            ..
        }) = self.descriptors.get(&base.id())
        {
            return true;
        }
        self.subtypes.contains_key(&(sub.id(), base.id()))
    }

    pub(crate) fn upcast(&self, value: AnyValue, from: TypeKey, to: TypeKey) -> Option<Result<AnyValue, AnyValue>> {
        self.subtypes.get(&(from.id(), to.id())).map(|f| f(value))
    }

    pub fn descriptor(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.descriptors.get(&id)
    }

    pub fn is_registered<T: ?Sized + Any>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    /// Sets the term name used for `T`. Both directions must be unique.
    pub fn map_term_name_to_type<T: ?Sized + Any>(&mut self, name: &str) -> Result<(), RegistrationError> {
        let key = TypeKey::of::<T>();
        if let Some(existing) = self.term_names.get(name) {
            return Err(RegistrationError::DuplicateTermName {
                name: name.into(),
                existing: existing.name(),
            });
        }
        if let Some(existing) = self.type_names.get(&key.id()) {
            return Err(RegistrationError::DuplicateTypeMapping {
                type_name: key.name(),
                existing: existing.clone(),
            });
        }
        self.term_names.insert(name.into(), key);
        self.type_names.insert(key.id(), name.into());
        Ok(())
    }

    /// Resolves the type a named term decodes to. An unmapped name resolves
    /// to `expected` itself; a mapped type must be assignable to it.
    pub fn get_type_for_term_name(&self, name: &str, expected: TypeKey) -> Result<TypeKey, CodecError> {
        let Some(&resolved) = self.term_names.get(name) else {
            return Ok(expected);
        };
        if !self.is_assignable(resolved, expected) {
            return Err(CodecError::TypeResolution {
                term_name: name.into(),
                resolved: resolved.name(),
                expected: expected.name(),
            });
        }
        Ok(resolved)
    }

    /// The term name of a type: the mapped name, else its short name.
    pub fn get_term_name_for_type(&self, key: TypeKey) -> String {
        self.type_names
            .get(&key.id())
            .cloned()
            .unwrap_or_else(|| key.short_name().into())
    }

    /// Binds `name` to a constant. Passing `None` leaves the registry
    /// unchanged. `null` is reserved.
    pub fn map_identifier_name_to_constant<T: ConstantValue>(
        &mut self,
        name: &str,
        value: impl Into<Option<T>>,
    ) -> Result<(), RegistrationError> {
        let Some(value) = value.into() else {
            return Ok(());
        };
        if name == NULL || self.constants.contains_key(name) {
            return Err(RegistrationError::DuplicateIdentifier(name.into()));
        }
        self.constants.insert(name.into(), Box::new(value));
        Ok(())
    }

    pub fn get_constant_value_for_identifier(&self, name: &str) -> Option<Constant> {
        if name == NULL {
            return Some(Constant::Null);
        }
        self.constants.get(name).map(|c| Constant::Value {
            value: c.clone_value(),
            ty: c.value_type(),
        })
    }

    /// The identifier bound to a constant equal to `value`, if any.
    pub fn get_identifier_for_constant_value(&self, value: &dyn Any) -> Option<&str> {
        self.constants
            .iter()
            .find(|(_, c)| c.matches(value))
            .map(|(name, _)| name.as_str())
    }

    /// `true` if `value` is an `Option` holding `None`.
    pub(crate) fn is_absent(&self, value: &dyn Any) -> bool {
        match self.descriptors.get(&value.type_id()).map(|d| &d.shape) {
            Some(Shape::Optional { get, .. }) => matches!(get(value), Some(None)),
            _ => false,
        }
    }

    /// The deconstructor with the most parameters; the first one added wins
    /// a tie.
    pub fn best_deconstructor(&self, id: TypeId) -> Option<&Deconstructor> {
        let mut best: Option<&Deconstructor> = None;
        for candidate in self.deconstructors.get(&id)? {
            match best {
                Some(b) if candidate.arity() <= b.arity() => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    /// Adds the deconstructors of `provider`. Every target type must be
    /// registered already.
    pub fn register_extensions(&mut self, provider: &dyn ExtensionProvider) -> Result<(), RegistrationError> {
        let name: String = provider.name().into();
        if self.providers.contains(&name) {
            return Err(RegistrationError::DuplicateExtensionProvider(name));
        }
        let mut extensions = Extensions::default();
        provider.register(&mut extensions);
        if extensions.is_empty() {
            return Err(RegistrationError::NotAnExtensionProvider(name));
        }
        if let Some((key, _)) = extensions
            .deconstructors
            .iter()
            .find(|(key, _)| !self.descriptors.contains_key(&key.id()))
        {
            return Err(RegistrationError::UnknownType(key.name()));
        }
        log::debug!(
            "extension provider '{}' adds {} deconstructors",
            name,
            extensions.len()
        );
        for (key, deconstructor) in extensions.deconstructors {
            self.deconstructors.entry(key.id()).or_default().push(deconstructor);
        }
        self.providers.insert(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    trait Shape2: Downcast {}
    downcast_rs::impl_downcast!(Shape2);

    #[derive(Debug, Clone, PartialEq)]
    struct Square(u32);
    impl Shape2 for Square {}

    #[derive(Debug, Clone, PartialEq)]
    struct Pair(u8, u8);

    fn pair() -> TypeDescriptor {
        TypeDescriptor::composite::<Pair>()
            .constructor(|a: u8, b: u8| Pair(a, b))
            .deconstructor(|p: &Pair| (p.0,))
            .deconstructor(|p: &Pair| (p.0, p.1))
            .deconstructor(|p: &Pair| (p.1, p.0))
            .build()
    }

    #[test]
    fn builtins() {
        let r = Registry::new();
        assert!(r.is_registered::<std::string::String>());
        assert!(r.is_registered::<i128>());
        assert!(r.is_registered::<BigDecimal>());
        assert!(r.is_registered::<Vec<f64>>());
        assert!(r.is_registered::<VecDeque<u8>>());
        assert!(r.is_registered::<Box<[bool]>>());
        assert!(r.is_registered::<Option<i64>>());
        assert!(r.is_registered::<Vec<AnyValue>>());
        assert!(!Registry::empty().is_registered::<std::string::String>());
        assert_eq!(r.get_identifier_for_constant_value(&true), Some("true"));
    }

    #[test]
    fn duplicate_registrations() {
        let mut r = Registry::new();
        r.register(pair()).unwrap();
        assert_eq!(
            r.register(pair()),
            Err(RegistrationError::DuplicateType(TypeKey::of::<Pair>().name()))
        );

        r.map_term_name_to_type::<Pair>("P").unwrap();
        assert!(matches!(
            r.map_term_name_to_type::<Square>("P"),
            Err(RegistrationError::DuplicateTermName { .. })
        ));
        assert!(matches!(
            r.map_term_name_to_type::<Pair>("Q"),
            Err(RegistrationError::DuplicateTypeMapping { .. })
        ));
        assert_eq!(r.get_term_name_for_type(TypeKey::of::<Pair>()).as_str(), "P");
        assert_eq!(r.get_term_name_for_type(TypeKey::of::<Square>()).as_str(), "Square");
    }

    #[test]
    fn constants() {
        let mut r = Registry::new();
        r.map_identifier_name_to_constant("Pi", std::f64::consts::PI).unwrap();
        r.map_identifier_name_to_constant::<f64>("Nothing", None).unwrap();
        assert_eq!(
            r.map_identifier_name_to_constant("Pi", 3.0f64),
            Err(RegistrationError::DuplicateIdentifier("Pi".into()))
        );
        assert_eq!(
            r.map_identifier_name_to_constant("null", 0u8),
            Err(RegistrationError::DuplicateIdentifier("null".into()))
        );

        assert_eq!(r.get_identifier_for_constant_value(&std::f64::consts::PI), Some("Pi"));
        assert_eq!(r.get_identifier_for_constant_value(&3.0f64), None);
        assert!(r.get_constant_value_for_identifier("Nothing").is_none());
        assert!(matches!(r.get_constant_value_for_identifier("null"), Some(Constant::Null)));
        let Some(Constant::Value { value, ty }) = r.get_constant_value_for_identifier("Pi") else {
            panic!("Pi is not defined")
        };
        assert_eq!(ty, TypeKey::of::<f64>());
        assert_eq!(value.downcast_ref::<f64>(), Some(&std::f64::consts::PI));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn finished_registry_is_shared_between_threads() {
        assert_send_sync::<Registry>();
        let mut r = Registry::new();
        r.register(pair()).unwrap();
        r.map_subtype::<Square, dyn Shape2>(|s| Box::new(s));
        r.map_identifier_name_to_constant("Pi", std::f64::consts::PI).unwrap();
        let r = std::sync::Arc::new(r);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let r = std::sync::Arc::clone(&r);
                std::thread::spawn(move || {
                    r.get_identifier_for_constant_value(&std::f64::consts::PI)
                        .map(|name| name.to_string())
                })
            })
            .collect();
        for reader in readers {
            assert_eq!(reader.join().unwrap().as_deref(), Some("Pi"));
        }
    }

    #[test]
    fn subtypes_and_resolution() {
        let mut r = Registry::new();
        r.map_subtype::<Square, dyn Shape2>(|s| Box::new(s));
        r.map_term_name_to_type::<Square>("Square").unwrap();
        let base = TypeKey::of::<Box<dyn Shape2>>();
        assert!(r.is_registered::<Box<dyn Shape2>>());
        assert!(r.is_assignable(TypeKey::of::<Square>(), base));
        assert!(!r.is_assignable(TypeKey::of::<Pair>(), base));
        assert!(r.is_assignable(TypeKey::of::<Pair>(), TypeKey::of::<AnyValue>()));

        assert_eq!(
            r.get_type_for_term_name("Square", base).unwrap(),
            TypeKey::of::<Square>()
        );
        assert_eq!(
            r.get_type_for_term_name("Circle", base).unwrap(),
            base
        );
        assert!(matches!(
            r.get_type_for_term_name("Square", TypeKey::of::<Pair>()),
            Err(CodecError::TypeResolution { .. })
        ));

        let up = r
            .upcast(Box::new(Square(2)), TypeKey::of::<Square>(), base)
            .unwrap()
            .unwrap();
        let shape = up.downcast::<Box<dyn Shape2>>().unwrap();
        assert_eq!((**shape).as_any().downcast_ref::<Square>(), Some(&Square(2)));
    }

    #[test]
    fn best_deconstructor_prefers_arity_then_order() {
        let mut r = Registry::new();
        r.register(pair()).unwrap();
        let best = r.best_deconstructor(TypeId::of::<Pair>()).unwrap();
        assert_eq!(best.arity(), 2);
        let parts = (best.split)(&Pair(1, 2)).unwrap();
        assert_eq!(parts[0].0.downcast_ref::<u8>(), Some(&1));
        assert!(r.best_deconstructor(TypeId::of::<Square>()).is_none());
    }

    struct Nothing;

    impl ExtensionProvider for Nothing {
        fn name(&self) -> &str {
            "nothing"
        }

        fn register(&self, _: &mut Extensions) {}
    }

    struct SquareSide;

    impl ExtensionProvider for SquareSide {
        fn name(&self) -> &str {
            "square"
        }

        fn register(&self, extensions: &mut Extensions) {
            extensions.deconstructor(|s: &Square| (s.0,));
        }
    }

    #[test]
    fn extension_providers() {
        let mut r = Registry::new();
        assert_eq!(
            r.register_extensions(&Nothing),
            Err(RegistrationError::NotAnExtensionProvider("nothing".into()))
        );
        assert!(matches!(
            r.register_extensions(&SquareSide),
            Err(RegistrationError::UnknownType(_))
        ));
        r.register(TypeDescriptor::composite::<Square>().constructor(Square))
            .unwrap();
        r.register_extensions(&SquareSide).unwrap();
        assert_eq!(
            r.register_extensions(&SquareSide),
            Err(RegistrationError::DuplicateExtensionProvider("square".into()))
        );
        assert_eq!(r.best_deconstructor(TypeId::of::<Square>()).map(|d| d.arity()), Some(1));
    }
}
