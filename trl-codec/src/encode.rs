//! Writes native values into a [`TermStore`].

use crate::descriptor::{Member, Shape};
use crate::registry::NULL;
use crate::{CodecError, Registry, TypeKey};
use smartstring::alias::String;
use std::any::Any;
use trl_terms::{AtomKind, ExtractCommonTerms, Symbol, TermStore};

/// Translates one value graph into terms.
///
/// Values are visited depth first. Constants are checked before anything
/// else, so a value equal to a registered constant is always written as
/// its identifier. Composite values use their widest deconstructor when
/// they have one and are written positionally; otherwise their members
/// are written in name order, skipping members that hold `None`.
pub struct ObjectToTerm<'r> {
    registry: &'r Registry,
    store: TermStore,
}

impl<'r> ObjectToTerm<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            store: TermStore::new(),
        }
    }

    /// Encodes `value` as the root statement `root_label: term;` and
    /// extracts repeated subterms into rewrite rules.
    pub fn translate(
        mut self,
        value: &dyn Any,
        declared: TypeKey,
        root_label: &str,
    ) -> Result<TermStore, CodecError> {
        let symbol = self.encode(value, declared)?;
        self.store.label_term(symbol, root_label)?;
        self.store.set_root_term(symbol)?;
        self.store.mutate(&ExtractCommonTerms::new())?;
        Ok(self.store)
    }

    /// Stores the term for `value` and returns its symbol. `declared` is
    /// the static type the value was reached through.
    pub fn encode(&mut self, value: &dyn Any, declared: TypeKey) -> Result<Symbol, CodecError> {
        let registry = self.registry;
        if let Some(identifier) = registry.get_identifier_for_constant_value(value) {
            return Ok(self.store.store_atom(identifier, AtomKind::Identifier)?);
        }
        let Some(descriptor) = registry.descriptor(value.type_id()) else {
            return Err(CodecError::UnknownType(unknown_name(value, declared)));
        };
        let key = descriptor.key();
        match descriptor.shape() {
            Shape::Text { as_str, .. } => {
                let text = as_str(value).ok_or_else(|| mismatch(key))?;
                Ok(self.store.store_atom(text, AtomKind::String)?)
            }
            Shape::Sequence { element, iterate, .. } => {
                let items = iterate(value).ok_or_else(|| mismatch(key))?;
                let mut refs = Vec::with_capacity(items.len());
                for item in items {
                    refs.push(self.encode(item, *element)?);
                }
                Ok(self.store.store_term_list(refs)?)
            }
            Shape::Number { format, .. } => match format(value) {
                Ok(text) => Ok(self.store.store_atom(text, AtomKind::Number)?),
                Err(reason) => Err(CodecError::Unrepresentable {
                    type_name: key.name(),
                    reason,
                }),
            },
            Shape::Optional { inner, get, .. } => match get(value) {
                Some(Some(inner_value)) => self.encode(inner_value, *inner),
                Some(None) => Ok(self.store.store_atom(NULL, AtomKind::Identifier)?),
                None => Err(mismatch(key)),
            },
            Shape::Abstract { project, .. } => {
                let inner = project(value).ok_or_else(|| mismatch(key))?;
                self.encode(inner, key)
            }
            Shape::Enumerated => Err(CodecError::Unrepresentable {
                type_name: key.name(),
                reason: "no identifier is mapped to this value".into(),
            }),
            Shape::Composite(composite) => {
                let name = registry.get_term_name_for_type(key);
                if let Some(deconstructor) = registry.best_deconstructor(key.id()) {
                    let parts = (deconstructor.split)(value).ok_or_else(|| mismatch(key))?;
                    let mut args = Vec::with_capacity(parts.len());
                    for (part, ty) in &parts {
                        args.push(self.encode(&**part, *ty)?);
                    }
                    return Ok(self.store.store_non_ac_term(name, args, None)?);
                }
                let mut members: Vec<&Member> = composite.members.iter().collect();
                members.sort_by(|a, b| a.name.cmp(&b.name));
                let mut names: Vec<String> = Vec::with_capacity(members.len());
                let mut args = Vec::with_capacity(members.len());
                for member in members {
                    let Some(field) = (member.get)(value) else {
                        return Err(mismatch(key));
                    };
                    if registry.is_absent(field) {
                        continue;
                    }
                    args.push(self.encode(field, member.ty)?);
                    names.push(member.name.clone());
                }
                Ok(self.store.store_non_ac_term(name, args, Some(names))?)
            }
        }
    }

    pub fn into_store(self) -> TermStore {
        self.store
    }
}

fn unknown_name(value: &dyn Any, declared: TypeKey) -> std::string::String {
    if value.type_id() == declared.id() {
        declared.name().into()
    } else {
        format!("a value declared as {}", declared.name())
    }
}

fn mismatch(key: TypeKey) -> CodecError {
    CodecError::Unrepresentable {
        type_name: key.name(),
        reason: "value does not have the registered type".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeDescriptor;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Location {
        city: std::string::String,
        country: Option<std::string::String>,
    }

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.register(
            TypeDescriptor::composite::<Location>()
                .with_default()
                .member("City", |l: &Location| &l.city, |l: &mut Location, v| l.city = v)
                .member("Country", |l: &Location| &l.country, |l: &mut Location, v| l.country = v),
        )
        .unwrap();
        r.register_list::<Location>();
        r
    }

    fn render(registry: &Registry, value: &dyn Any, declared: TypeKey) -> std::string::String {
        let store = ObjectToTerm::new(registry)
            .translate(value, declared, "root")
            .unwrap();
        store.read_current_frame().unwrap().to_string()
    }

    #[test]
    fn scalars() {
        let r = registry();
        assert_eq!(render(&r, &42i32, TypeKey::of::<i32>()), "root: 42;");
        assert_eq!(render(&r, &-1.5f64, TypeKey::of::<f64>()), "root: -1.5;");
        assert_eq!(
            render(&r, &std::string::String::from("a\"b"), TypeKey::of::<std::string::String>()),
            r#"root: "a\"b";"#
        );
        assert_eq!(render(&r, &true, TypeKey::of::<bool>()), "root: true;");
        assert_eq!(render(&r, &None::<i32>, TypeKey::of::<Option<i32>>()), "root: null;");
        assert_eq!(render(&r, &Some(7u8), TypeKey::of::<Option<u8>>()), "root: 7;");
        assert_eq!(render(&r, &vec![1u8, 2], TypeKey::of::<Vec<u8>>()), "root: (1, 2);");
    }

    #[test]
    fn members_in_name_order_without_absent_values() {
        let r = registry();
        let located = Location {
            city: "Athens".into(),
            country: Some("Greece".into()),
        };
        assert_eq!(
            render(&r, &located, TypeKey::of::<Location>()),
            r#"root: Location<City, Country>("Athens", "Greece");"#
        );
        let unknown = Location {
            city: "Stagira".into(),
            country: None,
        };
        assert_eq!(
            render(&r, &unknown, TypeKey::of::<Location>()),
            r#"root: Location<City>("Stagira");"#
        );
    }

    #[test]
    fn repeated_values_are_shared() {
        let r = registry();
        let athens = Location {
            city: "Athens".into(),
            country: None,
        };
        let both = vec![athens.clone(), athens];
        assert_eq!(
            render(&r, &both, TypeKey::of::<Vec<Location>>()),
            r#"root: (_0, _0); _0 => Location<City>("Athens");"#
        );
    }

    #[test]
    fn unrepresentable_values() {
        let r = registry();
        let err = ObjectToTerm::new(&r)
            .translate(&f64::NAN, TypeKey::of::<f64>(), "root")
            .unwrap_err();
        assert!(matches!(err, CodecError::Unrepresentable { .. }));

        let err = ObjectToTerm::new(&r)
            .translate(&'c', TypeKey::of::<char>(), "root")
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(_)));
    }
}
