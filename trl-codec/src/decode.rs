//! Builds native values from owned terms.

use crate::descriptor::{Composite, SequenceKind, Shape};
use crate::registry::{Constant, NULL};
use crate::{AnyValue, CodecError, Registry, TypeKey};
use bigdecimal::BigDecimal;
use trl_terms::{Atom, AtomKind, NonAcTerm, Term};

/// Translates fully rewritten terms into values of an expected type.
///
/// Named terms with a member list are built by binding every member of a
/// fresh default value. Positional terms try the constructors of matching
/// arity in registration order; a candidate whose arguments do not
/// convert, or which rejects them, is skipped.
pub struct TermToObject<'r> {
    registry: &'r Registry,
}

impl<'r> TermToObject<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Decodes `term` into a value whose concrete type is `expected`.
    pub fn translate(&self, term: &Term, expected: TypeKey) -> Result<AnyValue, CodecError> {
        if expected.is::<AnyValue>() {
            let value = self.translate_natural(term)?;
            return Ok(Box::new(value));
        }
        let shape = self.registry.descriptor(expected.id()).map(|d| d.shape());
        if let Some(Shape::Optional { inner, some, none, .. }) = shape {
            if term.is_identifier(NULL) {
                return Ok(none());
            }
            let value = self.translate(term, *inner)?;
            return some(value).ok_or_else(|| conversion(term, expected, "value does not fit the option"));
        }
        match term {
            Term::Atom(Atom {
                kind: AtomKind::Identifier,
                text,
            }) => self.translate_identifier(text, expected),
            Term::Atom(Atom {
                kind: AtomKind::String,
                text,
            }) => match shape {
                Some(Shape::Text { from_str, .. }) => Ok(from_str(text)),
                Some(_) => Err(conversion(term, expected, "a string needs a text type")),
                None => Err(CodecError::UnknownType(expected.name().into())),
            },
            Term::Atom(Atom {
                kind: AtomKind::Number,
                text,
            }) => match shape {
                Some(Shape::Number { parse, .. }) => {
                    parse(text).map_err(|reason| conversion(term, expected, &reason))
                }
                Some(Shape::Text { from_str, .. }) => Ok(from_str(text)),
                Some(_) => Err(conversion(term, expected, "a number needs a numeric type")),
                None => Err(CodecError::UnknownType(expected.name().into())),
            },
            Term::List(items) => match shape {
                Some(Shape::Sequence { element, kind, .. }) => {
                    self.translate_sequence(items, *element, kind, expected)
                }
                Some(_) => Err(conversion(term, expected, "a list needs a sequence type")),
                None => Err(CodecError::UnknownType(expected.name().into())),
            },
            Term::NonAc(t) => self.translate_non_ac(t, expected),
        }
    }

    /// The value a term stands for when nothing constrains the target:
    /// strings, [`BigDecimal`] numbers, constants, `Box<[AnyValue]>` lists
    /// and named terms of mapped types.
    fn translate_natural(&self, term: &Term) -> Result<AnyValue, CodecError> {
        let target = TypeKey::of::<AnyValue>();
        match term {
            Term::Atom(atom) => match atom.kind {
                AtomKind::String => Ok(Box::new(std::string::String::from(atom.text.as_str()))),
                AtomKind::Number => atom
                    .text
                    .parse::<BigDecimal>()
                    .map(|n| Box::new(n) as AnyValue)
                    .map_err(|e| conversion(term, target, &e.to_string())),
                AtomKind::Identifier => match self.registry.get_constant_value_for_identifier(&atom.text) {
                    Some(Constant::Value { value, .. }) => Ok(value),
                    Some(Constant::Null) => Err(CodecError::AbsentValue {
                        target: target.name(),
                    }),
                    None => Err(CodecError::UndefinedIdentifier(atom.text.clone())),
                },
            },
            Term::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.translate_natural(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(values.into_boxed_slice()))
            }
            Term::NonAc(t) => {
                let resolved = self.registry.get_type_for_term_name(&t.name, target)?;
                if resolved == target {
                    return Err(CodecError::Construction {
                        term: t.name.clone(),
                        target: target.name(),
                        reason: "no type is mapped to this term name".into(),
                    });
                }
                self.translate_non_ac(t, resolved)
            }
        }
    }

    fn translate_identifier(&self, name: &str, expected: TypeKey) -> Result<AnyValue, CodecError> {
        match self.registry.get_constant_value_for_identifier(name) {
            Some(Constant::Value { value, ty }) => self.coerce(value, ty, expected, name),
            Some(Constant::Null) => Err(CodecError::AbsentValue {
                target: expected.name(),
            }),
            None => Err(CodecError::UndefinedIdentifier(name.into())),
        }
    }

    fn translate_sequence(
        &self,
        items: &[Term],
        element: TypeKey,
        kind: &SequenceKind,
        expected: TypeKey,
    ) -> Result<AnyValue, CodecError> {
        let failed = |reason| CodecError::Construction {
            term: "list".into(),
            target: expected.name(),
            reason,
        };
        match kind {
            SequenceKind::Array { build } => {
                let values = items
                    .iter()
                    .map(|item| self.translate(item, element))
                    .collect::<Result<Vec<_>, _>>()?;
                build(values).map_err(failed)
            }
            SequenceKind::Collection { new, push } => {
                let mut collection = new();
                for item in items {
                    let value = self.translate(item, element)?;
                    push(&mut *collection, value).map_err(failed)?;
                }
                Ok(collection)
            }
        }
    }

    fn translate_non_ac(&self, t: &NonAcTerm, expected: TypeKey) -> Result<AnyValue, CodecError> {
        let resolved = self.registry.get_type_for_term_name(&t.name, expected)?;
        let Some(descriptor) = self.registry.descriptor(resolved.id()) else {
            return Err(CodecError::UnknownType(resolved.name().into()));
        };
        let Shape::Composite(composite) = descriptor.shape() else {
            return Err(CodecError::Construction {
                term: t.name.clone(),
                target: resolved.name(),
                reason: format!("{} types are not built from named terms", descriptor.shape().kind_name()),
            });
        };
        let value = match &t.members {
            Some(members) => self.bind_members(t, members, composite, resolved)?,
            None => self.construct(t, composite, resolved)?,
        };
        self.coerce(value, resolved, expected, &t.name)
    }

    fn bind_members(
        &self,
        t: &NonAcTerm,
        members: &[smartstring::alias::String],
        composite: &Composite,
        target: TypeKey,
    ) -> Result<AnyValue, CodecError> {
        let Some(factory) = &composite.factory else {
            return Err(CodecError::Construction {
                term: t.name.clone(),
                target: target.name(),
                reason: "no default value to bind members to".into(),
            });
        };
        let mut object = factory();
        for (name, arg) in members.iter().zip(&t.args) {
            let binding = |reason: &str, source: Option<CodecError>| CodecError::Binding {
                member: name.clone(),
                argument: arg.to_string(),
                target: target.name(),
                reason: reason.into(),
                source: source.map(Box::new),
            };
            let Some(member) = composite.members.iter().find(|m| m.name == *name) else {
                return Err(binding("no such member", None));
            };
            let value = self
                .translate(arg, member.ty)
                .map_err(|e| binding("argument does not convert", Some(e)))?;
            (member.set)(&mut *object, value).map_err(|reason| binding(&reason, None))?;
        }
        Ok(object)
    }

    fn construct(&self, t: &NonAcTerm, composite: &Composite, target: TypeKey) -> Result<AnyValue, CodecError> {
        let arity = t.args.len();
        for (index, constructor) in composite
            .constructors
            .iter()
            .enumerate()
            .filter(|(_, c)| c.params.len() == arity)
        {
            let args = t
                .args
                .iter()
                .zip(&constructor.params)
                .map(|(arg, param)| self.translate(arg, *param))
                .collect::<Result<Vec<_>, _>>();
            let args = match args {
                Ok(args) => args,
                Err(e) => {
                    log::trace!("{} constructor #{} skipped: {}", target.name(), index, e);
                    continue;
                }
            };
            match (constructor.invoke)(args) {
                Ok(value) => return Ok(value),
                Err(reason) => {
                    log::trace!("{} constructor #{} rejected: {}", target.name(), index, reason);
                }
            }
        }
        if arity == 0 {
            if let Some(factory) = &composite.factory {
                return Ok(factory());
            }
        }
        Err(CodecError::Construction {
            term: t.name.clone(),
            target: target.name(),
            reason: format!("no constructor with {arity} parameters accepts the arguments"),
        })
    }

    /// Converts a value of type `from` into the `expected` type.
    fn coerce(&self, value: AnyValue, from: TypeKey, expected: TypeKey, name: &str) -> Result<AnyValue, CodecError> {
        if from == expected {
            return Ok(value);
        }
        if expected.is::<AnyValue>() {
            return Ok(Box::new(value));
        }
        let mismatch = || CodecError::TypeResolution {
            term_name: name.into(),
            resolved: from.name(),
            expected: expected.name(),
        };
        match self.registry.upcast(value, from, expected) {
            Some(Ok(value)) => Ok(value),
            _ => Err(mismatch()),
        }
    }
}

fn conversion(term: &Term, target: TypeKey, reason: &str) -> CodecError {
    CodecError::Conversion {
        text: term.to_string(),
        target: target.name(),
        reason: reason.into(),
    }
}
