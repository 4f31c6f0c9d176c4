//! # TRL Codec
//!
//! Translates Rust values to TRL documents and back.
//!
//! A [`Registry`] describes the types taking part: how each one is written
//! as a term ([`TypeDescriptor`]), which term names and identifiers map to
//! which types and constants, and which concrete types may stand in for a
//! trait object. The [`Codec`] runs the whole pipeline on top of it:
//!
//! - **decode**: parse, store the statements in a
//!   [`TermStore`](trl_terms::TermStore), apply the rewrite rules until the
//!   graph is stable, then build the value bound to the root label
//!   ([`TermToObject`]).
//! - **encode**: write the value graph into a store ([`ObjectToTerm`]),
//!   label it as root, extract repeated subterms into rewrite rules and
//!   render the document.
//!
//! ## Example
//! ```rust
//! use trl_codec::{Codec, TypeDescriptor};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Location {
//!     city: String,
//!     country: String,
//! }
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Person {
//!     name: String,
//!     born: i32,
//!     location: Location,
//! }
//!
//! let mut codec = Codec::new();
//! let registry = codec.registry_mut();
//! registry
//!     .register(
//!         TypeDescriptor::composite::<Location>()
//!             .with_default()
//!             .member("City", |l: &Location| &l.city, |l: &mut Location, v| l.city = v)
//!             .member("Country", |l: &Location| &l.country, |l: &mut Location, v| l.country = v),
//!     )
//!     .unwrap();
//! registry
//!     .register(
//!         TypeDescriptor::composite::<Person>()
//!             .with_default()
//!             .member("Name", |p: &Person| &p.name, |p: &mut Person, v| p.name = v)
//!             .member("Born", |p: &Person| &p.born, |p: &mut Person, v| p.born = v)
//!             .member("Location", |p: &Person| &p.location, |p: &mut Person, v| p.location = v),
//!     )
//!     .unwrap();
//!
//! let text = r#"
//!     root: Person<Name, Born, Location>("Plato", -423, athens);
//!     athens => Location<City, Country>("Athens", "Greece");
//! "#;
//! let plato: Person = codec.decode(text).unwrap().unwrap();
//! assert_eq!(plato.location.city, "Athens");
//!
//! assert_eq!(
//!     codec.encode(&plato).unwrap(),
//!     r#"root: Person<Born, Location, Name>(-423, Location<City, Country>("Athens", "Greece"), "Plato");"#
//! );
//! ```
//!
//! ## License
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod codec;
mod decode;
mod descriptor;
mod encode;
mod error;
#[cfg(feature = "chrono")]
mod ext;
mod registry;
mod types;

pub use codec::{Codec, DecodeOptions, DecodeStage, EncodeOptions, DEFAULT_ROOT_LABEL};
pub use decode::TermToObject;
pub use descriptor::{
    Composite, CompositeBuilder, Constructor, Deconstructor, Member, SequenceKind, Shape,
    TypeDescriptor,
};
pub use encode::ObjectToTerm;
pub use error::{CodecError, RegistrationError};
#[cfg(feature = "chrono")]
pub use ext::{register_chrono_types, ChronoExtensions};
pub use registry::{Constant, ConstantValue, ExtensionProvider, Extensions, Registry, NULL};
pub use types::{AnyValue, ArgTuple, Positional, TypeKey};
