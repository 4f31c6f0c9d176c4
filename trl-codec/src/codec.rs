//! The document-level entry points: [`Codec::decode`] and
//! [`Codec::encode`].

use crate::{CodecError, ObjectToTerm, Registry, TermToObject, TypeKey};
use smartstring::alias::String;
use std::any::Any;
use std::fmt;
use trl_terms::{TermStore, DEFAULT_MAX_REWRITE_ITERATIONS};
use trl_terms_parser::{DocumentParser, TermParser};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Label of the statement decoded and encoded by default.
pub const DEFAULT_ROOT_LABEL: &str = "root";

/// Settings of a decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodeOptions {
    /// Label of the statement to materialize.
    pub root_label: String,
    /// Upper bound on rewrite passes. Reaching it is not an error.
    pub max_rewrite_iterations: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            root_label: DEFAULT_ROOT_LABEL.into(),
            max_rewrite_iterations: DEFAULT_MAX_REWRITE_ITERATIONS,
        }
    }
}

impl DecodeOptions {
    pub fn root_label(mut self, label: impl AsRef<str>) -> Self {
        self.root_label = label.as_ref().into();
        self
    }

    pub fn max_rewrite_iterations(mut self, max: usize) -> Self {
        self.max_rewrite_iterations = max;
        self
    }
}

/// Settings of an encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EncodeOptions {
    /// Label of the root statement.
    pub root_label: String,
    /// One statement per line, long argument lists broken and indented.
    pub pretty_print: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            root_label: DEFAULT_ROOT_LABEL.into(),
            pretty_print: false,
        }
    }
}

impl EncodeOptions {
    pub fn root_label(mut self, label: impl AsRef<str>) -> Self {
        self.root_label = label.as_ref().into();
        self
    }

    pub fn pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }
}

/// Progress of a decode call, reported at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Parsed,
    Stored,
    Rewritten,
    Materialized,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecodeStage::Parsed => "parsed",
            DecodeStage::Stored => "stored",
            DecodeStage::Rewritten => "rewritten",
            DecodeStage::Materialized => "materialized",
        })
    }
}

/// Encodes values to documents and decodes documents to values, as
/// described by a [`Registry`].
///
/// ```
/// use trl_codec::Codec;
///
/// let mut codec = Codec::new();
/// codec
///     .registry_mut()
///     .map_identifier_name_to_constant("Pi", std::f64::consts::PI)
///     .unwrap();
///
/// assert_eq!(codec.encode(&std::f64::consts::PI).unwrap(), "root: Pi;");
/// let pi: Option<f64> = codec.decode("root: Pi;").unwrap();
/// assert_eq!(pi, Some(std::f64::consts::PI));
/// ```
pub struct Codec<P: DocumentParser = TermParser> {
    registry: Registry,
    parser: P,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").field("registry", &self.registry).finish()
    }
}

impl Codec {
    /// A codec over the built-in types.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            parser: TermParser::new(),
        }
    }
}

impl<P: DocumentParser> Codec<P> {
    /// A codec reading documents with another parser.
    pub fn with_parser(registry: Registry, parser: P) -> Self {
        Self { registry, parser }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Decodes the `root` statement. `None` if the document has none.
    pub fn decode<T: Any>(&self, text: &str) -> Result<Option<T>, CodecError> {
        self.decode_with(text, &DecodeOptions::default())
    }

    /// Decodes the statement bound to `label`.
    pub fn decode_label<T: Any>(&self, text: &str, label: &str) -> Result<Option<T>, CodecError> {
        self.decode_with(text, &DecodeOptions::default().root_label(label))
    }

    pub fn decode_with<T: Any>(&self, text: &str, options: &DecodeOptions) -> Result<Option<T>, CodecError> {
        let parsed = self.parser.parse(text);
        if !parsed.succeeded {
            return Err(CodecError::Parse(parsed.error_message()));
        }
        log::debug!("{}: {} statements", DecodeStage::Parsed, parsed.statements.len());

        let mut store = TermStore::new();
        store.store_statements(parsed.statements)?;
        log::debug!("{}: {:?}", DecodeStage::Stored, store.stats());

        let stats = store.execute_rewrite_rules(options.max_rewrite_iterations)?;
        log::debug!("{}: {:?}", DecodeStage::Rewritten, stats);

        let statements = store.read_statements_for_label(&options.root_label)?;
        let statement = match statements.len() {
            0 => return Ok(None),
            1 => &statements[0],
            count => {
                return Err(CodecError::MultipleRoots {
                    label: options.root_label.clone(),
                    count,
                })
            }
        };
        let value = TermToObject::new(&self.registry).translate(&statement.term, TypeKey::of::<T>())?;
        log::debug!("{}: '{}' as {}", DecodeStage::Materialized, options.root_label, std::any::type_name::<T>());
        match value.downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(CodecError::UnknownType(std::any::type_name::<T>().into())),
        }
    }

    /// Encodes `value` as a compact document with the root label `root`.
    pub fn encode<T: Any>(&self, value: &T) -> Result<std::string::String, CodecError> {
        self.encode_with(value, &EncodeOptions::default())
    }

    pub fn encode_with<T: Any>(&self, value: &T, options: &EncodeOptions) -> Result<std::string::String, CodecError> {
        let store = self.encode_to_store(value, &options.root_label)?;
        let document = store.read_current_frame()?;
        Ok(document.display(options.pretty_print).to_string())
    }

    /// Encodes into a term store without rendering it.
    pub fn encode_to_store<T: Any>(&self, value: &T, root_label: &str) -> Result<TermStore, CodecError> {
        let store = ObjectToTerm::new(&self.registry).translate(value, TypeKey::of::<T>(), root_label)?;
        log::debug!("encoded {} into {:?}", std::any::type_name::<T>(), store.stats());
        Ok(store)
    }
}
