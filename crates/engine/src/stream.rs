//! Serialized stream model and codec
//!
//! The engine consumes a general object-serialization byte-stream format:
//! arbitrary nested records, primitives, and back-references for shared or
//! cyclic sub-objects. This module defines that model ([`StreamDoc`]) and
//! its MessagePack encoding via `rmp-serde`.
//!
//! A document is an ordered table of object records plus a root value.
//! [`Wire::Ref`] points into the object table by index; the deserializer
//! constructs every object before applying attributes, so a reference is
//! valid even when two objects refer to each other.
//!
//! [`StreamBuilder`] is the minimal write side: enough to produce documents
//! for round-trip exercising and for callers that snapshot plain state.
//! Full snapshot encoding lives outside this crate.

use chrysalis_core::error::Result;
use serde::{Deserialize, Serialize};

/// Current stream format version
pub const STREAM_FORMAT_VERSION: u32 = 1;

/// One serialized value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Wire {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordered sequence of values
    List(Vec<Wire>),
    /// String-keyed entries, order preserved as written
    Map(Vec<(String, Wire)>),
    /// Back-reference to an object record by table index
    Ref(u32),
}

/// "Construct an instance of class (module, name), then apply attributes"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Module the class lived in when serialized
    pub module: String,
    /// Class name when serialized
    pub class: String,
    /// Attribute entries, in serialization order
    pub attrs: Vec<(String, Wire)>,
}

/// A complete serialized object graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDoc {
    /// Format version for future compatibility
    pub format_version: u32,
    /// Object table; `Wire::Ref` indexes into this
    pub objects: Vec<ObjectRecord>,
    /// Root value, typically a `Ref` into the table
    pub root: Wire,
}

impl StreamDoc {
    /// Encode to MessagePack bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Decode from MessagePack bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Incremental builder for a [`StreamDoc`]
///
/// ```
/// use chrysalis_engine::stream::{StreamBuilder, Wire};
///
/// let mut builder = StreamBuilder::new();
/// let circle = builder.add_object("shapes", "Circle");
/// builder.set_attr(circle, "radius", Wire::Float(2.0));
/// let doc = builder.finish(Wire::Ref(circle));
/// assert_eq!(doc.objects.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct StreamBuilder {
    objects: Vec<ObjectRecord>,
}

impl StreamBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object record, returning its table index for `Wire::Ref`
    pub fn add_object(&mut self, module: &str, class: &str) -> u32 {
        self.objects.push(ObjectRecord {
            module: module.to_string(),
            class: class.to_string(),
            attrs: Vec::new(),
        });
        (self.objects.len() - 1) as u32
    }

    /// Append an attribute to an already-added object
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by [`StreamBuilder::add_object`] on
    /// this builder.
    pub fn set_attr(&mut self, id: u32, name: &str, value: Wire) {
        self.objects[id as usize]
            .attrs
            .push((name.to_string(), value));
    }

    /// Finish with the given root, producing the document
    pub fn finish(self, root: Wire) -> StreamDoc {
        StreamDoc {
            format_version: STREAM_FORMAT_VERSION,
            objects: self.objects,
            root,
        }
    }
}
