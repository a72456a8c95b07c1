//! Device-language type descriptors.
//!
//! A [`TypeDescriptor`] is one occurrence of a kernel-language type: a base type name, an
//! optional vector width, a pointer flag, an address space and type qualifiers. It renders to
//! declaration text (`global const float4* const`) and parses back from it, see
//! [`TypeDescriptor::from_declaration`].

use std::fmt;

use smallvec::SmallVec;

pub mod error;
pub mod parse;
pub mod scalar;


pub use error::*;
pub use scalar::{Precision, ScalarDType};

/// Base type name of the per-instance aggregate structure built by the kernel wrapper.
pub const DATA_STRUCT_TYPE: &str = "devfn_data_struct";

/// Base type name of the floating point alias whose width follows the configured [`Precision`].
pub const FLOAT_TYPE_ALIAS: &str = "devfn_float_type";

/// Address space qualifier of a kernel-language type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::VariantArray)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddrSpace {
    /// Device memory visible to every work item.
    Global,
    /// Memory shared by the work items of one workgroup.
    Local,
    /// Read-only device memory.
    Constant,
    /// Per work item memory.
    Private,
}

impl AddrSpace {
    /// Canonical (unprefixed) keyword.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Local => "local",
            Self::Constant => "constant",
            Self::Private => "private",
        }
    }

    /// Recognizes both the `global` and `__global` spellings.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.strip_prefix("__").unwrap_or(word) {
            "global" => Some(Self::Global),
            "local" => Some(Self::Local),
            "constant" => Some(Self::Constant),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    /// Whether a pointer into this space needs a scratch copy when the data lives in a global buffer.
    pub const fn needs_scratch(&self) -> bool {
        matches!(self, Self::Local | Self::Private)
    }
}

impl fmt::Display for AddrSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Type qualifier keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::VariantArray)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Qualifier {
    Const,
    Restrict,
    Volatile,
}

impl Qualifier {
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Restrict => "restrict",
            Self::Volatile => "volatile",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "const" => Some(Self::Const),
            "restrict" => Some(Self::Restrict),
            "volatile" => Some(Self::Volatile),
            _ => None,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Ordered list of pre-type qualifiers.
///
/// A single [`Qualifier`] converts into a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Qualifiers(SmallVec<[Qualifier; 2]>);

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, qualifier: Qualifier) {
        self.0.push(qualifier);
    }

    pub fn as_slice(&self) -> &[Qualifier] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, qualifier: Qualifier) -> bool {
        self.0.contains(&qualifier)
    }
}

impl From<Qualifier> for Qualifiers {
    fn from(qualifier: Qualifier) -> Self {
        Self(smallvec::smallvec![qualifier])
    }
}

impl From<Vec<Qualifier>> for Qualifiers {
    fn from(qualifiers: Vec<Qualifier>) -> Self {
        Self(SmallVec::from_vec(qualifiers))
    }
}

impl<const N: usize> From<[Qualifier; N]> for Qualifiers {
    fn from(qualifiers: [Qualifier; N]) -> Self {
        qualifiers.into_iter().collect()
    }
}

impl From<&[Qualifier]> for Qualifiers {
    fn from(qualifiers: &[Qualifier]) -> Self {
        Self(SmallVec::from_slice(qualifiers))
    }
}

impl FromIterator<Qualifier> for Qualifiers {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Supported vector widths of kernel-language vector types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::FromRepr, strum::EnumIter, strum::VariantArray)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum VectorWidth {
    Two = 2,
    Three = 3,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
}

impl VectorWidth {
    /// Number of components.
    pub const fn lanes(&self) -> usize {
        *self as u8 as usize
    }

    /// Number of components a value occupies in device memory (`*3` types are padded to four).
    pub const fn storage_lanes(&self) -> usize {
        match self {
            Self::Three => 4,
            other => other.lanes(),
        }
    }
}

impl TryFrom<usize> for VectorWidth {
    type Error = Error;

    fn try_from(width: usize) -> Result<Self> {
        u8::try_from(width).ok().and_then(Self::from_repr).ok_or(Error::UnsupportedVectorWidth { width })
    }
}

/// One kernel-language type occurrence.
///
/// Two descriptors are equal iff all fields are equal; the declaration string is a pure function
/// of the fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDescriptor {
    raw_type: String,
    vector_width: Option<VectorWidth>,
    pointer: bool,
    address_space: Option<AddrSpace>,
    pre_qualifiers: Qualifiers,
    post_qualifier: Option<Qualifier>,
}

impl TypeDescriptor {
    /// Plain, unqualified, non-pointer type.
    ///
    /// A supported vector suffix is split off the name, so `new("float4")` is `float` with width
    /// four, as [`TypeDescriptor::from_declaration`] reads it. A base name that still ends in a
    /// digit cannot also carry a vector width: its declaration would not parse back.
    pub fn new(raw_type: impl Into<String>) -> Self {
        let raw_type = raw_type.into();
        let (stem, vector_width) = parse::split_vector_width(&raw_type);
        Self {
            raw_type: stem.to_string(),
            vector_width,
            pointer: false,
            address_space: None,
            pre_qualifiers: Qualifiers::new(),
            post_qualifier: None,
        }
    }

    pub fn raw_type(&self) -> &str {
        &self.raw_type
    }

    pub fn vector_width(&self) -> Option<VectorWidth> {
        self.vector_width
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer
    }

    pub fn address_space(&self) -> Option<AddrSpace> {
        self.address_space
    }

    pub fn pre_qualifiers(&self) -> &[Qualifier] {
        self.pre_qualifiers.as_slice()
    }

    pub fn post_qualifier(&self) -> Option<Qualifier> {
        self.post_qualifier
    }

    pub fn is_vector(&self) -> bool {
        self.vector_width.is_some()
    }

    /// True for the reserved per-instance aggregate structure type.
    pub fn is_data_struct(&self) -> bool {
        self.raw_type == DATA_STRUCT_TYPE
    }

    /// Element type without pointer or qualifiers, e.g. `float4`.
    pub fn ctype(&self) -> String {
        match self.vector_width {
            Some(width) => format!("{}{}", self.raw_type, width.lanes()),
            None => self.raw_type.clone(),
        }
    }

    /// Element type including the pointer marker, e.g. `float4*`.
    pub fn cl_type(&self) -> String {
        let mut ty = self.ctype();
        if self.pointer {
            ty.push('*');
        }
        ty
    }

    /// Full declaration: `<address space> <pre-qualifiers> <cl type> <post-qualifier>`.
    pub fn declaration(&self) -> String {
        let cl_type = self.cl_type();
        let mut parts: SmallVec<[&str; 6]> = SmallVec::new();
        if let Some(space) = self.address_space {
            parts.push(space.keyword());
        }
        for qualifier in self.pre_qualifiers.as_slice() {
            parts.push(qualifier.keyword());
        }
        parts.push(cl_type.as_str());
        if let Some(post) = self.post_qualifier {
            parts.push(post.keyword());
        }
        parts.join(" ")
    }

    /// Scalar component type, resolving [`FLOAT_TYPE_ALIAS`] through `precision`.
    pub fn scalar_dtype(&self, precision: Precision) -> Option<ScalarDType> {
        if self.raw_type == FLOAT_TYPE_ALIAS {
            return Some(precision.scalar());
        }
        self.raw_type.parse().ok()
    }

    /// Components per element as stored in device memory.
    pub fn storage_lanes(&self) -> usize {
        self.vector_width.map_or(1, |width| width.storage_lanes())
    }

    /// Components per element as laid out in host memory.
    pub fn lanes(&self) -> usize {
        self.vector_width.map_or(1, |width| width.lanes())
    }

    /// Size of one element in device memory.
    pub fn element_bytes(&self, precision: Precision) -> Option<usize> {
        self.scalar_dtype(precision).map(|scalar| scalar.bytes() * self.storage_lanes())
    }

    // Setters

    pub fn set_vector_width(&mut self, width: Option<VectorWidth>) -> &mut Self {
        self.vector_width = width;
        self
    }

    pub fn set_pointer(&mut self, pointer: bool) -> &mut Self {
        self.pointer = pointer;
        self
    }

    /// Sets the base name. A supported vector suffix replaces the vector width, as in [`Self::new`].
    pub fn set_raw_type(&mut self, raw_type: impl Into<String>) -> &mut Self {
        let raw_type = raw_type.into();
        let (stem, vector_width) = parse::split_vector_width(&raw_type);
        if vector_width.is_some() {
            self.vector_width = vector_width;
        }
        self.raw_type = stem.to_string();
        self
    }

    pub fn set_address_space(&mut self, address_space: Option<AddrSpace>) -> &mut Self {
        self.address_space = address_space;
        self
    }

    pub fn set_pre_qualifiers(&mut self, qualifiers: impl Into<Qualifiers>) -> &mut Self {
        self.pre_qualifiers = qualifiers.into();
        self
    }

    pub fn set_post_qualifier(&mut self, qualifier: Option<Qualifier>) -> &mut Self {
        self.post_qualifier = qualifier;
        self
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration())
    }
}

impl std::str::FromStr for TypeDescriptor {
    type Err = Error;

    fn from_str(declaration: &str) -> Result<Self> {
        Self::from_declaration(declaration)
    }
}
