//! Declarative index specifications
//!
//! A test declares the indices it needs as a tree of plain values:
//!
//! ```text
//! IndexSpec ─┬─ settings
//!            └─ TypeMapping* ─┬─ metadata (_source, _ttl, _timestamp, _parent)
//!                             ├─ FieldSpec*
//!                             └─ MultiFieldGroup* ── FieldSpec*
//! ```
//!
//! The tree is built either with the fluent builder methods below or by
//! deserializing TOML (see `FixtureConfig` in the engine crate). It is not
//! validated on construction; the schema compiler validates it eagerly
//! before anything reaches a store.
//!
//! # Example
//!
//! ```
//! use strata_fixture_core::{FieldSpec, FieldType, IndexSpec, TypeMapping};
//!
//! let spec = IndexSpec::new("library").mapping(
//!     TypeMapping::new("book")
//!         .ttl("2d")
//!         .field(FieldSpec::new("title", FieldType::String).stored())
//!         .field(FieldSpec::new("author", FieldType::String).not_analyzed()),
//! );
//! assert_eq!(spec.type_names().collect::<Vec<_>>(), vec!["book"]);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Text
    #[default]
    String,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Long,
    /// 16-bit integer
    Short,
    /// 8-bit integer
    Byte,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Boolean
    Boolean,
    /// Date
    Date,
    /// Base64 binary
    Binary,
    /// IPv4 address
    Ip,
    /// Latitude/longitude pair
    GeoPoint,
    /// Inner object (carries nested properties)
    Object,
    /// Nested document (carries nested properties)
    Nested,
}

impl FieldType {
    /// Lower-case name used in the wire document
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Short => "short",
            FieldType::Byte => "byte",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Binary => "binary",
            FieldType::Ip => "ip",
            FieldType::GeoPoint => "geo_point",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
        }
    }

    /// True for types whose value is a nested field map
    pub fn is_container(&self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }

    /// All value types, in declaration order
    pub const ALL: [FieldType; 14] = [
        FieldType::String,
        FieldType::Integer,
        FieldType::Long,
        FieldType::Short,
        FieldType::Byte,
        FieldType::Float,
        FieldType::Double,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Binary,
        FieldType::Ip,
        FieldType::GeoPoint,
        FieldType::Object,
        FieldType::Nested,
    ];
}

/// Whether the original value is stored alongside the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Store {
    /// Store the value (`store: true` on the wire)
    Yes,
    /// Do not store (no `store` key on the wire)
    #[default]
    No,
}

/// How a field is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Analyzed (the engine default; no `index` key on the wire)
    #[default]
    Analyzed,
    /// Indexed as a single exact term
    NotAnalyzed,
    /// Not indexed at all
    No,
}

impl IndexMode {
    /// Wire value, or None for the engine default
    pub fn wire_value(&self) -> Option<&'static str> {
        match self {
            IndexMode::Analyzed => None,
            IndexMode::NotAnalyzed => Some("not_analyzed"),
            IndexMode::No => Some("no"),
        }
    }
}

/// Term vector storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermVector {
    /// No term vectors (no `term_vector` key on the wire)
    #[default]
    No,
    /// Terms only
    Yes,
    /// Terms and character offsets
    WithOffsets,
    /// Terms and positions
    WithPositions,
    /// Terms, positions and character offsets
    WithPositionsOffsets,
}

impl TermVector {
    /// Wire value, or None when term vectors are disabled
    pub fn wire_value(&self) -> Option<&'static str> {
        match self {
            TermVector::No => None,
            TermVector::Yes => Some("yes"),
            TermVector::WithOffsets => Some("with_offsets"),
            TermVector::WithPositions => Some("with_positions"),
            TermVector::WithPositionsOffsets => Some("with_positions_offsets"),
        }
    }
}

/// One field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Field name, unique within its owning field map
    pub name: String,
    /// Value type
    #[serde(rename = "type", default)]
    pub value_type: FieldType,
    /// Store option
    #[serde(default)]
    pub store: Store,
    /// Index option
    #[serde(default)]
    pub index: IndexMode,
    /// Single analyzer for both indexing and search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Analyzer used at index time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_analyzer: Option<String>,
    /// Analyzer used at search time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,
    /// Term vector option
    #[serde(default)]
    pub term_vector: TermVector,
    /// Nested properties (object and nested types only)
    #[serde(default, rename = "property", skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<FieldSpec>,
}

impl FieldSpec {
    /// Create a field with default options (not stored, analyzed, no term vectors)
    pub fn new(name: impl Into<String>, value_type: FieldType) -> Self {
        Self {
            name: name.into(),
            value_type,
            store: Store::No,
            index: IndexMode::Analyzed,
            analyzer: None,
            index_analyzer: None,
            search_analyzer: None,
            term_vector: TermVector::No,
            properties: Vec::new(),
        }
    }

    /// Set the store option
    pub fn store(mut self, store: Store) -> Self {
        self.store = store;
        self
    }

    /// Shorthand for `store(Store::Yes)`
    pub fn stored(self) -> Self {
        self.store(Store::Yes)
    }

    /// Set the index option
    pub fn index(mut self, index: IndexMode) -> Self {
        self.index = index;
        self
    }

    /// Shorthand for `index(IndexMode::NotAnalyzed)`
    pub fn not_analyzed(self) -> Self {
        self.index(IndexMode::NotAnalyzed)
    }

    /// Set a single analyzer
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set the index-time analyzer
    pub fn index_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.index_analyzer = Some(analyzer.into());
        self
    }

    /// Set the search-time analyzer
    pub fn search_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.search_analyzer = Some(analyzer.into());
        self
    }

    /// Set the term vector option
    pub fn term_vector(mut self, term_vector: TermVector) -> Self {
        self.term_vector = term_vector;
        self
    }

    /// Add a nested property (object and nested types only)
    pub fn property(mut self, field: FieldSpec) -> Self {
        self.properties.push(field);
        self
    }
}

/// One logical property exposed as several differently indexed sub-fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiFieldGroup {
    /// Group name (the property name on the wire)
    pub name: String,
    /// Member fields; conventionally one is named like the group
    #[serde(default, rename = "field", skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
}

impl MultiFieldGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a member field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// The member named like the group, if any
    pub fn primary(&self) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == self.name)
    }
}

fn default_true() -> bool {
    true
}

/// Mapping of one document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeMapping {
    /// Type name, unique within the index
    #[serde(rename = "type")]
    pub type_name: String,
    /// `_source.enabled`
    #[serde(rename = "source", default = "default_true")]
    pub source_enabled: bool,
    /// `_source.compress`
    #[serde(default)]
    pub compress: bool,
    /// `_source.compress_threshold` size literal; only used when `compress` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress_threshold: Option<String>,
    /// Emit a `_ttl` block
    #[serde(rename = "ttl", default)]
    pub ttl_enabled: bool,
    /// Default time-to-live as a duration literal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_value: Option<String>,
    /// Emit a `_timestamp` block
    #[serde(rename = "timestamp", default)]
    pub timestamp_enabled: bool,
    /// Timestamp date format; empty means engine default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_format: Option<String>,
    /// Document path the timestamp is extracted from; empty means engine default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_path: Option<String>,
    /// Parent type for parent/child relationships
    #[serde(rename = "parent", default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
    /// Plain fields, in declaration order
    #[serde(rename = "field", default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    /// Multi-field groups, in declaration order
    #[serde(rename = "multi_field", default, skip_serializing_if = "Vec::is_empty")]
    pub multi_field_groups: Vec<MultiFieldGroup>,
}

impl TypeMapping {
    /// Create a mapping with default metadata (source enabled, uncompressed,
    /// no ttl, no timestamp, no parent)
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            source_enabled: true,
            compress: false,
            compress_threshold: None,
            ttl_enabled: false,
            ttl_value: None,
            timestamp_enabled: false,
            timestamp_format: None,
            timestamp_path: None,
            parent_type: None,
            fields: Vec::new(),
            multi_field_groups: Vec::new(),
        }
    }

    /// Enable or disable `_source`
    pub fn source(mut self, enabled: bool) -> Self {
        self.source_enabled = enabled;
        self
    }

    /// Enable `_source` compression
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Enable `_source` compression above a size threshold
    pub fn compress_threshold(mut self, threshold: impl Into<String>) -> Self {
        self.compress = true;
        self.compress_threshold = Some(threshold.into());
        self
    }

    /// Enable `_ttl` with a default duration literal
    pub fn ttl(mut self, value: impl Into<String>) -> Self {
        self.ttl_enabled = true;
        self.ttl_value = Some(value.into());
        self
    }

    /// Enable `_timestamp` with a format and a source path
    pub fn timestamp(mut self, format: impl Into<String>, path: impl Into<String>) -> Self {
        self.timestamp_enabled = true;
        self.timestamp_format = Some(format.into());
        self.timestamp_path = Some(path.into());
        self
    }

    /// Declare a parent type
    pub fn parent(mut self, parent_type: impl Into<String>) -> Self {
        self.parent_type = Some(parent_type.into());
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a multi-field group
    pub fn multi_field(mut self, group: MultiFieldGroup) -> Self {
        self.multi_field_groups.push(group);
        self
    }
}

/// An index and the type mappings to install into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    /// Index name
    pub name: String,
    /// Index settings passed to index creation (e.g. `number_of_shards`)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
    /// Type mappings, in declaration order
    #[serde(rename = "mapping", default, skip_serializing_if = "Vec::is_empty")]
    pub type_mappings: Vec<TypeMapping>,
}

impl IndexSpec {
    /// Create an index spec with no settings and no mappings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Map::new(),
            type_mappings: Vec::new(),
        }
    }

    /// Add an index setting
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Add a type mapping
    pub fn mapping(mut self, mapping: TypeMapping) -> Self {
        self.type_mappings.push(mapping);
        self
    }

    /// Type names in declaration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.type_mappings.iter().map(|m| m.type_name.as_str())
    }

    /// Look up a type mapping by name
    pub fn type_mapping(&self, type_name: &str) -> Option<&TypeMapping> {
        self.type_mappings.iter().find(|m| m.type_name == type_name)
    }
}
