//! Registry Object Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Value type of a feature view field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Int64,
    Float64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int64 => write!(f, "Int64"),
            ValueType::Float64 => write!(f, "Float64"),
        }
    }
}

/// File-backed data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSource {
    pub name: String,
    /// Location of the Parquet file
    pub path: PathBuf,
    /// Column holding the event time of each row
    pub timestamp_field: String,
    /// Column holding the creation time, used to break timestamp ties
    pub created_timestamp_column: Option<String>,
}

impl FileSource {
    /// Create a new file source
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        timestamp_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            timestamp_field: timestamp_field.into(),
            created_timestamp_column: None,
        }
    }

    /// Set the created timestamp column
    pub fn with_created_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.created_timestamp_column = Some(column.into());
        self
    }
}

/// Entity definition (the key features are joined on)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub join_keys: Vec<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, join_keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            join_keys: join_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// The first join key, used as the entity id column
    pub fn primary_join_key(&self) -> Option<&str> {
        self.join_keys.first().map(String::as_str)
    }
}

/// Typed field of a feature view schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: ValueType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: ValueType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Feature view: a named, typed set of feature columns read from a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureView {
    pub name: String,
    /// Names of the entities this view is keyed by
    pub entities: Vec<String>,
    /// How far back a feature row stays valid; zero means forever
    pub ttl: Duration,
    pub schema: Vec<Field>,
    /// Whether the view is materialized for online serving
    pub online: bool,
    /// Name of the data source
    pub source: String,
    pub tags: BTreeMap<String, String>,
}

impl FeatureView {
    /// Create an empty feature view reading from `source`
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            ttl: Duration::ZERO,
            schema: Vec::new(),
            online: false,
            source: source.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entities.push(entity.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, dtype: ValueType) -> Self {
        self.schema.push(Field::new(name, dtype));
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Look up a schema field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.schema.iter().find(|f| f.name == name)
    }
}
