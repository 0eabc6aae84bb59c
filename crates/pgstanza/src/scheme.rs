//! Table schemes: caller-supplied table and field metadata.
//!
//! A [`TableScheme`] is long-lived, read-only to the statement layer, and
//! validated when built. The statement layer reads it for three things only:
//! the default table/alias, the primary key for verb inference and write
//! handling, and the per-field `serialize` flag.

use crate::error::{StanzaError, StanzaResult};

/// Coarse field type, carried as metadata for callers and codegen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Integer,
    Float,
    Text,
    Bytes,
    Timestamp,
    Uuid,
    Json,
}

/// A single field description within a [`TableScheme`].
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Serialize the value to JSON text before binding on writes.
    pub serialize: bool,
}

impl FieldDef {
    /// Create a text field with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            serialize: false,
        }
    }

    /// Set the field kind.
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the field for JSON serialization before binding.
    pub fn serialized(mut self) -> Self {
        self.serialize = true;
        self
    }
}

impl From<&str> for FieldDef {
    fn from(name: &str) -> Self {
        FieldDef::new(name)
    }
}

/// Validated table metadata shared by statement definitions.
#[derive(Clone, Debug)]
pub struct TableScheme {
    table: String,
    alias: Option<String>,
    primary_key: Option<String>,
    fields: Vec<FieldDef>,
}

impl TableScheme {
    /// Start building a scheme for the given table.
    pub fn builder(table: impl Into<String>) -> TableSchemeBuilder {
        TableSchemeBuilder {
            table: table.into(),
            alias: None,
            primary_key: None,
            fields: Vec::new(),
        }
    }

    /// Table name (without prefix).
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Default alias, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Primary key field name, if any.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the named field is flagged for serialization.
    pub fn is_serialized(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.serialize)
    }
}

/// Builder for [`TableScheme`]; validation happens in [`TableSchemeBuilder::build`].
pub struct TableSchemeBuilder {
    table: String,
    alias: Option<String>,
    primary_key: Option<String>,
    fields: Vec<FieldDef>,
}

impl TableSchemeBuilder {
    /// Set the default alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the primary key field name.
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Add a field.
    pub fn field(mut self, field: impl Into<FieldDef>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Validate and build the scheme.
    pub fn build(self) -> StanzaResult<TableScheme> {
        if self.table.is_empty() {
            return Err(StanzaError::validation("scheme table name is empty"));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(StanzaError::validation("scheme field name is empty"));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(StanzaError::validation(format!(
                    "duplicate field '{}' in scheme for '{}'",
                    field.name, self.table
                )));
            }
        }
        if let Some(pk) = &self.primary_key {
            if !self.fields.is_empty() && !self.fields.iter().any(|f| &f.name == pk) {
                return Err(StanzaError::validation(format!(
                    "primary key '{}' is not a declared field of '{}'",
                    pk, self.table
                )));
            }
        }
        Ok(TableScheme {
            table: self.table,
            alias: self.alias,
            primary_key: self.primary_key,
            fields: self.fields,
        })
    }
}
