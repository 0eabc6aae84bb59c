//! Declarative statement definitions.
//!
//! A [`Definition`] describes a desired database operation: table, verb,
//! fields, data, filter, joins, grouping, ordering, limits. It is built once
//! per call, normalized into a [`NormalizedStatement`], and rendered into a
//! [`Statement`] holding SQL text with `:name` placeholders plus the bound
//! parameters. Rendering is pure; nothing here touches a connection.
//!
//! # Usage
//!
//! ```ignore
//! use pgstanza::{params, stmt};
//!
//! let statement = stmt::select("users")
//!     .filter_with("id=:id", params! { ":id" => 7 })
//!     .render()?;
//! assert_eq!(statement.sql, "SELECT users.* FROM {prefix}users WHERE id=:id");
//! ```

mod emit;
mod normalize;

#[cfg(test)]
mod tests;

pub use emit::Statement;
pub use normalize::NormalizedStatement;

use crate::error::StanzaResult;
use crate::scheme::TableScheme;
use crate::value::{ParamMap, Value};
use std::sync::Arc;

/// Statement verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Select,
    Insert,
    Update,
    Delete,
    /// Insert-or-update keyed on the scheme primary key.
    Replace,
}

impl Verb {
    /// SQL keyword for the verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Select => "SELECT",
            Verb::Insert => "INSERT",
            Verb::Update => "UPDATE",
            Verb::Delete => "DELETE",
            Verb::Replace => "REPLACE",
        }
    }
}

/// One output field of a SELECT.
#[derive(Clone, Debug)]
pub enum FieldSpec {
    /// Column name or raw SQL expression, used verbatim.
    Column(String),
    /// Correlated subquery rendered as `(SELECT …) AS alias`.
    Subquery {
        definition: Box<Definition>,
        alias: String,
    },
}

/// Filter clause: a bare string, or a clause paired with its parameter map.
#[derive(Clone, Debug)]
pub enum Filter {
    Raw(String),
    WithParams { clause: String, params: ParamMap },
}

impl Filter {
    /// The filter clause text.
    pub fn clause(&self) -> &str {
        match self {
            Filter::Raw(clause) => clause,
            Filter::WithParams { clause, .. } => clause,
        }
    }
}

/// Join type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// SQL join keyword.
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// Canonical join record: table, optional alias, join type, ON condition.
#[derive(Clone, Debug)]
pub struct Join {
    pub table: String,
    pub alias: Option<String>,
    pub kind: JoinKind,
    pub on: String,
}

impl Join {
    /// Create a join record.
    pub fn new(table: impl Into<String>, kind: JoinKind, on: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            kind,
            on: on.into(),
        }
    }

    /// Set the joined table's alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Running-counter pseudo-column prepended to SELECT output.
///
/// Renders as a window expression numbering result rows:
/// `(start + step * ROW_NUMBER() OVER ()) AS alias`.
#[derive(Clone, Debug)]
pub struct Counter {
    pub alias: String,
    pub start: i64,
    pub step: i64,
}

impl Counter {
    /// Create a counter aliased `alias`, starting at 0, stepping by 1.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            start: 0,
            step: 1,
        }
    }

    /// Counter start value.
    pub fn start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    /// Counter increment per row.
    pub fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }
}

/// A declarative statement definition.
///
/// Created fresh per call, consumed by [`Definition::normalize`], discarded.
/// When no verb is set, one is inferred: a nonempty `data` map means a write
/// (UPDATE when the scheme primary key has a nonempty value in `data`, INSERT
/// otherwise); everything else is a SELECT.
#[derive(Clone, Debug, Default)]
pub struct Definition {
    pub(crate) table: Option<String>,
    pub(crate) alias: Option<String>,
    pub(crate) verb: Option<Verb>,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) data: Vec<(String, Value)>,
    pub(crate) filter: Option<Filter>,
    pub(crate) params: ParamMap,
    pub(crate) joins: Vec<Join>,
    pub(crate) group: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) order: Vec<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) counter: Option<Counter>,
    pub(crate) scheme: Option<Arc<TableScheme>>,
    /// Deferred builder error, surfaced by `normalize()`.
    pub(crate) build_error: Option<String>,
}

/// Create a SELECT definition for the given table.
pub fn select(table: &str) -> Definition {
    Definition::new().table(table).verb(Verb::Select)
}

/// Create an INSERT definition for the given table.
pub fn insert(table: &str) -> Definition {
    Definition::new().table(table).verb(Verb::Insert)
}

/// Create an UPDATE definition for the given table.
pub fn update(table: &str) -> Definition {
    Definition::new().table(table).verb(Verb::Update)
}

/// Create a DELETE definition for the given table.
pub fn delete(table: &str) -> Definition {
    Definition::new().table(table).verb(Verb::Delete)
}

/// Create a REPLACE (insert-or-update) definition for the given table.
pub fn replace(table: &str) -> Definition {
    Definition::new().table(table).verb(Verb::Replace)
}

impl Definition {
    /// Create an empty definition with no verb set.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Target ====================

    /// Set the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the table alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the verb explicitly.
    pub fn verb(mut self, verb: Verb) -> Self {
        self.verb = Some(verb);
        self
    }

    /// Attach a table scheme; its table, alias and primary key win over the
    /// definition's own values.
    pub fn scheme(mut self, scheme: impl Into<Arc<TableScheme>>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    // ==================== Fields ====================

    /// Append one output field (column name or raw SQL expression).
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(FieldSpec::Column(field.into()));
        self
    }

    /// Append several output fields.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        for field in fields {
            self.fields.push(FieldSpec::Column((*field).to_string()));
        }
        self
    }

    /// Append a correlated subquery field, rendered as `(…) AS alias`.
    pub fn subquery_field(mut self, definition: Definition, alias: impl Into<String>) -> Self {
        self.fields.push(FieldSpec::Subquery {
            definition: Box::new(definition),
            alias: alias.into(),
        });
        self
    }

    // ==================== Data (writes) ====================

    /// Set a field value for a write.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        if let Some(entry) = self.data.iter_mut().find(|(name, _)| *name == field) {
            entry.1 = value;
        } else {
            self.data.push((field, value));
        }
        self
    }

    /// Set a field value from any serializable type, stored as JSON.
    pub fn set_json<T: serde::Serialize>(mut self, field: impl Into<String>, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => self.set(field, Value::Json(json)),
            Err(e) => {
                self.build_error
                    .get_or_insert_with(|| format!("set_json: {e}"));
                self
            }
        }
    }

    // ==================== Filter & params ====================

    /// Set the filter clause (used verbatim after `WHERE`).
    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        self.filter = Some(Filter::Raw(clause.into()));
        self
    }

    /// Set the filter clause together with its parameter map.
    pub fn filter_with(mut self, clause: impl Into<String>, params: ParamMap) -> Self {
        self.filter = Some(Filter::WithParams {
            clause: clause.into(),
            params,
        });
        self
    }

    /// Bind one parameter.
    pub fn param(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Merge a parameter map into the definition's params.
    pub fn params(mut self, params: ParamMap) -> Self {
        self.params.merge(&params);
        self
    }

    // ==================== Joins ====================

    /// Add a join record.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add an INNER JOIN.
    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join(Join::new(table, JoinKind::Inner, on))
    }

    /// Add a LEFT JOIN.
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join(Join::new(table, JoinKind::Left, on))
    }

    // ==================== Grouping, ordering, limits ====================

    /// Set the GROUP BY clause.
    pub fn group_by(mut self, clause: impl Into<String>) -> Self {
        self.group = Some(clause.into());
        self
    }

    /// Set the HAVING clause.
    pub fn having(mut self, clause: impl Into<String>) -> Self {
        self.having = Some(clause.into());
        self
    }

    /// Add an ORDER BY term.
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order.push(clause.into());
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Prepend a running-counter pseudo-column to the output fields.
    pub fn counter(mut self, counter: Counter) -> Self {
        self.counter = Some(counter);
        self
    }

    // ==================== Rendering ====================

    /// Resolve the effective verb, inferring one when unset.
    pub fn resolved_verb(&self) -> Verb {
        if let Some(verb) = self.verb {
            return verb;
        }
        if !self.data.is_empty() {
            let primary = self
                .scheme
                .as_deref()
                .and_then(|scheme| scheme.primary_key());
            if let Some(pk) = primary {
                let persisted = self
                    .data
                    .iter()
                    .any(|(name, value)| name == pk && !value.is_empty());
                if persisted {
                    return Verb::Update;
                }
            }
            return Verb::Insert;
        }
        Verb::Select
    }

    /// Normalize and render in one step.
    pub fn render(&self) -> StanzaResult<Statement> {
        Ok(self.normalize()?.render())
    }

    /// Render and return the SQL text only.
    pub fn to_sql(&self) -> StanzaResult<String> {
        self.render().map(|statement| statement.sql)
    }
}
