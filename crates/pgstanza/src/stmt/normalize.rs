//! Normalization: resolve a [`Definition`] into the canonical statement shape.

use crate::error::{StanzaError, StanzaResult};
use crate::placeholder::{self, PREFIX_TOKEN};
use crate::stmt::{Definition, FieldSpec, Filter, Verb};
use crate::value::{ParamMap, Value};

/// The resolved, dialect-agnostic form of a [`Definition`].
///
/// Owned by one render call; holds everything the emitter needs and nothing
/// it has to look up. Every placeholder referenced by the clauses below has a
/// bound value in `params` (the reverse is not required; rendering prunes).
#[derive(Clone, Debug)]
pub struct NormalizedStatement {
    pub(crate) verb: Verb,
    pub(crate) table: String,
    pub(crate) alias: Option<String>,
    /// SELECT output fragments.
    pub(crate) fields: Vec<String>,
    /// INSERT/REPLACE column names.
    pub(crate) columns: Vec<String>,
    /// VALUES fragments matching `columns`.
    pub(crate) placeholders: Vec<String>,
    /// UPDATE SET fragments.
    pub(crate) set_clauses: Vec<String>,
    /// REPLACE conflict target (the scheme primary key).
    pub(crate) conflict_key: Option<String>,
    /// Rendered join fragments.
    pub(crate) joins: Vec<String>,
    pub(crate) filter: Option<String>,
    pub(crate) params: ParamMap,
    pub(crate) group: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) order: Vec<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl NormalizedStatement {
    /// The resolved verb.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The resolved table name (without prefix).
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The bound parameters before pruning.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }
}

impl Definition {
    /// Resolve this definition into a [`NormalizedStatement`].
    ///
    /// Errors here are configuration errors: a programming mistake in the
    /// caller, not a runtime condition. They are never caught internally.
    pub fn normalize(&self) -> StanzaResult<NormalizedStatement> {
        if let Some(message) = &self.build_error {
            return Err(StanzaError::validation(message.clone()));
        }

        let scheme = self.scheme.as_deref();

        // Scheme values win over definition values.
        let table = scheme
            .map(|s| s.table().to_string())
            .or_else(|| self.table.clone())
            .filter(|t| !t.is_empty())
            .ok_or(StanzaError::MissingTable)?;
        let alias = scheme
            .and_then(|s| s.alias())
            .map(str::to_string)
            .or_else(|| self.alias.clone());

        let verb = self.resolved_verb();

        let mut params = self.params.clone();
        let mut filter = match &self.filter {
            None => None,
            Some(Filter::Raw(clause)) => {
                if clause.trim().is_empty() {
                    return Err(StanzaError::MalformedFilter("empty filter clause".into()));
                }
                Some(clause.clone())
            }
            Some(Filter::WithParams {
                clause,
                params: filter_params,
            }) => {
                if clause.trim().is_empty() {
                    return Err(StanzaError::MalformedFilter("empty filter clause".into()));
                }
                params.merge(filter_params);
                Some(clause.clone())
            }
        };

        for name in params.names() {
            if !placeholder::is_valid_name(name) {
                return Err(StanzaError::MalformedFilter(format!(
                    "parameter key ':{name}' is not a valid placeholder name"
                )));
            }
        }

        let primary_key = scheme.and_then(|s| s.primary_key());
        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        let mut set_clauses = Vec::new();
        let mut conflict_key = None;

        if matches!(verb, Verb::Insert | Verb::Update | Verb::Replace) {
            if self.data.is_empty() && self.fields.is_empty() {
                return Err(StanzaError::MissingFieldList {
                    verb: verb.as_str(),
                });
            }
            if verb == Verb::Replace {
                let pk =
                    primary_key.ok_or_else(|| StanzaError::MissingPrimaryKey(table.clone()))?;
                conflict_key = Some(pk.to_string());
            }

            if self.data.is_empty() {
                // Explicit field list; values come from the caller's params.
                for spec in &self.fields {
                    let FieldSpec::Column(name) = spec else {
                        return Err(StanzaError::validation(
                            "subquery fields are only valid in SELECT",
                        ));
                    };
                    columns.push(name.clone());
                    placeholders.push(format!(":{name}"));
                    set_clauses.push(format!("{name}=:{name}"));
                }
            } else {
                for (field, value) in &self.data {
                    let value = if scheme.is_some_and(|s| s.is_serialized(field)) {
                        Value::Text(value.to_json_text()?)
                    } else {
                        value.clone()
                    };
                    if primary_key == Some(field.as_str()) {
                        if verb == Verb::Insert {
                            // Not yet persisted; the database assigns the key.
                            continue;
                        }
                        if verb == Verb::Update {
                            let param = format!("__primary_{field}");
                            let clause = format!("{field} = :{param}");
                            filter = Some(match filter {
                                Some(existing) => format!("({existing}) AND {clause}"),
                                None => clause,
                            });
                            params.insert(&param, value);
                            continue;
                        }
                        // REPLACE keeps the primary key as a normal column.
                    }
                    columns.push(field.clone());
                    placeholders.push(format!(":{field}"));
                    set_clauses.push(format!("{field}=:{field}"));
                    params.insert(field, value);
                }
            }
        }

        let mut fields = Vec::new();
        if verb == Verb::Select {
            for spec in &self.fields {
                match spec {
                    FieldSpec::Column(name) => fields.push(name.clone()),
                    FieldSpec::Subquery { definition, alias } => {
                        if definition.resolved_verb() != Verb::Select {
                            return Err(StanzaError::validation(
                                "subquery fields must be SELECT definitions",
                            ));
                        }
                        let sub = definition.normalize()?.render();
                        params.merge(&sub.params);
                        fields.push(format!("({}) AS {}", sub.sql, alias));
                    }
                }
            }
            if fields.is_empty() {
                let owner = alias.as_deref().unwrap_or(&table);
                fields.push(format!("{owner}.*"));
            }
            if let Some(counter) = &self.counter {
                fields.insert(
                    0,
                    format!(
                        "({} + {} * ROW_NUMBER() OVER ()) AS {}",
                        counter.start, counter.step, counter.alias
                    ),
                );
            }
        }

        let joins = self
            .joins
            .iter()
            .map(|join| {
                let mut fragment =
                    format!("{} {}{}", join.kind.as_sql(), PREFIX_TOKEN, join.table);
                if let Some(alias) = &join.alias {
                    fragment.push_str(" AS ");
                    fragment.push_str(alias);
                }
                fragment.push_str(" ON ");
                fragment.push_str(&join.on);
                fragment
            })
            .collect();

        Ok(NormalizedStatement {
            verb,
            table,
            alias,
            fields,
            columns,
            placeholders,
            set_clauses,
            conflict_key,
            joins,
            filter,
            params,
            group: self.group.clone(),
            having: self.having.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
        })
    }
}
