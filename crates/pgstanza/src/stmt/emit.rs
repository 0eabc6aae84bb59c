//! Rendering: turn a [`NormalizedStatement`] into SQL text.
//!
//! Pure string assembly, no I/O. Clause order is fixed — filter, group,
//! having, order, limit, offset — and must not be reordered.

use crate::error::StanzaResult;
use crate::placeholder::{self, PREFIX_TOKEN};
use crate::stmt::{NormalizedStatement, Verb};
use crate::value::{ParamMap, Value};

/// A rendered statement: SQL text with `:name` placeholders and an
/// unresolved `{prefix}` table token, plus the pruned bound parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: ParamMap,
}

impl Statement {
    /// Resolve the table prefix and rewrite placeholders to positional `$n`
    /// form, returning executable SQL and the bind values in index order.
    pub fn for_execution<'a>(&'a self, prefix: &str) -> StanzaResult<(String, Vec<&'a Value>)> {
        let substituted = placeholder::substitute_prefix(&self.sql, prefix);
        placeholder::to_positional(&substituted, &self.params)
    }
}

impl NormalizedStatement {
    /// Render SQL text and prune parameters not referenced by it.
    ///
    /// Pure and idempotent: repeated calls yield byte-identical output.
    pub fn render(&self) -> Statement {
        let sql = match self.verb {
            Verb::Select => self.render_select(),
            Verb::Insert => self.render_insert(),
            Verb::Update => self.render_update(),
            Verb::Delete => self.render_delete(),
            Verb::Replace => self.render_replace(),
        };
        let mut params = self.params.clone();
        placeholder::prune(&sql, &mut params);
        Statement { sql, params }
    }

    fn push_filter(&self, sql: &mut String) {
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
    }

    fn push_tail(&self, sql: &mut String) {
        if let Some(group) = &self.group {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn render_select(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            self.fields.join(", "),
            PREFIX_TOKEN,
            self.table
        );
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        self.push_filter(&mut sql);
        self.push_tail(&mut sql);
        sql
    }

    fn render_insert(&self) -> String {
        format!(
            "INSERT INTO {}{} ({}) VALUES ({})",
            PREFIX_TOKEN,
            self.table,
            self.columns.join(", "),
            self.placeholders.join(", ")
        )
    }

    fn render_update(&self) -> String {
        let mut sql = format!(
            "UPDATE {}{} SET {}",
            PREFIX_TOKEN,
            self.table,
            self.set_clauses.join(", ")
        );
        self.push_filter(&mut sql);
        sql
    }

    fn render_delete(&self) -> String {
        if self.order.is_empty() && self.limit.is_none() && self.offset.is_none() {
            let mut sql = format!("DELETE FROM {}{}", PREFIX_TOKEN, self.table);
            self.push_filter(&mut sql);
            sql
        } else {
            // Postgres allows no ORDER BY/LIMIT on DELETE; select targets by ctid.
            let mut inner = format!("SELECT ctid FROM {}{}", PREFIX_TOKEN, self.table);
            self.push_filter(&mut inner);
            self.push_tail(&mut inner);
            format!(
                "DELETE FROM {}{} WHERE ctid IN ({})",
                PREFIX_TOKEN, self.table, inner
            )
        }
    }

    fn render_replace(&self) -> String {
        let mut sql = self.render_insert();
        if let Some(key) = &self.conflict_key {
            let key = key.as_str();
            let updates: Vec<String> = self
                .columns
                .iter()
                .filter(|column| column.as_str() != key)
                .map(|column| format!("{column} = EXCLUDED.{column}"))
                .collect();
            if updates.is_empty() {
                sql.push_str(&format!(" ON CONFLICT ({key}) DO NOTHING"));
            } else {
                sql.push_str(&format!(
                    " ON CONFLICT ({key}) DO UPDATE SET {}",
                    updates.join(", ")
                ));
            }
        }
        sql
    }
}
