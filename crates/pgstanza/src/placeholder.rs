//! Named-placeholder handling shared by the emitter and the connection facade.
//!
//! Emitted SQL carries `:name` placeholders and an unresolved [`PREFIX_TOKEN`]
//! in table references. Both are resolved here: the prefix by plain
//! substitution, the placeholders by a rewrite to positional `$n` form at
//! execute time. The scanner skips single-quoted literals, double-quoted
//! identifiers, and `::type` casts so those never read as placeholders.

use crate::error::{StanzaError, StanzaResult};
use crate::value::{ParamMap, Value};
use std::collections::{HashMap, HashSet};

/// Table-name token left unresolved in emitted SQL.
pub const PREFIX_TOKEN: &str = "{prefix}";

/// Substitute the deployment table prefix into emitted SQL.
pub fn substitute_prefix(sql: &str, prefix: &str) -> String {
    sql.replace(PREFIX_TOKEN, prefix)
}

/// Whether `name` is a valid placeholder name (identifier without the colon).
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A `:name` occurrence: byte range including the colon, plus the bare name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Occurrence<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

/// Scan SQL text for `:name` placeholders.
fn scan(sql: &str) -> Vec<Occurrence<'_>> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                // String literal; '' is an escaped quote.
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            b'"' => {
                // Quoted identifier.
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += 1;
                }
                i += 1;
            }
            b':' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                    // Postgres cast, not a placeholder.
                    i += 2;
                    continue;
                }
                let start = i;
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j].is_ascii_alphabetic() || bytes[j] == b'_') {
                    j += 1;
                    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_')
                    {
                        j += 1;
                    }
                    found.push(Occurrence {
                        start,
                        end: j,
                        name: &sql[start + 1..j],
                    });
                    i = j;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    found
}

/// Drop parameters not textually referenced in `sql`.
pub(crate) fn prune(sql: &str, params: &mut ParamMap) {
    let referenced: HashSet<&str> = scan(sql).iter().map(|occ| occ.name).collect();
    params.retain(|name| referenced.contains(name));
}

/// Rewrite `:name` placeholders to positional `$n` form.
///
/// Indices are assigned by first occurrence; repeated names share an index.
/// Returns the rewritten SQL and the bind values in index order. A placeholder
/// with no bound value is a [`StanzaError::MissingParameter`].
pub(crate) fn to_positional<'a>(
    sql: &str,
    params: &'a ParamMap,
) -> StanzaResult<(String, Vec<&'a Value>)> {
    let occurrences = scan(sql);

    let mut index_of: HashMap<&str, usize> = HashMap::new();
    let mut values: Vec<&'a Value> = Vec::new();
    for occ in &occurrences {
        if index_of.contains_key(occ.name) {
            continue;
        }
        let value = params
            .get(occ.name)
            .ok_or_else(|| StanzaError::MissingParameter(occ.name.to_string()))?;
        index_of.insert(occ.name, values.len() + 1);
        values.push(value);
    }

    let mut rewritten = String::with_capacity(sql.len());
    let mut tail = 0;
    for occ in &occurrences {
        rewritten.push_str(&sql[tail..occ.start]);
        rewritten.push('$');
        rewritten.push_str(&index_of[occ.name].to_string());
        tail = occ.end;
    }
    rewritten.push_str(&sql[tail..]);

    Ok((rewritten, values))
}
