use super::*;
use crate::error::StanzaError;
use crate::params;
use crate::scheme::{FieldDef, FieldKind, TableScheme};
use crate::value::Value;

fn users_scheme() -> TableScheme {
    TableScheme::builder("core_users")
        .primary_key("id_user")
        .field(FieldDef::new("id_user").kind(FieldKind::Integer))
        .field("username")
        .field(FieldDef::new("prefs").kind(FieldKind::Json).serialized())
        .build()
        .unwrap()
}

#[test]
fn test_default_select() {
    let statement = select("users").render().unwrap();
    assert_eq!(statement.sql, "SELECT users.* FROM {prefix}users");
    assert!(statement.params.is_empty());
}

#[test]
fn test_select_with_filter_and_params() {
    let statement = Definition::new()
        .table("users")
        .filter_with("id=:id", params! { ":id" => 7 })
        .render()
        .unwrap();
    assert_eq!(statement.sql, "SELECT users.* FROM {prefix}users WHERE id=:id");
    assert_eq!(statement.params.get("id"), Some(&Value::Int(7)));
    assert_eq!(statement.params.len(), 1);
}

#[test]
fn test_select_with_alias_and_join() {
    let statement = select("users")
        .alias("u")
        .fields(&["u.id", "posts.title"])
        .left_join("posts", "u.id = posts.id_user")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT u.id, posts.title FROM {prefix}users AS u \
         LEFT JOIN {prefix}posts ON u.id = posts.id_user"
    );
}

#[test]
fn test_select_join_with_alias() {
    let statement = select("users")
        .join(Join::new("posts", JoinKind::Inner, "users.id = p.id_user").alias("p"))
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT users.* FROM {prefix}users \
         INNER JOIN {prefix}posts AS p ON users.id = p.id_user"
    );
}

#[test]
fn test_clause_order_is_fixed() {
    let statement = select("orders")
        .field("id_user")
        .field("COUNT(*) AS n")
        .filter("status=:status")
        .param("status", "open")
        .group_by("id_user")
        .having("COUNT(*) > 5")
        .order_by("n DESC")
        .limit(10)
        .offset(20)
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT id_user, COUNT(*) AS n FROM {prefix}orders WHERE status=:status \
         GROUP BY id_user HAVING COUNT(*) > 5 ORDER BY n DESC LIMIT 10 OFFSET 20"
    );
}

#[test]
fn test_limit_lower_bound_only() {
    let statement = select("users").limit(5).render().unwrap();
    assert_eq!(statement.sql, "SELECT users.* FROM {prefix}users LIMIT 5");
}

#[test]
fn test_render_is_idempotent() {
    let normalized = select("users")
        .filter_with("id=:id", params! { "id" => 1 })
        .order_by("id")
        .normalize()
        .unwrap();
    let first = normalized.render();
    let second = normalized.render();
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.params, second.params);
}

#[test]
fn test_parameter_pruning() {
    let statement = select("users")
        .filter("id=:id")
        .params(params! { "id" => 1, "unused" => 2, "also_unused" => "x" })
        .render()
        .unwrap();
    assert_eq!(statement.params.len(), 1);
    assert!(statement.params.contains("id"));
}

#[test]
fn test_delete_scenario() {
    let statement = delete("sessions")
        .filter_with("id_session=:id", params! { ":id" => "abc" })
        .render()
        .unwrap();
    assert_eq!(statement.sql, "DELETE FROM {prefix}sessions WHERE id_session=:id");
    assert_eq!(statement.params.get("id"), Some(&Value::Text("abc".into())));
}

#[test]
fn test_delete_with_limit_targets_by_ctid() {
    let statement = delete("sessions")
        .filter("expired=:cutoff")
        .param("cutoff", true)
        .order_by("last_seen ASC")
        .limit(100)
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "DELETE FROM {prefix}sessions WHERE ctid IN \
         (SELECT ctid FROM {prefix}sessions WHERE expired=:cutoff ORDER BY last_seen ASC LIMIT 100)"
    );
}

#[test]
fn test_insert_from_data() {
    let statement = insert("users")
        .set("username", "alice")
        .set("email", "alice@example.com")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "INSERT INTO {prefix}users (username, email) VALUES (:username, :email)"
    );
    assert_eq!(
        statement.params.get("username"),
        Some(&Value::Text("alice".into()))
    );
    assert_eq!(statement.params.len(), 2);
}

#[test]
fn test_insert_ignores_primary_key_in_data() {
    let statement = insert("core_users")
        .scheme(users_scheme())
        .set("id_user", 0)
        .set("username", "a")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "INSERT INTO {prefix}core_users (username) VALUES (:username)"
    );
    assert!(!statement.params.contains("id_user"));
}

#[test]
fn test_insert_with_explicit_fields_and_params() {
    let statement = insert("users")
        .fields(&["username", "email"])
        .params(params! { "username" => "a", "email" => "a@x" })
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "INSERT INTO {prefix}users (username, email) VALUES (:username, :email)"
    );
    assert_eq!(statement.params.len(), 2);
}

#[test]
fn test_update_inference_from_primary_key() {
    let definition = Definition::new()
        .table("core_users")
        .scheme(users_scheme())
        .set("id_user", 3)
        .set("username", "a");
    assert_eq!(definition.resolved_verb(), Verb::Update);

    let statement = definition.render().unwrap();
    assert_eq!(
        statement.sql,
        "UPDATE {prefix}core_users SET username=:username WHERE id_user = :__primary_id_user"
    );
    assert_eq!(
        statement.params.get("__primary_id_user"),
        Some(&Value::Int(3))
    );
    assert_eq!(statement.params.get("username"), Some(&Value::Text("a".into())));
}

#[test]
fn test_insert_inference_from_empty_primary_key() {
    for empty in [Value::Null, Value::Int(0), Value::Text(String::new())] {
        let definition = Definition::new()
            .table("core_users")
            .scheme(users_scheme())
            .set("id_user", empty)
            .set("username", "a");
        assert_eq!(definition.resolved_verb(), Verb::Insert);
    }
}

#[test]
fn test_inference_without_data_is_select() {
    let definition = Definition::new().table("users");
    assert_eq!(definition.resolved_verb(), Verb::Select);
}

#[test]
fn test_explicit_verb_wins_over_inference() {
    let definition = Definition::new()
        .table("core_users")
        .scheme(users_scheme())
        .verb(Verb::Insert)
        .set("id_user", 3)
        .set("username", "a");
    assert_eq!(definition.resolved_verb(), Verb::Insert);
}

#[test]
fn test_update_primary_key_filter_combines_with_existing() {
    let statement = Definition::new()
        .table("core_users")
        .scheme(users_scheme())
        .filter("deleted=:deleted")
        .param("deleted", false)
        .set("id_user", 3)
        .set("username", "a")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "UPDATE {prefix}core_users SET username=:username \
         WHERE (deleted=:deleted) AND id_user = :__primary_id_user"
    );
}

#[test]
fn test_replace_keeps_primary_key_and_upserts() {
    let statement = replace("core_users")
        .scheme(users_scheme())
        .set("id_user", 3)
        .set("username", "a")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "INSERT INTO {prefix}core_users (id_user, username) VALUES (:id_user, :username) \
         ON CONFLICT (id_user) DO UPDATE SET username = EXCLUDED.username"
    );
    assert_eq!(statement.params.get("id_user"), Some(&Value::Int(3)));
}

#[test]
fn test_replace_without_primary_key_fails() {
    let err = replace("users").set("a", 1).render().unwrap_err();
    assert!(matches!(err, StanzaError::MissingPrimaryKey(table) if table == "users"));
}

#[test]
fn test_serialized_field_binds_json_text() {
    let statement = insert("core_users")
        .scheme(users_scheme())
        .set("username", "a")
        .set("prefs", serde_json::json!({"theme": "dark"}))
        .render()
        .unwrap();
    assert_eq!(
        statement.params.get("prefs"),
        Some(&Value::Text(r#"{"theme":"dark"}"#.into()))
    );
}

#[test]
fn test_missing_table() {
    let err = Definition::new().filter("1=1").render().unwrap_err();
    assert!(matches!(err, StanzaError::MissingTable));
}

#[test]
fn test_scheme_table_wins_over_definition() {
    let statement = select("ignored").scheme(users_scheme()).render().unwrap();
    assert_eq!(statement.sql, "SELECT core_users.* FROM {prefix}core_users");
}

#[test]
fn test_missing_field_list() {
    let err = insert("users").render().unwrap_err();
    assert!(matches!(
        err,
        StanzaError::MissingFieldList { verb: "INSERT" }
    ));
    let err = update("users").render().unwrap_err();
    assert!(matches!(
        err,
        StanzaError::MissingFieldList { verb: "UPDATE" }
    ));
}

#[test]
fn test_malformed_filter_params() {
    let err = select("users")
        .filter_with("id=:id", params! { "not a name" => 1 })
        .render()
        .unwrap_err();
    assert!(matches!(err, StanzaError::MalformedFilter(_)));

    let err = select("users").filter("  ").render().unwrap_err();
    assert!(matches!(err, StanzaError::MalformedFilter(_)));
}

#[test]
fn test_counter_field_is_prepended() {
    let statement = select("scores")
        .field("username")
        .counter(Counter::new("rank").start(0).step(1))
        .order_by("points DESC")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT (0 + 1 * ROW_NUMBER() OVER ()) AS rank, username \
         FROM {prefix}scores ORDER BY points DESC"
    );
}

#[test]
fn test_counter_custom_start_and_step() {
    let statement = select("scores")
        .counter(Counter::new("position").start(10).step(5))
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT (10 + 5 * ROW_NUMBER() OVER ()) AS position, scores.* FROM {prefix}scores"
    );
}

#[test]
fn test_subquery_field() {
    let posts = select("posts")
        .field("COUNT(*)")
        .filter("posts.id_user = u.id_user");
    let statement = select("users")
        .alias("u")
        .field("u.username")
        .subquery_field(posts, "post_count")
        .render()
        .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT u.username, (SELECT COUNT(*) FROM {prefix}posts \
         WHERE posts.id_user = u.id_user) AS post_count FROM {prefix}users AS u"
    );
}

#[test]
fn test_subquery_params_merge_into_outer() {
    let posts = select("posts")
        .field("COUNT(*)")
        .filter_with(
            "posts.id_user = u.id_user AND posts.status = :status",
            params! { "status" => "published" },
        );
    let statement = select("users")
        .alias("u")
        .subquery_field(posts, "post_count")
        .render()
        .unwrap();
    assert_eq!(
        statement.params.get("status"),
        Some(&Value::Text("published".into()))
    );
}

#[test]
fn test_write_subquery_field_rejected() {
    let err = insert("users")
        .subquery_field(select("posts"), "x")
        .render()
        .unwrap_err();
    assert!(matches!(err, StanzaError::Validation(_)));
}

#[test]
fn test_statement_for_execution() {
    let statement = select("users")
        .filter_with("id=:id AND status=:status", params! { "id" => 7, "status" => "active" })
        .render()
        .unwrap();
    let (sql, values) = statement.for_execution("app_").unwrap();
    assert_eq!(sql, "SELECT users.* FROM app_users WHERE id=$1 AND status=$2");
    assert_eq!(
        values,
        vec![&Value::Int(7), &Value::Text("active".into())]
    );
}

#[test]
fn test_for_execution_reuses_index_for_repeated_placeholder() {
    let statement = select("events")
        .filter_with("starts_at >= :day AND ends_at < :day", params! { "day" => "2024-01-01" })
        .render()
        .unwrap();
    let (sql, values) = statement.for_execution("").unwrap();
    assert_eq!(
        sql,
        "SELECT events.* FROM events WHERE starts_at >= $1 AND ends_at < $1"
    );
    assert_eq!(values.len(), 1);
}
