//! Transaction boundaries on the connection facade.
//!
//! Creates a member and its audit-log entry atomically; rolls back if
//! either write fails.

use pgstanza::{Connection, ConnectionConfig, StanzaResult, params, stmt};

async fn register(db: &mut Connection, name: &str) -> StanzaResult<()> {
    db.begin_transaction().await?;

    let result = async {
        db.execute(
            &stmt::insert("members")
                .set("name", name)
                .set("email", format!("{name}@example.com"))
                .render()?,
        )
        .await?;
        db.execute(
            &stmt::insert("audit_log")
                .set("action", "member_registered")
                .set("detail", name)
                .render()?,
        )
        .await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => db.commit_transaction().await,
        Err(e) => {
            db.rollback_transaction().await?;
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> StanzaResult<()> {
    dotenvy::dotenv().ok();
    let mut db = Connection::new(ConnectionConfig::from_env()?);

    register(&mut db, "alice").await?;
    println!("member registered");

    let actions: Vec<String> = db
        .fetch_column(
            &stmt::select("audit_log")
                .field("action")
                .filter_with("detail=:detail", params! { ":detail" => "alice" })
                .render()?,
        )
        .await?;
    println!("audit entries: {actions:?}");

    db.close();
    Ok(())
}
