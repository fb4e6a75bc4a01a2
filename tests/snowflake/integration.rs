//! Tests against a live Snowflake account.
//!
//! They need `SNOWFLAKE_ACCOUNT`, `SNOWFLAKE_USER`, `SNOWFLAKE_PRIVATE_KEY` (or
//! `SNOWFLAKE_PRIVATE_KEY_PATH`) and, for encrypted keys, `SNOWFLAKE_PASSWORD`, either in the
//! environment or in a `.env` file. Run them with `cargo test -- --ignored`.

use serde_json::json;
use snowflake_millis::snowflake::{MillisLoggingConnection, SnowflakeConnectOptions};
use snowflake_millis::{Connection, Cursor};

async fn new_connection() -> anyhow::Result<MillisLoggingConnection> {
    let _ = env_logger::builder().is_test(true).try_init();

    let options = SnowflakeConnectOptions::from_snowflake_env()
        .ok_or_else(|| anyhow::anyhow!("SNOWFLAKE_ACCOUNT is not set"))?;

    Ok(MillisLoggingConnection::connect_with(&options).await?)
}

#[ignore]
#[tokio::test]
async fn it_connects_and_pings() -> anyhow::Result<()> {
    let mut conn = new_connection().await?;

    conn.ping().await?;
    conn.close().await?;

    Ok(())
}

#[ignore]
#[tokio::test]
async fn it_fetches_tuples_and_dicts() -> anyhow::Result<()> {
    let conn = new_connection().await?;

    let sql = "SELECT 1 AS ONE,\n'two' AS TWO,\nPARSE_JSON('[3]') AS THREE";

    let tuple = conn.cursor(false).execute(sql).await?.fetch_one().await?;
    assert_eq!(
        serde_json::to_value(tuple)?,
        json!([1, "two", [3]])
    );

    let dict = conn.cursor(true).execute(sql).await?.fetch_one().await?;
    assert_eq!(
        serde_json::to_value(dict)?,
        json!({ "ONE": 1, "TWO": "two", "THREE": [3] })
    );

    Ok(())
}

#[ignore]
#[tokio::test]
async fn it_reports_sql_errors() -> anyhow::Result<()> {
    let conn = new_connection().await?;
    let mut cursor = conn.cursor(false);

    let err = cursor
        .execute("SELECT * FROM THIS_TABLE_DOES_NOT_EXIST")
        .await
        .unwrap_err();

    let db = err.as_database_error().unwrap();
    assert_eq!(db.code(), "002003");
    assert_eq!(db.sql_state(), Some("42S02"));

    Ok(())
}

#[ignore]
#[tokio::test]
async fn it_streams_results_spanning_partitions() -> anyhow::Result<()> {
    let conn = new_connection().await?;
    let mut cursor = conn.cursor(false);

    cursor
        .execute("SELECT SEQ4() AS N, RANDSTR(64, RANDOM()) AS S FROM TABLE(GENERATOR(ROWCOUNT => 200000))")
        .await?;

    assert_eq!(cursor.rowcount(), Some(200_000));
    assert_eq!(cursor.fetch_many(10).await?.len(), 10);
    assert_eq!(cursor.fetch_all().await?.len(), 199_990);

    Ok(())
}
