use futures::future::BoxFuture;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;
use snowflake_millis::logger::{filter_driver_logs, DEFAULT_DRIVER_LOG_LEVEL};
use snowflake_millis::snowflake::{
    MillisLoggingConnection, Pkcs8Der, PrivateKey, SnowflakeArguments, SnowflakeColumn,
    SnowflakeConnectOptions, SnowflakeDatabaseError, SnowflakeDriver, SnowflakeRow, SnowflakeType,
    SnowflakeTypeInfo,
};
use snowflake_millis::{Connection, Cursor, Error, LogSettings, RowFormat};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const RSA_KEY_DES3: &str = include_str!("../fixtures/rsa_key_des3.p8");
const RSA_KEY_AES256: &str = include_str!("../fixtures/rsa_key_aes256.p8");
const RSA_KEY_DER: &[u8] = include_bytes!("../fixtures/rsa_key.der");
const PASSWORD: &str = "correct-horse";

// Records every log line; each test logs to its own target and only looks at that one.
struct CapturingLogger {
    records: Mutex<Vec<(String, Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records.lock().unwrap().push((
            record.target().to_owned(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

fn capture() -> &'static CapturingLogger {
    static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();

    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
            records: Mutex::new(Vec::new()),
        }));
        log::set_logger(logger).unwrap();
        log::set_max_level(LevelFilter::Trace);
        logger
    })
}

/// A log target no other test writes to.
fn unique_target() -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    capture();
    format!("test::timings::{}", NEXT.fetch_add(1, Ordering::SeqCst))
}

fn lines(target: &str) -> Vec<(Level, String)> {
    capture()
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(t, ..)| t == target)
        .map(|(_, level, message)| (*level, message.clone()))
        .collect()
}

fn escape(pem: &str) -> String {
    pem.replace('\n', "\\n")
}

/// Remembers the options it was handed and serves canned results.
#[derive(Debug, Default)]
struct MockDriver {
    seen: Mutex<Option<SnowflakeConnectOptions>>,
    refuse: bool,
}

impl MockDriver {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    fn seen(&self) -> Option<SnowflakeConnectOptions> {
        self.seen.lock().unwrap().clone()
    }
}

impl SnowflakeDriver for MockDriver {
    type Connection = MockConnection;

    fn connect<'a>(
        &'a self,
        options: &'a SnowflakeConnectOptions,
    ) -> BoxFuture<'a, Result<MockConnection, Error>> {
        Box::pin(async move {
            *self.seen.lock().unwrap() = Some(options.clone());

            if self.refuse {
                return Err(SnowflakeDatabaseError::new(
                    "390144",
                    "JWT token is invalid.",
                    Some("08001".into()),
                )
                .into());
            }

            Ok(MockConnection)
        })
    }
}

#[derive(Debug)]
struct MockConnection;

impl Connection for MockConnection {
    type Cursor = MockCursor;

    fn cursor_with(&self, format: RowFormat) -> MockCursor {
        MockCursor {
            format,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async { Ok(()) })
    }

    fn close(self) -> BoxFuture<'static, Result<(), Error>> {
        Box::pin(async { Ok(()) })
    }
}

/// Fails statements containing `FAIL`, sleeps 50ms for `SLEEP` and otherwise returns two rows.
#[derive(Debug)]
struct MockCursor {
    format: RowFormat,
    columns: Vec<SnowflakeColumn>,
    rows: Vec<SnowflakeRow>,
}

impl Cursor for MockCursor {
    fn format(&self) -> RowFormat {
        self.format
    }

    fn execute_with<'e>(
        &'e mut self,
        command: &'e str,
        arguments: &'e SnowflakeArguments,
    ) -> BoxFuture<'e, Result<&'e mut Self, Error>> {
        Box::pin(async move {
            if command.contains("FAIL") {
                return Err(SnowflakeDatabaseError::new(
                    "002003",
                    "SQL compilation error: Object 'FAIL' does not exist.",
                    Some("42S02".into()),
                )
                .into());
            }

            if command.contains("SLEEP") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            self.columns = vec![
                SnowflakeColumn::new("ID", SnowflakeTypeInfo::new(SnowflakeType::Fixed), 0),
                SnowflakeColumn::new("NAME", SnowflakeTypeInfo::new(SnowflakeType::Text), 1),
            ];

            let name = arguments.values().first().cloned().unwrap_or(json!("a"));
            self.rows = vec![
                SnowflakeRow::from_values(self.format, &self.columns, vec![json!(1), name]),
                SnowflakeRow::from_values(self.format, &self.columns, vec![json!(2), json!("b")]),
            ];

            Ok(self)
        })
    }

    fn columns(&self) -> &[SnowflakeColumn] {
        &self.columns
    }

    fn rowcount(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn query_id(&self) -> Option<&str> {
        None
    }

    fn fetch_one(&mut self) -> BoxFuture<'_, Result<Option<SnowflakeRow>, Error>> {
        Box::pin(async move { Ok((!self.rows.is_empty()).then(|| self.rows.remove(0))) })
    }

    fn fetch_many(&mut self, size: usize) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>> {
        Box::pin(async move {
            let size = size.min(self.rows.len());
            Ok(self.rows.drain(..size).collect())
        })
    }

    fn fetch_all(&mut self) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>> {
        Box::pin(async move { Ok(std::mem::take(&mut self.rows)) })
    }
}

fn options(target: &str) -> SnowflakeConnectOptions {
    SnowflakeConnectOptions::new()
        .account("xy12345")
        .username("loader")
        .warehouse("LOADING")
        .database("ANALYTICS")
        .schema("RAW")
        .log_settings(LogSettings::new().target(target.to_owned()))
}

async fn connect(
    driver: &MockDriver,
    options: &SnowflakeConnectOptions,
) -> anyhow::Result<MillisLoggingConnection<MockDriver>> {
    Ok(MillisLoggingConnection::connect_with_driver(driver, options).await?)
}

fn seen_der(driver: &MockDriver) -> Vec<u8> {
    match driver.seen().unwrap().get_private_key() {
        Some(PrivateKey::Der(der)) => der.as_bytes().to_vec(),
        other => panic!("driver was handed {other:?}"),
    }
}

#[tokio::test]
async fn it_hands_the_driver_unencrypted_der() -> anyhow::Result<()> {
    let driver = MockDriver::default();
    let options = options("unused").private_key(RSA_KEY_DES3).password(PASSWORD);

    connect(&driver, &options).await?;

    assert_eq!(seen_der(&driver), RSA_KEY_DER);

    Ok(())
}

#[tokio::test]
async fn escaped_and_plain_pem_reach_the_driver_identically() -> anyhow::Result<()> {
    let plain = MockDriver::default();
    let escaped = MockDriver::default();

    connect(&plain, &options("unused").private_key(RSA_KEY_AES256).password(PASSWORD)).await?;
    connect(
        &escaped,
        &options("unused")
            .private_key(escape(RSA_KEY_AES256))
            .password(PASSWORD),
    )
    .await?;

    assert_eq!(seen_der(&plain), seen_der(&escaped));
    assert_eq!(seen_der(&escaped), RSA_KEY_DER);

    Ok(())
}

#[tokio::test]
async fn the_password_is_not_passed_on_with_a_key() -> anyhow::Result<()> {
    let driver = MockDriver::default();
    let options = options("unused").private_key(RSA_KEY_DES3).password(PASSWORD);

    connect(&driver, &options).await?;

    let seen = driver.seen().unwrap();
    assert_eq!(seen.get_password(), None);
    assert_eq!(seen.get_account(), "xy12345");
    assert_eq!(seen.get_username(), "loader");
    assert_eq!(seen.get_warehouse(), Some("LOADING"));

    Ok(())
}

#[tokio::test]
async fn the_password_is_passed_on_without_a_key() -> anyhow::Result<()> {
    let driver = MockDriver::default();

    connect(&driver, &options("unused").password("secret")).await?;

    assert_eq!(driver.seen().unwrap().get_password(), Some("secret"));
    assert!(driver.seen().unwrap().get_private_key().is_none());

    Ok(())
}

#[tokio::test]
async fn an_empty_key_counts_as_no_key() -> anyhow::Result<()> {
    let driver = MockDriver::default();

    connect(&driver, &options("unused").private_key("").password("secret")).await?;

    let seen = driver.seen().unwrap();
    assert!(seen.get_private_key().is_none());
    assert_eq!(seen.get_password(), Some("secret"));

    Ok(())
}

#[tokio::test]
async fn it_reads_an_encrypted_key_from_a_file() -> anyhow::Result<()> {
    let driver = MockDriver::default();
    let options = options("unused")
        .private_key_path(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rsa_key_des3.p8"))
        .password(PASSWORD);

    connect(&driver, &options).await?;

    assert_eq!(seen_der(&driver), RSA_KEY_DER);
    assert_eq!(driver.seen().unwrap().get_password(), None);

    Ok(())
}

#[tokio::test]
async fn a_missing_key_file_fails_before_the_driver_is_called() {
    let driver = MockDriver::default();
    let options = options("unused")
        .private_key_path(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/missing.p8"))
        .password(PASSWORD);

    let err = MillisLoggingConnection::connect_with_driver(&driver, &options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io(_)), "{err:?}");
    assert!(driver.seen().is_none());
}

#[tokio::test]
async fn a_wrong_password_fails_before_the_driver_is_called() {
    let driver = MockDriver::default();
    let options = options("unused")
        .private_key(RSA_KEY_DES3)
        .password("not-the-password");

    let err = MillisLoggingConnection::connect_with_driver(&driver, &options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PrivateKey(_)), "{err:?}");
    assert!(driver.seen().is_none());
}

#[tokio::test]
async fn an_already_decoded_key_is_passed_through() -> anyhow::Result<()> {
    let driver = MockDriver::default();
    let options = options("unused")
        .private_key_der(Pkcs8Der::from_der(RSA_KEY_DER)?)
        .password("kept");

    connect(&driver, &options).await?;

    assert_eq!(seen_der(&driver), RSA_KEY_DER);
    assert_eq!(driver.seen().unwrap().get_password(), Some("kept"));

    Ok(())
}

#[tokio::test]
async fn driver_errors_are_returned_unchanged() {
    let driver = MockDriver::refusing();

    let err = MillisLoggingConnection::connect_with_driver(&driver, &options("unused"))
        .await
        .unwrap_err();

    let db = err.as_database_error().unwrap();
    assert_eq!(db.code(), "390144");
    assert!(db.is_authentication_error());
}

#[tokio::test]
async fn it_remembers_the_configured_context() -> anyhow::Result<()> {
    let conn = connect(&MockDriver::default(), &options("unused")).await?;

    assert_eq!(conn.configured_warehouse(), Some("LOADING"));
    assert_eq!(conn.configured_database(), Some("ANALYTICS"));
    assert_eq!(conn.configured_schema(), Some("RAW"));

    let conn = connect(
        &MockDriver::default(),
        &SnowflakeConnectOptions::new().account("xy12345"),
    )
    .await?;

    assert_eq!(conn.configured_warehouse(), None);
    assert_eq!(conn.configured_database(), None);
    assert_eq!(conn.configured_schema(), None);

    Ok(())
}

#[tokio::test]
async fn it_logs_one_line_per_statement() -> anyhow::Result<()> {
    let target = unique_target();
    let conn = connect(&MockDriver::default(), &options(&target)).await?;
    let mut cursor = conn.cursor(false);

    cursor.execute("SELECT 1").await?;

    let lines = lines(&target);
    assert_eq!(lines.len(), 1);

    let (level, message) = &lines[0];
    assert_eq!(*level, Level::Info);

    let millis = message
        .strip_prefix("MillisLoggingCursor: ")
        .and_then(|rest| rest.strip_suffix(" millis spent executing: SELECT 1"))
        .unwrap();
    assert!(millis.parse::<u128>().is_ok(), "{message}");

    Ok(())
}

#[tokio::test]
async fn failed_statements_are_logged_and_the_error_returned() -> anyhow::Result<()> {
    let target = unique_target();
    let conn = connect(&MockDriver::default(), &options(&target)).await?;
    let mut cursor = conn.cursor(false);

    let err = cursor.execute("SELECT * FROM FAIL").await.unwrap_err();

    let db = err.as_database_error().unwrap();
    assert_eq!(db.code(), "002003");
    assert_eq!(db.sql_state(), Some("42S02"));

    let lines = lines(&target);
    assert_eq!(lines.len(), 1);
    assert!(lines[0]
        .1
        .ends_with(" millis spent executing: SELECT * FROM FAIL"));

    Ok(())
}

#[tokio::test]
async fn multi_line_statements_are_logged_on_one_line() -> anyhow::Result<()> {
    let target = unique_target();
    let conn = connect(&MockDriver::default(), &options(&target)).await?;
    let mut cursor = conn.cursor(false);

    cursor.execute("SELECT *\nFROM t\nWHERE id = 1").await?;

    let lines = lines(&target);
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].1.contains('\n'));
    assert!(lines[0]
        .1
        .ends_with("millis spent executing: SELECT *  \\n  FROM t  \\n  WHERE id = 1"));

    Ok(())
}

#[tokio::test]
async fn cancelled_statements_are_still_logged() -> anyhow::Result<()> {
    let target = unique_target();
    let conn = connect(&MockDriver::default(), &options(&target)).await?;
    let mut cursor = conn.cursor(false);

    let timed_out =
        tokio::time::timeout(Duration::from_millis(5), cursor.execute("SELECT SLEEP")).await;

    assert!(timed_out.is_err());
    assert_eq!(lines(&target).len(), 1);

    Ok(())
}

#[tokio::test]
async fn dict_cursors_key_rows_by_column_name() -> anyhow::Result<()> {
    let conn = connect(&MockDriver::default(), &options("unused")).await?;

    let mut tuples = conn.cursor(false);
    let mut dicts = conn.cursor(true);

    assert_eq!(tuples.format(), RowFormat::Tuple);
    assert_eq!(dicts.format(), RowFormat::Dict);

    let tuple = tuples.execute("SELECT 1").await?.fetch_one().await?.unwrap();
    let dict = dicts.execute("SELECT 1").await?.fetch_one().await?.unwrap();

    assert_eq!(serde_json::to_value(&tuple)?, json!([1, "a"]));
    assert_eq!(serde_json::to_value(&dict)?, json!({ "ID": 1, "NAME": "a" }));
    assert_eq!(dict.try_get("NAME")?, &json!("a"));
    assert!(matches!(tuple.try_get("NAME"), Err(Error::ColumnNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn bind_arguments_reach_the_driver() -> anyhow::Result<()> {
    let conn = connect(&MockDriver::default(), &options("unused")).await?;
    let mut cursor = conn.cursor(true);

    let arguments: SnowflakeArguments = vec![json!("z")].into();
    let rows = cursor
        .execute_with("SELECT ? AS NAME", &arguments)
        .await?
        .fetch_all()
        .await?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].try_get("NAME")?, &json!("z"));
    assert_eq!(cursor.fetch_many(10).await?.len(), 0);

    Ok(())
}

#[tokio::test]
async fn set_logger_applies_to_existing_cursors() -> anyhow::Result<()> {
    let before = unique_target();
    let after = unique_target();
    let mut conn = connect(&MockDriver::default(), &options(&before)).await?;

    let mut old_cursor = conn.cursor(false);
    old_cursor.execute("SELECT 'first'").await?;

    conn.set_logger(LogSettings::new().target(after.clone()));
    let mut new_cursor = conn.cursor(false);

    old_cursor.execute("SELECT 'old'").await?;
    new_cursor.execute("SELECT 'new'").await?;

    assert_eq!(conn.log_settings().get_target(), after);
    assert_eq!(old_cursor.log_settings().get_target(), after);

    let before = lines(&before);
    assert_eq!(before.len(), 1);
    assert!(before[0].1.ends_with("SELECT 'first'"));

    let after = lines(&after);
    assert_eq!(after.len(), 2);
    assert!(after[0].1.ends_with("SELECT 'old'"));
    assert!(after[1].1.ends_with("SELECT 'new'"));

    Ok(())
}

#[tokio::test]
async fn slow_statements_are_escalated() -> anyhow::Result<()> {
    let target = unique_target();
    let mut settings = LogSettings::new().target(target.clone());
    settings.log_slow_statements(LevelFilter::Warn, Duration::from_millis(20));

    let conn = connect(&MockDriver::default(), &options("unused").log_settings(settings)).await?;
    let mut cursor = conn.cursor(false);

    cursor.execute("SELECT 1").await?;
    cursor.execute("SELECT SLEEP").await?;

    let levels: Vec<Level> = lines(&target).into_iter().map(|(level, _)| level).collect();
    assert_eq!(levels, [Level::Info, Level::Warn]);

    Ok(())
}

#[tokio::test]
async fn statement_logging_can_be_turned_off() -> anyhow::Result<()> {
    let target = unique_target();
    let mut settings = LogSettings::new().target(target.clone());
    settings.log_statements(LevelFilter::Off);
    settings.log_slow_statements(LevelFilter::Off, Duration::from_secs(1));

    let conn = connect(&MockDriver::default(), &options("unused").log_settings(settings)).await?;
    conn.cursor(false).execute("SELECT 1").await?;

    assert!(lines(&target).is_empty());

    Ok(())
}

#[test]
fn driver_logs_can_be_capped() {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Debug);

    let logger = filter_driver_logs(&mut builder, DEFAULT_DRIVER_LOG_LEVEL).build();

    let enabled = |target: &str, level: Level| {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    };

    assert!(!enabled("snowflake_millis::driver", Level::Debug));
    assert!(!enabled("reqwest::connect", Level::Info));
    assert!(!enabled("hyper_util::client", Level::Debug));
    assert!(enabled("rustls", Level::Warn));
    assert!(enabled("snowflake_millis::query", Level::Info));
}

#[test]
fn options_parse_from_url_and_config() -> anyhow::Result<()> {
    let options: SnowflakeConnectOptions =
        "snowflake://loader@xy12345.snowflakecomputing.com/ANALYTICS/RAW?warehouse=LOADING&role=ETL"
            .parse()?;

    assert_eq!(options.get_account(), "xy12345");
    assert_eq!(options.get_username(), "loader");
    assert_eq!(options.get_database(), Some("ANALYTICS"));
    assert_eq!(options.get_schema(), Some("RAW"));
    assert_eq!(options.get_warehouse(), Some("LOADING"));
    assert_eq!(options.get_role(), Some("ETL"));

    let options = SnowflakeConnectOptions::from_config(&json!({
        "account": "xy12345",
        "user": "loader",
        "password": PASSWORD,
        "private_key": escape(RSA_KEY_DES3),
    }))?;

    let normalized = options.normalize_private_key()?;
    assert_eq!(normalized.get_password(), None);
    assert!(matches!(
        normalized.get_private_key(),
        Some(PrivateKey::Der(der)) if der.as_bytes() == RSA_KEY_DER
    ));

    Ok(())
}
