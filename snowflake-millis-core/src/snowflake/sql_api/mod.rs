//! The bundled driver: Snowflake's SQL API over HTTPS with key-pair authentication.

use crate::connection::Connection;
use crate::cursor::{Cursor, RowFormat};
use crate::error::Error;
use crate::logger::DRIVER_LOG_TARGET;
use crate::snowflake::key::{Pkcs8Der, PrivateKey};
use crate::snowflake::options::SNOWFLAKE_DOMAIN;
use crate::snowflake::{
    SnowflakeArguments, SnowflakeColumn, SnowflakeConnectOptions, SnowflakeDriver, SnowflakeRow,
};
use futures_core::future::BoxFuture;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mod auth;
mod response;

use auth::KeyPairAuth;
use response::{database_error, Partition, QueryStatus, ResultSet};

const STATEMENTS_PATH: &str = "/api/v2/statements";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connects through the SQL API.
///
/// Only key-pair authentication is supported: the options must carry a private key.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlApiDriver;

impl SnowflakeDriver for SqlApiDriver {
    type Connection = SqlApiConnection;

    fn connect<'a>(
        &'a self,
        options: &'a SnowflakeConnectOptions,
    ) -> BoxFuture<'a, Result<SqlApiConnection, Error>> {
        Box::pin(SqlApiConnection::establish(options))
    }
}

/// A SQL API session. Statements are independent HTTP requests, so the connection is just
/// the client and the credentials to sign them with.
pub struct SqlApiConnection {
    session: Arc<Session>,
}

struct Session {
    client: reqwest::Client,
    origin: Url,
    statements_url: Url,
    auth: KeyPairAuth,
    statement_timeout: Option<Duration>,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    role: Option<String>,
}

impl SqlApiConnection {
    pub(crate) async fn establish(options: &SnowflakeConnectOptions) -> Result<Self, Error> {
        if options.account.is_empty() {
            return Err(Error::Configuration("an account is required".into()));
        }

        if options.username.is_empty() {
            return Err(Error::Configuration("a username is required".into()));
        }

        let key = match &options.private_key {
            Some(PrivateKey::Der(der)) => der.clone(),
            Some(PrivateKey::Pem(pem)) => Pkcs8Der::from_pem(pem, options.password.as_deref())?,
            None => {
                return Err(Error::Configuration(
                    "the SQL API requires key-pair authentication but no private key was given"
                        .into(),
                ))
            }
        };

        let auth = KeyPairAuth::new(&options.account, &options.username, &key)?;
        let origin = origin(options)?;
        let statements_url = origin.join(STATEMENTS_PATH).map_err(Error::config)?;

        let client = reqwest::Client::builder()
            .timeout(options.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .user_agent(concat!("snowflake-millis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::config)?;

        log::debug!(
            target: DRIVER_LOG_TARGET,
            "using {} as {}",
            statements_url,
            options.username
        );

        Ok(Self {
            session: Arc::new(Session {
                client,
                origin,
                statements_url,
                auth,
                statement_timeout: options.timeout,
                warehouse: options.warehouse.clone(),
                database: options.database.clone(),
                schema: options.schema.clone(),
                role: options.role.clone(),
            }),
        })
    }
}

impl Connection for SqlApiConnection {
    type Cursor = SqlApiCursor;

    fn cursor_with(&self, format: RowFormat) -> SqlApiCursor {
        SqlApiCursor::new(Arc::clone(&self.session), format)
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            self.session
                .execute("SELECT 1", &SnowflakeArguments::new())
                .await?;

            Ok(())
        })
    }

    fn close(self) -> BoxFuture<'static, Result<(), Error>> {
        // nothing is held open server-side
        Box::pin(async move { Ok(()) })
    }
}

impl Debug for SqlApiConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlApiConnection")
            .field("statements_url", &self.session.statements_url.as_str())
            .finish()
    }
}

impl Session {
    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, Error> {
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(self.auth.token()?)
            .header("X-Snowflake-Authorization-Token-Type", "KEYPAIR_JWT")
            .header(ACCEPT, "application/json"))
    }

    /// Submits a statement and waits for it to finish.
    async fn execute(&self, sql: &str, arguments: &SnowflakeArguments) -> Result<ResultSet, Error> {
        let mut body = json!({
            "statement": sql,
            "warehouse": self.warehouse,
            "database": self.database,
            "schema": self.schema,
            "role": self.role,
        });

        if let Some(timeout) = self.statement_timeout {
            body["timeout"] = json!(timeout.as_secs());
        }

        if !arguments.is_empty() {
            body["bindings"] = Value::Object(arguments.to_bindings());
        }

        log::debug!(target: DRIVER_LOG_TARGET, "submitting statement");

        let mut response = self
            .request(Method::POST, self.statements_url.clone())?
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;

        loop {
            match response.status() {
                StatusCode::OK => return response.json().await.map_err(http_error),
                StatusCode::ACCEPTED => {
                    let status: QueryStatus = response.json().await.map_err(http_error)?;

                    log::debug!(
                        target: DRIVER_LOG_TARGET,
                        "statement {} still running",
                        status.statement_handle.as_deref().unwrap_or("?")
                    );

                    tokio::time::sleep(POLL_INTERVAL).await;

                    let url = self
                        .origin
                        .join(&status.statement_status_url)
                        .map_err(Error::protocol)?;

                    response = self.get(url).await?;
                }
                status => return Err(failure(status, response).await),
            }
        }
    }

    /// Fetches partition `index` of a finished statement's result set.
    async fn partition(&self, handle: &str, index: usize) -> Result<Partition, Error> {
        let url = self
            .origin
            .join(&format!("{STATEMENTS_PATH}/{handle}?partition={index}"))
            .map_err(Error::protocol)?;

        log::debug!(
            target: DRIVER_LOG_TARGET,
            "fetching partition {} of statement {}",
            index,
            handle
        );

        let response = self.get(url).await?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(http_error),
            status => Err(failure(status, response).await),
        }
    }

    async fn get(&self, url: Url) -> Result<Response, Error> {
        self.request(Method::GET, url)?
            .send()
            .await
            .map_err(http_error)
    }
}

async fn failure(status: StatusCode, response: Response) -> Error {
    match response.text().await {
        Ok(body) => database_error(status, &body),
        Err(e) => http_error(e),
    }
}

fn http_error(error: reqwest::Error) -> Error {
    Error::Io(std::io::Error::other(error))
}

/// `https://<account>.snowflakecomputing.com`, unless a host was configured.
fn origin(options: &SnowflakeConnectOptions) -> Result<Url, Error> {
    let origin = match options.host.as_deref() {
        Some(host) if host.contains("://") => host.to_owned(),
        Some(host) => format!("https://{host}"),
        None => format!("https://{}{}", options.account, SNOWFLAKE_DOMAIN),
    };

    Url::parse(&origin).map_err(Error::config)
}

/// Rows of one statement, fetched partition by partition as they are consumed.
pub struct SqlApiCursor {
    session: Arc<Session>,
    format: RowFormat,
    columns: Vec<SnowflakeColumn>,
    rows: VecDeque<SnowflakeRow>,
    rowcount: Option<u64>,
    query_id: Option<String>,
    next_partition: usize,
    partitions: usize,
}

impl SqlApiCursor {
    fn new(session: Arc<Session>, format: RowFormat) -> Self {
        Self {
            session,
            format,
            columns: Vec::new(),
            rows: VecDeque::new(),
            rowcount: None,
            query_id: None,
            next_partition: 0,
            partitions: 0,
        }
    }

    fn reset(&mut self) {
        self.columns.clear();
        self.rows.clear();
        self.rowcount = None;
        self.query_id = None;
        self.next_partition = 0;
        self.partitions = 0;
    }

    fn push_rows(&mut self, data: Vec<Vec<Option<String>>>) -> Result<(), Error> {
        for raw in data {
            let row = SnowflakeRow::decode(self.format, &self.columns, raw)?;
            self.rows.push_back(row);
        }

        Ok(())
    }

    async fn next_row(&mut self) -> Result<Option<SnowflakeRow>, Error> {
        loop {
            if let Some(row) = self.rows.pop_front() {
                return Ok(Some(row));
            }

            if self.next_partition >= self.partitions {
                return Ok(None);
            }

            let Some(handle) = self.query_id.clone() else {
                return Err(err_protocol!("result set has partitions but no statement handle"));
            };

            let partition = self.session.partition(&handle, self.next_partition).await?;
            self.next_partition += 1;
            self.push_rows(partition.data)?;
        }
    }
}

impl Cursor for SqlApiCursor {
    fn format(&self) -> RowFormat {
        self.format
    }

    fn execute_with<'e>(
        &'e mut self,
        command: &'e str,
        arguments: &'e SnowflakeArguments,
    ) -> BoxFuture<'e, Result<&'e mut Self, Error>> {
        Box::pin(async move {
            self.reset();

            let result = self.session.execute(command, arguments).await?;

            self.columns = result.columns();
            self.rowcount = result.rowcount();
            self.partitions = result.partitions();
            // the first partition comes inline
            self.next_partition = 1;
            self.query_id = result.statement_handle;
            self.push_rows(result.data)?;

            Ok(self)
        })
    }

    fn columns(&self) -> &[SnowflakeColumn] {
        &self.columns
    }

    fn rowcount(&self) -> Option<u64> {
        self.rowcount
    }

    fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    fn fetch_one(&mut self) -> BoxFuture<'_, Result<Option<SnowflakeRow>, Error>> {
        Box::pin(self.next_row())
    }

    fn fetch_many(&mut self, size: usize) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>> {
        Box::pin(async move {
            let mut rows = Vec::with_capacity(size.min(self.rows.len()));

            while rows.len() < size {
                match self.next_row().await? {
                    Some(row) => rows.push(row),
                    None => break,
                }
            }

            Ok(rows)
        })
    }

    fn fetch_all(&mut self) -> BoxFuture<'_, Result<Vec<SnowflakeRow>, Error>> {
        Box::pin(async move {
            let mut rows = Vec::with_capacity(self.rows.len());

            while let Some(row) = self.next_row().await? {
                rows.push(row);
            }

            Ok(rows)
        })
    }
}

impl Debug for SqlApiCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlApiCursor")
            .field("format", &self.format)
            .field("columns", &self.columns)
            .field("buffered_rows", &self.rows.len())
            .field("rowcount", &self.rowcount)
            .field("query_id", &self.query_id)
            .finish()
    }
}
