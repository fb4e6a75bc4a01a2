use crate::connection::LogSettings;
use crate::error::Error;
use crate::snowflake::key::{Pkcs8Der, PrivateKey};
use log::LevelFilter;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub(crate) const SNOWFLAKE_DOMAIN: &str = ".snowflakecomputing.com";

/// Options for configuring a Snowflake connection.
///
/// Options can be built up with the builder methods, parsed from a connection URL, read
/// from a JSON configuration mapping, or read from `SNOWFLAKE_*` environment variables.
///
/// ```rust
/// use snowflake_millis_core::snowflake::SnowflakeConnectOptions;
///
/// let options: SnowflakeConnectOptions =
///     "snowflake://loader@xy12345.snowflakecomputing.com/ANALYTICS/RAW?warehouse=LOADING"
///         .parse()?;
///
/// assert_eq!(options.get_account(), "xy12345");
/// assert_eq!(options.get_schema(), Some("RAW"));
/// # Ok::<(), snowflake_millis_core::error::Error>(())
/// ```
#[derive(Clone)]
pub struct SnowflakeConnectOptions {
    pub(crate) account: String,
    pub(crate) host: Option<String>,
    pub(crate) warehouse: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) role: Option<String>,
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    pub(crate) private_key: Option<PrivateKey>,
    pub(crate) private_key_path: Option<PathBuf>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) log_settings: LogSettings,
}

impl SnowflakeConnectOptions {
    pub fn new() -> Self {
        Self {
            account: String::new(),
            host: None,
            warehouse: None,
            database: None,
            schema: None,
            role: None,
            username: String::new(),
            password: None,
            private_key: None,
            private_key_path: None,
            timeout: None,
            log_settings: Default::default(),
        }
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Overrides the host requests are sent to, `<account>.snowflakecomputing.com` by default.
    ///
    /// Useful for private link endpoints and local emulators. A scheme may be included; it
    /// defaults to `https`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the password.
    ///
    /// When a private key is configured the password is the key's passphrase and is not
    /// passed on to the driver.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the private key as PEM text. Escaped `\n` sequences are accepted.
    pub fn private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(PrivateKey::Pem(pem.into()));
        self
    }

    /// Sets an already decoded, unencrypted PKCS#8 private key.
    pub fn private_key_der(mut self, der: Pkcs8Der) -> Self {
        self.private_key = Some(PrivateKey::Der(der));
        self
    }

    /// Reads the PEM private key from a file when no key is set inline.
    pub fn private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets where statement timings are logged.
    pub fn log_settings(mut self, settings: LogSettings) -> Self {
        self.log_settings = settings;
        self
    }

    // Getter methods for testing
    pub fn get_account(&self) -> &str {
        &self.account
    }

    pub fn get_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn get_database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn get_warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    pub fn get_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn get_role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn get_private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn get_log_settings(&self) -> &LogSettings {
        &self.log_settings
    }

    /// Returns the options a driver is handed.
    ///
    /// A PEM private key (inline, or read from `private_key_path`) is decrypted with the
    /// password and re-encoded as unencrypted PKCS#8 DER. Once that happened the password
    /// has served its purpose and is removed. Options without a PEM key come back unchanged.
    ///
    /// A blank PEM or an empty path counts as no key at all: it is dropped and the password
    /// is kept.
    pub fn normalize_private_key(&self) -> Result<Self, Error> {
        let pem: Cow<'_, str> = match (&self.private_key, &self.private_key_path) {
            (Some(PrivateKey::Der(_)), _) => return Ok(self.clone()),
            (Some(PrivateKey::Pem(pem)), _) if !pem.trim().is_empty() => {
                Cow::Borrowed(pem.as_str())
            }
            (_, Some(path)) if !path.as_os_str().is_empty() => {
                Cow::Owned(std::fs::read_to_string(path)?)
            }
            _ => {
                let mut options = self.clone();
                options.private_key = None;
                options.private_key_path = None;
                return Ok(options);
            }
        };

        let der = Pkcs8Der::from_pem(&pem, self.password.as_deref())?;

        let mut options = self.clone();
        options.private_key = Some(PrivateKey::Der(der));
        options.private_key_path = None;
        options.password = None;

        Ok(options)
    }

    pub fn from_url(url: &Url) -> Result<Self, Error> {
        let mut options = SnowflakeConnectOptions::new();

        if let Some(host) = url.host_str() {
            match host.strip_suffix(SNOWFLAKE_DOMAIN) {
                Some(account) => options = options.account(account),
                None => {
                    if let Some(account) = host.split('.').next() {
                        options = options.account(account);
                    }
                    options = options.host(match url.port() {
                        Some(port) => format!("{host}:{port}"),
                        None => host.to_owned(),
                    });
                }
            }
        }

        if !url.username().is_empty() {
            options = options.username(percent_decode(url.username()));
        }

        if let Some(password) = url.password() {
            options = options.password(percent_decode(password));
        }

        // path is `/<database>` or `/<database>/<schema>`
        let mut segments = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty());

        if let Some(database) = segments.next() {
            options = options.database(percent_decode(database));
        }

        if let Some(schema) = segments.next() {
            options = options.schema(percent_decode(schema));
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "account" => options = options.account(value.as_ref()),
                "warehouse" => options = options.warehouse(value.as_ref()),
                "database" | "db" => options = options.database(value.as_ref()),
                "schema" => options = options.schema(value.as_ref()),
                "role" => options = options.role(value.as_ref()),
                "private_key" => options = options.private_key(value.as_ref()),
                "private_key_path" => options = options.private_key_path(value.as_ref()),
                "timeout" => {
                    let seconds = value.parse::<u64>().map_err(Error::config)?;
                    options = options.timeout(Duration::from_secs(seconds));
                }
                _ => {}
            }
        }

        Ok(options)
    }

    /// Reads options from a JSON configuration mapping.
    ///
    /// Recognized keys are `account`, `user` (or `username`), `password`, `warehouse`,
    /// `database` (or `dbname`), `schema`, `role`, `host`, `private_key`, `private_key_path`
    /// and `timeout` (seconds). Other keys are ignored, as are empty strings.
    pub fn from_config(config: &serde_json::Value) -> Result<Self, Error> {
        let config = ConfigMapping::deserialize(config).map_err(Error::config)?;
        Ok(config.into())
    }

    /// Reads options from `SNOWFLAKE_*` environment variables, loading a `.env` file first
    /// if there is one. Returns `None` when `SNOWFLAKE_ACCOUNT` is not set.
    pub fn from_snowflake_env() -> Option<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |name: &str| var(name).filter(|value| !value.is_empty());

        let config = ConfigMapping {
            account: var("SNOWFLAKE_ACCOUNT")?,
            user: var("SNOWFLAKE_USER").or_else(|| var("SNOWFLAKE_USERNAME")),
            password: var("SNOWFLAKE_PASSWORD"),
            warehouse: var("SNOWFLAKE_WAREHOUSE"),
            database: var("SNOWFLAKE_DATABASE"),
            schema: var("SNOWFLAKE_SCHEMA"),
            role: var("SNOWFLAKE_ROLE"),
            host: var("SNOWFLAKE_HOST"),
            private_key: var("SNOWFLAKE_PRIVATE_KEY"),
            private_key_path: var("SNOWFLAKE_PRIVATE_KEY_PATH"),
            timeout: var("SNOWFLAKE_TIMEOUT").and_then(|timeout| timeout.parse().ok()),
        };

        Some(config.into())
    }
}

fn percent_decode(value: &str) -> String {
    percent_encoding::percent_decode_str(value)
        .decode_utf8_lossy()
        .into_owned()
}

/// The shape of a JSON configuration mapping.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigMapping {
    account: String,
    #[serde(alias = "username")]
    user: Option<String>,
    password: Option<String>,
    warehouse: Option<String>,
    #[serde(alias = "dbname")]
    database: Option<String>,
    schema: Option<String>,
    role: Option<String>,
    host: Option<String>,
    private_key: Option<String>,
    private_key_path: Option<String>,
    timeout: Option<u64>,
}

impl From<ConfigMapping> for SnowflakeConnectOptions {
    fn from(config: ConfigMapping) -> Self {
        fn set(value: Option<String>) -> Option<String> {
            value.filter(|value| !value.is_empty())
        }

        let mut options = SnowflakeConnectOptions::new().account(config.account);

        options.username = set(config.user).unwrap_or_default();
        options.password = set(config.password);
        options.warehouse = set(config.warehouse);
        options.database = set(config.database);
        options.schema = set(config.schema);
        options.role = set(config.role);
        options.host = set(config.host);
        options.private_key = set(config.private_key).map(PrivateKey::Pem);
        options.private_key_path = set(config.private_key_path).map(PathBuf::from);
        options.timeout = config.timeout.map(Duration::from_secs);

        options
    }
}

impl Debug for SnowflakeConnectOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeConnectOptions")
            .field("account", &self.account)
            .field("host", &self.host)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("private_key", &self.private_key)
            .field("private_key_path", &self.private_key_path)
            .field("timeout", &self.timeout)
            .field("log_settings", &self.log_settings)
            .finish()
    }
}

impl Default for SnowflakeConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SnowflakeConnectOptions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(Error::config)?;
        Self::from_url(&url)
    }
}

impl crate::connection::ConnectOptions for SnowflakeConnectOptions {
    type Connection = crate::snowflake::MillisLoggingConnection;

    fn connect(&self) -> futures_core::future::BoxFuture<'_, Result<Self::Connection, Error>> {
        Box::pin(async move {
            crate::snowflake::MillisLoggingConnection::connect_with_driver(
                &crate::snowflake::SqlApiDriver,
                self,
            )
            .await
        })
    }

    /// Reads `SNOWFLAKE_*` variables, falling back to `DATABASE_URL`.
    fn from_env() -> Result<Self, Error> {
        match Self::from_snowflake_env() {
            Some(options) => Ok(options),
            None => {
                let url = std::env::var("DATABASE_URL").map_err(Error::config)?;
                Self::from_str(&url)
            }
        }
    }

    fn log_statements(&mut self, level: LevelFilter) -> &mut Self {
        self.log_settings.log_statements(level);
        self
    }

    fn log_slow_statements(&mut self, level: LevelFilter, duration: Duration) -> &mut Self {
        self.log_settings.log_slow_statements(level, duration);
        self
    }
}
