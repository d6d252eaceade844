use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] DatabaseError),

    #[error("Schema mismatch: {table}.{column} is missing on record {record_id}")]
    SchemaMismatch {
        table: &'static str,
        column: &'static str,
        record_id: String,
    },

    #[error("Unknown report: {name}")]
    UnknownReport { name: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Database is not connected")]
    NotConnected,

    #[error("Missing table: {table}")]
    MissingTable { table: String },

    #[error("Missing required column: {table}.{column}")]
    MissingColumn { table: String, column: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl CoreError {
    pub fn schema_mismatch(table: &'static str, column: &'static str, record_id: &str) -> Self {
        CoreError::SchemaMismatch {
            table,
            column,
            record_id: record_id.to_string(),
        }
    }
}
