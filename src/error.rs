//! Record store error types
//!
//! Every fallible operation in this crate returns [`RecordStoreError`].
//! Which operations surface these errors and which absorb them is part of
//! each operation's contract; see [`crate::RecordStore`].

use thiserror::Error;

/// Result type for record store operations
pub type Result<T> = std::result::Result<T, RecordStoreError>;

/// Unified error type for record store operations
#[derive(Debug, Error)]
pub enum RecordStoreError {
	/// The caller passed an argument the operation cannot accept
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Client construction, URI parsing or network I/O failed
	#[error("Connection error: {0}")]
	Connection(String),

	/// The server rejected the supplied credentials
	#[error("Authentication error: {0}")]
	Authentication(String),

	/// The store reported a failure while executing a request
	#[error("Operation failed: {0}")]
	Operation(String),

	/// BSON serialization or deserialization failed
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// A connection profile could not be read or parsed
	#[error("Configuration error: {0}")]
	Config(String),

	/// The filter or update uses an operator the backend cannot evaluate
	#[error("Unsupported query: {0}")]
	UnsupportedQuery(String),
}

impl From<mongodb::error::Error> for RecordStoreError {
	fn from(err: mongodb::error::Error) -> Self {
		use mongodb::error::ErrorKind;

		match *err.kind {
			ErrorKind::Authentication { .. } => RecordStoreError::Authentication(err.to_string()),
			ErrorKind::InvalidArgument { .. } => RecordStoreError::InvalidArgument(err.to_string()),
			ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
				RecordStoreError::Connection(err.to_string())
			}
			_ => RecordStoreError::Operation(err.to_string()),
		}
	}
}

// In bson v3.x, both ser::Error and de::Error are type aliases for bson::error::Error
impl From<bson::error::Error> for RecordStoreError {
	fn from(err: bson::error::Error) -> Self {
		RecordStoreError::Serialization(err.to_string())
	}
}

impl From<toml::de::Error> for RecordStoreError {
	fn from(err: toml::de::Error) -> Self {
		RecordStoreError::Config(err.to_string())
	}
}
