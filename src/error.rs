//! Error taxonomy shared by the graph store, the codecs and the browser host.
//!
//! Every variant carries the message shown to the user. None of them is fatal:
//! the presentation layer turns them into an alert and the graph is left as it
//! was before the failed operation.

use thiserror::Error;

/// Failure of a user-initiated graph operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
	/// A required input was empty.
	#[error("{0}")]
	Validation(String),
	/// A referenced label or id does not exist.
	#[error("{0}")]
	NotFound(String),
	/// An import payload could not be understood.
	#[error("{0}")]
	Format(String),
	/// A browser API refused or failed (storage, rasterization, file access).
	#[error("{0}")]
	Host(String),
}

impl GraphError {
	pub(crate) fn validation(message: impl Into<String>) -> Self {
		Self::Validation(message.into())
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound(message.into())
	}

	pub(crate) fn format(message: impl Into<String>) -> Self {
		Self::Format(message.into())
	}

	pub(crate) fn host(message: impl Into<String>) -> Self {
		Self::Host(message.into())
	}
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;
