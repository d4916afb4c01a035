use thiserror::Error;

/// Convenience alias for results using the editor error type.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Failures that are reported back to the caller.
///
/// Routine rule violations (illegal connections, edits of system types, dangling ids) are
/// not errors here; those operations are no-ops that return `false` or a
/// [`ConnectionRejected`].
#[derive(Error, Debug)]
pub enum EditorError {
	#[error("malformed diagram document: {0}")]
	MalformedDocument(#[from] serde_json::Error),

	#[error("invalid color {color:?} on node {node_id:?}, expected #rrggbb")]
	InvalidColor { node_id: String, color: String },

	#[error("unknown component type id {0:?}")]
	UnknownType(String),
}

/// Why a `connect` call left the graph unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRejected {
	#[error("node {0:?} does not exist")]
	MissingNode(String),

	#[error("a node cannot connect to itself")]
	SelfConnection,

	#[error("{from:?} is already connected to {to:?}")]
	AlreadyConnected { from: String, to: String },

	#[error("type {from_type:?} may not connect to type {to_type:?}")]
	NotAllowed { from_type: String, to_type: String },
}
