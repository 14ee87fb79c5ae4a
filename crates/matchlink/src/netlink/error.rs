//! Error types for pipeline control operations.

use std::io;

/// Result type for pipeline control operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a match-action pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer returned an error code.
    #[error("pipeline error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the peer.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Generic netlink family is not registered.
    #[error("family not found: {name}")]
    FamilyNotFound {
        /// The family name that could not be resolved.
        name: String,
    },

    /// Malformed command token or wrong arity.
    #[error("parse error: {0}")]
    Parse(String),

    /// A value exceeds the width of its field or argument.
    #[error("'{token}' is out of range for {field}, must be at most {max}(0x{max:x})")]
    OutOfRange {
        /// The offending token.
        token: String,
        /// The field or argument name.
        field: String,
        /// The largest representable value.
        max: u64,
    },

    /// Field width that has no attribute representation.
    #[error("field {field} has unsupported bit width {bitwidth}")]
    UnsupportedWidth {
        /// The field name.
        field: String,
        /// The declared bit width.
        bitwidth: u32,
    },

    /// Header instance name not present in the header graph.
    #[error("unknown header instance `{name}`, check `get_header_graph`")]
    UnknownInstance {
        /// The instance name.
        name: String,
    },

    /// Field name not present in the resolved header.
    #[error("unknown field `{name}` in header `{header}`, check `get_headers`")]
    UnknownField {
        /// The header name.
        header: String,
        /// The field name.
        name: String,
    },

    /// Action name not present in the pipeline.
    #[error("unknown action `{name}`, check `get_actions`")]
    UnknownAction {
        /// The action name.
        name: String,
    },

    /// Table name or id not present in the pipeline.
    #[error("unknown table `{name}`")]
    UnknownTable {
        /// The table name or id.
        name: String,
    },

    /// Attribute name not declared by the target table.
    #[error("table {table} does not support attribute `{name}`")]
    UnknownAttribute {
        /// The table id.
        table: u32,
        /// The attribute name.
        name: String,
    },

    /// Attribute declared read-only by the target table.
    #[error("table {table} does not support setting `{name}`")]
    ReadOnlyAttribute {
        /// The table id.
        table: u32,
        /// The attribute name.
        name: String,
    },

    /// Action argument list exhausted before a required argument.
    #[error("missing action argument, expected `{arg_type} {name}`")]
    MissingArg {
        /// The expected argument type.
        arg_type: String,
        /// The expected argument name.
        name: String,
    },

    /// Table name and id resolve to different tables.
    #[error("table name `{name}` and id {id} do not refer to the same table")]
    TableMismatch {
        /// The given table name.
        name: String,
        /// The given table id.
        id: u32,
    },

    /// Encoded request exceeds the netlink message size bound.
    #[error("encoded request is {len} bytes, exceeds the message size limit")]
    MessageTooLarge {
        /// Encoded length in bytes.
        len: usize,
    },

    /// Reply carried a command code outside the protocol enumeration.
    #[error("unknown command code {code} in reply")]
    UnknownCommand {
        /// The raw command code.
        code: u8,
    },

    /// Operation not supported by the protocol.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// Receive loop cancelled between messages.
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    /// Create a peer error from an errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 2 | 19), // ENOENT=2, ENODEV=19
            Self::FamilyNotFound { .. }
            | Self::UnknownInstance { .. }
            | Self::UnknownField { .. }
            | Self::UnknownAction { .. }
            | Self::UnknownTable { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 1 | 13), // EPERM=1, EACCES=13
            _ => false,
        }
    }

    /// Get the errno value if this is a peer error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errno() {
        let err = Error::from_errno(-1); // EPERM
        assert!(err.is_permission_denied());
        assert_eq!(err.errno(), Some(1));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::from_errno(-2).is_not_found()); // ENOENT
        assert!(
            Error::UnknownAction {
                name: "set_egress_port".into()
            }
            .is_not_found()
        );
        assert!(!Error::Interrupted.is_not_found());
    }

    #[test]
    fn test_out_of_range_reports_both_bases() {
        let err = Error::OutOfRange {
            token: "4096".into(),
            field: "vlan_id".into(),
            max: 4095,
        };
        let msg = err.to_string();
        assert!(msg.contains("4095"));
        assert!(msg.contains("0xfff"));
    }
}
