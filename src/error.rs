//! Error types for LuaFlow.

use thiserror::Error;

/// Common error type for LuaFlow.
#[derive(Error, Debug)]
pub enum FlowError {
    /// A named action, event, entity, script or function does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// An action with this name is already registered.
    #[error("action '{0}' is already registered")]
    AlreadyRegistered(String),

    /// A script value could not be converted to the type a handler expects.
    #[error("type mismatch: cannot convert {from} to {to}")]
    TypeMismatch {
        /// Type name of the value that was supplied.
        from: &'static str,
        /// Type name the handler expects.
        to: &'static str,
    },

    /// A playback was requested while another one is in progress.
    #[error("a cutscene is already playing")]
    AlreadyBusy,

    /// Script execution error reported by the interpreter.
    #[error("script error: {0}")]
    Script(String),

    /// The playback was cancelled.
    #[error("playback cancelled")]
    Cancelled,

    /// A host action or event handler failed.
    #[error("handler '{name}' failed: {message}")]
    Callback {
        /// Action or event name.
        name: String,
        /// Error reported by the handler.
        message: String,
    },

    /// A command was used after its script session was destroyed.
    #[error("script session is closed")]
    SessionClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),
}

impl FlowError {
    /// Wrap this error so it can be raised inside a Lua callback.
    pub fn into_lua(self) -> mlua::Error {
        mlua::Error::external(self)
    }
}

impl From<mlua::Error> for FlowError {
    fn from(e: mlua::Error) -> Self {
        FlowError::Script(e.to_string())
    }
}

/// Result type alias for LuaFlow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = FlowError::NotFound("action 'greet'".to_string());
        assert_eq!(err.to_string(), "action 'greet' not found");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = FlowError::TypeMismatch {
            from: "string",
            to: "integer",
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot convert string to integer"
        );
    }

    #[test]
    fn test_callback_error_display() {
        let err = FlowError::Callback {
            name: "open_door".to_string(),
            message: "door is locked".to_string(),
        };
        assert_eq!(err.to_string(), "handler 'open_door' failed: door is locked");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FlowError = io_err.into();
        assert!(matches!(err, FlowError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_lua_error_conversion() {
        let err: FlowError = mlua::Error::RuntimeError("boom".to_string()).into();
        assert!(matches!(err, FlowError::Script(ref msg) if msg.contains("boom")));
    }

    #[test]
    fn test_into_lua_keeps_message() {
        let err = FlowError::Cancelled.into_lua();
        assert!(err.to_string().contains("playback cancelled"));
    }
}
