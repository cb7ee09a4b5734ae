use thiserror::Error;

/// Failures raised inside a tool executor.
///
/// None of these ever reach the agent loop as errors: the registry renders
/// them as `"Error: ..."` tool results so the model can read them and retry.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Cannot access \"{path}\" as it is outside the permitted working directory")]
    PathEscape { path: String },

    #[error("File \"{path}\" not found")]
    NotFound { path: String },

    #[error("\"{path}\" is not a directory")]
    NotADirectory { path: String },

    #[error("File is not found or is not a regular file: \"{path}\"")]
    NotAFile { path: String },

    #[error("File \"{path}\" is not a recognized script (supported extensions: {supported})")]
    UnsupportedScript { path: String, supported: String },

    #[error("Process exited with code {code}. STDERR: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Process terminated by signal. STDERR: {stderr}")]
    Terminated { stderr: String },

    #[error("executing script \"{path}\": {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Script \"{path}\" timed out after {secs} seconds")]
    Timeout { path: String, secs: u64 },

    #[error("Could not {action} \"{path}\": {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Unknown function: {name}")]
    UnknownTool { name: String },
}

impl ToolError {
    pub fn io(action: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = ToolError::PathEscape {
            path: "../secret.txt".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot access \"../secret.txt\" as it is outside the permitted working directory"
        );

        let err = ToolError::NonZeroExit {
            code: 3,
            stderr: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Process exited with code 3. STDERR: boom");
    }

    #[test]
    fn test_io_helper() {
        let err = ToolError::io(
            "read file",
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "Could not read file \"/tmp/x\": denied");
    }
}
