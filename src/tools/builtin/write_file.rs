use async_trait::async_trait;
use serde::Deserialize;

use crate::sandbox::WorkingRoot;
use crate::tools::{ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError};

/// Creates or overwrites a file, creating parent directories as needed.
pub struct WriteFileTool;

#[derive(Debug, Deserialize)]
pub struct WriteFileArgs {
    pub file_path: String,
    pub content: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    type Args = WriteFileArgs;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "write_file",
            description: "Writes content to a file, constrained to the working directory. \
                          Creates the file and any missing parent directories; \
                          overwrites existing content.",
            parameters: vec![
                ParameterSpec {
                    name: "file_path",
                    kind: ParamKind::String,
                    description: "Path of the file to write, relative to the working directory.",
                    required: true,
                },
                ParameterSpec {
                    name: "content",
                    kind: ParamKind::String,
                    description: "The full content to write to the file.",
                    required: true,
                },
            ],
        }
    }

    async fn execute(&self, root: &WorkingRoot, args: WriteFileArgs) -> Result<String, ToolError> {
        let target = root.resolve(&args.file_path)?;
        let display = target.display().to_string();

        if tokio::fs::metadata(&target)
            .await
            .is_ok_and(|meta| meta.is_dir())
        {
            return Err(ToolError::NotAFile { path: display });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io("create directories for", &display, e))?;
        }

        tokio::fs::write(&target, args.content.as_bytes())
            .await
            .map_err(|e| ToolError::io("write to file", &display, e))?;

        Ok(format!(
            "Successfully wrote to \"{display}\" ({} characters written)",
            args.content.chars().count()
        ))
    }
}
