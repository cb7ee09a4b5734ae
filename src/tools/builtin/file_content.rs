use async_trait::async_trait;
use serde::Deserialize;

use crate::sandbox::WorkingRoot;
use crate::tools::{ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError};

/// Reads a text file, truncated to a fixed number of characters.
pub struct FileContentTool {
    max_chars: usize,
}

#[derive(Debug, Deserialize)]
pub struct FileContentArgs {
    pub file_path: String,
}

impl FileContentTool {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl Tool for FileContentTool {
    type Args = FileContentArgs;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_file_content",
            description: "Reads the content of a file, constrained to the working directory. \
                          Long files are truncated.",
            parameters: vec![ParameterSpec {
                name: "file_path",
                kind: ParamKind::String,
                description: "Path of the file to read, relative to the working directory.",
                required: true,
            }],
        }
    }

    async fn execute(
        &self,
        root: &WorkingRoot,
        args: FileContentArgs,
    ) -> Result<String, ToolError> {
        let target = root.resolve(&args.file_path)?;
        let display = target.display().to_string();

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(ToolError::NotAFile { path: display }),
        }

        let content = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| ToolError::io("read file", &display, e))?;

        Ok(truncate(content, self.max_chars, &display))
    }
}

/// Keeps the first `max_chars` characters and appends a marker naming the
/// file when anything was cut.
fn truncate(mut content: String, max_chars: usize, path: &str) -> String {
    if let Some((byte_idx, _)) = content.char_indices().nth(max_chars) {
        content.truncate(byte_idx);
        content.push_str(&format!(
            "[...File \"{path}\" truncated at {max_chars} characters]"
        ));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, WorkingRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkingRoot::new(dir.path()).unwrap();
        (dir, root)
    }

    fn args(path: &str) -> FileContentArgs {
        FileContentArgs {
            file_path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reads_whole_file() {
        let (_dir, root) = setup();
        fs::create_dir(root.path().join("pkg")).unwrap();
        fs::write(root.path().join("pkg/calc.py"), "def add(a, b):\n    return a + b\n").unwrap();
        let out = FileContentTool::new(10_000)
            .execute(&root, args("pkg/calc.py"))
            .await
            .unwrap();
        assert_eq!(out, "def add(a, b):\n    return a + b\n");
    }

    #[tokio::test]
    async fn test_truncates_long_file() {
        let (_dir, root) = setup();
        fs::write(root.path().join("big.txt"), "a".repeat(25)).unwrap();
        let out = FileContentTool::new(10)
            .execute(&root, args("big.txt"))
            .await
            .unwrap();
        let path = root.path().join("big.txt");
        assert_eq!(
            out,
            format!(
                "aaaaaaaaaa[...File \"{}\" truncated at 10 characters]",
                path.display()
            )
        );
    }

    #[tokio::test]
    async fn test_exact_length_is_not_truncated() {
        let (_dir, root) = setup();
        fs::write(root.path().join("ten.txt"), "0123456789").unwrap();
        let out = FileContentTool::new(10)
            .execute(&root, args("ten.txt"))
            .await
            .unwrap();
        assert_eq!(out, "0123456789");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let out = truncate("héllo wörld".to_string(), 4, "f");
        assert!(out.starts_with("héll["));
        assert!(out.ends_with("truncated at 4 characters]"));
    }

    #[tokio::test]
    async fn test_rejects_escape() {
        let (_dir, root) = setup();
        let err = FileContentTool::new(100)
            .execute(&root, args("../secret.txt"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot access \"../secret.txt\" as it is outside the permitted working directory"
        );
    }

    #[tokio::test]
    async fn test_rejects_directory_and_missing() {
        let (_dir, root) = setup();
        fs::create_dir(root.path().join("pkg")).unwrap();
        let err = FileContentTool::new(100)
            .execute(&root, args("pkg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotAFile { .. }));
        let err = FileContentTool::new(100)
            .execute(&root, args("nope.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotAFile { .. }));
    }

    #[tokio::test]
    async fn test_non_utf8_is_an_io_error() {
        let (_dir, root) = setup();
        fs::write(root.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let err = FileContentTool::new(100)
            .execute(&root, args("blob.bin"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Could not read file"));
    }
}
