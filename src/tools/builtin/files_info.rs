use async_trait::async_trait;
use serde::Deserialize;

use crate::sandbox::WorkingRoot;
use crate::tools::{ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError};

/// Lists the immediate children of a directory with size and kind.
pub struct FilesInfoTool;

#[derive(Debug, Deserialize)]
pub struct FilesInfoArgs {
    #[serde(default)]
    pub directory: Option<String>,
}

struct Entry {
    name: String,
    size: u64,
    is_dir: bool,
}

#[async_trait]
impl Tool for FilesInfoTool {
    type Args = FilesInfoArgs;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "get_files_info",
            description: "Lists files in the specified directory along with their sizes, \
                          constrained to the working directory.",
            parameters: vec![ParameterSpec {
                name: "directory",
                kind: ParamKind::String,
                description: "The directory to list files from, relative to the working \
                              directory. If not provided, lists files in the working \
                              directory itself.",
                required: false,
            }],
        }
    }

    async fn execute(&self, root: &WorkingRoot, args: FilesInfoArgs) -> Result<String, ToolError> {
        let directory = args.directory.unwrap_or_else(|| ".".to_string());
        let target = root.resolve(&directory)?;

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ToolError::NotADirectory { path: directory }),
            Err(_) => return Err(ToolError::NotFound { path: directory }),
        }

        let mut reader = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| ToolError::io("list directory", &directory, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::io("list directory", &directory, e))?
        {
            // lstat: a symlink is described as itself, never by its target
            let meta = entry
                .metadata()
                .await
                .map_err(|e| ToolError::io("stat", entry.path().display().to_string(), e))?;
            entries.push(Entry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                is_dir: meta.is_dir(),
            });
        }

        if entries.is_empty() {
            return Ok(format!("Directory \"{directory}\" is empty"));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries
            .iter()
            .map(format_entry)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// `- name: file_size=N bytes, is_dir=True|False`
fn format_entry(entry: &Entry) -> String {
    format!(
        "- {}: file_size={} bytes, is_dir={}",
        entry.name,
        entry.size,
        if entry.is_dir { "True" } else { "False" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, WorkingRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkingRoot::new(dir.path()).unwrap();
        fs::write(root.path().join("notes.txt"), "hello").unwrap();
        fs::write(root.path().join("main.py"), "print('hi')\n").unwrap();
        fs::create_dir(root.path().join("pkg")).unwrap();
        fs::write(root.path().join("pkg/calc.py"), "x = 1").unwrap();
        (dir, root)
    }

    fn args(directory: Option<&str>) -> FilesInfoArgs {
        FilesInfoArgs {
            directory: directory.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_lists_root_sorted() {
        let (_dir, root) = setup();
        let out = FilesInfoTool.execute(&root, args(Some("."))).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "- main.py: file_size=12 bytes, is_dir=False");
        assert_eq!(lines[1], "- notes.txt: file_size=5 bytes, is_dir=False");
        assert!(lines[2].starts_with("- pkg: file_size="));
        assert!(lines[2].ends_with("is_dir=True"));
    }

    #[tokio::test]
    async fn test_defaults_to_root() {
        let (_dir, root) = setup();
        let explicit = FilesInfoTool.execute(&root, args(Some("."))).await.unwrap();
        let default = FilesInfoTool.execute(&root, args(None)).await.unwrap();
        assert_eq!(explicit, default);
    }

    #[tokio::test]
    async fn test_non_recursive_subdirectory() {
        let (_dir, root) = setup();
        let out = FilesInfoTool.execute(&root, args(Some("pkg"))).await.unwrap();
        assert_eq!(out, "- calc.py: file_size=5 bytes, is_dir=False");
    }

    #[tokio::test]
    async fn test_rejects_escape() {
        let (_dir, root) = setup();
        let err = FilesInfoTool
            .execute(&root, args(Some("../")))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PathEscape { .. }));
        let err = FilesInfoTool
            .execute(&root, args(Some("/bin")))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PathEscape { .. }));
    }

    #[tokio::test]
    async fn test_rejects_file_and_missing() {
        let (_dir, root) = setup();
        let err = FilesInfoTool
            .execute(&root, args(Some("notes.txt")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "\"notes.txt\" is not a directory");
        let err = FilesInfoTool
            .execute(&root, args(Some("missing")))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_to_outside_is_not_followed() {
        let (_dir, root) = setup();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("big.bin"), vec![0u8; 4096]).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("out_dir")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("big.bin"),
            root.path().join("out_file"),
        )
        .unwrap();

        let out = FilesInfoTool.execute(&root, args(None)).await.unwrap();
        let line = |name: &str| {
            out.lines()
                .find(|l| l.starts_with(&format!("- {name}:")))
                .unwrap()
                .to_string()
        };
        assert!(line("out_dir").ends_with("is_dir=False"));
        let link_size = fs::symlink_metadata(root.path().join("out_file"))
            .unwrap()
            .len();
        assert_eq!(
            line("out_file"),
            format!("- out_file: file_size={link_size} bytes, is_dir=False")
        );
        assert!(!out.contains("file_size=4096 bytes"));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let (_dir, root) = setup();
        fs::create_dir(root.path().join("empty")).unwrap();
        let out = FilesInfoTool
            .execute(&root, args(Some("empty")))
            .await
            .unwrap();
        assert_eq!(out, "Directory \"empty\" is empty");
    }
}
