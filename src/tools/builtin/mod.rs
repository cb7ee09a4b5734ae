pub mod file_content;
pub mod files_info;
pub mod run_script;
pub mod write_file;

use std::time::Duration;

use crate::config::ToolsConfig;

use super::ToolRegistry;

pub use file_content::FileContentTool;
pub use files_info::FilesInfoTool;
pub use run_script::RunScriptTool;
pub use write_file::WriteFileTool;

/// Registers the four sandboxed filesystem/process tools.
pub fn register_all(registry: &mut ToolRegistry, config: &ToolsConfig) {
    registry.register(FilesInfoTool);
    registry.register(FileContentTool::new(config.max_file_content_length));
    registry.register(RunScriptTool::new(
        config.interpreters.clone(),
        Duration::from_secs(config.script_timeout_secs),
    ));
    registry.register(WriteFileTool);
}
