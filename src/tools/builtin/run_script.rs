//! Runs a script inside the working root under a wall-clock timeout.
//!
//! On unix the script leads its own process group. When the timeout fires,
//! or when the whole agent run is cancelled, the wait future is dropped:
//! `kill_on_drop` kills the interpreter and [`ProcessGroup`] kills anything
//! it forked, so nothing is left orphaned.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::sandbox::WorkingRoot;
use crate::tools::{ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError};

pub const NO_OUTPUT: &str = "No output produced by the script.";

pub struct RunScriptTool {
    /// Extension (no dot, lowercase) → interpreter command
    interpreters: BTreeMap<String, String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct RunScriptArgs {
    pub file_path: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

impl RunScriptTool {
    pub fn new(interpreters: BTreeMap<String, String>, timeout: Duration) -> Self {
        let interpreters = interpreters
            .into_iter()
            .map(|(ext, cmd)| (ext.trim_start_matches('.').to_lowercase(), cmd))
            .collect();
        Self {
            interpreters,
            timeout,
        }
    }

    fn interpreter_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.interpreters.get(&ext).map(String::as_str)
    }

    fn supported(&self) -> String {
        self.interpreters
            .keys()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl Tool for RunScriptTool {
    type Args = RunScriptArgs;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "run_script",
            description: "Executes a script file with optional arguments, constrained to the \
                          working directory. The process runs with the working directory as \
                          its current directory and is killed after a timeout.",
            parameters: vec![
                ParameterSpec {
                    name: "file_path",
                    kind: ParamKind::String,
                    description: "Path of the script to execute, relative to the working \
                                  directory.",
                    required: true,
                },
                ParameterSpec {
                    name: "args",
                    kind: ParamKind::StringArray,
                    description: "Optional command-line arguments passed to the script.",
                    required: false,
                },
            ],
        }
    }

    async fn execute(&self, root: &WorkingRoot, args: RunScriptArgs) -> Result<String, ToolError> {
        let file_path = args.file_path;
        let target = root.resolve(&file_path)?;

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(ToolError::NotAFile { path: file_path }),
            Err(_) => return Err(ToolError::NotFound { path: file_path }),
        }

        let interpreter = self
            .interpreter_for(&target)
            .ok_or_else(|| ToolError::UnsupportedScript {
                path: file_path.clone(),
                supported: self.supported(),
            })?;

        let script_args = args.args.unwrap_or_default();
        debug!(
            "Running {} {} {:?} in {}",
            interpreter,
            target.display(),
            script_args,
            root.path().display()
        );

        let mut command = Command::new(interpreter);
        command
            .arg(&target)
            .args(&script_args)
            .current_dir(root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| ToolError::Spawn {
            path: file_path.clone(),
            source,
        })?;
        #[cfg(unix)]
        let _group = ProcessGroup(child.id());

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ToolError::Spawn {
                    path: file_path,
                    source,
                })
            }
            Err(_) => {
                // The wait future was dropped; kill_on_drop has killed the
                // child and `_group` kills the rest on return
                warn!(
                    "Script {file_path} timed out after {}s and was killed",
                    self.timeout.as_secs()
                );
                return Err(ToolError::Timeout {
                    path: file_path,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => ToolError::NonZeroExit {
                    code,
                    stderr: stderr.into_owned(),
                },
                None => ToolError::Terminated {
                    stderr: stderr.into_owned(),
                },
            });
        }

        if stdout.trim().is_empty() && stderr.trim().is_empty() {
            return Ok(NO_OUTPUT.to_string());
        }

        Ok(format!("STDOUT: {stdout}\nSTDERR: {stderr}"))
    }
}

/// Kills the script's whole process group when dropped, including after a
/// normal exit, so background children cannot outlive the call.
#[cfg(unix)]
struct ProcessGroup(Option<u32>);

#[cfg(unix)]
impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(pgid) = self.0.and_then(|id| libc::pid_t::try_from(id).ok()) else {
            return;
        };
        // SAFETY: killpg takes plain integers and touches no memory. ESRCH
        // (group already gone) is expected and ignored.
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc == 0 {
            debug!("Killed process group {pgid}");
        }
    }
}
