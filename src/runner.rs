//! Invokes the container runtime on a staged build context

use crate::containerfile::ContainerRuntime;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to run {runtime}: {source}")]
    Spawn {
        runtime: ContainerRuntime,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output of {runtime}: {source}")]
    Output {
        runtime: ContainerRuntime,
        #[source]
        source: std::io::Error,
    },

    #[error("Container build failed with exit code {}", .code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32> },
}

/// One `<runtime> build` invocation
#[derive(Debug, Clone)]
pub struct ContainerBuild {
    pub runtime: ContainerRuntime,
    pub containerfile: PathBuf,
    pub context: PathBuf,
    pub tags: Vec<String>,
    /// `KEY=VALUE`, or a bare `KEY` taken from the caller's environment
    pub build_args: Vec<String>,
    pub no_cache: bool,
}

impl ContainerBuild {
    pub fn new(runtime: ContainerRuntime, containerfile: PathBuf, context: PathBuf) -> Self {
        Self {
            runtime,
            containerfile,
            context,
            tags: Vec::new(),
            build_args: Vec::new(),
            no_cache: false,
        }
    }

    /// Arguments passed to the runtime executable
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-f".to_string(),
            self.containerfile.display().to_string(),
        ];

        for tag in &self.tags {
            args.push("-t".to_string());
            args.push(tag.clone());
        }
        for build_arg in &self.build_args {
            args.push("--build-arg".to_string());
            args.push(build_arg.clone());
        }
        if self.no_cache {
            args.push("--no-cache".to_string());
        }

        args.push(self.context.display().to_string());
        args
    }

    /// Run the build, streaming its output into the log
    pub async fn run(&self) -> Result<(), RunnerError> {
        let args = self.args();
        info!("Running command: {} {}", self.runtime, args.join(" "));

        let mut child = Command::new(self.runtime.as_str())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                runtime: self.runtime,
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (out, err) = tokio::join!(forward_lines(stdout), forward_lines(stderr));
        for result in [out, err] {
            result.map_err(|source| RunnerError::Output {
                runtime: self.runtime,
                source,
            })?;
        }

        let status = child.wait().await.map_err(|source| RunnerError::Spawn {
            runtime: self.runtime,
            source,
        })?;
        debug!("{} exited with {}", self.runtime, status);

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::Failed {
                code: status.code(),
            })
        }
    }
}

async fn forward_lines<R>(stream: Option<R>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(());
    };

    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        info!(target: "ee_builder::runtime", "{}", line);
    }
    Ok(())
}
