use regex::Regex;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::model::{ActionKind, ActionRequest, ContainerRecord};
use crate::parser::PS_FORMAT;

static HOST_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)->\d+/tcp").expect("valid regex"));

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum DispatchError {
    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("{command} exited with {status}{}", render_output(.output))]
    NonZeroExit {
        command: String,
        status: String,
        output: String,
    },

    #[error("{0}")]
    Validation(String),
}

fn render_output(output: &str) -> String {
    let output = output.trim();
    if output.is_empty() {
        String::new()
    } else {
        format!(": {output}")
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InvocationMode {
    Captured,
    Interactive,
    /// Launcher that may leave long-lived children behind (browser openers).
    Detached,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub mode: InvocationMode,
}

impl Invocation {
    fn captured(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            mode: InvocationMode::Captured,
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);
        match self.mode {
            InvocationMode::Captured => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            InvocationMode::Interactive => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            InvocationMode::Detached => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
            }
        }
        cmd
    }
}

#[derive(Debug, Clone)]
pub struct DockerGateway {
    docker_bin: String,
    opener: String,
    exec_shell: String,
}

impl DockerGateway {
    pub fn new(
        docker_bin: impl Into<String>,
        opener: impl Into<String>,
        exec_shell: impl Into<String>,
    ) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            opener: opener.into(),
            exec_shell: exec_shell.into(),
        }
    }

    pub fn list_invocation(&self) -> Invocation {
        Invocation::captured(&self.docker_bin, &["ps", "--all", "--format", PS_FORMAT])
    }

    /// Builds the process for an already validated request.
    pub fn invocation(&self, request: &ActionRequest) -> Result<Invocation, DispatchError> {
        let target = request.target.as_str();
        let invocation = match request.kind {
            ActionKind::Stop => Invocation::captured(&self.docker_bin, &["stop", target]),
            ActionKind::Restart => Invocation::captured(&self.docker_bin, &["restart", target]),
            ActionKind::Delete => {
                Invocation::captured(&self.docker_bin, &["rm", "--volumes", target])
            }
            ActionKind::Attach => Invocation {
                program: self.docker_bin.clone(),
                args: vec![
                    "exec".to_string(),
                    "-it".to_string(),
                    target.to_string(),
                    self.exec_shell.clone(),
                ],
                mode: InvocationMode::Interactive,
            },
            ActionKind::Open => {
                let Some(endpoint) = request.endpoint.as_deref() else {
                    return Err(DispatchError::Validation(format!(
                        "no endpoint resolved for {target}"
                    )));
                };
                Invocation {
                    program: self.opener.clone(),
                    args: vec![endpoint.to_string()],
                    mode: InvocationMode::Detached,
                }
            }
        };
        Ok(invocation)
    }

    pub async fn list(&self) -> Result<String, DispatchError> {
        run_captured(&self.list_invocation()).await
    }

    pub async fn invoke(&self, request: &ActionRequest) -> Result<String, DispatchError> {
        let invocation = self.invocation(request)?;
        debug!("dispatching {}", invocation.display());
        match invocation.mode {
            InvocationMode::Detached => run_detached(&invocation).await,
            InvocationMode::Captured | InvocationMode::Interactive => {
                run_captured(&invocation).await
            }
        }
    }
}

/// Checks a request against the selected record before anything is spawned.
pub fn prepare_request(
    kind: ActionKind,
    record: &ContainerRecord,
) -> Result<ActionRequest, DispatchError> {
    let endpoint = match kind {
        ActionKind::Attach if record.state().is_terminal() => {
            return Err(DispatchError::Validation(format!(
                "cannot attach to stopped container {} ({})",
                record.id, record.status
            )));
        }
        ActionKind::Open => Some(endpoint_url(&record.ports)?),
        _ => None,
    };

    Ok(ActionRequest {
        kind,
        target: record.id.clone(),
        endpoint,
    })
}

pub fn extract_host_port(ports: &str) -> Result<String, DispatchError> {
    HOST_PORT
        .captures(ports)
        .and_then(|captures| captures.get(1))
        .map(|port| port.as_str().to_string())
        .ok_or_else(|| {
            let shown = if ports.trim().is_empty() {
                "<none>"
            } else {
                ports.trim()
            };
            DispatchError::Validation(format!("no port found in {shown}"))
        })
}

pub fn endpoint_url(ports: &str) -> Result<String, DispatchError> {
    extract_host_port(ports).map(|port| format!("http://localhost:{port}"))
}

pub async fn run_captured(invocation: &Invocation) -> Result<String, DispatchError> {
    let output = invocation
        .command()
        .output()
        .await
        .map_err(|error| DispatchError::Launch {
            program: invocation.program.clone(),
            reason: error.to_string(),
        })?;

    let combined = combine_output(&output.stdout, &output.stderr);
    if output.status.success() {
        Ok(combined)
    } else {
        Err(non_zero_exit(invocation, output.status, combined))
    }
}

/// Waits for the launcher itself only. Its stdio is null, so grandchildren
/// such as a browser hold no pipe open to us.
pub async fn run_detached(invocation: &Invocation) -> Result<String, DispatchError> {
    let status = invocation
        .command()
        .status()
        .await
        .map_err(|error| DispatchError::Launch {
            program: invocation.program.clone(),
            reason: error.to_string(),
        })?;

    if status.success() {
        Ok(String::new())
    } else {
        Err(non_zero_exit(invocation, status, String::new()))
    }
}

pub fn non_zero_exit(invocation: &Invocation, status: ExitStatus, output: String) -> DispatchError {
    DispatchError::NonZeroExit {
        command: invocation.display(),
        status: status.to_string(),
        output,
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    if stderr.trim().is_empty() {
        stdout.to_string()
    } else if stdout.trim().is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    }
}
