use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, info, warn};

use crate::error::ScanError;

/// Prefixes that run the real scanner with elevated privileges.
const ELEVATION_PREFIXES: &[&str] = &["sudo", "doas"];

/// A validated scanner invocation: the user's command tokens followed by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommand {
    tokens: Vec<String>,
}

impl ScanCommand {
    /// Split `command` on whitespace and append `target` as the last argument.
    ///
    /// Both must be non-empty after trimming. The command is not checked to
    /// actually name a scanner.
    pub fn new(command: &str, target: &str) -> Result<Self, ScanError> {
        let command = command.trim();
        let target = target.trim();
        if command.is_empty() {
            return Err(ScanError::Validation("scan command"));
        }
        if target.is_empty() {
            return Err(ScanError::Validation("target"));
        }

        let mut tokens: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        tokens.push(target.to_string());
        Ok(Self { tokens })
    }

    /// Full token sequence, program first, target last.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn target(&self) -> &str {
        self.tokens.last().map(String::as_str).unwrap_or_default()
    }

    /// The scanner binary, looking past a `sudo`/`doas` prefix.
    ///
    /// For display only; [`ScanCommand::run`] still executes the tokens as given.
    pub fn executable(&self) -> &str {
        match self.tokens.as_slice() {
            [first, second, _, ..] if ELEVATION_PREFIXES.contains(&first.as_str()) => {
                second.as_str()
            }
            [first, ..] => first.as_str(),
            [] => "",
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.tokens
            .first()
            .is_some_and(|t| ELEVATION_PREFIXES.contains(&t.as_str()))
    }

    /// Run the command and return its combined stdout + stderr text.
    ///
    /// With `timeout` set, a scan that runs longer is killed and reported
    /// as [`ScanError::Timeout`].
    pub async fn run(&self, timeout: Option<Duration>) -> Result<String, ScanError> {
        let (program, args) = self
            .tokens
            .split_first()
            .ok_or(ScanError::Validation("scan command"))?;

        info!(
            executable = self.executable(),
            target = self.target(),
            elevated = self.is_elevated(),
            "starting scan"
        );
        debug!(command = %self.tokens.join(" "), "scan command line");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ScanError::Launch {
            program: program.clone(),
            source,
        })?;

        let output = match timeout {
            Some(limit) => match time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(?limit, "scan exceeded time limit, killed");
                    return Err(ScanError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|source| ScanError::Launch {
            program: program.clone(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ScanError::Execution {
                status: output.status.to_string(),
                output: text,
            });
        }
        debug!(bytes = text.len(), "scan finished");
        Ok(text)
    }
}
