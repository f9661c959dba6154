//! External programs as file actions

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::traits::FileAction;
use crate::config::ExternalProgram;
use crate::error::Error;

impl ExternalProgram {
    /// Path of the file the program is expected to produce, if it produces one
    pub fn output_path(&self, input: &Path) -> Option<PathBuf> {
        let ext = self.output_extension.trim().trim_start_matches('.');
        if ext.is_empty() {
            return None;
        }
        Some(input.with_extension(ext))
    }

    /// Substitute `%input`/`%output` and split into arguments
    pub fn build_args(&self, input: &Path, output: Option<&Path>) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.map(|p| p.to_string_lossy()).unwrap_or_default();
        let line = self
            .args
            .replace("%input", &input)
            .replace("%output", &output);
        split_args(&line)
    }

    fn resolve_binary(&self) -> crate::Result<PathBuf> {
        if self.path.components().count() > 1 || self.path.is_absolute() {
            return Ok(self.path.clone());
        }
        which::which(&self.path).map_err(|e| {
            Error::ExternalTool(format!(
                "program '{}' not found: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl FileAction for ExternalProgram {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, file_path: &Path) -> crate::Result<PathBuf> {
        if !file_path.exists() {
            return Ok(file_path.to_path_buf());
        }

        let binary = self.resolve_binary()?;
        let output_path = self.output_path(file_path);
        let args = self.build_args(file_path, output_path.as_deref());

        tracing::debug!(
            program = %self.name,
            binary = %binary.display(),
            args = ?args,
            "running file action"
        );

        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&binary).args(&args).kill_on_drop(true).output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    tracing::warn!(
                        program = %self.name,
                        code = ?output.status.code(),
                        "file action exited with failure"
                    );
                }
            }
            Ok(Err(e)) => {
                return Err(Error::ExternalTool(format!(
                    "failed to run '{}': {}",
                    self.name, e
                )));
            }
            Err(_) => {
                return Err(Error::ExternalTool(format!(
                    "'{}' timeout after {:?}",
                    self.name, self.timeout
                )));
            }
        }

        match output_path {
            Some(path) if path.exists() => Ok(path),
            _ => Ok(file_path.to_path_buf()),
        }
    }
}

/// Split a command line on whitespace, honouring double quotes
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}
