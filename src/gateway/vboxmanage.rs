use super::{Invocation, ResourceGateway};
use crate::config::ModelConfig;
use crate::core::{ModelError, Result};
use log::{debug, trace};
use std::path::PathBuf;
use std::process::Command;

/// Runs the command-line management tool as a child process.
#[derive(Debug, Clone)]
pub struct VBoxManageGateway {
    program: PathBuf,
}

impl VBoxManageGateway {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            program: config.vboxmanage.clone(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

impl ResourceGateway for VBoxManageGateway {
    fn invoke(&self, command: &str, args: &[String]) -> Result<String> {
        debug!("{} {}", self.program.display(), Invocation::new(command, args));

        let output = Command::new(&self.program)
            .arg(command)
            .args(args)
            .output()
            .map_err(|err| {
                ModelError::command_failed(
                    command,
                    args,
                    format!("failed to start {}: {}", self.program.display(), err),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(ModelError::command_failed(command, args, message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("{} returned {} bytes", command, stdout.len());
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_a_command_failure() {
        let config = ModelConfig::new().vboxmanage("/nonexistent/VBoxManage-for-tests");
        let gateway = VBoxManageGateway::new(&config);
        let err = gateway
            .invoke("showhdinfo", &["foo".to_string()])
            .unwrap_err();

        match err {
            ModelError::CommandFailed { command, args, .. } => {
                assert_eq!(command, "showhdinfo");
                assert_eq!(args, vec!["foo".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
