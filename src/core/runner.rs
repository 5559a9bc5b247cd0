//! Command-runner seam between local and remote execution.
//!
//! Stage logic (checkout-or-pull, venv provisioning) is written once against
//! this trait and driven either on the local machine or over SSH, the same
//! way file operations go through the `FileSystem` trait.

use crate::ssh::{execute_local_command_in_dir, CommandOutput, SshClient};

pub trait CommandRunner {
    /// Run a shell command and capture its output.
    fn run(&self, command: &str) -> CommandOutput;

    /// Whether the command exits zero, discarding output.
    fn check(&self, command: &str) -> bool {
        self.run(command).success
    }

    /// Human-readable execution target for diagnostics.
    fn target(&self) -> String;
}

/// Runs commands on the local machine via `sh -c`.
pub struct LocalRunner {
    pub workdir: Option<String>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self { workdir: None }
    }

    pub fn in_dir(dir: impl Into<String>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for LocalRunner {
    fn run(&self, command: &str) -> CommandOutput {
        execute_local_command_in_dir(command, self.workdir.as_deref())
    }

    fn target(&self) -> String {
        "localhost".to_string()
    }
}

/// Runs commands on a remote host through an SSH client.
pub struct RemoteRunner<'a> {
    pub client: &'a SshClient,
}

impl<'a> RemoteRunner<'a> {
    pub fn new(client: &'a SshClient) -> Self {
        Self { client }
    }
}

impl CommandRunner for RemoteRunner<'_> {
    fn run(&self, command: &str) -> CommandOutput {
        self.client.execute(command)
    }

    fn target(&self) -> String {
        self.client.target()
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Scripted runner for tests: records every command and answers from a
    /// queue of canned outputs (missing entries succeed with empty output).
    pub struct ScriptedRunner {
        pub commands: RefCell<Vec<String>>,
        pub responses: RefCell<Vec<(String, CommandOutput)>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self {
                commands: RefCell::new(Vec::new()),
                responses: RefCell::new(Vec::new()),
            }
        }

        /// Respond to commands containing `needle` with the given output.
        pub fn respond(self, needle: &str, output: CommandOutput) -> Self {
            self.responses
                .borrow_mut()
                .push((needle.to_string(), output));
            self
        }

        pub fn fail_on(self, needle: &str, stderr: &str) -> Self {
            self.respond(
                needle,
                CommandOutput {
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    success: false,
                    exit_code: 1,
                },
            )
        }

        pub fn ran(&self, needle: &str) -> bool {
            self.commands.borrow().iter().any(|c| c.contains(needle))
        }
    }

    pub fn ok_output() -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &str) -> CommandOutput {
            self.commands.borrow_mut().push(command.to_string());
            for (needle, output) in self.responses.borrow().iter() {
                if command.contains(needle.as_str()) {
                    return output.clone();
                }
            }
            ok_output()
        }

        fn target(&self) -> String {
            "scripted".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;

    #[test]
    fn local_runner_runs_in_workdir() {
        let runner = LocalRunner::in_dir("/tmp");
        let output = runner.run("pwd");
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "/tmp");
    }

    #[test]
    fn scripted_runner_answers_from_queue() {
        let runner = ScriptedRunner::new().fail_on("git pull", "merge conflict");
        assert!(runner.check("echo ok"));
        assert!(!runner.check("git pull origin main"));
        assert!(runner.ran("echo ok"));
    }
}
