use std::process::Command;

use tracing::debug;
use waiter_core::DeliveryFailure;

/// Performs the work an order describes. Gets the order's arguments, never the order.
pub trait ExecutionSink {
    fn deliver(&self, arguments: &[String]) -> Result<(), DeliveryFailure>;
}

impl<F> ExecutionSink for F
where
    F: Fn(&[String]) -> Result<(), DeliveryFailure>,
{
    fn deliver(&self, arguments: &[String]) -> Result<(), DeliveryFailure> {
        self(arguments)
    }
}

/// Delivers by running `prefix ++ arguments` as an external command.
#[derive(Clone, Debug)]
pub struct CommandSink {
    prefix: Vec<String>,
    shell: bool,
}

impl CommandSink {
    pub fn new(prefix: Vec<String>) -> Self {
        Self { prefix, shell: true }
    }

    /// With `shell` the pieces are joined with spaces and handed to `sh -c`;
    /// without it the first piece is executed directly.
    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    fn argv<'a>(&'a self, arguments: &'a [String]) -> Vec<&'a str> {
        self.prefix.iter().chain(arguments).map(String::as_str).collect()
    }
}

impl ExecutionSink for CommandSink {
    fn deliver(&self, arguments: &[String]) -> Result<(), DeliveryFailure> {
        let argv = self.argv(arguments);
        let Some((program, rest)) = argv.split_first() else {
            return Err(DeliveryFailure::new("empty command line"));
        };
        let line = argv.join(" ");

        let mut cmd = if self.shell {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        } else {
            let mut c = Command::new(program);
            c.args(rest);
            c
        };

        debug!(command = %line, "running delivery command");
        let status = cmd
            .status()
            .map_err(|e| DeliveryFailure(format!("could not run `{}`: {}", line, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(DeliveryFailure(format!("`{}` failed: {}", line, status)))
        }
    }
}
