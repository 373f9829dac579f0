//! Shell completions generation command
//!
//! Usage: `zonesync completions bash > ~/.local/share/bash-completion/completions/zonesync`

use std::io::{self, Write};

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::output::OutputFormat;

/// Arguments for the completions subcommand
#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    /// Prints the completion script to stdout; the output format is ignored
    pub async fn execute(&self, _format: OutputFormat) -> Result<()> {
        let script = render(self.shell);
        io::stdout().write_all(&script)?;
        Ok(())
    }
}

fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = crate::Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "zonesync", &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_mention_subcommands() {
        let script = String::from_utf8(render(Shell::Bash)).unwrap();
        assert!(script.contains("zonesync"));
        assert!(script.contains("tokens"));
        assert!(script.contains("events"));
    }
}
