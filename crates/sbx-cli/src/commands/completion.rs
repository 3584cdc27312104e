//! completion command implementation

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write the completion script for `shell` to `out`
pub fn run_completion(shell: Shell, out: &mut dyn Write) {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "sbx", out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_script_names_subcommands() {
        let mut out = Vec::new();
        run_completion(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("push-components"));
        assert!(script.contains("pull-components"));
    }
}
