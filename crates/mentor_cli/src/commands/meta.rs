//! Shell completions and man pages.

use std::io::Write;
use std::path::Path;

use clap::CommandFactory;

use crate::Cli;

const BIN_NAME: &str = "mentor";

fn write_completions(
    shell: clap_complete::Shell,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
    Ok(())
}

fn write_man_page(out: &mut impl Write) -> Result<(), Box<dyn std::error::Error>> {
    clap_mangen::Man::new(Cli::command()).render(out)?;
    Ok(())
}

pub(crate) fn handle_completions(
    shell: clap_complete::Shell,
) -> Result<(), Box<dyn std::error::Error>> {
    write_completions(shell, &mut std::io::stdout().lock())
}

/// Print the top-level man page, or write one page per subcommand into
/// `output`.
pub(crate) fn handle_man(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(dir) = output else {
        return write_man_page(&mut std::io::stdout().lock());
    };

    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)?;
    println!("Generated man pages in: {}", dir.display());
    Ok(())
}
