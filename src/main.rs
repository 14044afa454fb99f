use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use pyedit::args::{Args, Command};
use pyedit::logging::{set_up_logging, LogLevel};

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = LogLevel::from(&args.log_level_args);
    if log_level != LogLevel::Silent {
        if let Err(err) = set_up_logging(&log_level) {
            eprintln!("{}{} {err:#}", "error".red().bold(), ":".bold());
            return ExitCode::FAILURE;
        }
    }

    match run(args.command) {
        Ok(status) => {
            println!("{status}");
            if status.starts_with("Tool Failed:") {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            if is_broken_pipe(&err) {
                return ExitCode::SUCCESS;
            }
            eprintln!("{}{} {err:#}", "error".red().bold(), ":".bold());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<String> {
    match command {
        Command::Edit(cmd) => {
            let code = cmd.code.read()?;
            Ok(pyedit::edit(
                &cmd.target_scope,
                &code,
                cmd.coscope_with.as_deref(),
                cmd.delete_a_lot,
            ))
        }
        Command::View(cmd) => Ok(pyedit::view(&cmd.target_scope, cmd.max_lines)),
        Command::Patch(cmd) => {
            let patch_content = cmd.patch.read()?;
            Ok(pyedit::patch(&cmd.file_path, &patch_content))
        }
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::BrokenPipe)
}
