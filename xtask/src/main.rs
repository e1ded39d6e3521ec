use core::str;
use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build ariad and run it from a scratch program root.
    RunSandbox {
        #[arg(long, short, default_value = "")]
        cargo_args: String,
        #[arg(long, short, default_value = "")]
        program_args: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::RunSandbox {
            cargo_args,
            program_args,
        } => run_sandbox(cargo_args, program_args),
    }
}

fn run_sandbox(cargo_args: String, program_args: String) -> anyhow::Result<()> {
    let cargo = std::env::var("CARGO")?;
    let project_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?).join("..");

    let mut args = vec!["build", "--message-format=json", "--bin", "ariad"];
    args.extend(cargo_args.split_whitespace());
    let output = std::process::Command::new(&cargo).args(args).output()?;
    let stdout = str::from_utf8(&output.stdout)?;

    if !output.status.success() {
        std::io::stdout().write_all(&output.stdout)?;
        std::io::stderr().write_all(&output.stderr)?;
        anyhow::bail!("build failed");
    }

    let mut executable_path = PathBuf::new();

    for line in stdout.lines() {
        let value = serde_json::from_str::<Value>(line)?;
        let reason = value
            .as_object()
            .and_then(|obj| obj.get("reason").and_then(|val| val.as_str()));
        let executable = value
            .as_object()
            .and_then(|obj| obj.get("executable").and_then(|val| val.as_str()));

        if reason == Some("compiler-artifact") {
            if let Some(executable) = executable {
                executable_path = PathBuf::from(executable);
            }
        }
    }

    anyhow::ensure!(executable_path.is_file());

    let sandbox_dir = project_dir.join("target").join("sandbox");
    std::fs::create_dir_all(&sandbox_dir)?;

    let file_name = executable_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("executable has no file name"))?;
    let sandbox_executable = sandbox_dir.join(file_name);
    std::fs::copy(&executable_path, &sandbox_executable)?;

    eprintln!("running {}", sandbox_executable.display());

    let status = std::process::Command::new(&sandbox_executable)
        .args(program_args.split_whitespace())
        .current_dir(&sandbox_dir)
        .status()?;

    anyhow::ensure!(status.success(), "ariad exited with {status}");

    Ok(())
}
