use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use minicg::{CompileOptions, Scoping, TranslationUnit};

#[derive(Parser)]
#[command(name = "minicg")]
#[command(about = "Lower a JSON-serialized AST to x86-64 assembly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Compile {
        #[arg(help = "Input AST as JSON")]
        input: PathBuf,

        #[arg(short, long, help = "Output file (stdout when omitted)")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Emit::Asm, help = "What to write")]
        emit: Emit,

        #[arg(long, help = "Give every compound statement its own scope")]
        block_scopes: bool,

        #[arg(long, help = "Omit '# spill' / '# reload' comments")]
        no_annotate: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Assembly text
    Asm,
    /// IR listing after frame layout
    Ir,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            emit,
            block_scopes,
            no_annotate,
        } => {
            let unit = read_unit(&input)?;
            let options = CompileOptions {
                scoping: if block_scopes {
                    Scoping::Block
                } else {
                    Scoping::Flat
                },
                annotate: !no_annotate,
            };

            let text = match emit {
                Emit::Asm => {
                    minicg::compile_with_options(&unit, &options).context("Compilation failed")?
                }
                Emit::Ir => {
                    let mut function =
                        minicg::build_ir(&unit, &options).context("IR construction failed")?;
                    function.layout().context("Frame layout failed")?;
                    function.to_string()
                }
            };

            match output {
                Some(path) => {
                    fs::write(&path, &text)
                        .with_context(|| format!("Failed to write output to {}", path.display()))?;
                    tracing::info!(
                        input = %input.display(),
                        output = %path.display(),
                        bytes = text.len(),
                        "compiled"
                    );
                }
                None => io::stdout()
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?,
            }
        }
    }

    Ok(())
}

fn read_unit(path: &Path) -> Result<TranslationUnit> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{}: not a valid AST", path.display()))
}
