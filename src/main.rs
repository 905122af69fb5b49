use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use isagen::loader::isa::IsaLoader;
use isagen::soc::isa::catalog::{Catalog, InstructionFilter};
use isagen::soc::isa::classify::classify_instruction;
use isagen::soc::isa::decode::{ClusterStrategy, SynthesisOptions, synthesize_tables};
use isagen::soc::isa::semantics::{Lowerer, LoweringOptions, LoweringTarget};

#[derive(Parser)]
#[command(author, version, about = "Instruction definition compiler", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit one decodetree file per instruction width.
    Decodetree {
        #[arg(long)]
        inst_dir: PathBuf,
        /// Write `{prefix}{width}.decode` files instead of printing.
        #[arg(long)]
        out_prefix: Option<PathBuf>,
        /// Group instructions with the legacy greedy clustering.
        #[arg(long)]
        single_pass: bool,
        /// Also emit the nested switch dispatch for every group.
        #[arg(long)]
        switches: bool,
    },
    /// Lower instruction semantics into runtime calls.
    Lower {
        #[arg(long)]
        inst_dir: PathBuf,
        #[arg(long = "csr-dir")]
        csr_dirs: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = Target::Exec)]
        target: Target,
        #[arg(long, default_value = "xqci")]
        prefix: String,
        #[arg(long, default_value = "env")]
        env_arg: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the operand kind of every instruction field.
    Classify {
        #[arg(long)]
        inst_dir: PathBuf,
    },
    /// Emit CSR address and field-mask constants.
    Csr {
        #[arg(long = "csr-dir", required = true)]
        csr_dirs: Vec<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Exec,
    Symbolic,
}

impl From<Target> for LoweringTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Exec => LoweringTarget::Execution,
            Target::Symbolic => LoweringTarget::Symbolic,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one subcommand. `Ok(false)` means output was produced but some definition failed.
fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Decodetree {
            inst_dir,
            out_prefix,
            single_pass,
            switches,
        } => {
            let (catalog, mut ok) = load(Some(inst_dir.as_path()), &[])?;
            let options = SynthesisOptions {
                strategy: if single_pass {
                    ClusterStrategy::SinglePass
                } else {
                    ClusterStrategy::Transitive
                },
            };
            for (width, table) in synthesize_tables(&catalog, &options) {
                if let Err(err) = table.ensure_resolved() {
                    error!(width, "{err}");
                    ok = false;
                    continue;
                }
                let mut text = table.render();
                if switches {
                    text.push_str(&table.render_switches());
                }
                match &out_prefix {
                    Some(prefix) => {
                        let path = PathBuf::from(format!("{}{width}.decode", prefix.display()));
                        write_output(Some(path.as_path()), &text)?;
                    }
                    None => print!("{text}"),
                }
            }
            Ok(ok)
        }
        Command::Lower {
            inst_dir,
            csr_dirs,
            target,
            prefix,
            env_arg,
            out,
        } => {
            let (catalog, ok) = load(Some(inst_dir.as_path()), &csr_dirs)?;
            let options = LoweringOptions {
                runtime_prefix: prefix,
                env_arg,
            };
            let lowerer = Lowerer::new(catalog.csrs(), options);
            let lowered = lowerer.lower_catalog(&catalog, target.into());
            let gaps = lowered
                .iter()
                .filter(|instr| !instr.diagnostics.is_empty())
                .count();
            let text: String = lowered
                .iter()
                .map(|instr| instr.render_function())
                .collect::<Vec<_>>()
                .join("\n");
            write_output(out.as_deref(), &text)?;
            info!(lowered = lowered.len(), with_gaps = gaps, "lowering finished");
            Ok(ok)
        }
        Command::Classify { inst_dir } => {
            let (catalog, ok) = load(Some(inst_dir.as_path()), &[])?;
            for instr in catalog.instructions() {
                for (field, kind) in classify_instruction(instr) {
                    println!("{} {field} {kind}", instr.name);
                }
            }
            Ok(ok)
        }
        Command::Csr { csr_dirs, out } => {
            let (catalog, ok) = load(None, &csr_dirs)?;
            write_output(out.as_deref(), &catalog.csrs().render_constants())?;
            Ok(ok)
        }
    }
}

/// Loads the catalog, reporting every broken definition. The flag is false if any failed.
fn load(inst_dir: Option<&Path>, csr_dirs: &[PathBuf]) -> Result<(Catalog, bool)> {
    let report = IsaLoader::new()
        .with_filter(InstructionFilter::xqci())
        .load_catalog(inst_dir, csr_dirs)
        .context("loading definitions")?;
    let ok = !report.has_errors();
    Ok((report.catalog, ok))
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote output");
        }
        None => print!("{text}"),
    }
    Ok(())
}
