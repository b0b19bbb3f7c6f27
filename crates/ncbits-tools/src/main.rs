//! `ncbits` command-line entry point.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use ncbits::ContainerReader as _;
use ncbits_bit_info::KeepBitsRule;
use ncbits_store::MemContainer;
use ncbits_tools::{bit_analyze, bit_round_rewrite, concat, size_stat, RewriteConfig};

#[derive(Parser, Debug)]
#[command(name = "ncbits", version)]
#[command(about = "Lossy-compression preparation toolkit for chunked scientific arrays")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply information-preserving bit rounding to the float32 variables of
    /// a container
    BitRound {
        /// Information level threshold (0.0-1.0, typically 0.9999)
        inflevel: f64,
        /// Input container
        input: PathBuf,
        /// Output container
        output: PathBuf,
        /// Compression level (1-9); enables the shuffle filter
        #[arg(long)]
        complevel: Option<u8>,
        /// Use monotonic filtering when calculating bit information
        #[arg(long)]
        monotonic_bitinfo: bool,
    },
    /// Print the per-bit-position pattern of every variable
    BitAnalyze {
        /// Input container
        input: PathBuf,
    },
    /// Print compressed and uncompressed size statistics
    SizeStat {
        /// Input container
        input: PathBuf,
    },
    /// Concatenate containers along their unlimited dimension without
    /// recompressing
    Concat {
        /// Show per-dataset debug traces
        #[arg(short)]
        verbose: bool,
        /// Input containers followed by the output container
        #[arg(required = true, num_args = 3..)]
        files: Vec<PathBuf>,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match &cli.command {
        Command::Concat { verbose: true, .. } => log::Level::Debug,
        _ => log::Level::Info,
    };
    simple_logger::init_with_level(level).context("failed to initialise logging")?;

    match cli.command {
        Command::BitRound {
            inflevel,
            input,
            output,
            complevel,
            monotonic_bitinfo,
        } => {
            let config = RewriteConfig {
                inflevel,
                complevel,
                rule: if monotonic_bitinfo {
                    KeepBitsRule::Monotonic
                } else {
                    KeepBitsRule::TailFilteredCdf
                },
            };
            config.validate()?;

            let monotonic_note = if monotonic_bitinfo {
                ", monotonic-bitinfo=enabled"
            } else {
                ""
            };
            if let Some(level) = complevel {
                println!(
                    "Processing: {} -> {} (inflevel={inflevel:.6}, compression={level}, \
                     shuffle=enabled{monotonic_note})",
                    input.display(),
                    output.display()
                );
            } else {
                println!(
                    "Processing: {} -> {} (inflevel={inflevel:.6}{monotonic_note})",
                    input.display(),
                    output.display()
                );
            }

            let reader = MemContainer::open(&input)
                .with_context(|| format!("cannot open input file {}", input.display()))?;
            let mut writer = MemContainer::create(&output);
            let summary =
                bit_round_rewrite(&reader, &mut writer, &config, &mut std::io::stdout().lock())?;

            println!();
            println!("Bitrounding complete:");
            println!("  Processed variables: {}", summary.processed);
            println!("  Bitrounded variables: {}", summary.rounded);
            println!("  Output file: {}", output.display());

            if let (Ok(input_meta), Ok(output_meta)) =
                (std::fs::metadata(&input), std::fs::metadata(&output))
            {
                #[allow(clippy::cast_precision_loss)]
                let (input_size, output_size) =
                    (input_meta.len() as f64, output_meta.len() as f64);
                if input_size > 0.0 && output_size > 0.0 {
                    println!("  Input file size: {:.2} MB", input_size / (1024.0 * 1024.0));
                    println!(
                        "  Output file size: {:.2} MB",
                        output_size / (1024.0 * 1024.0)
                    );
                    println!("  Compression ratio: {:.2}:1", input_size / output_size);
                }
            }
        }
        Command::BitAnalyze { input } => {
            println!("Loading file: {}", input.display());
            let reader = MemContainer::open(&input)
                .with_context(|| format!("cannot open file {}", input.display()))?;
            bit_analyze(&reader, &mut std::io::stdout().lock())?;
        }
        Command::SizeStat { input } => {
            println!("Loading file: {}", input.display());
            let reader = MemContainer::open(&input)
                .with_context(|| format!("cannot open file {}", input.display()))?;
            println!("Found {} datasets", reader.variables().len());
            size_stat(
                &reader,
                &input.display().to_string(),
                &mut std::io::stdout().lock(),
            )?;
        }
        Command::Concat { files, .. } => {
            let Some((output, input_paths)) = files.split_last() else {
                anyhow::bail!("missing output file");
            };
            if input_paths.len() < 2 {
                anyhow::bail!(
                    "concatenation needs at least 2 inputs and an output, got {} paths",
                    files.len()
                );
            }

            let mut inputs = Vec::with_capacity(input_paths.len());
            for path in input_paths {
                inputs.push(
                    MemContainer::open(path)
                        .with_context(|| format!("cannot open input file {}", path.display()))?,
                );
            }
            let mut writer = MemContainer::create(output);

            let command_line = std::env::args().collect::<Vec<String>>().join(" ");
            concat(&inputs, &mut writer, &command_line)?;
            log::info!("wrote {} - concatenation complete", output.display());
        }
    }

    Ok(())
}
