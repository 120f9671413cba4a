use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transfer_branch_labels::io::{ReadOptions, default_output_path, write_labeled_tree};
use transfer_branch_labels::render::{RenderOptions, render};
use transfer_branch_labels::transfer::transfer_files;
use transfer_branch_labels::TransferError;

/// Place branch labels (e.g. bootstrap or posterior support) from one or more
/// source trees onto the matching branches of a target tree.
/// Topologies need not be identical or nested.
#[derive(Parser, Debug)]
#[command(name = "transfer-branch-labels", version, about = "Transfer branch labels between phylogenetic trees")]
struct Args {
    /// Target tree (NEXUS or Newick, optionally .gz) receiving the labels
    target: PathBuf,

    /// Source trees supplying labels; source i fills label slot i
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Output path (default: <TARGET>_labeled.tre); `-` writes to stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Separator between the per-source values of a branch
    #[arg(short = 'd', long = "delimiter", default_value = "/")]
    delimiter: String,

    /// Written for branches without a matching labelled source branch
    #[arg(short = 'p', long = "placeholder", default_value = "-")]
    placeholder: String,

    /// Terminate the output tree with `;`
    #[arg(long = "semicolon", default_value_t = false)]
    semicolon: bool,

    /// Ignore NEXUS TRANSLATE blocks and keep the raw leaf tokens
    #[arg(long = "raw-taxa", default_value_t = false)]
    raw_taxa: bool,

    /// Quiet mode: suppresses progress messages on stdout
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.quiet);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(args: &Args) -> Result<(), TransferError> {
    let read_options = ReadOptions { translate: !args.raw_taxa };

    let t0 = Instant::now();
    let target = transfer_files(&args.target, &args.sources, &read_options, |slot, path, stats| {
        log_if(
            !args.quiet,
            format!(
                "source tree {slot} ({}): {} branches matched in target, {} not in target",
                path.display(),
                stats.matched,
                stats.unmatched
            ),
        );
    })?;
    info!("transferred labels from {} source trees in {:.3}s", args.sources.len(), t0.elapsed().as_secs_f64());

    let options = RenderOptions {
        delimiter: args.delimiter.clone(),
        placeholder: args.placeholder.clone(),
    };
    let mut text = render(&target, &options)?;
    if args.semicolon {
        text.push(';');
    }

    let t1 = Instant::now();
    let output = args.output.clone().unwrap_or_else(|| default_output_path(&args.target));
    write_labeled_tree(&output, &text)?;
    info!(output = %output.display(), "wrote labeled tree in {:.3}s", t1.elapsed().as_secs_f64());

    log_if(!args.quiet, "Execution complete".to_string());
    Ok(())
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn log_if(show: bool, msg: String) {
    if show { println!("{}", msg); }
}
