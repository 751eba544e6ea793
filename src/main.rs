#![forbid(unsafe_code)]

use assetpak::pak;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "assetpak",
    version,
    about = "Packs resource files into binary asset archives"
)]
struct Cli {
    /// Pack exactly these files into one archive (skips directory grouping).
    #[arg(short, long, num_args = 1..)]
    files: Vec<PathBuf>,

    /// Output file with --files, otherwise the base name for `<out>.bin` and `<out>-<dir>.bin`.
    #[arg(short, long, default_value = "assets")]
    out: String,

    /// Resource directory to walk when --files is not given.
    #[arg(short, long, default_value = "res")]
    root: PathBuf,

    /// Debug logging (identifier hashes, skipped lines).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Print the supported extensions and exit.
    #[arg(short, long, default_value_t = false)]
    extensions: bool,

    /// List the assets in an archive.
    #[arg(short, long, value_name = "ARCHIVE")]
    list: Option<PathBuf>,

    /// Check an archive's layout and hashes.
    #[arg(long, value_name = "ARCHIVE")]
    verify: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> pak::PakResult<()> {
    let registry = pak::EncoderRegistry::standard();

    if cli.extensions {
        println!("{}", pak::extensions_line(&registry));
        return Ok(());
    }
    if let Some(archive) = &cli.list {
        return pak::list(archive, cli.verbose);
    }
    if let Some(archive) = &cli.verify {
        return pak::verify(archive);
    }

    if cli.files.is_empty() {
        pak::pack_tree(&registry, &cli.root, &cli.out)?;
    } else {
        pak::pack_files(&registry, &cli.files, PathBuf::from(&cli.out).as_path())?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
