use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use wsarc::archive::{Archive, ExtractOptions};
use wsarc::filter::WildcardPattern;
use wsarc::reader::ContainerKind;

#[derive(Parser)]
#[command(name = "wsarc", about = "WorldShift XE/XP archive extractor")]
struct Cli {
    /// Enable debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List archive contents without extracting
    List {
        input: PathBuf,
        /// Only show files matching a wildcard like "*.dds"
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Extract an archive
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Only extract files matching a wildcard like "*.dds"
        #[arg(short, long)]
        filter: Option<String>,
        /// Report matching files without writing them
        #[arg(short, long)]
        list_only: bool,
    },
    /// Show container metadata
    Info {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    match cli.command {
        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, filter } => {
            let ar = Archive::open(&input)?;
            let pattern = filter.as_deref().map(WildcardPattern::new);
            println!("Archive: {}", input.display());
            println!("{:>10}  Name", "Size");
            let mut shown = 0usize;
            for entry in ar.entries()? {
                if let Some(p) = &pattern {
                    if !p.matches(wsarc::filter::base_name(&entry.path)) {
                        continue;
                    }
                }
                println!("{:>10}  {}", entry.file_size, entry.path);
                shown += 1;
            }
            println!("{shown} file(s), {} top-level entries", ar.entry_count());
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, filter, list_only } => {
            let mut ar = Archive::open(&input)?;
            let options = ExtractOptions {
                list_only,
                pattern: filter.as_deref().map(WildcardPattern::new),
            };
            let stats = ar.extract(&output_dir, &options)?;
            if list_only {
                println!("{} file(s) matched", stats.matched);
            } else {
                println!("{} file(s) extracted to {}", stats.written, output_dir.display());
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let ar = Archive::open(&input)?;
            let kind = match ar.kind() {
                ContainerKind::Plain => "plain (XP)",
                ContainerKind::Packed => "block-compressed (XE)",
            };
            println!("── WorldShift archive ──────────────────────────────────");
            println!("  Path              {}", input.display());
            println!("  Variant           {kind}");
            println!("  Logical length    {} B", ar.logical_len());
            println!("  Top-level entries {}", ar.entry_count());
            println!("  File entries      {}", ar.entries()?.len());
        }
    }

    Ok(())
}
