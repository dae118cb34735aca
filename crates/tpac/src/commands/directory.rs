use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use tpac_format::manager::{LoadOptions, ProgressFn};
use tpac_format::AssetManager;
use tracing::info;

#[derive(clap::Subcommand)]
pub enum DirectoryCommands {
    /// Load every package under a directory and summarize its contents
    Scan(ScanArgs),
}

impl DirectoryCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            DirectoryCommands::Scan(scan) => scan.handle(),
        }
    }
}

#[derive(Args)]
pub struct ScanArgs {
    /// A directory containing TPAC packages
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Report progress per package file
    #[arg(long, default_value_t = false)]
    progress: bool,
}

impl ScanArgs {
    pub fn handle(&self) -> Result<()> {
        let options = if self.progress {
            let progress: ProgressFn = Box::new(|done, count, name, ok| {
                if ok {
                    info!("[{done}/{count}] {name}");
                } else {
                    info!("[{done}/{count}] {name} (failed, skipped)");
                }
                true
            });
            LoadOptions::builder().progress(progress).build()
        } else {
            LoadOptions::default()
        };
        let manager = AssetManager::load_directory_with(&self.directory, options)?;

        let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
        for package in manager.packages() {
            for asset in &package.assets {
                *kinds.entry(asset.meta.kind_name()).or_default() += 1;
            }
        }

        println!(
            "{}: {} packages, {} assets",
            "scanned".bold(),
            manager.packages().count(),
            manager.asset_count(),
        );
        for (kind, count) in kinds {
            println!("  {kind}: {count}");
        }

        Ok(())
    }
}
