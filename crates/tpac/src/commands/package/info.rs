use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use tpac_format::Package;

#[derive(Args)]
pub struct InfoArgs {
    /// An input TPAC package
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let package = Package::open(&self.file)?;

        println!("{}: {}", "package".bold(), package.guid);
        println!("{}: {}", "version".bold(), package.version);
        println!("{}: {}", "assets".bold(), package.assets.len());

        let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
        let mut segments = 0usize;
        for asset in &package.assets {
            *kinds.entry(asset.meta.kind_name()).or_default() += 1;
            segments += asset.segments.len();
        }
        println!("{}: {}", "segments".bold(), segments);
        for (kind, count) in kinds {
            println!("  {kind}: {count}");
        }

        Ok(())
    }
}
