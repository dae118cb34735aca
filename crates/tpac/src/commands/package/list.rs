use std::path::PathBuf;

use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use tpac_format::Package;

#[derive(Args)]
pub struct ListArgs {
    /// An input TPAC package
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only list assets of this kind (e.g. "texture", "skeleton")
    #[arg(short, long)]
    kind: Option<String>,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let package = Package::open(&self.file)?;

        for asset in &package.assets {
            let kind = asset.meta.kind_name();
            if let Some(filter) = &self.kind {
                if !kind.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }

            let payload_bytes: u64 = asset
                .segments
                .iter()
                .map(|s| s.record.actual_size)
                .sum();
            println!(
                "{} {} {} ({} segments, {} bytes)",
                asset.guid.dimmed(),
                kind.green(),
                asset.name.bold(),
                asset.segments.len(),
                payload_bytes,
            );
        }

        Ok(())
    }
}
