use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use tpac_format::Package;
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input TPAC package
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting existing files
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let package = Package::open(&self.file)?;

        for asset in &package.assets {
            if asset.segments.is_empty() {
                continue;
            }
            let asset_dir = self.directory.join(sanitize(&asset.name, asset.guid));
            std::fs::create_dir_all(&asset_dir)
                .into_diagnostic()
                .context(format!("creating {}", asset_dir.display()))?;

            let ctx = asset.meta.decode_context();
            for (i, segment) in asset.segments.iter().enumerate() {
                let bytes = segment.raw_data(package.source(), &ctx)?;
                let p = asset_dir.join(format!("{i}_{}.bin", segment.type_guid()));
                info!("writing {}", p.display());

                let mut out = if !self.overwrite {
                    File::create_new(&p)
                        .into_diagnostic()
                        .context(format!("creating {}", p.display()))?
                } else {
                    File::create(&p)
                        .into_diagnostic()
                        .context(format!("creating {}", p.display()))?
                };
                out.write_all(&bytes).into_diagnostic()?;
            }
        }
        Ok(())
    }
}

fn sanitize(name: &str, guid: tpac_format::Guid) -> String {
    if name.is_empty() {
        return guid.to_string();
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
