pub mod extract;
pub mod info;
pub mod list;

#[derive(clap::Subcommand)]
pub enum PackageCommands {
    /// Show header information of a package
    Info(info::InfoArgs),
    /// List the assets of a package
    List(list::ListArgs),
    /// Extract segment payloads of a package into a directory
    Extract(extract::ExtractArgs),
}

impl PackageCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            PackageCommands::Info(info) => info.handle(),
            PackageCommands::List(list) => list.handle(),
            PackageCommands::Extract(extract) => extract.handle(),
        }
    }
}
