pub mod directory;
pub mod package;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle TPAC package files
    Package {
        #[command(subcommand)]
        command: package::PackageCommands,
    },
    /// Handle directories of TPAC packages
    Directory {
        #[command(subcommand)]
        command: directory::DirectoryCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Package { command } => command.handle(),
            Commands::Directory { command } => command.handle(),
        }
    }
}
