//! Core CLI definitions

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gtasave")]
#[command(about = "Embed compiled scripts into San Andreas saves", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub embed: EmbedArgs,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Arguments for the default embed operation
#[derive(Args, Debug, Clone, Default)]
pub struct EmbedArgs {
    /// <SAVE> [SCRIPT] <OUTPUT>; without a script the save is only re-encoded
    #[arg(value_name = "PATHS", num_args = 2..=3, required = true)]
    pub paths: Vec<PathBuf>,

    /// Size of the global store after expansion, in bytes
    #[arg(long, value_name = "BYTES")]
    pub store_size: Option<u32>,

    /// Name of the embedded script (8 characters at most)
    #[arg(long)]
    pub name: Option<String>,

    /// Sanny Builder opcode INI merged over the built-in table
    #[arg(long, value_name = "INI")]
    pub opcodes: Option<PathBuf>,

    /// Fail if the script cannot be fully decoded for relocation
    #[arg(long)]
    pub strict: bool,

    /// Do not back up an existing output file
    #[arg(long)]
    pub no_backup: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl EmbedArgs {
    pub fn save(&self) -> &Path {
        &self.paths[0]
    }

    pub fn script(&self) -> Option<&Path> {
        (self.paths.len() == 3).then(|| self.paths[1].as_path())
    }

    pub fn output(&self) -> &Path {
        &self.paths[self.paths.len() - 1]
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the platform, global store and running scripts of a save
    #[command(visible_alias = "i")]
    Inspect {
        /// Path to the save file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Default opcode INI
        #[arg(long, value_name = "INI")]
        opcodes: Option<PathBuf>,

        /// Default global store size in bytes
        #[arg(long, value_name = "BYTES")]
        store_size: Option<u32>,

        /// Default script name
        #[arg(long)]
        name: Option<String>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_embed_with_script() {
        let cli = Cli::try_parse_from([
            "gtasave",
            "in.b",
            "code.cs",
            "out.b",
            "--store-size",
            "64000",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.embed.save(), Path::new("in.b"));
        assert_eq!(cli.embed.script(), Some(Path::new("code.cs")));
        assert_eq!(cli.embed.output(), Path::new("out.b"));
        assert_eq!(cli.embed.store_size, Some(64_000));
    }

    #[test]
    fn test_rewrite_without_script() {
        let cli = Cli::try_parse_from(["gtasave", "in.b", "out.b"]).unwrap();
        assert_eq!(cli.embed.script(), None);
        assert_eq!(cli.embed.output(), Path::new("out.b"));
    }

    #[test]
    fn test_wrong_argument_count() {
        let too_many = ["gtasave", "a", "b", "c", "d"];
        assert!(Cli::try_parse_from(["gtasave", "in.b"]).is_err());
        assert!(Cli::try_parse_from(too_many).is_err());
        assert!(Cli::try_parse_from(["gtasave"]).is_err());
    }

    #[test]
    fn test_inspect_subcommand() {
        let cli = Cli::try_parse_from(["gtasave", "inspect", "in.b", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Inspect { json: true, .. })
        ));
    }
}
