use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "stackfit",
    about = "Detect a project's tech stack and find the rule templates that fit it",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file [default: ./.stackfit/config.toml, fallback ~/.config/stackfit/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging and per-category score details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the summary line
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the tech stack of a project
    Detect(DetectArgs),

    /// Rank catalog rules against a project's tech stack
    Match(MatchArgs),

    /// Maintain rule catalogs
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Project path to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Run extractors in parallel
    #[arg(long)]
    pub concurrent: bool,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Project path to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Local catalog file (overrides the config)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Remote catalog URL; enables remote rules
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Minimum score in [0, 1]
    #[arg(long, value_name = "F")]
    pub min_score: Option<f64>,

    /// Leave out the built-in rules
    #[arg(long)]
    pub no_builtin: bool,

    /// Leave out the local catalog
    #[arg(long)]
    pub no_local: bool,

    /// Language for rule names and descriptions
    #[arg(long, value_name = "LANG")]
    pub lang: Option<String>,

    /// Run extractors in parallel
    #[arg(long)]
    pub concurrent: bool,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Build catalog entries from a directory of .mdc rule sets
    Index {
        rules_dir: PathBuf,

        /// Catalog to extend; its entries are kept
        #[arg(long, value_name = "FILE")]
        existing: Option<PathBuf>,

        /// Write here instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Report rule paths that do not exist
    Check {
        catalog: PathBuf,

        /// Directory rule paths resolve against [default: the catalog's directory]
        #[arg(long, value_name = "DIR")]
        base_dir: Option<PathBuf>,
    },

    /// Turn plain-string names and descriptions into per-language maps
    I18n {
        catalog: PathBuf,

        /// Comma-separated language codes
        #[arg(long, value_delimiter = ',', default_value = "zh,en")]
        langs: Vec<String>,

        /// Write here instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_match_flags() {
        let cli = Cli::parse_from([
            "stackfit",
            "match",
            "web",
            "--limit",
            "3",
            "--no-builtin",
            "--report",
            "json",
            "--verbose",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Match(args) => {
                assert_eq!(args.path, PathBuf::from("web"));
                assert_eq!(args.limit, Some(3));
                assert!(args.no_builtin);
                assert_eq!(args.report, ReportFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_i18n_langs_split() {
        let cli = Cli::parse_from(["stackfit", "catalog", "i18n", "meta.json", "--langs", "ja,en"]);
        match cli.command {
            Command::Catalog(CatalogCommand::I18n { langs, .. }) => {
                assert_eq!(langs, vec!["ja", "en"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
