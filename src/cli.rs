use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mixin-metrics",
    version,
    about = "Parse Prometheus metric names from dashboard JSON and rule YAML"
)]
pub struct Cli {
    /// Input directory holding dashboards or rule files
    #[arg(long)]
    pub dir: PathBuf,

    /// Metrics report output file
    #[arg(long, default_value = "metrics_out.json")]
    pub out: PathBuf,

    /// Print every distinct metric on one line instead of writing the report
    #[arg(long, default_value_t = false)]
    pub print: bool,

    /// Record unreadable files and malformed rule files in the report instead of aborting
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Parse JSON dashboards in the input directory
    Dash,
    /// Parse YAML rule configs in the input directory
    Rules,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_flags_before_subcommand() {
        let cli = Cli::try_parse_from(["mixin-metrics", "--dir", "rules.d", "--print", "rules"])
            .expect("valid arguments");

        assert_eq!(cli.dir, PathBuf::from("rules.d"));
        assert_eq!(cli.out, PathBuf::from("metrics_out.json"));
        assert!(cli.print);
        assert!(!cli.keep_going);
        assert_eq!(cli.command, Commands::Rules);
    }

    #[test]
    fn keep_going_is_opt_in() {
        let cli = Cli::try_parse_from(["mixin-metrics", "--dir", "d", "--keep-going", "dash"])
            .expect("valid arguments");

        assert!(cli.keep_going);
        assert_eq!(cli.command, Commands::Dash);
    }

    #[test]
    fn requires_input_directory() {
        let result = Cli::try_parse_from(["mixin-metrics", "dash"]);
        assert!(result.is_err());
    }
}
