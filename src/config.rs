use std::path::PathBuf;

use crate::cli::{Cli, Commands};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DocumentMode {
    Dashboards,
    Rules,
}

impl DocumentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboards => "dash",
            Self::Rules => "rules",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutputTarget {
    File(PathBuf),
    Print,
}

#[derive(Clone, Debug)]
pub struct ExtractConfig {
    pub mode: DocumentMode,
    pub input_dir: PathBuf,
    pub output: OutputTarget,
    pub keep_going: bool,
}

impl ExtractConfig {
    pub fn from_cli(cli: Cli) -> Self {
        let mode = match cli.command {
            Commands::Dash => DocumentMode::Dashboards,
            Commands::Rules => DocumentMode::Rules,
        };
        let output = if cli.print {
            OutputTarget::Print
        } else {
            OutputTarget::File(cli.out)
        };

        Self {
            mode,
            input_dir: cli.dir,
            output,
            keep_going: cli.keep_going,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_flag_overrides_output_file() {
        let cli = Cli {
            dir: PathBuf::from("dashboards"),
            out: PathBuf::from("ignored.json"),
            print: true,
            keep_going: false,
            command: Commands::Dash,
        };

        let config = ExtractConfig::from_cli(cli);
        assert_eq!(config.mode, DocumentMode::Dashboards);
        assert_eq!(config.output, OutputTarget::Print);
        assert_eq!(config.input_dir, PathBuf::from("dashboards"));
    }

    #[test]
    fn output_file_is_used_without_print() {
        let cli = Cli {
            dir: PathBuf::from("rules"),
            out: PathBuf::from("out/metrics.json"),
            print: false,
            keep_going: true,
            command: Commands::Rules,
        };

        let config = ExtractConfig::from_cli(cli);
        assert_eq!(config.mode, DocumentMode::Rules);
        assert_eq!(
            config.output,
            OutputTarget::File(PathBuf::from("out/metrics.json"))
        );
        assert!(config.keep_going);
    }
}
