use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "idm-admin")]
#[command(about = "Connects to the store and prints the employee and role inventory")]
pub struct Cli {
    /// Dotenv file holding the DB_* settings
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["idm-admin"]).unwrap();
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        assert!(!cli.json_logs);
    }

    #[test]
    fn explicit_flags() {
        let cli =
            Cli::try_parse_from(["idm-admin", "--env-file", "conf/dev.env", "--json-logs"]).unwrap();
        assert_eq!(cli.env_file, PathBuf::from("conf/dev.env"));
        assert!(cli.json_logs);
    }

    #[test]
    fn rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["idm-admin", "employee"]).is_err());
    }
}
