use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "records-ui")]
#[command(about = "Resolve persistent identifiers and render record pages")]
pub struct CliArgs {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON file with records and persistent identifiers to serve
    #[arg(short, long)]
    pub fixtures: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one request through the records UI and print the response
    Get {
        /// Request path, optionally with a query string
        path: String,

        /// Act as this logged-in user
        #[arg(long)]
        user: Option<String>,

        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// List the configured records endpoints
    Routes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        let args = CliArgs::try_parse_from([
            "records-ui",
            "--fixtures",
            "demo.json",
            "get",
            "/records/1",
            "--user",
            "alice",
        ])
        .unwrap();

        assert_eq!(args.fixtures.as_deref(), Some("demo.json"));
        match args.command {
            Command::Get { path, user, method } => {
                assert_eq!(path, "/records/1");
                assert_eq!(user.as_deref(), Some("alice"));
                assert_eq!(method, "GET");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_routes() {
        let args = CliArgs::try_parse_from(["records-ui", "-v", "routes"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Routes));
    }
}
