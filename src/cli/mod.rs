//! CLI interface for Quizdesk

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::auth::Role;

#[derive(Parser)]
#[command(name = "quizdesk")]
#[command(author = "Krakaw")]
#[command(version)]
#[command(about = "Sign in to the quiz platform and check role-based access", long_about = None)]
pub struct Cli {
    /// Use this config file instead of searching for quizdesk.toml
    #[arg(long, global = true, env = "QUIZDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default quizdesk.toml in the current directory
    Init,

    /// Sign in and store the session
    Login {
        /// Account email (prompted for when omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Account password (prompted for when omitted)
        #[arg(short, long, env = "QUIZDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Check whether the current session may open a route
    Open {
        /// Route to check, e.g. /admin/quizzes
        route: String,

        /// Roles admitted to the route (repeatable); any signed-in user when omitted
        #[arg(short, long = "allow", value_parser = parse_role)]
        allow: Vec<Role>,
    },

    /// Print the claims carried by a token without verifying it
    Decode {
        /// The bearer token
        token: String,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// GET a backend resource with the stored session
    Fetch {
        /// Resource path, e.g. /quiz or /users/3
        path: String,

        /// Roles admitted to the resource (repeatable)
        #[arg(short, long = "allow", value_parser = parse_role)]
        allow: Vec<Role>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

fn parse_role(value: &str) -> Result<Role, String> {
    match value.parse::<Role>().unwrap_or(Role::Unknown) {
        Role::Unknown => Err(format!(
            "unknown role '{}' (expected STUDENT, INSTRUCTOR or ADMIN)",
            value
        )),
        role => Ok(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin"), Ok(Role::Admin));
        assert!(parse_role("janitor").is_err());
    }

    #[test]
    fn test_open_collects_allow_list() {
        let cli = Cli::try_parse_from([
            "quizdesk", "open", "/grading", "--allow", "INSTRUCTOR", "-a", "admin",
        ])
        .unwrap();
        match cli.command {
            Commands::Open { route, allow } => {
                assert_eq!(route, "/grading");
                assert_eq!(allow, vec![Role::Instructor, Role::Admin]);
            }
            _ => panic!("expected open"),
        }
    }

    #[test]
    fn test_decode_defaults_to_json() {
        let cli = Cli::try_parse_from(["quizdesk", "decode", "a.b.c"]).unwrap();
        match cli.command {
            Commands::Decode { token, format } => {
                assert_eq!(token, "a.b.c");
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected decode"),
        }

        let cli = Cli::try_parse_from(["quizdesk", "decode", "a.b.c", "-f", "table"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Decode { format: OutputFormat::Table, .. }
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
