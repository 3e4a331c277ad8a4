//! CLI entry point for apa-gql.

pub mod commands;

use clap::{Parser, Subcommand};

/// APA GraphQL CLI
#[derive(Parser, Debug)]
#[command(name = "apa-gql", version, about = "Run authenticated queries against the APA GraphQL API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more queries (sequentially) and print the responses
    Query(QueryArgs),
    /// Show cached token status for the configured account
    Status,
    /// Forget cached tokens for the configured account
    Logout,
}

/// Arguments for `apa-gql query`.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// GraphQL documents to run, in order
    #[arg(required = true)]
    pub queries: Vec<String>,

    /// Variable as name=value (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Variables as a JSON object; merged after --var
    #[arg(long)]
    pub vars_json: Option<String>,

    /// Emit {"error": ...} for a failed query instead of stopping
    #[arg(long)]
    pub continue_on_fail: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_with_vars() {
        let cli = Cli::try_parse_from([
            "apa-gql",
            "query",
            "query($id: ID!) { team(id: $id) { name } }",
            "--var",
            "id=42",
            "--var",
            "note=a=b",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.queries.len(), 1);
                assert_eq!(
                    args.vars,
                    vec![
                        ("id".to_string(), "42".to_string()),
                        ("note".to_string(), "a=b".to_string())
                    ]
                );
                assert!(!args.continue_on_fail);
                assert!(args.vars_json.is_none());
            }
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[test]
    fn parse_batch_with_continue_on_fail() {
        let cli = Cli::try_parse_from([
            "apa-gql",
            "query",
            "{ a }",
            "{ b }",
            "--continue-on-fail",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.queries, vec!["{ a }", "{ b }"]);
                assert!(args.continue_on_fail);
            }
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[test]
    fn parse_status_and_logout() {
        let cli = Cli::try_parse_from(["apa-gql", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
        let cli = Cli::try_parse_from(["apa-gql", "logout"]).unwrap();
        assert!(matches!(cli.command, Commands::Logout));
    }

    #[test]
    fn parse_query_requires_a_document() {
        assert!(Cli::try_parse_from(["apa-gql", "query"]).is_err());
    }

    #[test]
    fn parse_var_rejects_missing_equals() {
        assert!(parse_var("id").is_err());
        assert!(parse_var("=5").is_err());
    }
}
