//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use security::TokenScope;

/// Token and field-encryption tooling for stored records.
#[derive(Debug, Parser)]
#[command(name = "sealctl", version, about)]
pub struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(long, global = true, env = "SEALCTL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Issue or check tokens.
    #[command(subcommand)]
    Token(TokenCommand),
    /// Encrypt declared fields of JSON-lines records.
    Encrypt(RecordArgs),
    /// Decrypt declared fields of JSON-lines records.
    Decrypt(RecordArgs),
    /// Re-encrypt records under a new application secret / database hash.
    Rekey(RekeyArgs),
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Print a token.
    Issue(TokenArgs),
    /// Check a token; exits 0 when valid, 1 when not.
    Check {
        #[command(flatten)]
        args: TokenArgs,
        /// Token to check.
        #[arg(long)]
        token: String,
    },
}

#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Context hash (user, session or database scope).
    #[arg(long)]
    pub context: String,
    /// Optional free-form suffix.
    #[arg(long, default_value = "")]
    pub suffix: String,
    /// Token flavour.
    #[arg(long, value_enum, default_value_t = Scope::Plain)]
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scope {
    /// Key-derivation token (hex); cannot be checked.
    Static,
    /// Verifiable token without a time component.
    Plain,
    /// Verifiable token valid for the current day.
    Day,
    /// Verifiable token valid for the current hour.
    Hour,
}

impl Scope {
    /// The verifiable scope, or `None` for static tokens.
    pub fn verifiable(self) -> Option<TokenScope> {
        match self {
            Scope::Static => None,
            Scope::Plain => Some(TokenScope::Unbounded),
            Scope::Day => Some(TokenScope::Day),
            Scope::Hour => Some(TokenScope::Hour),
        }
    }
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// JSON-lines input file; stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Field to transform (repeatable). Defaults to the configured fields of
    /// each record's model.
    #[arg(long = "field")]
    pub fields: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RekeyArgs {
    #[command(flatten)]
    pub records: RecordArgs,
    /// Environment variable holding the new application secret.
    #[arg(long, default_value = "NEW_APP_HASH")]
    pub new_app_hash_var: String,
    /// New database hash; defaults to the configured one.
    #[arg(long)]
    pub new_database_hash: Option<String>,
}
