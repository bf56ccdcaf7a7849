use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "circle", version, about = "A tiny social network that lives in one file")]
pub struct Cli {
    /// Database file (overrides CIRCLE_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Sign in
    Login { email: String, password: String },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Edit the signed-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// List everyone else, marking friends
    Directory,
    /// Publish an update
    Post { content: String },
    /// Posts from you and your friends
    Feed,
    /// Like or unlike a post
    Like { post_id: String },
    /// Posts written by one user
    Posts { user_id: String },
    #[command(subcommand)]
    Friends(FriendsCommand),
    #[command(subcommand)]
    Messages(MessagesCommand),
}

impl Command {
    /// Commands reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Command::Register { .. } | Command::Login { .. })
    }
}

/// Friends and friend requests
#[derive(Debug, Subcommand)]
pub enum FriendsCommand {
    /// Friends plus pending requests
    List,
    Request { user_id: String },
    Accept { request_id: String },
    Decline { request_id: String },
    /// Withdraw a request
    Cancel { request_id: String },
    /// Unfriend someone
    Remove { user_id: String },
}

/// Direct messages
#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    Send { to: String, body: String },
    /// Show a conversation and mark it read
    Show { user_id: String },
    /// Mark a conversation read without showing it
    Read { user_id: String },
    /// One line per conversation
    Inbox,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_commands_are_public() {
        let cli = Cli::parse_from(["circle", "login", "a@b.c", "pw"]);
        assert!(cli.command.is_public());

        let cli = Cli::parse_from(["circle", "--db", "x.db", "friends", "request", "user_1"]);
        assert!(!cli.command.is_public());
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
