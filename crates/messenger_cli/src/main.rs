//! `messenger` command-line front end.
//!
//! # Responsibility
//! - Map flags and environment onto `StoreConfig` and logging setup.
//! - Call core services and render their records as plain text.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use messenger_core::{
    default_log_level, init_logging, init_stderr_logging, DbLocation, Message, MessageService,
    NewMessage, NewUser, ServiceError, Store, StoreConfig, User, UserId, UserService,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "messenger")]
#[command(version)]
#[command(about = "Store users and their messages in a local SQLite database")]
struct Cli {
    /// Path to the database file
    #[arg(long, env = "MESSENGER_DB", default_value = messenger_core::config::DEFAULT_DB_FILE_NAME, global = true)]
    db: PathBuf,

    /// Use a throwaway in-memory database instead of a file
    #[arg(long, global = true)]
    memory: bool,

    /// trace|debug|info|warn|error (defaults to debug in debug builds)
    #[arg(long, env = "MESSENGER_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema if it does not exist yet
    Init,

    /// Register a new user
    AddUser { username: String, email: String },

    /// Post a message as an existing user
    Post { user_id: UserId, text: String },

    /// List all users
    Users,

    /// List messages, oldest first
    Messages {
        /// Only show messages from this user
        #[arg(long)]
        user: Option<UserId>,
    },

    /// Message counts per user, busiest first
    Stats,

    /// Latest message of every user
    Latest,

    /// Delete a user and all of their messages
    DeleteUser { user_id: UserId },

    /// Seed sample users and messages, then print every view
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logging(&cli)?;

    let config = if cli.memory {
        StoreConfig::in_memory()
    } else {
        StoreConfig::file(&cli.db)
    };
    let store = Arc::new(
        Store::open(&config).context("failed to open messenger database")?,
    );
    let users = UserService::new(Arc::clone(&store));
    let messages = MessageService::new(Arc::clone(&store));

    run(cli.command, &store, &users, &messages)?;

    drop(users);
    drop(messages);
    if let Ok(store) = Arc::try_unwrap(store) {
        store.shutdown()?;
    }
    Ok(())
}

fn init_cli_logging(cli: &Cli) -> Result<()> {
    let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
    let initialized = match &cli.log_dir {
        Some(dir) => init_logging(level, &dir.to_string_lossy()),
        None => init_stderr_logging(level),
    };
    initialized.map_err(anyhow::Error::msg)
}

fn run(
    command: Commands,
    store: &Store,
    users: &UserService,
    messages: &MessageService,
) -> Result<()> {
    match command {
        Commands::Init => match store.location() {
            DbLocation::File(path) => println!("database ready at {}", path.display()),
            DbLocation::Memory => println!("in-memory database ready"),
        },
        Commands::AddUser { username, email } => {
            let user = users.create(&NewUser::new(username, email))?;
            print_user(&user);
        }
        Commands::Post { user_id, text } => {
            let message = messages.create(&NewMessage::new(user_id, text))?;
            print_message(&message);
        }
        Commands::Users => users.get_all()?.iter().for_each(print_user),
        Commands::Messages { user } => {
            let listed = match user {
                Some(user_id) => messages.get_by_user(user_id)?,
                None => messages.get_all()?,
            };
            listed.iter().for_each(print_message);
        }
        Commands::Stats => print_stats(messages)?,
        Commands::Latest => print_latest(messages)?,
        Commands::DeleteUser { user_id } => {
            if users.delete(user_id)? {
                println!("deleted user {user_id}");
            } else {
                println!("no user with id {user_id}");
            }
        }
        Commands::Demo => demo(users, messages)?,
    }
    Ok(())
}

fn demo(users: &UserService, messages: &MessageService) -> Result<()> {
    println!("== users");
    let alice = find_or_create(users, "alice123", "alice@example.com")?;
    let bob = find_or_create(users, "bob456", "bob@example.com")?;

    match users.create(&NewUser::new("alice123", "another@example.com")) {
        Err(err @ ServiceError::DuplicateUser(_)) => println!("expected rejection: {err}"),
        Err(err) => return Err(err.into()),
        Ok(user) => anyhow::bail!("duplicate username accepted as user {}", user.id),
    }

    println!("\n== posting");
    for (author, text) in [
        (&alice, "Hi everyone! How is it going?"),
        (&alice, "Who wants pizza? 🍕"),
        (&bob, "Hi Alice! All good here!"),
        (&bob, "I'm in for pizza! 🍕"),
        (&alice, "Great! Ordering now!"),
    ] {
        let message = messages.create(&NewMessage::new(author.id, text))?;
        print_message(&message);
    }

    println!("\n== all users");
    users.get_all()?.iter().for_each(print_user);

    println!("\n== all messages");
    messages.get_all()?.iter().for_each(print_message);

    println!("\n== messages from {}", alice.username);
    messages.get_by_user(alice.id)?.iter().for_each(print_message);

    println!("\n== stats");
    print_stats(messages)?;

    println!("\n== latest");
    print_latest(messages)
}

fn find_or_create(users: &UserService, username: &str, email: &str) -> Result<User> {
    let user = match users.get_by_username(username)? {
        Some(existing) => existing,
        None => users.create(&NewUser::new(username, email))?,
    };
    print_user(&user);
    Ok(user)
}

fn print_user(user: &User) {
    println!(
        "{:>4}  {:<20} {:<30} created_at={}",
        user.id, user.username, user.email, user.created_at
    );
}

fn print_message(message: &Message) {
    println!(
        "{:>4}  {:<20} {} ({})",
        message.id, message.user.username, message.message_text, message.created_at
    );
}

fn print_stats(messages: &MessageService) -> Result<()> {
    for stat in messages.get_conversation_stats()? {
        let last = stat
            .last_message_at
            .map_or_else(|| "never".to_string(), |at| at.to_string());
        println!(
            "{:<20} {:>5} messages, last: {}",
            stat.username, stat.message_count, last
        );
    }
    Ok(())
}

fn print_latest(messages: &MessageService) -> Result<()> {
    for latest in messages.get_latest_per_user()? {
        println!(
            "{:<20} '{}' ({})",
            latest.username, latest.message_text, latest.created_at
        );
    }
    Ok(())
}
