use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use client::{ApiClient, AuthOutcome, ChatClient, ClientError, FileSlot, Session, render};
use contract::{NutritionPlanEntry, RegisterRequest};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `raha login` first")]
    NotLoggedIn,
    #[error("{0}")]
    AuthFailed(String),
    #[error("cancelled")]
    Cancelled,
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "raha", about = "Raha fitness API command line")]
struct Cli {
    #[arg(long, env = "RAHA_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// Where the session token is kept between runs.
    #[arg(long, env = "RAHA_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Log HTTP and session activity to stderr.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is up.
    Ping,
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "RAHA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "RAHA_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = contract::DEFAULT_LANGUAGE)]
        language: String,
    },
    Logout,
    Whoami {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Ask the fitness coach.
    Chat {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Ask the action planner and show what it did.
    Plan {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        /// Continue an earlier planner conversation.
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the meals of a nutrition plan in day order.
    Nutrition {
        #[arg(long = "type", default_value = contract::DEFAULT_NUTRITION_PLAN_TYPE)]
        plan_type: String,
    },
    /// Show past coach conversations, newest first.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

struct CliContext {
    session: Session,
}

fn default_token_file() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".raha_token")
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    }

    let token_file = cli.token_file.unwrap_or_else(default_token_file);
    let session = Session::new(&cli.base_url, Arc::new(FileSlot::new(token_file)))?;
    let ctx = CliContext { session };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Login { username, password } => {
            let outcome = ctx.session.login(&username, &password).await;
            report_auth(outcome)
        }
        Command::Register { username, email, password, language } => {
            let request = RegisterRequest { username, email, password, language, profile: None };
            let outcome = ctx.session.register(&request).await;
            report_auth(outcome)
        }
        Command::Logout => {
            ctx.session.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami { json } => run_whoami(&ctx, json).await,
        Command::Chat { message } => run_chat(&ctx, &message.join(" ")).await,
        Command::Plan { message, session_id, json } => run_plan(&ctx, &message.join(" "), session_id, json).await,
        Command::Nutrition { plan_type } => run_nutrition(&ctx, &plan_type).await,
        Command::History { limit } => run_history(&ctx, limit).await,
    }
}

fn report_auth(outcome: AuthOutcome) -> Result<(), CliError> {
    match outcome {
        AuthOutcome::Success { user } => {
            println!("logged in as {} ({})", user.username, user.role.as_str());
            Ok(())
        }
        AuthOutcome::Failure { error } => Err(CliError::AuthFailed(error)),
        AuthOutcome::Cancelled => Err(CliError::Cancelled),
    }
}

/// Resolve the stored token; every command below needs a user.
async fn require_login(ctx: &CliContext) -> Result<(), CliError> {
    let snapshot = ctx.session.initialize().await;
    if snapshot.is_authenticated() { Ok(()) } else { Err(CliError::NotLoggedIn) }
}

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    let health = ApiClient::new(ctx.session.http().clone()).health().await?;
    println!("{}", health.status);
    Ok(())
}

async fn run_whoami(ctx: &CliContext, json: bool) -> Result<(), CliError> {
    require_login(ctx).await?;
    let detail = ApiClient::new(ctx.session.http().clone()).current_user().await?;
    if json {
        return print_json(&detail);
    }
    let user = &detail.user;
    println!("{} <{}>", user.username, user.email);
    println!("role: {}", user.role.as_str());
    if let Some(language) = &user.language {
        println!("language: {language}");
    }
    Ok(())
}

async fn run_chat(ctx: &CliContext, message: &str) -> Result<(), CliError> {
    require_login(ctx).await?;
    let reply = ChatClient::new(ctx.session.http().clone()).send(message).await?;
    println!("{reply}");
    Ok(())
}

async fn run_plan(ctx: &CliContext, message: &str, session_id: Option<String>, json: bool) -> Result<(), CliError> {
    require_login(ctx).await?;
    let http = ctx.session.http().clone();
    let chat = match session_id {
        Some(id) => ChatClient::resume(http, id),
        None => ChatClient::new(http),
    };
    let plan = chat.plan(message).await?;
    if json {
        return print_json(&plan);
    }
    println!("{}", render::render_plan(&plan));
    if let Some(id) = chat.session_id() {
        eprintln!("session: {id}");
    }
    Ok(())
}

async fn run_history(ctx: &CliContext, limit: usize) -> Result<(), CliError> {
    require_login(ctx).await?;
    let entries = ApiClient::new(ctx.session.http().clone()).chat_history().await?;
    for entry in entries.iter().take(limit) {
        println!("[{}] you: {}", entry.timestamp, entry.message);
        println!("{:>width$} coach: {}\n", "", entry.response, width = entry.timestamp.len() + 2);
    }
    Ok(())
}

async fn run_nutrition(ctx: &CliContext, plan_type: &str) -> Result<(), CliError> {
    require_login(ctx).await?;
    let entries = ApiClient::new(ctx.session.http().clone()).nutrition_plans(plan_type).await?;
    if entries.is_empty() {
        println!("no {plan_type} nutrition plan yet");
    }
    for entry in &entries {
        println!("{}", meal_line(entry));
    }
    Ok(())
}

fn meal_line(entry: &NutritionPlanEntry) -> String {
    let mut line = format!("day {:>2}  {}", entry.day, entry.food_item);
    if let Some(meal) = &entry.meal_type {
        line.push_str(&format!(" ({meal})"));
    }
    if let Some(calories) = entry.calories {
        line.push_str(&format!(", {calories} kcal"));
    }
    line
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
