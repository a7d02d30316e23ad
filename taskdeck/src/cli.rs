//! Command-line front end.
//!
//! Every command is a thin layer over [`Session`]: arguments are turned
//! into the same JSON payloads the HTTP API accepts and validated locally
//! with the shared proto validators before anything is sent.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use taskdeck_proto::account::{LoginRequest, RegisterRequest};
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::ListParams;
use taskdeck_proto::stats::TaskStats;
use taskdeck_proto::task::{Task, TaskId, TaskStatus};

use crate::client::ClientError;
use crate::config::{self, CliArgs, ClientConfig, ConfigError};
use crate::events::EventStream;
use crate::insights::{self, Insights};
use crate::session::Session;

/// Personal task manager.
#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about)]
pub struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    pub global: CliArgs,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and sign in.
    Register {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Email address.
        #[arg(long)]
        email: String,
        /// Password.
        #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in and save the token.
    Login {
        /// Email address.
        #[arg(long)]
        email: String,
        /// Password.
        #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Revoke the saved token.
    Logout,
    /// Show the signed-in account.
    Whoami,
    /// List tasks.
    List {
        /// Only tasks with this status.
        #[arg(long)]
        status: Option<String>,
        /// Only tasks with this priority.
        #[arg(long)]
        priority: Option<String>,
        /// Sort by `createdAt`, `dueDate`, `priority` or `title`.
        #[arg(long)]
        sort: Option<String>,
        /// `asc` or `desc`.
        #[arg(long)]
        order: Option<String>,
    },
    /// Show one task.
    Show {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Create a task.
    Add {
        /// Title.
        title: String,
        /// Longer description.
        #[arg(long, short)]
        description: Option<String>,
        /// `low`, `medium` or `high`.
        #[arg(long, short)]
        priority: Option<String>,
        /// `todo`, `in-progress` or `completed`.
        #[arg(long, short)]
        status: Option<String>,
        /// Deadline, `YYYY-MM-DD` or RFC 3339.
        #[arg(long)]
        due: Option<String>,
        /// Label (repeatable).
        #[arg(long = "tag", short)]
        tags: Vec<String>,
    },
    /// Change fields of a task.
    Edit {
        /// Task id or unique id prefix.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long, short)]
        description: Option<String>,
        /// New priority.
        #[arg(long, short)]
        priority: Option<String>,
        /// New status.
        #[arg(long, short)]
        status: Option<String>,
        /// New deadline.
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the deadline.
        #[arg(long)]
        clear_due: bool,
        /// Replacement labels (repeatable).
        #[arg(long = "tag", short, conflicts_with = "clear_tags")]
        tags: Vec<String>,
        /// Remove every label.
        #[arg(long)]
        clear_tags: bool,
    },
    /// Change only the status of a task.
    Status {
        /// Task id or unique id prefix.
        id: String,
        /// `todo`, `in-progress` or `completed`.
        status: String,
    },
    /// Delete a task.
    Rm {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Show counts, completion rate, overdue and due-today figures.
    Stats,
    /// Print task changes made by other sessions as they happen.
    Watch,
}

/// Errors surfaced to the user by [`run`].
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A request or local validation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Configuration or the saved token could not be used.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No token was given or saved.
    #[error("not signed in; run `taskdeck login` first")]
    NotSignedIn,

    /// The id argument did not pick out exactly one task.
    #[error("{0}")]
    TaskRef(String),

    /// `edit` was given nothing to change.
    #[error("nothing to change")]
    EmptyEdit,
}

/// Runs one command to completion.
///
/// # Errors
///
/// Returns [`CliError`] describing why the command failed.
pub async fn run(command: Command, config: &ClientConfig) -> Result<(), CliError> {
    let mut session = Session::new(config)?;
    match command {
        Command::Register {
            name,
            email,
            password,
        } => {
            let request = RegisterRequest {
                name,
                email,
                password,
            };
            request.validate().map_err(ClientError::from)?;
            let user = session.register(&request).await?;
            remember_token(config, &session)?;
            println!("Registered and signed in as {} <{}>", user.name, user.email);
        }
        Command::Login { email, password } => {
            let user = session.login(&LoginRequest { email, password }).await?;
            remember_token(config, &session)?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            match resume(&mut session, config).await {
                Ok(()) => session.logout().await,
                Err(CliError::NotSignedIn | CliError::Client(ClientError::Unauthorized)) => {}
                Err(e) => return Err(e),
            }
            forget_token(config)?;
            println!("Signed out");
        }
        command => {
            resume(&mut session, config).await?;
            execute(command, &mut session, config).await?;
        }
    }
    Ok(())
}

async fn execute(
    command: Command,
    session: &mut Session,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let now = Utc::now();
    match command {
        Command::Whoami => {
            if let Some(user) = session.user() {
                println!("{} <{}>  {}", user.name, user.email, user.id);
            }
        }
        Command::List {
            status,
            priority,
            sort,
            order,
        } => {
            let query = ListParams {
                status,
                priority,
                sort,
                order,
            }
            .parse()
            .map_err(ClientError::from)?;
            let tasks = session.list_tasks(&query).await?;
            print!("{}", format_list(&tasks, now, config.offset()));
        }
        Command::Show { id } => {
            let id = resolve_id(session, &id)?;
            let task = session.get_task(&id).await?;
            print!("{}", format_task(&task, now, config.offset()));
        }
        Command::Add {
            title,
            description,
            priority,
            status,
            due,
            tags,
        } => {
            let mut body = Map::new();
            body.insert("title".into(), json!(title));
            insert_opt(&mut body, "description", description);
            insert_opt(&mut body, "priority", priority);
            insert_opt(&mut body, "status", status);
            insert_opt(&mut body, "dueDate", due);
            if !tags.is_empty() {
                body.insert("tags".into(), json!(tags));
            }
            let input = NewTask::from_json(&Value::Object(body)).map_err(ClientError::from)?;
            let task = session.create_task(&input).await?;
            println!("Created {}", format_line(&task, now, config.offset()));
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            status,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let mut body = Map::new();
            insert_opt(&mut body, "title", title);
            insert_opt(&mut body, "description", description);
            insert_opt(&mut body, "priority", priority);
            insert_opt(&mut body, "status", status);
            if clear_due {
                body.insert("dueDate".into(), Value::Null);
            } else {
                insert_opt(&mut body, "dueDate", due);
            }
            if clear_tags {
                body.insert("tags".into(), json!([]));
            } else if !tags.is_empty() {
                body.insert("tags".into(), json!(tags));
            }
            let patch = TaskPatch::from_json(&Value::Object(body)).map_err(ClientError::from)?;
            if patch.is_empty() {
                return Err(CliError::EmptyEdit);
            }
            let id = resolve_id(session, &id)?;
            let task = session.update_task(&id, &patch).await?;
            println!("Updated {}", format_line(&task, now, config.offset()));
        }
        Command::Status { id, status } => {
            let patch =
                TaskPatch::status_from_json(&json!({ "status": status })).map_err(ClientError::from)?;
            let status = patch.status.unwrap_or_default();
            let id = resolve_id(session, &id)?;
            let task = session.set_status(&id, status).await?;
            println!("Updated {}", format_line(&task, now, config.offset()));
        }
        Command::Rm { id } => {
            let id = resolve_id(session, &id)?;
            session.delete_task(&id).await?;
            println!("Deleted {id}");
        }
        Command::Stats => {
            let server = session.stats().await?;
            let local = session
                .cache()
                .map(|cache| cache.insights(now, config.offset()))
                .unwrap_or_default();
            print!("{}", format_stats(&server, &local));
        }
        Command::Watch => watch(session, config).await?,
        Command::Register { .. } | Command::Login { .. } | Command::Logout => {}
    }
    Ok(())
}

async fn watch(session: &mut Session, config: &ClientConfig) -> Result<(), CliError> {
    let token = session.token().ok_or(CliError::NotSignedIn)?.to_string();
    let mut events = EventStream::connect(config, &token).await?;
    println!("Watching for changes (Ctrl-C to stop)");

    while let Some(event) = events.next().await {
        let event = event?;
        session.refresh().await?;
        let title = session
            .cache()
            .and_then(|cache| cache.get(event.task_id()))
            .map_or_else(String::new, |task| format!("  {}", task.title));
        println!("{:<13} {}{title}", event.name(), short_id(event.task_id()));
    }
    println!("Server closed the notification channel");
    events.close().await;
    Ok(())
}

/// Signs `session` in with the explicit token or the saved one.
async fn resume(session: &mut Session, config: &ClientConfig) -> Result<(), CliError> {
    let saved = match (&config.token, &config.token_file) {
        (Some(_), _) | (None, None) => None,
        (None, Some(path)) => config::load_token(path)?,
    };
    let token = config
        .token
        .as_deref()
        .or(saved.as_deref())
        .ok_or(CliError::NotSignedIn)?;

    match session.resume(token).await {
        Ok(_) => Ok(()),
        Err(ClientError::Unauthorized) if saved.is_some() => {
            tracing::info!("saved token rejected, removing it");
            forget_token(config)?;
            Err(CliError::Client(ClientError::Unauthorized))
        }
        Err(e) => Err(e.into()),
    }
}

fn remember_token(config: &ClientConfig, session: &Session) -> Result<(), CliError> {
    if let (Some(path), Some(token)) = (&config.token_file, session.token()) {
        config::save_token(path, token)?;
    }
    Ok(())
}

fn forget_token(config: &ClientConfig) -> Result<(), CliError> {
    if let Some(path) = &config.token_file {
        config::clear_token(path)?;
    }
    Ok(())
}

/// Turns a full id or a unique prefix of a cached id into a [`TaskId`].
fn resolve_id(session: &Session, input: &str) -> Result<TaskId, CliError> {
    if let Ok(id) = input.parse() {
        return Ok(id);
    }
    let matches = session
        .cache()
        .map(|cache| cache.ids_with_prefix(input))
        .unwrap_or_default();
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => Err(CliError::TaskRef(format!("no task matches '{input}'"))),
        _ => Err(CliError::TaskRef(format!(
            "'{input}' matches {} tasks",
            matches.len()
        ))),
    }
}

fn insert_opt(body: &mut Map<String, Value>, field: &str, value: Option<String>) {
    if let Some(value) = value {
        body.insert(field.to_string(), Value::String(value));
    }
}

fn short_id(id: &TaskId) -> String {
    id.to_string().chars().take(8).collect()
}

fn marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    }
}

/// One-line summary: short id, status, priority, title, deadline.
///
/// The deadline is shown as a calendar date at `offset`.
#[must_use]
pub fn format_line(task: &Task, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let mut line = format!(
        "{} {} {:<6} {}",
        short_id(&task.id),
        marker(task.status),
        task.priority.as_str(),
        task.title
    );
    if let Some(due) = task.due_date {
        let _ = write!(
            line,
            "  (due {})",
            due.with_timezone(&offset).format("%Y-%m-%d")
        );
        if insights::is_overdue(task, now) {
            line.push_str(" OVERDUE");
        }
    }
    line
}

/// One line per task, or a note when there are none.
#[must_use]
pub fn format_list(tasks: &[Task], now: DateTime<Utc>, offset: FixedOffset) -> String {
    if tasks.is_empty() {
        return "No tasks\n".to_string();
    }
    tasks
        .iter()
        .map(|task| format_line(task, now, offset) + "\n")
        .collect()
}

/// Every field of a task.
#[must_use]
pub fn format_task(task: &Task, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", task.title);
    let _ = writeln!(out, "  id:        {}", task.id);
    let _ = writeln!(out, "  status:    {}", task.status);
    let _ = writeln!(out, "  priority:  {}", task.priority);
    if !task.description.is_empty() {
        let _ = writeln!(out, "  about:     {}", task.description);
    }
    if let Some(due) = task.due_date {
        let mut flags = String::new();
        if insights::is_due_today(task, now, offset) {
            flags.push_str(" today");
        }
        if insights::is_overdue(task, now) {
            flags.push_str(" overdue");
        }
        let _ = writeln!(
            out,
            "  due:       {}{flags}",
            due.with_timezone(&offset).format("%Y-%m-%d %H:%M")
        );
    }
    if !task.tags.is_empty() {
        let _ = writeln!(out, "  tags:      {}", task.tags.join(", "));
    }
    let _ = writeln!(
        out,
        "  created:   {}",
        task.created_at.with_timezone(&offset).format("%Y-%m-%d %H:%M")
    );
    if let Some(done) = task.completed_at {
        let _ = writeln!(
            out,
            "  completed: {}",
            done.with_timezone(&offset).format("%Y-%m-%d %H:%M")
        );
    }
    out
}

/// Server counts followed by the locally computed dashboard figures.
#[must_use]
pub fn format_stats(stats: &TaskStats, local: &Insights) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total:        {}", stats.total);
    let _ = writeln!(out, "  todo:       {}", stats.todo);
    let _ = writeln!(out, "  doing:      {}", stats.in_progress);
    let _ = writeln!(out, "  completed:  {}", stats.completed);
    let _ = writeln!(
        out,
        "Priority:     high {} / medium {} / low {}",
        stats.high_priority, stats.medium_priority, stats.low_priority
    );
    let _ = writeln!(
        out,
        "Completion:   {}%",
        insights::completion_rate(stats.completed, stats.total)
    );
    let _ = writeln!(out, "Overdue:      {}", local.overdue);
    let _ = writeln!(out, "Due today:    {}", local.due_today);
    out
}
