use std::net::SocketAddr;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use deskflow::{
    api,
    board::TaskBoard,
    config::Config,
    services::TaskRepository,
    types::{Category, FilterSelection, FilterValue, NewTask, Priority, StatusFilter, Task, TaskPatch},
};

#[derive(Parser)]
#[command(author, version, about = "DeskFlow task manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Bind address, overrides DESKFLOW_ADDR
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// List tasks with optional filters
    List {
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long, default_value = "all")]
        priority: FilterValue<Priority>,
        #[arg(long, default_value = "all")]
        category: FilterValue<Category>,
    },
    /// Add a new task
    Add {
        title: String,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<Category>,
        /// Due date as YYYY-MM-DD
        #[arg(short, long)]
        due: Option<NaiveDate>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Flip a task between active and completed
    Toggle { id: i64 },
    /// Change fields of an existing task
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Delete a task
    Delete { id: i64 },
}

fn print_task(task: &Task, today: NaiveDate) {
    let mark = if task.completed { "x" } else { " " };
    let due = task
        .due_label(today)
        .map(|label| format!(" due {}", label))
        .unwrap_or_default();
    println!(
        "[{}] #{} {} ({}, {}){}",
        mark, task.id, task.title, task.priority, task.category, due
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let repository = TaskRepository::from_config(&config)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Serve { addr } => {
            api::serve(addr.unwrap_or(config.addr), repository).await?;
        }
        Commands::List { status, priority, category } => {
            let mut board = TaskBoard::new(repository);
            board.set_filter(FilterSelection { status, priority, category });
            if let Err(e) = board.load().await {
                anyhow::bail!("{} ({})", board.load_error().unwrap_or("Failed to load tasks"), e);
            }

            let view = board.view();
            println!(
                "{} total, {} active, {} completed",
                view.counts.total, view.counts.active, view.counts.completed
            );
            for task in &view.visible {
                print_task(task, today);
            }
        }
        Commands::Add { title, priority, category, due, tags } => {
            let mut task = NewTask::new(title).with_tags(tags);
            if let Some(priority) = priority {
                task = task.with_priority(priority);
            }
            if let Some(category) = category {
                task = task.with_category(category);
            }
            if let Some(due) = due {
                task = task.with_due_date(due);
            }
            let mut board = TaskBoard::new(repository);
            let created = board.add(task).await?;
            println!("✅ Added task:");
            print_task(&created, today);
        }
        Commands::Toggle { id } => {
            let mut board = TaskBoard::new(repository);
            board.load().await?;
            let task = board.toggle(id).await?;
            print_task(&task, today);
        }
        Commands::Edit { id, title, priority, category, due, clear_due } => {
            let mut patch = TaskPatch::new();
            if let Some(title) = title {
                patch = patch.with_title(title);
            }
            if let Some(priority) = priority {
                patch = patch.with_priority(priority);
            }
            if let Some(category) = category {
                patch = patch.with_category(category);
            }
            if clear_due {
                patch = patch.with_due_date(None);
            } else if due.is_some() {
                patch = patch.with_due_date(due);
            }
            let mut board = TaskBoard::new(repository);
            let task = board.edit(id, patch).await?;
            print_task(&task, today);
        }
        Commands::Delete { id } => {
            let mut board = TaskBoard::new(repository);
            if board.remove(id).await? {
                println!("Deleted task #{}", id);
            } else {
                println!("Task #{} was not deleted", id);
            }
        }
    }

    Ok(())
}
