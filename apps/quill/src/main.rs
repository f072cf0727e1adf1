//! # Quill
//!
//! Terminal client for a shared blog. Every command starts a post
//! synchronization controller against the configured backend, runs, and
//! stops it again. `watch` keeps it running and prints each new snapshot.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use uuid::Uuid;

mod config;
mod render;
mod state;
mod telemetry;

use config::AppConfig;
use quill_core::SyncError;
use quill_shared::Notice;
use state::AppState;
use telemetry::TelemetryConfig;

/// Quill: read and write posts on a shared, live-updating blog
#[derive(Parser, Debug)]
#[command(name = "quill", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all posts, newest first
    List,

    /// Show one post in full
    Show { id: Uuid },

    /// Publish a new post as the signed-in user
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        author: String,
    },

    /// Change the title and content of one of your posts
    Edit {
        id: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },

    /// Permanently delete one of your posts
    Delete { id: Uuid },

    /// Print the post list every time it changes, until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let state = AppState::new(&config).await?;

    if let Err(e) = state.controller.start().await {
        // The snapshot is still usable without live updates
        tracing::warn!(error = %e, "Starting without change notifications");
    }

    let outcome = run(&state, cli.command).await;
    state.controller.stop().await;

    match outcome {
        Ok(Some(notice)) => {
            println!("{}", render::render_notice(&notice));
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", render::render_notice(&render::notice_for(&e)));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(state: &AppState, command: Command) -> Result<Option<Notice>, SyncError> {
    let controller = &state.controller;
    let viewer = state.viewer().await.map(|identity| identity.user_id);

    match command {
        Command::List => {
            let snapshot = controller.snapshot().await;
            if let Some(error) = snapshot.error {
                return Err(SyncError::FetchFailed(error));
            }
            print!("{}", render::render_list(&snapshot.posts, viewer));
            Ok(None)
        }
        Command::Show { id } => {
            let snapshot = controller.snapshot().await;
            let post = snapshot.find(id).ok_or(SyncError::PostNotFound(id))?;
            print!("{}", render::render_post(post, viewer));
            Ok(None)
        }
        Command::Create {
            title,
            content,
            author,
        } => {
            controller.create(&title, &content, &author).await?;
            Ok(Some(Notice::success("Post created")))
        }
        Command::Edit { id, title, content } => {
            controller.update(id, &title, &content).await?;
            Ok(Some(Notice::success("Post updated")))
        }
        Command::Delete { id } => {
            controller.delete(id).await?;
            Ok(Some(Notice::success("Post deleted")))
        }
        Command::Watch => {
            watch(state, viewer).await;
            Ok(None)
        }
    }
}

async fn watch(state: &AppState, viewer: Option<Uuid>) {
    let mut updates = state.controller.subscribe_updates();

    let current = state.controller.snapshot().await;
    println!("{}", render::render_status(&current));
    print!("{}", render::render_list(&current.posts, viewer));

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    println!("{}", render::render_status(&snapshot));
                    print!("{}", render::render_list(&snapshot.posts, viewer));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Skipped intermediate snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
        }
    }
}
