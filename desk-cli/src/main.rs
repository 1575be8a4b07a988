//! # Desk Planner CLI
//!
//! Headless command-line host for the desk planner.

use clap::Parser;
use desk_cli::{execute, CliArgs};
use desk_scene::{Editor, EditorConfig, HeadlessBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,desk_core=debug,desk_scene=debug"));

    // Logs go to stderr; stdout carries the JSON result.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = EditorConfig::from(&args);
    tracing::info!(
        "Starting desk planner (autosave: {}, data dir: {:?})",
        config.autosave,
        config.data_dir
    );

    let mut editor = Editor::new(&config)?;
    editor.init(Box::new(HeadlessBackend::new()), config.width, config.height)?;

    let layout = match &args.layout {
        Some(path) => {
            tracing::debug!("Reading layout from {}", path.display());
            Some(tokio::fs::read_to_string(path).await?)
        }
        None => None,
    };
    if editor.open(layout.as_deref())? {
        tracing::info!(
            "Opened \"{}\" with {} items",
            editor.store().document().document_name,
            editor.store().document().len()
        );
    }
    // Imported models in the opened layout resolve before the command runs.
    editor.settle().await;

    let result = execute(&mut editor, &args.command).await?;
    editor.frame()?;

    if let (Some(out), true) = (&args.out, args.command.is_mutation()) {
        tokio::fs::write(out, editor.store().export_json()?).await?;
        tracing::info!("Layout written to {}", out.display());
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    editor.dispose();
    Ok(())
}
