use clap::Parser;

mod align;
mod cli;
mod commands;
mod config;
mod media;
mod pipeline;
mod transcribe;
mod transcript;
mod ui;
mod workspace;

use cli::Cli;
use ui::{Level, OutputFormat, emit};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, true);

    if let Err(err) = commands::handle_command(cli).await {
        emit(Level::Error, "fatal", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}
