use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use gameshelf_gen::config::GeneratorConfig;

const USAGE: &str = "Usage: gameshelf-gen [--config <path>]

Fetches BoardGameGeek collections for every user in the owner map and
writes the joined game list (games.js by default).

Environment: BGG_TOKEN, GAMESHELF_OWNER_MAP, GAMESHELF_OUTPUT,
GAMESHELF_BGG_BASE_URL, RUST_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = match parse_args(std::env::args().skip(1)) {
        Ok(path) => path,
        Err(msg) => {
            eprintln!("{msg}\n\n{USAGE}");
            std::process::exit(2);
        },
    };

    let config = match GeneratorConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(2);
        },
    };

    match gameshelf_gen::run(&config).await {
        Ok(summary) => {
            tracing::info!(
                games = summary.games,
                skipped_users = summary.skipped_users.len(),
                unresolved = summary.unresolved_ids,
                "Done"
            );
        },
        Err(e) => {
            tracing::error!(error = %e, "Generation failed");
            std::process::exit(e.exit_code());
        },
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>, String> {
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().ok_or("Missing value for --config")?;
                config = Some(PathBuf::from(path));
            },
            "-h" | "--help" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            },
            other => return Err(format!("Unknown arg: {other}")),
        }
    }
    Ok(config)
}
