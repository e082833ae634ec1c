pub mod config;
pub mod error;

use gameshelf_bgg::BggClient;
use gameshelf_core::output::{render, write_atomic};
use gameshelf_core::{Catalog, Generation, Generator, OwnerMap};

use config::GeneratorConfig;
use error::AppError;

/// What a completed run wrote.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub games: usize,
    pub skipped_users: Vec<String>,
    pub unresolved_ids: usize,
}

/// Validate config, then generate against the live BGG API.
pub async fn run(config: &GeneratorConfig) -> Result<RunSummary, AppError> {
    config.validate()?;
    let client = BggClient::new(config.bgg.client_config())?;
    run_with_catalog(config, client).await
}

/// Load the owner map, generate through `catalog` and replace the output
/// file. The previous output is left untouched when any step fails.
pub async fn run_with_catalog<C: Catalog>(
    config: &GeneratorConfig,
    catalog: C,
) -> Result<RunSummary, AppError> {
    let owners = OwnerMap::load(&config.owner_map)?;
    tracing::info!(
        path = %config.owner_map.display(),
        users = owners.len(),
        "Loaded owner map"
    );

    let generator = Generator::new(catalog, config.generate_options());
    let Generation {
        records,
        skipped_users,
        unresolved_ids,
    } = generator.run(&owners).await?;

    let generated_on = config
        .output_options
        .stamp_date
        .then(|| chrono::Local::now().date_naive());
    let contents = render(&records, config.output_options.format, generated_on)?;
    write_atomic(&config.output, &contents)?;

    tracing::info!(
        path = %config.output.display(),
        games = records.len(),
        "Wrote output"
    );
    if !skipped_users.is_empty() {
        tracing::warn!(users = ?skipped_users, "Some collections could not be fetched");
    }

    Ok(RunSummary {
        games: records.len(),
        skipped_users,
        unresolved_ids: unresolved_ids.len(),
    })
}
