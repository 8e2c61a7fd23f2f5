use anyhow::{bail, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use storefront_rec::config::{CatalogBackend, StorageBackend};
use storefront_rec::services::catalog::{CatalogFixture, RedisCatalog};
use storefront_rec::{init_tracing, AppState, Config, InteractionType};
use tracing::{info, warn};

/// Relative frequency of each interaction kind in generated traffic.
const KIND_MIX: [(InteractionType, u32); 6] = [
    (InteractionType::View, 60),
    (InteractionType::Like, 12),
    (InteractionType::AddToCart, 12),
    (InteractionType::RemoveFromCart, 5),
    (InteractionType::Rating, 4),
    (InteractionType::Purchase, 7),
];

#[derive(Parser, Debug)]
#[command(author, version, about = "Load catalog fixtures and synthetic interactions", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "fixtures/catalog.json")]
    fixture: String,

    /// Synthetic interactions to record per fixture user.
    #[arg(short, long, default_value_t = 20)]
    interactions: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::load_or_default(&args.config)?;
    let fixture = CatalogFixture::from_file(&args.fixture)?;
    if fixture.products.is_empty() {
        bail!("fixture {} contains no products", args.fixture);
    }

    match config.catalog.backend {
        CatalogBackend::Redis => {
            RedisCatalog::connect(&config.catalog.redis_url)
                .await?
                .import(&fixture)
                .await?;
        }
        CatalogBackend::Memory => {
            config.catalog.fixture_path = Some(args.fixture.clone());
        }
    }
    if config.storage.backend == StorageBackend::Memory {
        warn!("Interaction store is in-memory; generated interactions are discarded on exit");
    }

    let state = AppState::new(config).await?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut recorded = 0usize;

    for user_id in &fixture.users {
        for _ in 0..args.interactions {
            let Some(product) = fixture.products.choose(&mut rng) else {
                break;
            };
            let (kind, _) = KIND_MIX.choose_weighted(&mut rng, |(_, weight)| *weight)?;

            let mut metadata = None;
            if *kind == InteractionType::Rating {
                let rating: u8 = *[3u8, 4, 5].choose(&mut rng).unwrap_or(&5);
                metadata = serde_json::json!({ "rating": rating }).as_object().cloned();
            }

            state
                .recorder
                .record_kind(*user_id, product.id, *kind, metadata)
                .await?;
            recorded += 1;
        }
    }

    info!(
        "Seeded {} interactions for {} users over {} products",
        recorded,
        fixture.users.len(),
        fixture.products.len()
    );
    Ok(())
}
