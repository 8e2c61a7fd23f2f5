use anyhow::Result;
use clap::Parser;
use storefront_rec::auth::TokenVerifier;
use storefront_rec::{init_tracing, Config};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mint a bearer token for local testing", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// User id placed in the token subject.
    #[arg(short, long)]
    user: Uuid,

    /// Overrides `auth.token_ttl_seconds`.
    #[arg(long)]
    ttl: Option<u64>,

    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(ttl) = args.ttl {
        config.auth.token_ttl_seconds = ttl;
    }

    let token = TokenVerifier::new(&config.auth).issue(args.user)?;
    println!("{}", token);
    Ok(())
}
