use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use seithi::{web, App, Config};

const USAGE: &str = "Usage: seithi [--fetch | --health | --publish <article_id> | \
--add-source <name> <url> | --activate-source <id> | --deactivate-source <id> | \
--subscribe <user_id> <email> [cooldown_minutes]]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load().context("failed to load configuration")?;
    let app = App::new(&config).await.context("failed to initialise services")?;

    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve(app, &config).await,
        Some("--fetch") => {
            let summary = app.run_ingestion().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Some("--health") => {
            let report = app.check_health().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Some("--publish") if args.len() >= 3 => {
            let article_id: i64 = args[2].parse().context("article_id must be a number")?;
            let outcome = app.publish_to_facebook(article_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.is_success() {
                Ok(())
            } else {
                anyhow::bail!("article {} was not posted", article_id)
            }
        }
        Some("--add-source") if args.len() >= 4 => {
            let id = app.add_source(&args[2], &args[3]).await?;
            println!("Added source {} as #{}", args[2], id);
            Ok(())
        }
        Some(flag @ ("--activate-source" | "--deactivate-source")) if args.len() >= 3 => {
            let id: i64 = args[2].parse().context("source id must be a number")?;
            let is_active = flag == "--activate-source";
            app.set_source_active(id, is_active).await?;
            println!(
                "Source #{} {}",
                id,
                if is_active { "activated" } else { "deactivated" }
            );
            Ok(())
        }
        Some("--subscribe") if args.len() >= 4 => {
            let cooldown = args
                .get(4)
                .map(|c| c.parse::<i64>())
                .transpose()
                .context("cooldown_minutes must be a number")?;
            let id = app.subscribe(&args[2], &args[3], cooldown).await?;
            println!("Subscribed {} as #{}", args[3], id);
            Ok(())
        }
        Some(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

async fn serve(app: App, config: &Config) -> anyhow::Result<()> {
    let router = web::create_router(Arc::new(app), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
