use std::sync::Arc;

use proposal_bot::config::BotConfig;
use proposal_bot::dispatch::ResultsDispatcher;
use proposal_bot::docs::GoogleDocsClient;
use proposal_bot::intake::IntakePipeline;
use proposal_bot::intake::routes::{IntakeRouteState, intake_routes};
use proposal_bot::resolution::ResolutionRunner;
use proposal_bot::scheduler::spawn_resolution_ticker;
use proposal_bot::shorten::UrlShortener;
use proposal_bot::slack::SlackClient;
use proposal_bot::slack::parse::AnnouncementParser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("proposal-bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channels: #{} / #{} / #{}",
        config.proposals_channel, config.announcements_channel, config.inbox_channel);
    eprintln!("   Voting window: {} days", config.voting_days);
    eprintln!("   Resolution: every {}s", config.resolution_interval_secs);
    eprintln!("   Intake: http://0.0.0.0:{}/api/intake\n", config.intake_port);

    // ── Clients ─────────────────────────────────────────────────────────
    let slack = Arc::new(SlackClient::new(&config));
    let shortener = Arc::new(UrlShortener::new(&config)?);
    let docs = Arc::new(GoogleDocsClient::new(&config, Arc::clone(&shortener)));

    // ── Resolution pipeline ─────────────────────────────────────────────
    let dispatcher = Arc::new(ResultsDispatcher::new(
        Arc::clone(&slack),
        Arc::clone(&docs) as _,
        &config.proposals_channel,
        config.timezone,
    ));
    let parser = AnnouncementParser::new(&config.timezone_label, &config.resolution_bot_id);
    let runner = Arc::new(ResolutionRunner::new(
        Arc::clone(&slack) as _,
        Arc::clone(&docs) as _,
        dispatcher,
        parser,
        &config.proposals_channel,
        config.timezone,
    ));

    let interval = std::time::Duration::from_secs(config.resolution_interval_secs);
    let ticker = spawn_resolution_ticker(runner, interval);

    // ── Intake webhook ──────────────────────────────────────────────────
    let pipeline = Arc::new(IntakePipeline::new(
        Arc::clone(&slack),
        Arc::clone(&docs),
        shortener,
        config.clone(),
    ));
    let app = intake_routes(IntakeRouteState { pipeline });
    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.intake_port)).await?;
    tokio::spawn(async move {
        tracing::info!(port = config.intake_port, "Intake webhook listening");
        axum::serve(listener, app).await.ok();
    });

    ticker.await?;
    Ok(())
}
