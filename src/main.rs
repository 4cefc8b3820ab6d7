use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobscout::breaker::BreakerConfig;
use jobscout::collectors::aggregator::AggregatorCollector;
use jobscout::collectors::directcrawl::DirectCrawlCollector;
use jobscout::collectors::govfeed::GovFeedCollector;
use jobscout::collectors::socialboard::SocialBoardCollector;
use jobscout::collectors::{CollectorHandle, PaginationOpts};
use jobscout::config::{Command, Config, ScrapeArgs};
use jobscout::db;
use jobscout::extract::fetch::PoliteFetcher;
use jobscout::extract::{ExtractionEngine, ExtractorConfig};
use jobscout::models::job::SourceQuery;
use jobscout::orchestrator::Orchestrator;
use jobscout::retry::RetryPolicy;
use jobscout::store::{PersistenceGateway, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscout=info")),
        )
        .init();

    let config = Config::parse();

    match config.command.clone() {
        Command::Scrape(args) => run_scrape(&config, &args).await,
        Command::Extract { url, no_browser } => run_extract(&url, no_browser).await,
    }
}

async fn run_scrape(config: &Config, args: &ScrapeArgs) -> anyhow::Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for scrape runs"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("jobscout/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;

    let request_timeout = Duration::from_secs(args.request_timeout_secs);
    let engine = Arc::new(ExtractionEngine::new(ExtractorConfig {
        request_timeout,
        browser_timeout: Duration::from_secs(args.browser_timeout_secs),
        use_browser: !args.no_browser,
    })?);

    let breaker_config = BreakerConfig {
        failure_threshold: args.breaker_threshold,
        cooldown: Duration::from_secs(args.breaker_cooldown_secs),
    };
    let opts = PaginationOpts {
        max_pages: args.max_pages,
        page_delay: Duration::from_millis(args.page_delay_ms),
        retry: RetryPolicy::fixed(Duration::from_secs(1), 2),
    };

    let mut collectors = vec![
        Arc::new(CollectorHandle::new(
            Arc::new(GovFeedCollector::new(client.clone(), &args.gov_feed_url)),
            breaker_config,
            opts.clone(),
        )),
        Arc::new(CollectorHandle::new(
            Arc::new(AggregatorCollector::new(client.clone(), &args.aggregator_url)),
            breaker_config,
            opts.clone(),
        )),
    ];

    match SocialBoardCollector::new(
        client.clone(),
        &args.socialboard_url,
        args.socialboard_api_key.clone(),
    ) {
        Ok(collector) => collectors.push(Arc::new(CollectorHandle::new(
            Arc::new(collector),
            breaker_config,
            opts.clone(),
        ))),
        Err(e) => tracing::warn!(error = %e, "social board source disabled"),
    }

    collectors.push(Arc::new(CollectorHandle::new(
        Arc::new(DirectCrawlCollector::new(
            PoliteFetcher::new(request_timeout)?,
            Arc::clone(&engine),
            &args.directcrawl_url,
            args.enrich_limit,
        )),
        breaker_config,
        opts,
    )));

    let query = SourceQuery {
        keywords: args.keywords.clone(),
        location: args.location.clone(),
        page: 0,
        results_per_page: args.results_per_page,
    };

    let store = PersistenceGateway::new(
        pool,
        StoreConfig {
            batch_size: args.batch_size,
            ..StoreConfig::default()
        },
    );

    let orchestrator = Orchestrator::new(
        collectors,
        query,
        Duration::from_secs(args.per_source_timeout_secs),
    )?
    .with_store(store);

    let outcome = orchestrator.scrape_all().await;

    println!("{}", serde_json::to_string_pretty(&outcome.per_source)?);
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    Ok(())
}

async fn run_extract(url: &str, no_browser: bool) -> anyhow::Result<()> {
    let engine = ExtractionEngine::new(ExtractorConfig {
        use_browser: !no_browser,
        ..ExtractorConfig::default()
    })?;

    let result = engine.extract(url).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
