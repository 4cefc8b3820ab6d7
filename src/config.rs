use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobscout", about = "Multi-source job listing aggregation pipeline")]
pub struct Config {
    /// Database connection URL (required for scrape runs)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the aggregation pipeline once across all configured sources
    Scrape(ScrapeArgs),
    /// Extract structured fields from a single posting URL
    Extract {
        /// Posting URL to enrich
        url: String,

        /// Skip the headless-browser strategy
        #[arg(long)]
        no_browser: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Search keywords forwarded to every source
    #[arg(long, env = "SCRAPE_KEYWORDS", default_value = "")]
    pub keywords: String,

    /// Location filter forwarded to every source
    #[arg(long, env = "SCRAPE_LOCATION", default_value = "")]
    pub location: String,

    /// Page size requested from each source
    #[arg(long, env = "RESULTS_PER_PAGE", default_value = "50")]
    pub results_per_page: u32,

    /// Hard ceiling on pages per source per run
    #[arg(long, env = "MAX_PAGES", default_value = "10")]
    pub max_pages: u32,

    /// Politeness interval between page requests, milliseconds
    #[arg(long, env = "PAGE_DELAY_MS", default_value = "500")]
    pub page_delay_ms: u64,

    /// Wall-clock budget per source before it is excluded from the run
    #[arg(long, env = "PER_SOURCE_TIMEOUT_SECS", default_value = "180")]
    pub per_source_timeout_secs: u64,

    /// Consecutive failures before a source's circuit opens
    #[arg(long, env = "BREAKER_THRESHOLD", default_value = "3")]
    pub breaker_threshold: u32,

    /// Seconds an open circuit waits before admitting a probe
    #[arg(long, env = "BREAKER_COOLDOWN_SECS", default_value = "60")]
    pub breaker_cooldown_secs: u64,

    /// Government syndication feed endpoint
    #[arg(long, env = "GOV_FEED_URL", default_value = "https://careers.usa.gov/feed/rss")]
    pub gov_feed_url: String,

    /// Aggregator API base URL
    #[arg(long, env = "AGGREGATOR_URL", default_value = "https://hiring.cafe")]
    pub aggregator_url: String,

    /// Social board API base URL
    #[arg(long, env = "SOCIALBOARD_URL", default_value = "https://api.socialboard.work")]
    pub socialboard_url: String,

    /// Social board API key; without it the source is skipped
    #[arg(long, env = "SOCIALBOARD_API_KEY")]
    pub socialboard_api_key: Option<String>,

    /// Direct-crawl site base URL
    #[arg(long, env = "DIRECTCRAWL_URL", default_value = "https://jobs.craigslist.org")]
    pub directcrawl_url: String,

    /// Max enrichment calls per direct-crawl results page
    #[arg(long, env = "ENRICH_LIMIT", default_value = "10")]
    pub enrich_limit: usize,

    /// Per-request timeout for static fetches, seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "15")]
    pub request_timeout_secs: u64,

    /// Navigation timeout for the headless browser, seconds
    #[arg(long, env = "BROWSER_TIMEOUT_SECS", default_value = "30")]
    pub browser_timeout_secs: u64,

    /// Skip the headless-browser extraction strategy
    #[arg(long, env = "NO_BROWSER")]
    pub no_browser: bool,

    /// Upsert batch size
    #[arg(long, env = "UPSERT_BATCH_SIZE", default_value = "100")]
    pub batch_size: usize,
}
