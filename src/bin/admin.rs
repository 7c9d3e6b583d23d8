//! CLI administration tool for site-redirects.
//!
//! Manages sites and redirect rules directly in the database. Every rule
//! change invalidates the site's cached outcomes in Redis, when Redis is
//! configured, and is announced to running servers over PostgreSQL
//! `NOTIFY` so their in-memory caches drop it too.
//!
//! # Usage
//!
//! ```bash
//! # Add a permanent redirect
//! cargo run --bin admin -- redirect add --site 1 --old /old-page/ --new /new-page/
//!
//! # Add a subpath rule
//! cargo run --bin admin -- redirect add --site 1 --old /blog --new /news --subpath
//!
//! # See what a path resolves to
//! cargo run --bin admin -- redirect test --site 1 /blog/2020/post/
//!
//! # Drop cached outcomes of a site
//! cargo run --bin admin -- cache flush --site 1
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `REDIS_URL` (optional): shared cache to invalidate after changes
//! - `APPEND_SLASH`, `REDIRECT_MATCH_QUERY`: same meaning as for the server

use site_redirects::application::services::{
    RedirectEngine, RedirectRequest, RedirectService, StaticSiteResolver, shared_settings,
};
use site_redirects::config::{self, Config};
use site_redirects::domain::entities::{
    NewRedirect, NewSite, RedirectPatch, RedirectRule, ResponseCode, SiteId,
};
use site_redirects::domain::outcome::Decision;
use site_redirects::domain::repositories::{RedirectRepository, SiteRepository};
use site_redirects::domain::site_resolver::SiteResolver;
use site_redirects::infrastructure::cache::{NullCache, PgBroadcastCache, RedirectCache, RedisCache};
use site_redirects::infrastructure::persistence::{PgRedirectRepository, PgSiteRepository};
use site_redirects::server::connect_database;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing site-redirects.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage redirect rules
    Redirect {
        #[command(subcommand)]
        action: RedirectAction,
    },

    /// Manage sites
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Cache operations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Redirect rule subcommands.
#[derive(Subcommand)]
enum RedirectAction {
    /// Create a rule
    Add {
        #[arg(short, long)]
        site: SiteId,

        /// Path to redirect from (e.g., "/old-page/")
        #[arg(short, long)]
        old: Option<String>,

        /// Target path or URL; leave empty together with --code 410
        #[arg(short, long)]
        new: Option<String>,

        /// Response code: 301, 302 or 410
        #[arg(short, long, default_value = "301")]
        code: ResponseCode,

        /// Redirect every path under --old to --new
        #[arg(long)]
        catchall: bool,

        /// Redirect every path under --old, keeping the remainder
        #[arg(long)]
        subpath: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Change fields of an existing rule
    Update {
        id: i64,

        #[arg(long)]
        old: Option<String>,

        #[arg(long)]
        new: Option<String>,

        #[arg(long)]
        code: Option<ResponseCode>,

        #[arg(long)]
        catchall: Option<bool>,

        #[arg(long)]
        subpath: Option<bool>,
    },

    /// Delete a rule
    Delete {
        id: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List the rules of a site
    List {
        #[arg(short, long)]
        site: SiteId,
    },

    /// Resolve a request path against the stored rules (bypasses the cache)
    Test {
        #[arg(short, long)]
        site: SiteId,

        /// Request path, percent-encoded or not
        path: String,

        /// Request query string without the leading '?'
        #[arg(short, long)]
        query: Option<String>,
    },
}

/// Site management subcommands.
#[derive(Subcommand)]
enum SiteAction {
    /// Register a site
    Add {
        /// Host name requests for this site arrive with
        #[arg(short, long)]
        domain: Option<String>,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List all sites
    List,
}

/// Cache subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Drop every cached outcome of a site
    Flush {
        #[arg(short, long)]
        site: SiteId,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;

    let pool = connect_database(&database_url, &config).await?;

    match cli.command {
        Commands::Redirect { action } => handle_redirect_action(action, &config, pool).await?,
        Commands::Site { action } => handle_site_action(action, pool).await?,
        Commands::Cache { action } => handle_cache_action(action, &config, pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Cache the server instances share, if any, wrapped so that every
/// invalidation also reaches servers with an in-memory cache.
async fn connect_cache(config: &Config, pool: Arc<PgPool>) -> Result<Arc<dyn RedirectCache>> {
    let shared: Arc<dyn RedirectCache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisCache::connect(url, config.cache_ttl_seconds, config.cache_max_key_length)
                .await
                .with_context(|| {
                    format!("Failed to connect to {}", config::mask_connection_string(url))
                })?;
            Arc::new(redis)
        }
        None => Arc::new(NullCache::new()),
    };

    Ok(Arc::new(PgBroadcastCache::new(shared, pool)))
}

/// Dispatches redirect management commands.
async fn handle_redirect_action(
    action: RedirectAction,
    config: &Config,
    pool: Arc<PgPool>,
) -> Result<()> {
    let repository: Arc<dyn RedirectRepository> =
        Arc::new(PgRedirectRepository::new(pool.clone()));

    if let RedirectAction::Test { site, path, query } = action {
        return test_path(repository, config, site, path, query).await;
    }

    let cache = connect_cache(config, pool).await?;
    let service = RedirectService::new(repository, cache, shared_settings(config.redirect.clone()));

    match action {
        RedirectAction::Add {
            site,
            old,
            new,
            code,
            catchall,
            subpath,
            yes,
        } => {
            add_redirect(&service, site, old, new, code, catchall, subpath, yes).await?;
        }
        RedirectAction::Update {
            id,
            old,
            new,
            code,
            catchall,
            subpath,
        } => {
            let patch = RedirectPatch {
                old_path: old,
                new_path: new,
                response_code: code,
                catchall_redirect: catchall,
                subpath_match: subpath,
            };

            if patch.is_empty() {
                println!("{}", "Nothing to update".yellow());
                return Ok(());
            }

            let rule = service
                .update(id, patch)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to update redirect: {}", e))?;

            println!("{}", "✅ Redirect updated".green().bold());
            print_rule(&rule);
        }
        RedirectAction::Delete { id, yes } => {
            let rule = service
                .get(id)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            print_rule(&rule);
            println!();

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Delete this redirect?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "❌ Cancelled".red());
                    return Ok(());
                }
            }

            service
                .delete(id)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to delete redirect: {}", e))?;

            println!("{}", "✅ Redirect deleted".green().bold());
        }
        RedirectAction::List { site } => {
            list_redirects(&service, site).await?;
        }
        RedirectAction::Test { .. } => {}
    }

    Ok(())
}

/// Creates a rule, prompting for missing paths.
#[allow(clippy::too_many_arguments)]
async fn add_redirect(
    service: &RedirectService,
    site: SiteId,
    old: Option<String>,
    new: Option<String>,
    code: ResponseCode,
    catchall: bool,
    subpath: bool,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "➕ Add Redirect".bright_blue().bold());
    println!();

    let old_path = match old {
        Some(path) => path,
        None => Input::new().with_prompt("Redirect from").interact_text()?,
    };

    let new_path = match new {
        Some(path) => path,
        None if code == ResponseCode::Gone => String::new(),
        None => Input::new().with_prompt("Redirect to").interact_text()?,
    };

    let mut new_redirect = NewRedirect::new(site, old_path, new_path).with_code(code);
    if catchall {
        new_redirect = new_redirect.catchall();
    }
    if subpath {
        new_redirect = new_redirect.subpath();
    }

    println!("  Site: {}", site.to_string().cyan());
    println!("  From: {}", new_redirect.old_path.cyan());
    println!("  To:   {}", display_target(&new_redirect.new_path).cyan());
    println!("  Code: {}", code.as_str().bright_white());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this redirect?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let rule = service
        .create(new_redirect)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create redirect: {}", e))?;

    println!("{}", "✅ Redirect created".green().bold());
    print_rule(&rule);

    Ok(())
}

/// Lists the rules of a site.
///
/// # Output Format
///
/// ```text
/// 📋 Redirects for site 1
///
///   ID   Code  Match     From                           To
///   ───────────────────────────────────────────────────────────────────────────
///   1    301   exact     /old-page/                     /new-page/
///   2    302   subpath   /blog                          /news
/// ```
async fn list_redirects(service: &RedirectService, site: SiteId) -> Result<()> {
    println!(
        "{}",
        format!("📋 Redirects for site {}", site).bright_blue().bold()
    );
    println!();

    let rules = service
        .list(site)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list redirects: {}", e))?;

    if rules.is_empty() {
        println!("{}", "  No redirects found".yellow());
        return Ok(());
    }

    println!(
        "  {:<4} {:<5} {:<9} {:<30} {}",
        "ID".bright_white().bold(),
        "Code".bright_white().bold(),
        "Match".bright_white().bold(),
        "From".bright_white().bold(),
        "To".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for rule in &rules {
        println!(
            "  {:<4} {:<5} {:<9} {:<30} {}",
            rule.id.to_string().bright_black(),
            rule.response_code.as_str(),
            match_kind(rule),
            rule.old_path.cyan(),
            display_target(&rule.new_path)
        );
    }

    println!();
    println!("  Total: {}", rules.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

/// Resolves a path the way the server would, straight from the store.
async fn test_path(
    repository: Arc<dyn RedirectRepository>,
    config: &Config,
    site: SiteId,
    path: String,
    query: Option<String>,
) -> Result<()> {
    let sites: Arc<dyn SiteResolver> = Arc::new(StaticSiteResolver::new(site));
    let engine = RedirectEngine::new(
        repository,
        Arc::new(NullCache::new()),
        Some(sites),
        shared_settings(config.redirect.clone()),
    );

    let decision = engine
        .handle(&RedirectRequest {
            host: "",
            path: &path,
            query: query.as_deref(),
        })
        .await
        .map_err(|e| anyhow::anyhow!("Lookup failed: {}", e))?;

    match decision {
        Decision::Redirect { location, status } => {
            println!("{} {}", status.as_u16().to_string().green().bold(), location.cyan());
        }
        Decision::Gone => println!("{}", "410 Gone".yellow().bold()),
        Decision::Continue => println!("{}", "No matching redirect".bright_black()),
    }

    Ok(())
}

/// Dispatches site management commands.
async fn handle_site_action(action: SiteAction, pool: Arc<PgPool>) -> Result<()> {
    let repo = PgSiteRepository::new(pool);

    match action {
        SiteAction::Add { domain, name } => {
            let domain = match domain {
                Some(d) => d,
                None => Input::new().with_prompt("Domain").interact_text()?,
            };
            let name = match name {
                Some(n) => n,
                None => Input::new()
                    .with_prompt("Display name")
                    .with_initial_text(domain.clone())
                    .interact_text()?,
            };

            let site = repo
                .create(NewSite { domain, name })
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create site: {}", e))?;

            println!(
                "{} {} ({})",
                "✅ Site created:".green().bold(),
                site.domain.cyan(),
                site.id.to_string().bright_white()
            );
        }
        SiteAction::List => {
            println!("{}", "🌐 Sites".bright_blue().bold());
            println!();

            let sites = repo
                .list()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list sites: {}", e))?;

            for site in &sites {
                println!(
                    "  {:<4} {:<40} {}",
                    site.id.to_string().bright_black(),
                    site.domain.cyan(),
                    site.name
                );
            }
            println!();
        }
    }

    Ok(())
}

/// Handles cache commands.
async fn handle_cache_action(
    action: CacheAction,
    config: &Config,
    pool: Arc<PgPool>,
) -> Result<()> {
    match action {
        CacheAction::Flush { site } => {
            let cache = connect_cache(config, pool).await?;
            cache
                .invalidate(site)
                .await
                .with_context(|| format!("Failed to flush cache of site {}", site))?;

            println!(
                "{} {}",
                "✅ Cache flushed for site".green().bold(),
                site.to_string().bright_white()
            );
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            let rules: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redirects")
                .fetch_one(pool)
                .await?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!("  Redirects: {}", rules.to_string().bright_green().bold());
        }
    }

    Ok(())
}

fn print_rule(rule: &RedirectRule) {
    println!(
        "  #{} [{} {}] {}",
        rule.id.to_string().bright_black(),
        rule.response_code.as_str(),
        match_kind(rule),
        rule.to_string().cyan()
    );
}

fn match_kind(rule: &RedirectRule) -> &'static str {
    match (rule.subpath_match, rule.catchall_redirect) {
        (true, _) => "subpath",
        (false, true) => "catchall",
        (false, false) => "exact",
    }
}

fn display_target(new_path: &str) -> &str {
    if new_path.is_empty() { "(gone)" } else { new_path }
}
