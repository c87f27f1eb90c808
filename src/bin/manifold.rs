//! manifold — command-line client for the Manifold Markets API.
//!
//! Reads the API key from `MANIFOLD_API_KEY` (a `.env` file is honoured) and
//! optional client settings from `manifold.toml`.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use manifold_cli::api::ManifoldClient;
use manifold_cli::config::{self, AppConfig, CONFIG_PATH};
use manifold_cli::reporter;
use manifold_cli::types::{
    self, BetsQuery, MarketHit, MarketView, Outcome, PlaceBetRequest, PositionOrder,
    PositionsQuery, SellRequest, UserView,
};

#[derive(Parser)]
#[command(name = "manifold", about = "Manifold Markets CLI")]
struct Cli {
    /// Settings file (missing file means defaults)
    #[arg(long, global = true, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Print raw JSON responses instead of summaries
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a market
    SearchMarket {
        /// Search term for the market
        term: String,
        /// Maximum number of markets to return
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Show the N-th result (1-based) without prompting
        #[arg(long)]
        select: Option<usize>,
    },

    /// Get market by slug
    GetMarket { slug: String },

    /// Get user by username
    GetUser { username: String },

    /// Place a bet or limit order
    Bet {
        contract_id: String,
        /// Bet amount in mana
        amount: f64,
        #[arg(value_parser = ["YES", "NO"])]
        outcome: String,
        /// Limit probability, turns the bet into a limit order
        #[arg(long, alias = "limit_prob")]
        limit_prob: Option<f64>,
        /// Limit order expiry (epoch milliseconds or RFC 3339)
        #[arg(long, alias = "expires_at")]
        expires_at: Option<String>,
        /// Simulate the bet without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Sell off a position
    Sell {
        market_id: String,
        #[arg(value_parser = ["YES", "NO"])]
        outcome: String,
        /// Number of shares to sell (sells all by default)
        #[arg(long)]
        shares: Option<f64>,
        /// Answer ID (multiple choice markets)
        #[arg(long, alias = "answer_id")]
        answer_id: Option<String>,
    },

    /// Cancel a limit order
    CancelOrder { bet_id: String },

    /// Get my bets
    GetBets {
        /// Maximum number of bets to retrieve
        #[arg(long, default_value_t = 1000)]
        limit: u32,
        /// Only bets on this market
        #[arg(long, alias = "contract_id")]
        contract_id: Option<String>,
    },

    /// Get market positions
    GetPositions {
        market_id: String,
        #[arg(long, default_value = "profit", value_parser = ["profit", "shares"])]
        order: String,
        /// Top N positions
        #[arg(long)]
        top: Option<u32>,
        /// Bottom N positions
        #[arg(long)]
        bottom: Option<u32>,
        /// Only this user's position
        #[arg(long, alias = "user_id")]
        user_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Fail before any network activity
    let api_key = config::api_key_from_env()?;
    let app_config = AppConfig::load_or_default(&cli.config)?;
    let client = ManifoldClient::from_settings(api_key, &app_config.settings)?;

    run(&client, cli.command, cli.json).await
}

async fn run(client: &ManifoldClient, command: Command, json: bool) -> Result<()> {
    match command {
        Command::SearchMarket {
            term,
            limit,
            select,
        } => search_market(client, &term, limit, select, json).await?,

        Command::GetMarket { slug } => {
            let market = client.get_market_by_slug(&slug).await?;
            show_market(&market, json)?;
        }

        Command::GetUser { username } => {
            let user = client.get_user_by_username(&username).await?;
            if json {
                reporter::report_json(&user);
            } else {
                reporter::report_user(&types::view::<UserView>(&user)?);
            }
        }

        Command::Bet {
            contract_id,
            amount,
            outcome,
            limit_prob,
            expires_at,
            dry_run,
        } => {
            let outcome: Outcome = outcome.parse()?;
            let mut bet = PlaceBetRequest::new(contract_id, amount, outcome).dry_run(dry_run);
            if let Some(p) = limit_prob {
                bet = bet.limit_prob(p);
            }
            if let Some(expiry) = expires_at {
                bet = bet.expires_at(types::parse_expires_at(&expiry)?);
            }
            info!(
                "Placing {} bet of {} on {}{}",
                bet.outcome,
                bet.amount,
                bet.contract_id,
                if bet.dry_run { " (dry run)" } else { "" }
            );
            let result = client.place_bet(&bet).await?;
            reporter::report_json(&result);
        }

        Command::Sell {
            market_id,
            outcome,
            shares,
            answer_id,
        } => {
            let mut sale = SellRequest::new(outcome.parse()?);
            if let Some(shares) = shares {
                sale = sale.shares(shares);
            }
            if let Some(answer_id) = answer_id {
                sale = sale.answer_id(answer_id);
            }
            info!("Selling {} shares in {market_id}", sale.outcome);
            let result = client.sell(&market_id, &sale).await?;
            reporter::report_json(&result);
        }

        Command::CancelOrder { bet_id } => {
            info!("Cancelling limit order {bet_id}");
            let result = client.cancel_limit_order(&bet_id).await?;
            reporter::report_json(&result);
        }

        Command::GetBets { limit, contract_id } => {
            let query = BetsQuery { limit, contract_id };
            let bets = client.get_my_bets(&query).await?;
            reporter::report_json(&Value::Array(bets));
        }

        Command::GetPositions {
            market_id,
            order,
            top,
            bottom,
            user_id,
        } => {
            let query = PositionsQuery {
                order: order.parse::<PositionOrder>()?,
                top,
                bottom,
                user_id,
            };
            let positions = client.get_market_positions(&market_id, &query).await?;
            reporter::report_json(&Value::Array(positions));
        }
    }

    Ok(())
}

/// List search hits, then show the chosen market: `--select`, or a prompt when
/// stdin is interactive.
async fn search_market(
    client: &ManifoldClient,
    term: &str,
    limit: u32,
    select: Option<usize>,
    json: bool,
) -> Result<()> {
    let markets = client.search_markets(term, limit).await?;

    if json {
        reporter::report_json(&Value::Array(markets.clone()));
    } else {
        let hits = markets
            .iter()
            .map(types::view::<MarketHit>)
            .collect::<Result<Vec<_>, _>>()?;
        reporter::report_search_hits(&hits);
    }

    let can_prompt = !json && std::io::stdin().is_terminal();
    let Some(index) = pick_hit(markets.len(), select, can_prompt, prompt_choice)? else {
        return Ok(());
    };

    let hit: MarketHit = types::view(&markets[index])?;
    println!();
    let market = client.get_market_by_slug(&hit.slug).await?;
    show_market(&market, json)
}

/// Zero-based index of the hit to show, if any. `--select` wins; otherwise
/// `prompt` is asked only when `can_prompt` is set. Choices are 1-based.
fn pick_hit(
    count: usize,
    select: Option<usize>,
    can_prompt: bool,
    prompt: impl FnOnce() -> Result<Option<usize>>,
) -> Result<Option<usize>> {
    if count == 0 {
        return Ok(None);
    }
    let choice = match select {
        Some(n) => n,
        None if can_prompt => match prompt()? {
            Some(n) => n,
            None => return Ok(None),
        },
        None => return Ok(None),
    };
    if choice == 0 || choice > count {
        bail!("selection must be between 1 and {count}");
    }
    Ok(Some(choice - 1))
}

fn prompt_choice() -> Result<Option<usize>> {
    print!("Enter the number of the market you want to view: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read selection")?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let n = line
        .parse::<usize>()
        .with_context(|| format!("invalid selection {line:?}"))?;
    Ok(Some(n))
}

fn show_market(market: &Value, json: bool) -> Result<()> {
    if json {
        reporter::report_json(market);
    } else {
        reporter::report_market(&types::view::<MarketView>(market)?);
    }
    Ok(())
}
