use std::fmt::Write;

use serde_json::Value;

use crate::types::{MarketHit, MarketView, UserView};

/// Emit a raw API response as pretty-printed JSON to stdout.
pub fn report_json(value: &Value) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{json}");
    }
}

pub fn report_search_hits(hits: &[MarketHit]) {
    print!("{}", format_search_hits(hits));
}

pub fn report_market(market: &MarketView) {
    print!("{}", format_market(market));
}

pub fn report_user(user: &UserView) {
    print!("{}", format_user(user));
}

/// Numbered list of search results.
pub fn format_search_hits(hits: &[MarketHit]) -> String {
    if hits.is_empty() {
        return "No markets found.\n".to_string();
    }
    let mut out = String::from("Found markets:\n");
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(out, "{}. {} (Slug: {})", i + 1, hit.question, hit.slug);
    }
    out
}

pub fn format_market(market: &MarketView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Market: {}", market.question);
    let _ = writeln!(out, "Total Liquidity: {}", or_na(market.total_liquidity));
    let _ = writeln!(out, "24-Hour Volume: {}", or_na(market.volume_24h));

    if market.is_multiple_choice() {
        out.push_str("\nCurrent Probabilities:\n");
        for answer in market.sorted_answers() {
            let _ = writeln!(out, "- {}: {}", answer.text, percent(answer.probability));
        }
    } else if let Some(p) = market.probability.filter(|_| market.is_binary()) {
        let _ = writeln!(out, "\nCurrent Probability (YES): {}", percent(p));
    }
    out
}

pub fn format_user(user: &UserView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Username: {}", user.username);
    let _ = writeln!(out, "Name: {}", user.name);
    if let Some(bio) = user.bio.as_deref().filter(|b| !b.trim().is_empty()) {
        let _ = writeln!(out, "Bio: {bio}");
    }
    let _ = writeln!(out, "Balance: {}", user.balance);
    let _ = writeln!(out, "All-Time Profit: {}", or_na(user.profit_cached.all_time));
    let _ = writeln!(out, "Follower Count: {}", user.follower_count_cached);
    if let Some(url) = &user.url {
        let _ = writeln!(out, "Profile URL: {url}");
    }
    out
}

fn percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

fn or_na(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into())
}
