// src/notify/format.rs
//! Chat message bodies. Markdown is Discord-flavoured.

use crate::flip::FlipEvent;
use crate::sentiment::SentimentRecord;

/// `"BTC-ETH-SOL Analysis"`, using at most the first three symbols.
pub fn thread_title(symbols: &[String]) -> String {
    let head: Vec<&str> = symbols.iter().take(3).map(String::as_str).collect();
    format!("{} Analysis", head.join("-"))
}

pub fn format_analysis(r: &SentimentRecord) -> String {
    let mut lines = vec!["**Sentiment Analysis**".to_string()];

    if !r.symbols.is_empty() {
        let tickers: Vec<String> = r.symbols.iter().map(|s| format!("${s}")).collect();
        lines.push(format!("**Tickers:** {}", tickers.join(" ")));
    }
    lines.push(format!("**Signal:** {} {}", r.signal.emoji(), r.signal));
    if !r.bull_case.is_empty() {
        lines.push(format!("**Bull:** {}", r.bull_case));
    }
    if !r.bear_case.is_empty() {
        lines.push(format!("**Bear:** {}", r.bear_case));
    }
    if !r.summary.is_empty() {
        lines.push(format!("**Summary:** {}", r.summary));
    }
    lines.join("\n")
}

pub fn format_flip_alert(flip: &FlipEvent, permalink: &str) -> String {
    format!(
        "🔄 **Sentiment flip** on ${}: {} {} → {} {}\n{}",
        flip.symbol,
        flip.prior.emoji(),
        flip.prior,
        flip.new.emoji(),
        flip.new,
        permalink
    )
}
