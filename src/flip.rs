// src/flip.rs
//! Sentiment flip detection: BUY <-> SELL reversals per symbol.

use crate::error::StorageError;
use crate::sentiment::{SentimentRecord, Signal};
use crate::store::SentimentLedger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipEvent {
    pub symbol: String,
    pub prior: Signal,
    pub new: Signal,
}

/// Only BUY -> SELL and SELL -> BUY count. NEUTRAL on either side never flips.
pub fn flip_between(prior: Signal, new: Signal) -> bool {
    matches!(
        (prior, new),
        (Signal::Buy, Signal::Sell) | (Signal::Sell, Signal::Buy)
    )
}

/// Compare `record` against the ledger as it stands *before* `record` is upserted.
/// Events follow the order of `record.symbols`.
pub async fn detect_flips<L>(
    ledger: &L,
    record: &SentimentRecord,
) -> Result<Vec<FlipEvent>, StorageError>
where
    L: SentimentLedger + ?Sized,
{
    if !record.signal.is_directional() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for symbol in &record.symbols {
        let Some(prior) = ledger.most_recent_sentiment(symbol).await? else {
            continue;
        };
        if flip_between(prior, record.signal) {
            out.push(FlipEvent {
                symbol: symbol.clone(),
                prior,
                new: record.signal,
            });
        }
    }
    Ok(out)
}
