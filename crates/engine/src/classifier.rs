//! Trade Classifier
//!
//! Infers buys and sells from the ledger-state deltas of one settled
//! transaction. AMM swaps show up as a modified `AMM` entry whose two pool
//! amounts moved; order-book fills show up as consumed or shrunk `Offer`
//! entries. Anything the classifier does not model degrades to `None`.

use std::collections::{HashSet, VecDeque};
use tracing::debug;
use xrpl_trader_core::{
    Amount, AffectedNode, IssuedAmount, LedgerNode, TokenIdentity, TradeDirection, TradeEvent,
    TradeMechanism, TransactionRecord, AMOUNT_EPSILON,
};

/// Capacity of the classified-hash cache
pub const DEDUP_CAPACITY: usize = 1000;

// ─── Dedup cache ─────────────────────────────────────────────────────

/// Bounded set of transaction hashes that have already produced a trade.
///
/// When the set grows past its capacity the oldest half is dropped.
#[derive(Debug, Clone)]
pub struct TradeHashCache {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl TradeHashCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.members.contains(hash)
    }

    /// Returns false if the hash was already present
    pub fn insert(&mut self, hash: &str) -> bool {
        if !self.members.insert(hash.to_string()) {
            return false;
        }
        self.order.push_back(hash.to_string());

        if self.order.len() > self.capacity {
            let evict = self.order.len() / 2;
            for old in self.order.drain(..evict) {
                self.members.remove(&old);
            }
            debug!("Classifier: evicted {} cached trade hashes", evict);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for TradeHashCache {
    fn default() -> Self {
        Self::new(DEDUP_CAPACITY)
    }
}

// ─── Classifier ──────────────────────────────────────────────────────

/// Classifies transactions of monitored accounts, forwarding each hash at most once
#[derive(Debug, Default)]
pub struct TradeClassifier {
    seen: TradeHashCache,
}

impl TradeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: TradeHashCache::new(capacity),
        }
    }

    /// Classify `record` as a trade by `monitored`.
    ///
    /// Returns `None` for other accounts' transactions, failed transactions,
    /// hashes already classified, and anything that is not a recognisable trade.
    pub fn classify(&mut self, record: &TransactionRecord, monitored: &str) -> Option<TradeEvent> {
        if record.account != monitored || !record.succeeded() || self.seen.contains(&record.hash) {
            return None;
        }

        let event = detect_trade(record)?;
        self.seen.insert(&record.hash);
        debug!(
            "Classifier: {} {} {} for {} XRP via {:?} ({})",
            event.direction.as_str(),
            event.token_amount,
            event.readable_symbol,
            event.xrp_amount,
            event.mechanism,
            record.hash
        );
        Some(event)
    }

    pub fn is_classified(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    pub fn cached_hashes(&self) -> usize {
        self.seen.len()
    }
}

/// Infer a trade from a transaction's deltas, ignoring account and dedup checks.
///
/// AMM deltas take precedence: when a payment moved an AMM pool, offers
/// consumed in the same transaction are not counted.
pub fn detect_trade(record: &TransactionRecord) -> Option<TradeEvent> {
    if record.is_type("Payment") {
        if let Some(event) = detect_amm_trade(&record.affected_nodes) {
            return Some(event);
        }
    }
    detect_orderbook_trade(&record.affected_nodes)
}

/// Signed change of one pool amount field: (native delta, or token delta with its identity)
enum FieldDelta {
    Native(f64),
    Token(f64, TokenIdentity),
}

fn field_delta(node: &LedgerNode, key: &str) -> Option<FieldDelta> {
    match (node.final_amount(key)?, node.previous_amount(key)?) {
        (after @ Amount::Native(_), before @ Amount::Native(_)) => {
            Some(FieldDelta::Native(after.as_xrp()? - before.as_xrp()?))
        }
        (Amount::Issued(after), Amount::Issued(before)) => {
            if after.currency != before.currency || after.issuer != before.issuer {
                return None;
            }
            Some(FieldDelta::Token(after.value_f64()? - before.value_f64()?, after.token()))
        }
        _ => None,
    }
}

fn detect_amm_trade(nodes: &[AffectedNode]) -> Option<TradeEvent> {
    for affected in nodes {
        let AffectedNode::ModifiedNode(node) = affected else {
            continue;
        };
        if !node.is_type("AMM") {
            continue;
        }

        let mut native = None;
        let mut token = None;
        for key in ["Amount", "Amount2"] {
            match field_delta(node, key) {
                Some(FieldDelta::Native(d)) => native = Some(d),
                Some(FieldDelta::Token(d, id)) => token = Some((d, id)),
                None => {}
            }
        }

        let (Some(native_delta), Some((token_delta, identity))) = (native, token) else {
            continue;
        };
        if native_delta.abs() < AMOUNT_EPSILON || token_delta.abs() < AMOUNT_EPSILON {
            continue;
        }

        let direction = if native_delta < 0.0 {
            TradeDirection::Buy
        } else {
            TradeDirection::Sell
        };
        return Some(trade_event(
            direction,
            identity,
            native_delta.abs(),
            token_delta.abs(),
            TradeMechanism::Amm,
        ));
    }
    None
}

/// One side of an offer: what it pays out (`TakerGets`) or takes in (`TakerPays`)
fn offer_side(fields: &serde_json::Value, key: &str) -> Option<Amount> {
    fields.get(key).and_then(Amount::from_json)
}

/// Native and token quantities of one consumed offer, with the native side's role
struct OfferFill {
    xrp: f64,
    tokens: f64,
    token: TokenIdentity,
    /// The offer paid out native XRP
    native_gets: bool,
}

/// The issued side of an XRP/token offer, and whether the native side is `TakerGets`
fn split_offer(gets: Amount, pays: Amount) -> Option<(IssuedAmount, bool)> {
    match (gets, pays) {
        (Amount::Native(_), Amount::Issued(issued)) => Some((issued, true)),
        (Amount::Issued(issued), Amount::Native(_)) => Some((issued, false)),
        _ => None,
    }
}

fn offer_fill(affected: &AffectedNode) -> Option<OfferFill> {
    let node = affected.node();
    if !node.is_type("Offer") {
        return None;
    }

    match affected {
        AffectedNode::DeletedNode(_) => {
            let fields = node.final_fields.as_ref().or(node.previous_fields.as_ref())?;
            let gets = offer_side(fields, "TakerGets")?;
            let pays = offer_side(fields, "TakerPays")?;
            let xrp = gets.as_xrp().or_else(|| pays.as_xrp())?;
            let (issued, native_gets) = split_offer(gets, pays)?;
            Some(OfferFill {
                xrp,
                tokens: issued.value_f64()?,
                token: issued.token(),
                native_gets,
            })
        }
        AffectedNode::ModifiedNode(_) => {
            let before = node.previous_fields.as_ref()?;
            let after = node.final_fields.as_ref()?;
            let gets_before = offer_side(before, "TakerGets")?;
            let pays_before = offer_side(before, "TakerPays")?;
            let gets_after = offer_side(after, "TakerGets")?;
            let pays_after = offer_side(after, "TakerPays")?;

            let (xrp_before, xrp_after) = match (gets_before.as_xrp(), pays_before.as_xrp()) {
                (Some(b), _) => (b, gets_after.as_xrp()?),
                (None, Some(b)) => (b, pays_after.as_xrp()?),
                (None, None) => return None,
            };
            let (issued_before, native_gets) = split_offer(gets_before, pays_before)?;
            let (issued_after, _) = split_offer(gets_after, pays_after)?;
            Some(OfferFill {
                xrp: xrp_before - xrp_after,
                tokens: issued_before.value_f64()? - issued_after.value_f64()?,
                token: issued_before.token(),
                native_gets,
            })
        }
        AffectedNode::CreatedNode(_) => None,
    }
}

fn detect_orderbook_trade(nodes: &[AffectedNode]) -> Option<TradeEvent> {
    let mut xrp_total = 0.0;
    let mut token_total = 0.0;
    let mut last: Option<(TokenIdentity, TradeDirection)> = None;

    for fill in nodes.iter().filter_map(offer_fill) {
        if fill.xrp.abs() < AMOUNT_EPSILON || fill.tokens.abs() < AMOUNT_EPSILON {
            continue;
        }
        xrp_total += fill.xrp.abs();
        token_total += fill.tokens.abs();
        let direction = if fill.native_gets {
            TradeDirection::Sell
        } else {
            TradeDirection::Buy
        };
        last = Some((fill.token, direction));
    }

    let (token, direction) = last?;
    if xrp_total < AMOUNT_EPSILON || token_total < AMOUNT_EPSILON {
        return None;
    }
    Some(trade_event(direction, token, xrp_total, token_total, TradeMechanism::Orderbook))
}

fn trade_event(
    direction: TradeDirection,
    token: TokenIdentity,
    xrp_amount: f64,
    token_amount: f64,
    mechanism: TradeMechanism,
) -> TradeEvent {
    TradeEvent {
        direction,
        readable_symbol: token.readable_symbol(),
        token,
        xrp_amount,
        token_amount,
        mechanism,
    }
}
