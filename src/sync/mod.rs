use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Result of one peer call. `Conflict` is the HTTP 409 signal that
/// schedules conflict resolution on the sender; `Unreachable` peers are
/// skipped silently by every broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Accepted,
    Rejected,
    Conflict,
    Unreachable,
}

#[derive(Serialize)]
struct BlockEnvelope<'a> {
    block: &'a Block,
}

#[derive(Deserialize)]
struct ChainPayload {
    chain: Vec<Block>,
}

fn peer_url(peer: &str, path: &str) -> String {
    format!("http://{peer}/api/v1/{path}")
}

async fn post_json<T: Serialize>(
    client: &reqwest::Client,
    url: &str,
    payload: &T,
) -> BroadcastOutcome {
    match client.post(url).json(payload).send().await {
        Ok(resp) if resp.status().is_success() => BroadcastOutcome::Accepted,
        Ok(resp) if resp.status() == reqwest::StatusCode::CONFLICT => {
            warn!("peer at {url} answered with a conflict");
            BroadcastOutcome::Conflict
        }
        Ok(resp) => {
            warn!("peer at {url} rejected the broadcast: {}", resp.status());
            BroadcastOutcome::Rejected
        }
        Err(err) => {
            warn!("peer at {url} unreachable: {err}");
            BroadcastOutcome::Unreachable
        }
    }
}

pub async fn broadcast_transaction(
    client: &reqwest::Client,
    peer: &str,
    transaction: &Transaction,
) -> BroadcastOutcome {
    post_json(client, &peer_url(peer, "broadcast/tx/"), transaction).await
}

pub async fn broadcast_block(
    client: &reqwest::Client,
    peer: &str,
    block: &Block,
) -> BroadcastOutcome {
    post_json(client, &peer_url(peer, "broadcast/block/"), &BlockEnvelope { block }).await
}

/// Fetch a peer's full chain. `None` when the peer is unreachable or its
/// answer does not parse as a chain.
pub async fn fetch_chain(client: &reqwest::Client, peer: &str) -> Option<Vec<Block>> {
    let url = peer_url(peer, "chain/");
    let resp = match client.get(&url).send().await {
        Ok(resp) => resp,
        Err(err) => {
            warn!("peer at {url} unreachable: {err}");
            return None;
        }
    };
    match resp.json::<ChainPayload>().await {
        Ok(payload) => Some(payload.chain),
        Err(err) => {
            warn!("peer at {url} returned a malformed chain: {err}");
            None
        }
    }
}

/// Fan a transaction out to every peer as an independent task and collect
/// the per-peer outcomes. One slow peer costs only its own timeout.
pub async fn broadcast_transaction_to_all(
    client: &reqwest::Client,
    peers: &HashSet<String>,
    transaction: &Transaction,
) -> Vec<BroadcastOutcome> {
    let handles: Vec<_> = peers
        .iter()
        .map(|peer| {
            let client = client.clone();
            let peer = peer.clone();
            let transaction = transaction.clone();
            actix_web::rt::spawn(
                async move { broadcast_transaction(&client, &peer, &transaction).await },
            )
        })
        .collect();
    join_outcomes(handles).await
}

/// Same fan-out for a freshly mined block.
pub async fn broadcast_block_to_all(
    client: &reqwest::Client,
    peers: &HashSet<String>,
    block: &Block,
) -> Vec<BroadcastOutcome> {
    let handles: Vec<_> = peers
        .iter()
        .map(|peer| {
            let client = client.clone();
            let peer = peer.clone();
            let block = block.clone();
            actix_web::rt::spawn(async move { broadcast_block(&client, &peer, &block).await })
        })
        .collect();
    join_outcomes(handles).await
}

/// Query every peer's chain concurrently; unreachable peers are dropped
/// from the result.
pub async fn fetch_all_chains(
    client: &reqwest::Client,
    peers: &HashSet<String>,
) -> Vec<Vec<Block>> {
    let handles: Vec<_> = peers
        .iter()
        .map(|peer| {
            let client = client.clone();
            let peer = peer.clone();
            actix_web::rt::spawn(async move { fetch_chain(&client, &peer).await })
        })
        .collect();
    let mut chains = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(Some(chain)) = handle.await {
            chains.push(chain);
        }
    }
    chains
}

async fn join_outcomes(
    handles: Vec<actix_web::rt::task::JoinHandle<BroadcastOutcome>>,
) -> Vec<BroadcastOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.unwrap_or(BroadcastOutcome::Unreachable));
    }
    outcomes
}
