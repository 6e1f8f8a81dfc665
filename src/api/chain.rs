use std::sync::atomic::Ordering;

use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, ChainResponse, MinedResponse, ResolveResponse, ValidateResponse};
use crate::error::ChainError;
use crate::sync::{self, BroadcastOutcome};

/// Get the full chain with transactions embedded.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ChainResponse {
        length: ledger.chain.len(),
        chain: &ledger.chain,
    })
}

/// Validate the whole chain. An invalid result also schedules conflict
/// resolution: the chain is no longer trusted.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let valid = ledger.check_integrity().is_ok();
    if !valid {
        warn!("{}; conflict resolution pending", ChainError::InvalidChain);
        state.resolve_pending.store(true, Ordering::Relaxed);
    }
    HttpResponse::Ok().json(ValidateResponse {
        valid,
        length: ledger.chain.len(),
    })
}

/// Mine a block from the current pool:
/// - snapshot pool + tip under the lock
/// - run the proof search on the blocking pool, interruptible
/// - re-take the lock, re-validate the tip, commit
/// - broadcast the sealed block to every peer
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> impl Responder {
    if state.resolve_pending.load(Ordering::Relaxed) {
        return HttpResponse::Conflict().body("conflicts pending; resolve before mining");
    }

    let job = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        match ledger.mining_snapshot() {
            Ok(job) => job,
            Err(err @ ChainError::WalletMissing) => {
                return HttpResponse::InternalServerError().body(err.to_string());
            }
            Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
        }
    };

    state.abort_mining.store(false, Ordering::Relaxed);
    let search_job = job.clone();
    let search_state = state.clone();
    let proof = match web::block(move || {
        crate::blockchain::proof_of_work(
            &search_job.transactions,
            &search_job.last_hash,
            &search_state.abort_mining,
        )
    })
    .await
    {
        Ok(Some(proof)) => proof,
        Ok(None) => {
            return HttpResponse::Conflict().body(ChainError::Interrupted.to_string());
        }
        Err(err) => {
            warn!("proof search task failed: {err}");
            return HttpResponse::InternalServerError().body("mining task failed");
        }
    };

    let (block, peers) = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        match ledger.commit_block(job, proof) {
            Ok(block) => (block, ledger.peers.clone()),
            Err(err @ ChainError::StaleTip) => {
                return HttpResponse::Conflict().body(err.to_string());
            }
            Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
        }
    };

    let outcomes = sync::broadcast_block_to_all(&state.http, &peers, &block).await;
    if outcomes.contains(&BroadcastOutcome::Conflict) {
        state.resolve_pending.store(true, Ordering::Relaxed);
        warn!("a peer reported a longer chain; conflict resolution pending");
    }
    info!("MINER - sealed block #{} (proof={})", block.index, block.proof);
    HttpResponse::Created().json(MinedResponse { block })
}

/// Query every peer's chain and adopt the longest one that validates.
#[post("/resolve/")]
pub async fn resolve_conflicts(state: web::Data<AppState>) -> impl Responder {
    let peers = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.peers.clone()
    };
    let candidates = sync::fetch_all_chains(&state.http, &peers).await;

    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    let replaced = ledger.resolve(candidates);
    if replaced {
        // any in-flight search now proves against a discarded tip
        state.abort_mining.store(true, Ordering::Relaxed);
    }
    state.resolve_pending.store(false, Ordering::Relaxed);
    HttpResponse::Ok().json(ResolveResponse {
        replaced,
        length: ledger.chain.len(),
    })
}
