use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, NewTxRequest, NewTxResponse, PoolResponse};
use crate::sync::{self, BroadcastOutcome};
use crate::transaction::Transaction;
use crate::verification;

/// Create a transaction from this node: sign it with the node wallet,
/// admit it into the pool and broadcast it to every peer. A rejecting
/// peer makes the call fail; an unreachable one is skipped.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    if body.amount == 0 {
        return HttpResponse::BadRequest().body("amount must be > 0");
    }

    let (sender, signature) = {
        let wallet = state.wallet.lock().expect("mutex poisoned");
        match wallet.as_ref() {
            Some(wallet) => (
                wallet.public_key_hex(),
                wallet.sign_transaction(&body.recipient, body.amount),
            ),
            None => return HttpResponse::InternalServerError().body("no wallet is configured"),
        }
    };
    let tx = Transaction::new(sender, body.recipient.clone(), signature, body.amount);

    let (balance, peers) = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        if let Err(err) = ledger.add_transaction(tx.clone()) {
            warn!("POST /tx/ - rejected: {err}");
            return HttpResponse::BadRequest().body(err.to_string());
        }
        (ledger.balance_of(&tx.sender), ledger.peers.clone())
    };

    let outcomes = sync::broadcast_transaction_to_all(&state.http, &peers, &tx).await;
    if outcomes
        .iter()
        .any(|o| matches!(o, BroadcastOutcome::Rejected | BroadcastOutcome::Conflict))
    {
        return HttpResponse::BadGateway().body("a peer rejected the transaction");
    }

    info!("POST /tx/ - admitted transfer of {} to {}", tx.amount, tx.recipient);
    HttpResponse::Created().json(NewTxResponse {
        transaction: tx,
        balance,
    })
}

/// List the pending pool.
#[get("/pool/")]
pub async fn get_pool(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let all_affordable =
        verification::verify_transactions(&ledger.pending, |who| ledger.balance_of(who));
    HttpResponse::Ok().json(PoolResponse {
        size: ledger.pending.len(),
        transactions: ledger.pending.clone(),
        all_affordable,
    })
}
