use std::sync::atomic::Ordering;

use actix_web::{HttpResponse, Responder, post, web};
use log::{info, warn};

use super::models::{AppState, BroadcastBlockRequest, BroadcastTxRequest};
use crate::transaction::Transaction;

/// Receiving side of a peer's transaction broadcast. Admission only; a
/// transaction that arrives here is never re-broadcast.
#[post("/broadcast/tx/")]
pub async fn receive_transaction(
    state: web::Data<AppState>,
    body: web::Json<BroadcastTxRequest>,
) -> impl Responder {
    let body = body.into_inner();
    let tx = Transaction::new(body.sender, body.recipient, body.signature, body.amount);
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.add_transaction(tx) {
        Ok(()) => HttpResponse::Created().body("transaction added"),
        Err(err) => {
            warn!("rejected broadcast transaction: {err}");
            HttpResponse::BadRequest().body(err.to_string())
        }
    }
}

/// Receiving side of a block broadcast:
/// - the direct successor of our tip is validated and appended
/// - a block further ahead is acknowledged without appending; a later
///   resolve run catches the chain up
/// - a block at or below our tip is answered with 409, the signal that
///   makes the sender reconcile
#[post("/broadcast/block/")]
pub async fn receive_block(
    state: web::Data<AppState>,
    body: web::Json<BroadcastBlockRequest>,
) -> impl Responder {
    let block = body.into_inner().block;
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    let local_index = ledger.last_block().index;

    if block.index == local_index + 1 {
        match ledger.add_block(block) {
            Ok(()) => {
                // an in-flight local search now proves against a stale tip
                state.abort_mining.store(true, Ordering::Relaxed);
                HttpResponse::Created().body("block added")
            }
            Err(err) => {
                warn!("rejected peer block: {err}");
                HttpResponse::Conflict().body(err.to_string())
            }
        }
    } else if block.index > local_index + 1 {
        info!(
            "peer block #{} is ahead of local tip #{local_index}; scheduling resolve",
            block.index
        );
        state.resolve_pending.store(true, Ordering::Relaxed);
        HttpResponse::Ok().body("block acknowledged; local chain is behind")
    } else {
        HttpResponse::Conflict().body("local chain is longer or equal")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use actix_web::{App, test, web};

    use crate::api::{self, AppState};
    use crate::blockchain::{Block, Blockchain};
    use crate::transaction::Transaction;
    use crate::wallet::Wallet;

    fn state_with(ledger: Blockchain) -> web::Data<AppState> {
        web::Data::new(AppState::new(ledger, None, reqwest::Client::new(), None))
    }

    #[actix_web::test]
    async fn successor_block_is_appended() {
        let miner = Wallet::generate();
        let mut remote = Blockchain::new(Some(miner.public_key_hex()), None);
        let block = remote
            .mine_block(&std::sync::atomic::AtomicBool::new(false))
            .unwrap();

        let state = state_with(Blockchain::new(None, None));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(api::init_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/broadcast/block/")
            .set_json(serde_json::json!({ "block": block }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
        assert_eq!(state.ledger.lock().unwrap().chain.len(), 2);
    }

    #[actix_web::test]
    async fn gap_block_is_acknowledged_without_appending() {
        let state = state_with(Blockchain::new(None, None));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(api::init_routes),
        )
        .await;

        let block = Block::new(5, "far-ahead".into(), vec![Transaction::reward("m")], 0);
        let req = test::TestRequest::post()
            .uri("/api/v1/broadcast/block/")
            .set_json(serde_json::json!({ "block": block }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
        assert_eq!(state.ledger.lock().unwrap().chain.len(), 1);
        assert!(state.resolve_pending.load(Ordering::Relaxed));
    }

    #[actix_web::test]
    async fn stale_block_is_answered_with_conflict() {
        let state = state_with(Blockchain::new(None, None));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(api::init_routes),
        )
        .await;

        let block = Block::new(0, String::new(), vec![], 100);
        let req = test::TestRequest::post()
            .uri("/api/v1/broadcast/block/")
            .set_json(serde_json::json!({ "block": block }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);
    }

    #[actix_web::test]
    async fn broadcast_transaction_is_admitted_against_the_derived_balance() {
        let miner = Wallet::generate();
        let mut ledger = Blockchain::new(Some(miner.public_key_hex()), None);
        ledger
            .mine_block(&std::sync::atomic::AtomicBool::new(false))
            .unwrap();
        let state = state_with(ledger);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(api::init_routes),
        )
        .await;

        let tx = Transaction::new(
            miner.public_key_hex(),
            "ada".into(),
            miner.sign_transaction("ada", 5),
            5,
        );
        let req = test::TestRequest::post()
            .uri("/api/v1/broadcast/tx/")
            .set_json(serde_json::json!(tx))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);

        // a second copy overdraws the remaining balance and is rejected
        let tx = Transaction::new(
            miner.public_key_hex(),
            "ada".into(),
            miner.sign_transaction("ada", 6),
            6,
        );
        let req = test::TestRequest::post()
            .uri("/api/v1/broadcast/tx/")
            .set_json(serde_json::json!(tx))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
        assert_eq!(state.ledger.lock().unwrap().pending.len(), 1);
    }
}
