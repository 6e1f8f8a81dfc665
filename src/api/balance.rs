use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse};

/// Balance of this node's own identity.
#[get("/balance/")]
pub async fn get_own_balance(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match (ledger.identity.clone(), ledger.balance()) {
        (Some(participant), Some(balance)) => {
            HttpResponse::Ok().json(BalanceResponse { participant, balance })
        }
        _ => HttpResponse::InternalServerError().body("no wallet is configured"),
    }
}

/// Balance of any participant, derived from chain plus pool.
#[get("/balance/{participant}/")]
pub async fn get_balance(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let participant = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let balance = ledger.balance_of(&participant);
    HttpResponse::Ok().json(BalanceResponse {
        participant,
        balance,
    })
}
