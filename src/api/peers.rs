use actix_web::{HttpResponse, Responder, delete, get, post, web};
use log::info;

use super::models::{AppState, PeerRequest, PeersResponse};

#[get("/peers/")]
pub async fn list_peers(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let mut peers: Vec<String> = ledger.peers.iter().cloned().collect();
    peers.sort();
    HttpResponse::Ok().json(PeersResponse { peers })
}

#[post("/peers/")]
pub async fn add_peer(state: web::Data<AppState>, body: web::Json<PeerRequest>) -> impl Responder {
    let address = body.address.trim().to_string();
    if address.is_empty() {
        return HttpResponse::BadRequest().body("peer address required");
    }
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    if ledger.add_peer(&address) {
        info!("registered peer {address}");
        HttpResponse::Created().body("peer added")
    } else {
        HttpResponse::Ok().body("peer already known")
    }
}

#[delete("/peers/{address}/")]
pub async fn remove_peer(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let address = path.into_inner().0;
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    if ledger.remove_peer(&address) {
        info!("removed peer {address}");
        HttpResponse::Ok().body("peer removed")
    } else {
        HttpResponse::NotFound().body("peer not found")
    }
}
