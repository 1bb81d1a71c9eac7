use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

use super::models::AppState;

/// Liveness probe; also reports the chain height and whether a miner is running.
#[get("/health/")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "height": state.blockchain.get_chain_length(),
        "mining": state.blockchain.is_mining(),
    }))
}
