use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::models::{AppState, ErrorResponse, MineRequest, MineResponse};
use crate::blockchain::{MiningState, MiningStatus, StatusCallback};
use crate::error::MiningError;

/// Start mining the pending transfers. Answers immediately; poll
/// `/mining/status/` for the outcome.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let miner_address = req.miner_address.trim().to_string();
    if miner_address.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new("miner_address required"));
    }

    // Reconcile the transaction history as soon as the block is sealed.
    let reconcile = state.clone();
    let callback: StatusCallback = Arc::new(move |status: &MiningStatus| {
        if status.status == MiningState::Completed {
            let updated = reconcile.transactions.lock().update_transaction_statuses();
            debug!("MINER - post-mining reconciliation updated {updated} transaction(s)");
        }
    });

    match state.blockchain.start_mining_with(&miner_address, callback) {
        Ok(handle) => HttpResponse::Accepted().json(MineResponse {
            started: true,
            block_index: handle.block_index(),
        }),
        Err(MiningError::AlreadyInProgress) => {
            HttpResponse::Conflict().json(ErrorResponse::new(MiningError::AlreadyInProgress))
        }
        Err(e) => {
            warn!("POST /mine/ - {e}");
            HttpResponse::InternalServerError().json(ErrorResponse::new(e))
        }
    }
}

/// Current mining status; safe to poll while a block is being mined.
#[get("/mining/status/")]
pub async fn mining_status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.blockchain.get_mining_status())
}
