use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;

use super::models::{
    AppState, ChainResponse, DifficultyResponse, ErrorResponse, SetDifficultyRequest,
    ValidateResponse,
};

/// Highest difficulty accepted over the API; keeps dev mining interactive.
const MAX_API_DIFFICULTY: u32 = 6;

/// Get the full blockchain plus the pending list.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.blockchain.snapshot();
    HttpResponse::Ok().json(ChainResponse {
        length: snapshot.chain.len(),
        difficulty: snapshot.difficulty,
        pending_transactions: snapshot.pending_transactions,
        chain: snapshot.chain,
    })
}

#[get("/chain/export/")]
pub async fn export_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.blockchain.snapshot())
}

#[get("/chain/{index}/")]
pub async fn get_block(state: web::Data<AppState>, path: web::Path<(u64,)>) -> impl Responder {
    let index = path.into_inner().0;
    match state.blockchain.get_block(index) {
        Some(block) => HttpResponse::Ok().json(block.to_record()),
        None => HttpResponse::NotFound().json(ErrorResponse::new(format!(
            "block #{index} not found"
        ))),
    }
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = &state.blockchain;
    let verdict = bc.validate();
    HttpResponse::Ok().json(ValidateResponse {
        valid: verdict.is_ok(),
        length: bc.get_chain_length(),
        difficulty: bc.difficulty(),
        reason: verdict.err().map(|e| e.to_string()),
    })
}

/// Get current PoW difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: state.blockchain.difficulty(),
    })
}

/// Update PoW difficulty (affects future blocks only).
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> impl Responder {
    if body.difficulty > MAX_API_DIFFICULTY {
        return HttpResponse::BadRequest().json(ErrorResponse::new(format!(
            "difficulty too high for dev mode (max {MAX_API_DIFFICULTY})"
        )));
    }
    state.blockchain.set_difficulty(body.difficulty);
    info!("CHAIN - difficulty set to {}", body.difficulty);
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: state.blockchain.difficulty(),
    })
}
