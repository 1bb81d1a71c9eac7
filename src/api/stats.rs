use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let bc = &state.blockchain;
    let blocks = bc.blocks();

    // Seconds between the two most recent blocks
    let last_interval_secs = match blocks.as_slice() {
        [.., older, newer] => Some((newer.timestamp - older.timestamp).max(0)),
        _ => None,
    };

    let pool_size = state.transactions.lock().pool_count();

    HttpResponse::Ok().json(StatsResponse {
        height: blocks.len(),
        difficulty: bc.difficulty(),
        mining_reward: bc.mining_reward(),
        is_valid: bc.is_chain_valid(),
        pending_transactions: bc.pending_transactions().len(),
        pool_size,
        last_interval_secs,
        mining: bc.is_mining(),
    })
}
