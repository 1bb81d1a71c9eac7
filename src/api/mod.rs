mod balance;
mod chain;
mod health;
mod mining;
pub mod models;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            // before `/chain/{index}/`, which would otherwise capture "export"
            .service(chain::export_chain)
            .service(chain::get_block)
            .service(chain::validate_chain)
            .service(chain::get_difficulty)
            .service(chain::set_difficulty)
            .service(mining::mine_block)
            .service(mining::mining_status)
            .service(tx::post_faucet)
            .service(tx::post_transaction)
            .service(tx::list_transactions)
            .service(tx::submit_all)
            .service(tx::get_transaction)
            .service(balance::get_balance)
            .service(balance::get_balances)
            .service(stats::get_stats)
            .service(wallet::create_wallet)
            .service(wallet::list_wallets),
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use serde_json::{Value, json};

    use super::*;
    use crate::config::{ChainConfig, ReconcileRule};

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::build(
            &ChainConfig {
                difficulty: 1,
                progress_tick: Duration::from_millis(5),
                ..ChainConfig::default()
            },
            ReconcileRule::FieldTuple,
        ))
    }

    async fn wait_for_miner(state: &web::Data<AppState>) {
        for _ in 0..1_000 {
            if !state.blockchain.is_mining() {
                return;
            }
            actix_web::rt::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("mining did not finish");
    }

    #[actix_web::test]
    async fn health_and_chain_endpoints() {
        let state = state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/health/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/api/v1/chain/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["length"], 1);
        assert_eq!(body["difficulty"], 1);

        let req = test::TestRequest::get().uri("/api/v1/chain/0/").to_request();
        let genesis: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(genesis["index"], 0);
        assert_eq!(genesis["previous_hash"], "0");

        let req = test::TestRequest::get().uri("/api/v1/chain/9/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/v1/chain/export/").to_request();
        let export: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(export["mining_reward"], 10);

        let req = test::TestRequest::get().uri("/api/v1/validate/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], true);
    }

    #[actix_web::test]
    async fn transfer_and_mining_flow() {
        let state = state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post().uri("/api/v1/wallet/new/").to_request();
        let wallet: Value = test::call_and_read_body_json(&app, req).await;
        let alice = wallet["address"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/faucet/")
            .set_json(json!({ "address": alice, "amount": 100 }))
            .to_request();
        let credit: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(credit["submitted"], true);

        let req = test::TestRequest::post()
            .uri("/api/v1/tx/")
            .set_json(json!({ "sender": alice, "recipient": "bob", "amount": 40 }))
            .to_request();
        let sent: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(sent["submitted"], true);
        assert_eq!(sent["transaction"]["status"], "confirmed");
        let txid = sent["transaction"]["transaction_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/tx/")
            .set_json(json!({ "sender": "ghost", "recipient": "bob", "amount": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/v1/tx/")
            .set_json(json!({ "sender": alice, "recipient": "bob", "amount": 1_000 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/mine/")
            .set_json(json!({ "miner_address": alice }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        wait_for_miner(&state).await;

        let req = test::TestRequest::get().uri("/api/v1/mining/status/").to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["status"], "completed");
        assert_eq!(status["block_index"], 1);
        assert_eq!(status["transaction_count"], 2);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/balance/{alice}/"))
            .to_request();
        let balance: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(balance["balance"], 70);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/tx/{txid}/"))
            .to_request();
        let tx: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tx["block_index"], 1);

        let req = test::TestRequest::get().uri("/api/v1/stats/").to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["height"], 2);
        assert_eq!(stats["pending_transactions"], 1);
        assert_eq!(stats["is_valid"], true);
    }

    #[actix_web::test]
    async fn rejects_bad_requests() {
        let state = state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/mine/")
            .set_json(json!({ "miner_address": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/difficulty/")
            .set_json(json!({ "difficulty": 9 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/faucet/")
            .set_json(json!({ "address": "alice", "amount": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
