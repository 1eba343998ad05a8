// region:    --- Imports
use crate::bidding::commands::BidPolicy;
use crate::store::PgAuctionStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod bidding;
mod error;
mod handlers;
mod query;
mod rating;
mod scheduler;
mod store;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 경매 저장소 생성
    let store = match PgAuctionStore::connect().await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("{:<12} --> 저장소 연결 실패: {:?}", "Main", e);
            return Err(e.into());
        }
    };

    // 데이터베이스 초기화
    if let Err(e) = store.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 입찰 정책 로드
    let policy = BidPolicy::from_env();
    info!("{:<12} --> 최소 입찰 단위: {}", "Main", policy.bid_increment);

    // 시간 기반 경매 상태 전이 스케줄러
    let scheduler = scheduler::AuctionScheduler::new(store.get_pool());
    scheduler.start().await;

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/bid", post(handlers::handle_bid))
        .route("/buy-now", post(handlers::handle_buy_now))
        .route("/comment", post(handlers::handle_comment))
        .route("/auction/:id", get(handlers::handle_get_auction_state))
        .route(
            "/auction/:id/highest-bid",
            get(handlers::handle_get_highest_bid),
        )
        .route("/items", get(handlers::handle_get_items))
        .route("/items/:id", get(handlers::handle_get_item))
        .route("/items/:id/bids", get(handlers::handle_get_item_bids))
        .route(
            "/items/:id/purchases",
            get(handlers::handle_get_item_purchases),
        )
        .route("/users/:id", get(handlers::handle_get_user))
        .route(
            "/users/:id/comments",
            get(handlers::handle_get_user_comments),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20)) // 동시성을 위한 바디 사이즈 10배 증가(20MB)
        .with_state((store, policy));

    // 리스너 생성(로컬 호스트의 3000번 포트를 사용)
    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
