// region:    --- Imports
use crate::bidding::commands::{
    self, BidPolicy, BuyNowCommand, PlaceBidCommand,
};
use crate::query;
use crate::rating::{self, PostCommentCommand};
use crate::store::PgAuctionStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

/// 애플리케이션 상태: 저장소 + 입찰 정책
pub type AppState = (Arc<PgAuctionStore>, BidPolicy);

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State((store, policy)): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    // 빠른 사전 검증: 잠금 없이 현재 스냅샷으로 거절 사유를 조기에 돌려준다.
    // 최종 판정은 엔진이 잠금을 잡은 재조회 값으로 다시 한다.
    let item = match query::handlers::get_item(&store, cmd.item_id).await {
        Ok(item) => item,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = commands::validate_place_bid(&item, &cmd, &policy, Utc::now()) {
        return e.into_response();
    }

    match commands::handle_place_bid(cmd, policy, store.as_ref()).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "입찰이 성공적으로 처리되었습니다.",
                "bid_id": receipt.bid_id,
                "max_bid": receipt.max_bid,
                "bid_count": receipt.bid_count,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 즉시 구매 요청 처리
pub async fn handle_buy_now(
    State((store, _)): State<AppState>,
    Json(cmd): Json<BuyNowCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 즉시 구매 요청 처리 시작: {:?}", "Command", cmd);

    // 빠른 사전 검증. 재고의 최종 판정은 엔진이 잠금을 잡은 재조회 값으로 다시 한다.
    let item = match query::handlers::get_item(&store, cmd.item_id).await {
        Ok(item) => item,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = commands::validate_buy_now(&item, &cmd, Utc::now()) {
        return e.into_response();
    }

    match commands::handle_buy_now(cmd, store.as_ref()).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "즉시 구매가 성공적으로 처리되었습니다.",
                "purchase_id": receipt.purchase_id,
                "unit_price": receipt.unit_price,
                "quantity": receipt.quantity,
                "remaining_quantity": receipt.remaining_quantity,
                "sold_out": receipt.sold_out,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 코멘트 작성 요청 처리
pub async fn handle_comment(
    State((store, _)): State<AppState>,
    Json(cmd): Json<PostCommentCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 코멘트 작성 요청 처리 시작: {:?}", "Command", cmd);

    match rating::handle_post_comment(cmd, store.as_ref()).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "코멘트가 성공적으로 등록되었습니다.",
                "comment_id": receipt.comment_id,
                "rating": receipt.rating,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 경매 상태 조회
pub async fn handle_get_auction_state(
    State((store, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 상태 조회 id: {}", "HandlerQuery", item_id);
    match query::handlers::get_item(&store, item_id).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 최고 입찰가 조회
pub async fn handle_get_highest_bid(
    State((store, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 최고 입찰가 조회 id: {}",
        "HandlerQuery", item_id
    );
    match query::handlers::get_highest_bid(&store, item_id).await {
        Ok(bid) => Json(bid).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 모든 상품 조회
pub async fn handle_get_items(State((store, _)): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 모든 상품 조회", "HandlerQuery");
    match query::handlers::get_all_items(&store).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 상품 조회
pub async fn handle_get_item(
    State((store, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 상품 조회 id: {}", "HandlerQuery", item_id);
    match query::handlers::get_item(&store, item_id).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 상품 입찰 이력 조회
pub async fn handle_get_item_bids(
    State((store, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 상품 입찰 이력 조회 id: {}",
        "HandlerQuery", item_id
    );
    match query::handlers::get_bid_history(&store, item_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 상품 구매 이력 조회
pub async fn handle_get_item_purchases(
    State((store, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 상품 구매 이력 조회 id: {}",
        "HandlerQuery", item_id
    );
    match query::handlers::get_item_purchases(&store, item_id).await {
        Ok(purchases) => Json(purchases).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 사용자 조회
pub async fn handle_get_user(
    State((store, _)): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 사용자 조회 id: {}", "HandlerQuery", user_id);
    match query::handlers::get_user(&store, user_id).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 사용자가 받은 코멘트 조회
pub async fn handle_get_user_comments(
    State((store, _)): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 사용자 코멘트 조회 id: {}",
        "HandlerQuery", user_id
    );
    match query::handlers::get_user_comments(&store, user_id).await {
        Ok(comments) => Json(comments).into_response(),
        Err(e) => e.into_response(),
    }
}

// endregion: --- Query Handlers
