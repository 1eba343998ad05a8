// region:    --- Imports
use super::queries;
use crate::bidding::model::{Bid, BuyNowPurchase, Item};
use crate::error::AuctionError;
use crate::rating::{Comment, User};
use crate::store::PgAuctionStore;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 상품 조회
pub async fn get_item(store: &PgAuctionStore, item_id: i64) -> Result<Item, AuctionError> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", item_id);
    store
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Item>(queries::GET_ITEM)
                    .bind(item_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(AuctionError::not_found("상품", item_id))
            })
        })
        .await
}

/// 모든 상품 조회
pub async fn get_all_items(store: &PgAuctionStore) -> Result<Vec<Item>, AuctionError> {
    info!("{:<12} --> 모든 상품 조회", "Query");
    store
        .transaction(|tx| {
            Box::pin(async move {
                Ok(sqlx::query_as::<_, Item>(queries::GET_ALL_ITEMS)
                    .fetch_all(&mut **tx)
                    .await?)
            })
        })
        .await
}

/// 최고 입찰가 조회
pub async fn get_highest_bid(
    store: &PgAuctionStore,
    item_id: i64,
) -> Result<Option<i64>, AuctionError> {
    info!("{:<12} --> 최고 입찰가 조회 id: {}", "Query", item_id);
    store
        .transaction(|tx| {
            Box::pin(async move {
                let highest = sqlx::query_scalar::<_, Option<i64>>(queries::GET_HIGHEST_BID)
                    .bind(item_id)
                    .fetch_one(&mut **tx)
                    .await?;
                Ok(highest)
            })
        })
        .await
}

/// 입찰 이력 조회
pub async fn get_bid_history(
    store: &PgAuctionStore,
    item_id: i64,
) -> Result<Vec<Bid>, AuctionError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", item_id);
    store
        .transaction(|tx| {
            Box::pin(async move {
                Ok(sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
                    .bind(item_id)
                    .fetch_all(&mut **tx)
                    .await?)
            })
        })
        .await
}

/// 구매 이력 조회
pub async fn get_item_purchases(
    store: &PgAuctionStore,
    item_id: i64,
) -> Result<Vec<BuyNowPurchase>, AuctionError> {
    info!("{:<12} --> 구매 이력 조회 id: {}", "Query", item_id);
    store
        .transaction(|tx| {
            Box::pin(async move {
                Ok(sqlx::query_as::<_, BuyNowPurchase>(queries::GET_ITEM_PURCHASES)
                    .bind(item_id)
                    .fetch_all(&mut **tx)
                    .await?)
            })
        })
        .await
}

/// 사용자 조회 (평점 스냅샷 포함)
pub async fn get_user(store: &PgAuctionStore, user_id: i64) -> Result<User, AuctionError> {
    info!("{:<12} --> 사용자 조회 id: {}", "Query", user_id);
    store
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, User>(queries::GET_USER)
                    .bind(user_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(AuctionError::not_found("사용자", user_id))
            })
        })
        .await
}

/// 사용자가 받은 코멘트 조회
pub async fn get_user_comments(
    store: &PgAuctionStore,
    user_id: i64,
) -> Result<Vec<Comment>, AuctionError> {
    info!("{:<12} --> 사용자 코멘트 조회 id: {}", "Query", user_id);
    store
        .transaction(|tx| {
            Box::pin(async move {
                Ok(sqlx::query_as::<_, Comment>(queries::GET_USER_COMMENTS)
                    .bind(user_id)
                    .fetch_all(&mut **tx)
                    .await?)
            })
        })
        .await
}

// endregion: --- Query Handlers
