use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 경매 상태
pub const STATUS_SCHEDULED: &str = "SCHEDULED";
pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_COMPLETED: &str = "COMPLETED";

// 상품 모델
// 가변 집계 필드(max_bid, bid_count, quantity, end_time, status)는
// 저장소의 행 잠금 아래에서만 갱신된다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub initial_price: i64,
    pub reserve_price: i64,
    pub buy_now_price: i64,
    pub quantity: i64,
    pub max_bid: i64,
    pub bid_count: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub seller_id: i64,
    pub category_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// 입찰 모델 (추가 전용, 생성 후 불변)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub item_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    // 입찰자가 허용한 상한. 노출 가격이 아니다.
    pub max_amount: i64,
    pub quantity: i64,
    pub bid_time: DateTime<Utc>,
}

// 즉시 구매 모델 (추가 전용, 생성 후 불변)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct BuyNowPurchase {
    pub id: i64,
    pub item_id: i64,
    pub buyer_id: i64,
    pub quantity: i64,
    pub purchase_time: DateTime<Utc>,
}
