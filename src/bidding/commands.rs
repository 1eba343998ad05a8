/// 입찰 관련 커맨드 처리
/// 1. 입찰
/// 2. 즉시 구매
// region:    --- Imports
use crate::bidding::model::{Item, STATUS_ACTIVE, STATUS_COMPLETED, STATUS_SCHEDULED};
use crate::error::AuctionError;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidCommand {
    pub item_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub max_amount: i64,
    pub quantity: i64,
}

/// 즉시 구매 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowCommand {
    pub item_id: i64,
    pub buyer_id: i64,
    pub quantity: i64,
}

/// 입찰 정책
/// 최소 입찰 단위. 기본값 0: 현재 최고가 이상이면 허용하는 관대한 기준
#[derive(Debug, Clone, Copy)]
pub struct BidPolicy {
    pub bid_increment: i64,
}

impl BidPolicy {
    /// BID_INCREMENT 환경 변수에서 로드
    pub fn from_env() -> Self {
        let bid_increment = std::env::var("BID_INCREMENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Self { bid_increment }
    }
}

impl Default for BidPolicy {
    fn default() -> Self {
        Self { bid_increment: 0 }
    }
}

// endregion: --- Commands

// region:    --- Results

/// 입찰 결과 스냅샷
#[derive(Debug, Serialize, Deserialize)]
pub struct BidReceipt {
    pub bid_id: i64,
    pub item_id: i64,
    pub max_bid: i64,
    pub bid_count: i64,
}

/// 즉시 구매 결과 스냅샷
#[derive(Debug, Serialize, Deserialize)]
pub struct BuyNowReceipt {
    pub purchase_id: i64,
    pub item_id: i64,
    pub unit_price: i64,
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub sold_out: bool,
}

// endregion: --- Results

// region:    --- Validation

/// 최소 허용 입찰가: max(현재 최고가, 시작가) + 입찰 단위
pub fn min_acceptable_bid(item: &Item, policy: &BidPolicy) -> i64 {
    item.max_bid.max(item.initial_price) + policy.bid_increment
}

/// 경매 진행 여부 검증
fn validate_open(item: &Item, now: DateTime<Utc>) -> Result<(), AuctionError> {
    if item.status == STATUS_SCHEDULED || now < item.start_time {
        return Err(AuctionError::invalid_bid(
            "NOT_STARTED",
            "경매가 아직 시작되지 않았습니다.",
        ));
    }
    if item.status == STATUS_COMPLETED || now > item.end_time {
        return Err(AuctionError::invalid_bid(
            "ALREADY_ENDED",
            "경매가 이미 종료되었습니다.",
        ));
    }
    if item.status != STATUS_ACTIVE {
        return Err(AuctionError::invalid_bid(
            "INVALID_STATUS",
            format!("잘못된 경매 상태입니다: {}", item.status),
        ));
    }
    Ok(())
}

/// 입찰 검증
/// 반드시 쓰기 잠금을 잡고 새로 읽은 스냅샷에 대해 호출해야 한다.
/// 동시 입찰이 max_bid를 이미 올렸을 수 있다.
pub fn validate_place_bid(
    item: &Item,
    cmd: &PlaceBidCommand,
    policy: &BidPolicy,
    now: DateTime<Utc>,
) -> Result<(), AuctionError> {
    validate_open(item, now)?;

    if cmd.quantity < 1 {
        return Err(AuctionError::InvalidAmount {
            value: cmd.quantity,
        });
    }
    if cmd.quantity > item.quantity {
        return Err(AuctionError::invalid_bid(
            "OVER_QUANTITY",
            format!("남은 수량({})을 초과해 입찰할 수 없습니다.", item.quantity),
        ));
    }

    let floor = min_acceptable_bid(item, policy);
    if cmd.amount < floor {
        return Err(AuctionError::invalid_bid(
            "LOW_BID",
            format!("입찰 금액이 최소 허용 입찰가({})보다 낮습니다.", floor),
        ));
    }
    if cmd.max_amount < floor {
        return Err(AuctionError::invalid_bid(
            "LOW_MAX_BID",
            format!("상한 금액이 최소 허용 입찰가({})보다 낮습니다.", floor),
        ));
    }
    if cmd.max_amount < cmd.amount {
        return Err(AuctionError::invalid_bid(
            "MAX_BELOW_BID",
            "상한 금액은 입찰 금액 이상이어야 합니다.",
        ));
    }
    Ok(())
}

/// 즉시 구매 검증
/// 재고 비교는 잠금을 잡고 새로 읽은 값으로만 한다. 캐시된 값은 믿지 않는다.
pub fn validate_buy_now(
    item: &Item,
    cmd: &BuyNowCommand,
    now: DateTime<Utc>,
) -> Result<(), AuctionError> {
    validate_open(item, now)?;

    if cmd.quantity < 1 {
        return Err(AuctionError::InvalidAmount {
            value: cmd.quantity,
        });
    }
    if cmd.quantity > item.quantity {
        return Err(AuctionError::InsufficientStock {
            available: item.quantity,
            requested: cmd.quantity,
        });
    }
    Ok(())
}

// endregion: --- Validation

// region:    --- Engines

/// 1. 입찰
/// 단일 트랜잭션: 행 잠금 재조회 -> 재검증 -> 입찰 기록 추가 -> 집계 갱신 -> 커밋
/// 실패 시 전부 롤백된다. 부분 입찰 기록이나 부분 집계 갱신은 남지 않는다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    policy: BidPolicy,
    store: &impl AuctionStore,
) -> Result<BidReceipt, AuctionError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "BidEngine", cmd);

    if cmd.amount <= 0 || cmd.max_amount <= 0 {
        return Err(AuctionError::InvalidAmount {
            value: cmd.amount.min(cmd.max_amount),
        });
    }

    let mut tx = store.begin().await?;

    let item = store.item_for_update(&mut tx, cmd.item_id).await?;
    let now = Utc::now();
    if let Err(e) = validate_place_bid(&item, &cmd, &policy, now) {
        tx.rollback().await.ok();
        return Err(e);
    }

    let bid_id = store.insert_bid(&mut tx, &cmd, now).await?;
    let (max_bid, bid_count) = store
        .apply_bid_aggregates(&mut tx, cmd.item_id, cmd.amount)
        .await?;
    tx.commit().await?;

    info!(
        "{:<12} --> 입찰 커밋 완료: bid_id={}, max_bid={}, bid_count={}",
        "BidEngine", bid_id, max_bid, bid_count
    );
    Ok(BidReceipt {
        bid_id,
        item_id: cmd.item_id,
        max_bid,
        bid_count,
    })
}

/// 2. 즉시 구매
/// 단일 트랜잭션: 행 잠금 재조회 -> 재검증 -> 구매 기록 추가 -> 재고 차감 -> 커밋
/// 마지막 남은 수량을 노리는 두 구매자가 모두 성공하는 일은
/// 잠금을 잡은 재조회가 막는다. 재고 소진 시 경매는 자동 종료된다.
pub async fn handle_buy_now(
    cmd: BuyNowCommand,
    store: &impl AuctionStore,
) -> Result<BuyNowReceipt, AuctionError> {
    info!("{:<12} --> 즉시 구매 요청 처리 시작: {:?}", "BuyNowEngine", cmd);

    let mut tx = store.begin().await?;

    let item = store.item_for_update(&mut tx, cmd.item_id).await?;
    let now = Utc::now();
    if let Err(e) = validate_buy_now(&item, &cmd, now) {
        tx.rollback().await.ok();
        return Err(e);
    }

    let purchase_id = store.insert_purchase(&mut tx, &cmd, now).await?;
    let remaining = store
        .apply_buy_now_decrement(&mut tx, cmd.item_id, cmd.quantity, now)
        .await?;
    tx.commit().await?;

    if remaining == 0 {
        info!(
            "{:<12} --> 재고 소진으로 경매 자동 종료: item_id={}",
            "BuyNowEngine", cmd.item_id
        );
    }
    Ok(BuyNowReceipt {
        purchase_id,
        item_id: cmd.item_id,
        unit_price: item.buy_now_price,
        quantity: cmd.quantity,
        remaining_quantity: remaining,
        sold_out: remaining == 0,
    })
}

// endregion: --- Engines

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// 진행 중인 테스트용 상품
    fn active_item() -> Item {
        let now = Utc::now();
        Item {
            id: 42,
            name: "테스트 상품".to_string(),
            description: "검증 테스트용 상품입니다.".to_string(),
            initial_price: 10,
            reserve_price: 0,
            buy_now_price: 500,
            quantity: 3,
            max_bid: 10,
            bid_count: 0,
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
            seller_id: 7,
            category_id: 1,
            status: STATUS_ACTIVE.to_string(),
            created_at: now - Duration::hours(2),
        }
    }

    fn bid(amount: i64, max_amount: i64, quantity: i64) -> PlaceBidCommand {
        PlaceBidCommand {
            item_id: 42,
            bidder_id: 1,
            amount,
            max_amount,
            quantity,
        }
    }

    #[test]
    fn test_bid_above_current_max_is_accepted() {
        let item = active_item();
        let cmd = bid(15, 20, 1);
        assert!(validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).is_ok());
    }

    #[test]
    fn test_bid_equal_to_current_max_is_accepted() {
        // 관대한 기준: 현재 최고가와 같은 금액도 허용된다
        let mut item = active_item();
        item.max_bid = 15;
        item.bid_count = 1;
        let cmd = bid(15, 15, 1);
        assert!(validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).is_ok());
    }

    #[test]
    fn test_stale_bid_fails_against_fresh_state() {
        // A의 입찰(15)이 커밋된 뒤의 상태로 재검증된 B의 입찰(12)은 거절된다
        let mut item = active_item();
        item.max_bid = 15;
        item.bid_count = 1;
        let cmd = PlaceBidCommand {
            item_id: 42,
            bidder_id: 2,
            amount: 12,
            max_amount: 12,
            quantity: 1,
        };
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidBid { code: "LOW_BID", .. }));
    }

    #[test]
    fn test_min_acceptable_bid_uses_initial_price_floor() {
        let mut item = active_item();
        item.initial_price = 100;
        item.max_bid = 10;
        assert_eq!(min_acceptable_bid(&item, &BidPolicy::default()), 100);
    }

    #[test]
    fn test_bid_increment_raises_floor() {
        let item = active_item();
        let policy = BidPolicy { bid_increment: 100 };
        assert_eq!(min_acceptable_bid(&item, &policy), 110);

        let cmd = bid(15, 200, 1);
        let err = validate_place_bid(&item, &cmd, &policy, Utc::now()).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidBid { code: "LOW_BID", .. }));

        let cmd = bid(110, 200, 1);
        assert!(validate_place_bid(&item, &cmd, &policy, Utc::now()).is_ok());
    }

    #[test]
    fn test_max_amount_below_floor_is_rejected() {
        let mut item = active_item();
        item.max_bid = 15;
        let cmd = bid(20, 12, 1);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "LOW_MAX_BID", .. }
        ));
    }

    #[test]
    fn test_max_amount_below_amount_is_rejected() {
        let item = active_item();
        let cmd = bid(30, 20, 1);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "MAX_BELOW_BID", .. }
        ));
    }

    #[test]
    fn test_bid_quantity_over_remaining_is_rejected() {
        let item = active_item();
        let cmd = bid(15, 20, 4);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "OVER_QUANTITY", .. }
        ));
    }

    #[test]
    fn test_bid_quantity_zero_is_rejected() {
        let item = active_item();
        let cmd = bid(15, 20, 0);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidAmount { value: 0 }));
    }

    #[test]
    fn test_bid_before_start_is_rejected() {
        let mut item = active_item();
        item.start_time = Utc::now() + Duration::hours(1);
        item.status = STATUS_SCHEDULED.to_string();
        let cmd = bid(15, 20, 1);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "NOT_STARTED", .. }
        ));
    }

    #[test]
    fn test_bid_after_end_is_rejected() {
        // 상태 갱신이 아직 안 됐어도 종료 시각이 지났으면 거절된다
        let mut item = active_item();
        item.end_time = Utc::now() - Duration::seconds(1);
        let cmd = bid(15, 20, 1);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "ALREADY_ENDED", .. }
        ));
    }

    #[test]
    fn test_bid_on_completed_item_is_rejected() {
        let mut item = active_item();
        item.status = STATUS_COMPLETED.to_string();
        item.quantity = 0;
        let cmd = bid(600, 600, 1);
        let err = validate_place_bid(&item, &cmd, &BidPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "ALREADY_ENDED", .. }
        ));
    }

    fn buy(quantity: i64) -> BuyNowCommand {
        BuyNowCommand {
            item_id: 42,
            buyer_id: 9,
            quantity,
        }
    }

    #[test]
    fn test_buy_now_within_stock_is_accepted() {
        let item = active_item();
        assert!(validate_buy_now(&item, &buy(3), Utc::now()).is_ok());
    }

    #[test]
    fn test_buy_now_over_stock_is_rejected() {
        let item = active_item();
        let err = validate_buy_now(&item, &buy(4), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InsufficientStock {
                available: 3,
                requested: 4
            }
        ));
    }

    #[test]
    fn test_buy_now_quantity_zero_is_rejected() {
        let item = active_item();
        let err = validate_buy_now(&item, &buy(0), Utc::now()).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidAmount { value: 0 }));
    }

    #[test]
    fn test_buy_now_on_sold_out_item_is_rejected() {
        // 재고 소진으로 자동 종료된 상품: 종료가 먼저 걸린다
        let mut item = active_item();
        item.quantity = 0;
        item.status = STATUS_COMPLETED.to_string();
        let err = validate_buy_now(&item, &buy(1), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            AuctionError::InvalidBid { code: "ALREADY_ENDED", .. }
        ));
    }
}
