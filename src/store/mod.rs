/// 경매 저장소: 내구 상태와 단위 작업(트랜잭션) 경계
/// 상품/사용자 집계 필드의 모든 변경은 행 잠금을 잡은 단일 트랜잭션 안에서 일어난다.
// region:    --- Imports
use crate::bidding::commands::{BuyNowCommand, PlaceBidCommand};
use crate::bidding::model::{Item, STATUS_COMPLETED};
use crate::error::AuctionError;
use crate::rating::{PostCommentCommand, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// endregion: --- Imports

/// 저장소 트랜잭션 핸들
/// commit/rollback은 핸들에서 직접 호출하고, 핸들이 그냥 드롭되면 롤백된다.
pub type StoreTx = Transaction<'static, Postgres>;

// region:    --- Auction Store Trait

/// 경매 저장소 트레이트
/// 엔진(입찰/즉시 구매/평점 원장)이 의존하는 단위 작업 프리미티브.
#[async_trait]
pub trait AuctionStore {
    /// 격리된 단위 작업 시작. 저장소가 작업을 받을 수 없으면 `StoreUnavailable`.
    async fn begin(&self) -> Result<StoreTx, AuctionError>;

    /// 상품 행을 쓰기 잠금과 함께 재조회
    /// 트랜잭션이 끝날 때까지 다른 쓰기 트랜잭션은 이 상품을 갱신할 수 없다.
    async fn item_for_update(&self, tx: &mut StoreTx, item_id: i64)
        -> Result<Item, AuctionError>;

    /// 상품 존재 확인 (잠금 없음)
    async fn item_exists(&self, tx: &mut StoreTx, item_id: i64) -> Result<bool, AuctionError>;

    /// 입찰 기록 추가. 생성된 id 반환
    async fn insert_bid(
        &self,
        tx: &mut StoreTx,
        cmd: &PlaceBidCommand,
        bid_time: DateTime<Utc>,
    ) -> Result<i64, AuctionError>;

    /// 입찰 집계 갱신: max_bid는 단조 증가, bid_count는 정확히 1 증가
    /// 갱신된 (max_bid, bid_count) 반환
    async fn apply_bid_aggregates(
        &self,
        tx: &mut StoreTx,
        item_id: i64,
        amount: i64,
    ) -> Result<(i64, i64), AuctionError>;

    /// 즉시 구매 기록 추가. 생성된 id 반환
    async fn insert_purchase(
        &self,
        tx: &mut StoreTx,
        cmd: &BuyNowCommand,
        purchase_time: DateTime<Utc>,
    ) -> Result<i64, AuctionError>;

    /// 재고 차감, 소진 시 자동 종료(status=COMPLETED, end_time=now). 남은 수량 반환
    async fn apply_buy_now_decrement(
        &self,
        tx: &mut StoreTx,
        item_id: i64,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, AuctionError>;

    /// 사용자 행을 쓰기 잠금과 함께 조회
    async fn user_for_update(&self, tx: &mut StoreTx, user_id: i64)
        -> Result<User, AuctionError>;

    /// 코멘트 기록 추가. 생성된 id 반환
    async fn insert_comment(
        &self,
        tx: &mut StoreTx,
        cmd: &PostCommentCommand,
        comment_time: DateTime<Utc>,
    ) -> Result<i64, AuctionError>;

    /// 평점 집계 갱신. 갱신된 평점 반환
    async fn apply_rating_delta(
        &self,
        tx: &mut StoreTx,
        user_id: i64,
        delta: i64,
    ) -> Result<i64, AuctionError>;
}

// endregion: --- Auction Store Trait

// region:    --- Postgres Store

/// Postgres 경매 저장소 구현체
pub struct PgAuctionStore {
    pool: Arc<PgPool>,
    lock_timeout_ms: u64,
}

impl PgAuctionStore {
    /// DATABASE_URL로 연결해 저장소 생성
    pub async fn connect() -> Result<Self, AuctionError> {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        // 잠금 대기 상한 (ms). 초과 시 무한 대기 대신 Conflict로 표면화된다.
        let lock_timeout_ms = std::env::var("LOCK_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .map_err(|e| AuctionError::StoreUnavailable {
                detail: e.to_string(),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
            lock_timeout_ms,
        })
    }

    /// 데이터베이스 풀 가져오기
    pub fn get_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 트랜잭션 실행 (읽기 경로에서 사용)
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// 데이터베이스 초기화
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        // 00-recreate-db.sql 실행
        let recreate_db_sql = include_str!("../sql/00-recreate-db.sql");
        self.execute_multi_query(recreate_db_sql).await?;

        // 01-create-schema.sql 실행
        let create_schema_sql = include_str!("../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;

        Ok(())
    }

    /// 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuctionStore for PgAuctionStore {
    async fn begin(&self) -> Result<StoreTx, AuctionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuctionError::StoreUnavailable {
                detail: e.to_string(),
            })?;

        // 행 잠금 대기 상한. 초과하면 55P03이 발생하고 Conflict로 분류된다.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout_ms
        ))
        .execute(&mut *tx)
        .await?;

        Ok(tx)
    }

    async fn item_for_update(
        &self,
        tx: &mut StoreTx,
        item_id: i64,
    ) -> Result<Item, AuctionError> {
        sqlx::query_as::<_, Item>(
            "SELECT id, name, description, initial_price, reserve_price, buy_now_price,
                    quantity, max_bid, bid_count, start_time, end_time, seller_id,
                    category_id, status, created_at
             FROM items WHERE id = $1
             FOR UPDATE",
        )
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AuctionError::NotFound {
            entity: "상품",
            id: item_id,
        })
    }

    async fn item_exists(&self, tx: &mut StoreTx, item_id: i64) -> Result<bool, AuctionError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM items WHERE id = $1) AS found")
            .bind(item_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.get("found"))
    }

    async fn insert_bid(
        &self,
        tx: &mut StoreTx,
        cmd: &PlaceBidCommand,
        bid_time: DateTime<Utc>,
    ) -> Result<i64, AuctionError> {
        let bid_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO bids (item_id, bidder_id, amount, max_amount, quantity, bid_time)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(cmd.item_id)
        .bind(cmd.bidder_id)
        .bind(cmd.amount)
        .bind(cmd.max_amount)
        .bind(cmd.quantity)
        .bind(bid_time)
        .fetch_one(&mut **tx)
        .await?;
        Ok(bid_id)
    }

    async fn apply_bid_aggregates(
        &self,
        tx: &mut StoreTx,
        item_id: i64,
        amount: i64,
    ) -> Result<(i64, i64), AuctionError> {
        let row = sqlx::query(
            "UPDATE items
             SET max_bid = GREATEST(max_bid, $2), bid_count = bid_count + 1
             WHERE id = $1
             RETURNING max_bid, bid_count",
        )
        .bind(item_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;
        Ok((row.get("max_bid"), row.get("bid_count")))
    }

    async fn insert_purchase(
        &self,
        tx: &mut StoreTx,
        cmd: &BuyNowCommand,
        purchase_time: DateTime<Utc>,
    ) -> Result<i64, AuctionError> {
        let purchase_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO purchases (item_id, buyer_id, quantity, purchase_time)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(cmd.item_id)
        .bind(cmd.buyer_id)
        .bind(cmd.quantity)
        .bind(purchase_time)
        .fetch_one(&mut **tx)
        .await?;
        Ok(purchase_id)
    }

    async fn apply_buy_now_decrement(
        &self,
        tx: &mut StoreTx,
        item_id: i64,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, AuctionError> {
        // 차감과 소진 시 자동 종료를 하나의 조건부 갱신으로 처리한다.
        // quantity >= $2 가드는 행 잠금 아래의 재검증과 같은 조건이므로,
        // 갱신 대상이 없으면 동시 쓰기 충돌로 본다.
        let row = sqlx::query(
            "UPDATE items
             SET quantity = quantity - $2,
                 status = CASE WHEN quantity - $2 = 0 THEN $4 ELSE status END,
                 end_time = CASE WHEN quantity - $2 = 0 THEN $3 ELSE end_time END
             WHERE id = $1 AND quantity >= $2
             RETURNING quantity",
        )
        .bind(item_id)
        .bind(quantity)
        .bind(now)
        .bind(STATUS_COMPLETED)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(|r| r.get("quantity"))
            .ok_or_else(|| AuctionError::Conflict {
                detail: format!("상품 {} 재고 차감 가드 실패", item_id),
            })
    }

    async fn user_for_update(
        &self,
        tx: &mut StoreTx,
        user_id: i64,
    ) -> Result<User, AuctionError> {
        sqlx::query_as::<_, User>(
            "SELECT id, nickname, rating, balance, created_at
             FROM users WHERE id = $1
             FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AuctionError::NotFound {
            entity: "사용자",
            id: user_id,
        })
    }

    async fn insert_comment(
        &self,
        tx: &mut StoreTx,
        cmd: &PostCommentCommand,
        comment_time: DateTime<Utc>,
    ) -> Result<i64, AuctionError> {
        let comment_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO comments (from_user_id, to_user_id, item_id, rating, content, comment_time)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(cmd.from_user_id)
        .bind(cmd.to_user_id)
        .bind(cmd.item_id)
        .bind(cmd.rating)
        .bind(&cmd.content)
        .bind(comment_time)
        .fetch_one(&mut **tx)
        .await?;
        Ok(comment_id)
    }

    async fn apply_rating_delta(
        &self,
        tx: &mut StoreTx,
        user_id: i64,
        delta: i64,
    ) -> Result<i64, AuctionError> {
        let row = sqlx::query(
            "UPDATE users SET rating = rating + $2 WHERE id = $1 RETURNING rating",
        )
        .bind(user_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.get("rating"))
    }
}

// endregion: --- Postgres Store
