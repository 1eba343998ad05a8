/// 평점 원장
/// 코멘트 기록 추가와 대상 사용자의 평점 집계 갱신을 한 트랜잭션으로 처리한다.
/// 코멘트만 보이고 평점이 안 바뀐 상태(또는 그 반대)는 관측될 수 없다.
// region:    --- Imports
use crate::error::AuctionError;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Models

// 사용자 모델
// rating은 이 사용자를 대상으로 커밋된 모든 코멘트 델타의 합과 같다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub rating: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

// 코멘트 모델 (추가 전용, 생성 후 불변)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub item_id: i64,
    pub rating: i64,
    pub content: String,
    pub comment_time: DateTime<Utc>,
}

// endregion: --- Models

// region:    --- Commands

/// 코멘트 작성 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCommentCommand {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub item_id: i64,
    // 부호 있는 평점 델타
    pub rating: i64,
    pub content: String,
}

/// 코멘트 결과 스냅샷
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentReceipt {
    pub comment_id: i64,
    pub to_user_id: i64,
    pub rating: i64,
}

// endregion: --- Commands

// region:    --- Ledger

/// 코멘트 작성
/// 단일 트랜잭션: 참조 확인 -> 대상 사용자 행 잠금 -> 코멘트 추가 -> 평점 갱신 -> 커밋
pub async fn handle_post_comment(
    cmd: PostCommentCommand,
    store: &impl AuctionStore,
) -> Result<CommentReceipt, AuctionError> {
    info!("{:<12} --> 코멘트 작성 처리 시작: {:?}", "RatingLedger", cmd);

    let mut tx = store.begin().await?;

    if !store.item_exists(&mut tx, cmd.item_id).await? {
        tx.rollback().await.ok();
        return Err(AuctionError::not_found("상품", cmd.item_id));
    }

    // 대상 사용자 행 잠금: 동시 코멘트의 평점 델타가 유실되지 않는다
    let to_user = store.user_for_update(&mut tx, cmd.to_user_id).await?;

    let now = Utc::now();
    let comment_id = store.insert_comment(&mut tx, &cmd, now).await?;
    let rating = store
        .apply_rating_delta(&mut tx, cmd.to_user_id, cmd.rating)
        .await?;
    tx.commit().await?;

    info!(
        "{:<12} --> 코멘트 커밋 완료: comment_id={}, 평점 {} -> {}",
        "RatingLedger", comment_id, to_user.rating, rating
    );
    Ok(CommentReceipt {
        comment_id,
        to_user_id: cmd.to_user_id,
        rating,
    })
}

// endregion: --- Ledger
