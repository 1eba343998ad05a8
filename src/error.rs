/// 경매 코어 오류 타입
/// "입력이 거절되었다"(검증)와 "다시 시도하라"(충돌/장애)를 구분한다.
// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Error Taxonomy

#[derive(Debug, Error)]
pub enum AuctionError {
    /// 입찰 전제조건 위반: 트랜잭션 부수효과 없이 거절
    #[error("입찰이 거절되었습니다: {detail}")]
    InvalidBid { code: &'static str, detail: String },

    /// 금액/수량 입력값 오류
    #[error("잘못된 값입니다: {value}")]
    InvalidAmount { value: i64 },

    /// 요청 수량이 남은 수량을 초과
    #[error("재고가 부족합니다: 남은 수량 {available}, 요청 수량 {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// 참조 대상 미존재: 잠금을 잡기 전에 실패
    #[error("{entity}을(를) 찾을 수 없습니다: id {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// 동시 쓰기 충돌: 트랜잭션은 전부 롤백되었고, 재시도 여부는 호출자가 결정한다
    #[error("동시 쓰기 충돌이 발생했습니다: {detail}")]
    Conflict { detail: String },

    /// 저장소 장애: 비즈니스 오류가 아닌 인프라 오류
    #[error("저장소를 사용할 수 없습니다: {detail}")]
    StoreUnavailable { detail: String },
}

impl AuctionError {
    /// 입찰 거절 오류 생성
    pub fn invalid_bid(code: &'static str, detail: impl Into<String>) -> Self {
        AuctionError::InvalidBid {
            code,
            detail: detail.into(),
        }
    }

    /// 미존재 오류 생성
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        AuctionError::NotFound { entity, id }
    }

    /// 호출자가 전체 연산을 처음부터 재시도해도 안전한 오류인지
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuctionError::Conflict { .. } | AuctionError::StoreUnavailable { .. }
        )
    }

    /// 응답 JSON에 실리는 기계 판독용 코드
    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::InvalidBid { code, .. } => code,
            AuctionError::InvalidAmount { .. } => "INVALID_AMOUNT",
            AuctionError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AuctionError::NotFound { .. } => "NOT_FOUND",
            AuctionError::Conflict { .. } => "CONFLICT",
            AuctionError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }
}

/// sqlx 오류 분류
/// 잠금 대기 상한 초과(55P03)와 직렬화 실패(40001)는 재시도 가능한 충돌,
/// 그 외는 인프라 장애로 본다.
impl From<sqlx::Error> for AuctionError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(code) = db_err.code() {
                if code == "55P03" || code == "40001" {
                    return AuctionError::Conflict {
                        detail: db_err.to_string(),
                    };
                }
            }
        }
        AuctionError::StoreUnavailable {
            detail: e.to_string(),
        }
    }
}

// endregion: --- Error Taxonomy

// region:    --- HTTP Mapping

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuctionError::InvalidBid { .. }
            | AuctionError::InvalidAmount { .. }
            | AuctionError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AuctionError::NotFound { .. } => StatusCode::NOT_FOUND,
            AuctionError::Conflict { .. } => StatusCode::CONFLICT,
            AuctionError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

// endregion: --- HTTP Mapping

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_display() {
        let e = AuctionError::InsufficientStock {
            available: 1,
            requested: 3,
        };
        assert_eq!(
            e.to_string(),
            "재고가 부족합니다: 남은 수량 1, 요청 수량 3"
        );
        assert_eq!(e.code(), "INSUFFICIENT_STOCK");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_invalid_bid_carries_code() {
        let e = AuctionError::invalid_bid("LOW_BID", "입찰 금액이 너무 낮습니다.");
        assert_eq!(e.code(), "LOW_BID");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_conflict_is_retryable() {
        let e = AuctionError::Conflict {
            detail: "lock timeout".to_string(),
        };
        assert!(e.is_retryable());
        assert_eq!(e.code(), "CONFLICT");
    }

    #[test]
    fn test_not_found_display() {
        let e = AuctionError::not_found("상품", 42);
        assert_eq!(e.to_string(), "상품을(를) 찾을 수 없습니다: id 42");
    }
}
