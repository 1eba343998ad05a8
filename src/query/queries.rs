/// 상품 조회
pub const GET_ITEM: &str = "SELECT id, name, description, initial_price, reserve_price, buy_now_price, quantity, max_bid, bid_count, start_time, end_time, seller_id, category_id, status, created_at FROM items WHERE id = $1";

/// 모든 상품 조회
pub const GET_ALL_ITEMS: &str = "SELECT id, name, description, initial_price, reserve_price, buy_now_price, quantity, max_bid, bid_count, start_time, end_time, seller_id, category_id, status, created_at FROM items ORDER BY created_at DESC";

/// 최고 입찰 조회
pub const GET_HIGHEST_BID: &str =
    "SELECT MAX(amount) as highest_bid FROM bids WHERE item_id = $1";

/// 입찰 이력 조회
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, item_id, bidder_id, amount, max_amount, quantity, bid_time
    FROM bids
    WHERE item_id = $1
    ORDER BY bid_time DESC
"#;

/// 구매 이력 조회
pub const GET_ITEM_PURCHASES: &str = r#"
    SELECT id, item_id, buyer_id, quantity, purchase_time
    FROM purchases
    WHERE item_id = $1
    ORDER BY purchase_time DESC
"#;

/// 사용자 조회
pub const GET_USER: &str =
    "SELECT id, nickname, rating, balance, created_at FROM users WHERE id = $1";

/// 사용자가 받은 코멘트 조회
pub const GET_USER_COMMENTS: &str = r#"
    SELECT id, from_user_id, to_user_id, item_id, rating, content, comment_time
    FROM comments
    WHERE to_user_id = $1
    ORDER BY comment_time DESC
"#;
