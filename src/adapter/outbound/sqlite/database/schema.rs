// Diesel table definitions matching migrations/.

diesel::table! {
    users (id) {
        id -> Text,
        external_ref -> Text,
        username -> Nullable<Text>,
        balance -> BigInt,
        total_deposited -> BigInt,
        total_withdrawn -> BigInt,
        custody_handle -> Nullable<Text>,
        custody_blob -> Nullable<Text>,
        referral_code -> Text,
        referred_by -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    rooms (id) {
        id -> Text,
        title -> Text,
        market_kind -> Text,
        market_ref -> Nullable<Text>,
        target -> Text,
        lock_at -> Text,
        settle_at -> Text,
        status -> Text,
        capacity -> Integer,
        current_players -> Integer,
        min_bet -> BigInt,
        max_bet -> Nullable<BigInt>,
        total_pool -> BigInt,
        yes_pool -> BigInt,
        no_pool -> BigInt,
        lock_price -> Nullable<Text>,
        settle_price -> Nullable<Text>,
        winning_side -> Nullable<Text>,
        chat_id -> Nullable<Text>,
        invite_link -> Nullable<Text>,
        creator_id -> Nullable<Text>,
        protocol_fee -> BigInt,
        host_fee -> BigInt,
        created_at -> Text,
        locked_at -> Nullable<Text>,
        settled_at -> Nullable<Text>,
    }
}

diesel::table! {
    bets (id) {
        id -> Text,
        room_id -> Text,
        user_id -> Text,
        side -> Text,
        amount -> BigInt,
        status -> Text,
        settled -> Bool,
        won -> Nullable<Bool>,
        payout -> BigInt,
        created_at -> Text,
    }
}

diesel::table! {
    transactions (id) {
        id -> Text,
        user_id -> Text,
        kind -> Text,
        amount -> BigInt,
        room_id -> Nullable<Text>,
        memo -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    chat_pool (id) {
        id -> Text,
        chat_id -> Text,
        status -> Text,
        room_id -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    sessions (key) {
        key -> Text,
        value -> Text,
        expires_at -> Text,
    }
}

diesel::joinable!(bets -> rooms (room_id));
diesel::joinable!(bets -> users (user_id));
diesel::joinable!(transactions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, rooms, bets, transactions, chat_pool, sessions);
