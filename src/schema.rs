diesel::table! {
    message (id) {
        id -> Integer,
        message_id -> Text,
        sender_id -> Integer,
        receiver_id -> Integer,
        content -> Text,
        nonce -> Text,
        ephemeral_key -> Text,
        message_key -> Text,
        file_name -> Nullable<Text>,
        file_type -> Nullable<Text>,
        file_size -> Nullable<BigInt>,
        file_path -> Nullable<Text>,
        created_at -> Timestamp,
        #[sql_name = "type"]
        type_ -> Text,
        is_edited -> Bool,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    user (id) {
        id -> Integer,
        username -> Text,
        created_at -> Timestamp,
        last_seen -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(message, user);
