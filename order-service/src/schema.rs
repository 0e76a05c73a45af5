diesel::table! {
    businesses (id) {
        id -> Uuid,
        user_id -> Uuid,
        business_name -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    business_payment_methods (id) {
        id -> Uuid,
        business_id -> Uuid,
        payment_type -> Varchar,
        account_details -> Jsonb,
        is_active -> Bool,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    spare_parts (id) {
        id -> Uuid,
        business_id -> Uuid,
        name -> Varchar,
        price -> Numeric,
        discount_percentage -> Numeric,
        stock -> Int4,
        sales_count -> Int4,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        order_number -> Varchar,
        status -> Varchar,
        shipping_address -> Text,
        shipping_phone -> Nullable<Varchar>,
        shipping_notes -> Nullable<Text>,
        payment_id -> Nullable<Uuid>,
        subtotal -> Numeric,
        shipping_cost -> Numeric,
        discount -> Numeric,
        total -> Numeric,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    order_details (id) {
        id -> Uuid,
        order_id -> Uuid,
        spare_part_id -> Uuid,
        quantity -> Int4,
        unit_price -> Numeric,
        discount -> Numeric,
        total -> Numeric,
        line_number -> Int4,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    payments (id) {
        id -> Uuid,
        order_id -> Uuid,
        user_id -> Uuid,
        business_id -> Uuid,
        payment_method_id -> Uuid,
        amount -> Numeric,
        reference_number -> Nullable<Varchar>,
        payment_status -> Varchar,
        payment_date -> Nullable<Timestamptz>,
        proof_image -> Nullable<Varchar>,
        notes -> Nullable<Text>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(business_payment_methods -> businesses (business_id));
diesel::joinable!(spare_parts -> businesses (business_id));
diesel::joinable!(order_details -> orders (order_id));
diesel::joinable!(order_details -> spare_parts (spare_part_id));

diesel::allow_tables_to_appear_in_same_query!(
    businesses,
    business_payment_methods,
    spare_parts,
    orders,
    order_details,
    payments,
);
