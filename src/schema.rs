// Diesel schema. Hand-maintained in the same style as a `diesel print-schema`
// dump (the teacher's own schema.rs is generated the same way), covering the
// tables named in spec.md §6.3.

diesel::table! {
    users (id) {
        id -> Int8,
        username -> Text,
        email -> Text,
        password_hash -> Text,
        created_at -> Timestamptz,
        last_login -> Nullable<Timestamptz>,
        is_active -> Bool,
    }
}

diesel::table! {
    planets (id) {
        id -> Int8,
        name -> Text,
        owner_id -> Int8,
        galaxy -> Int4,
        system -> Int4,
        position -> Int4,
        temperature -> Int4,
        size -> Int4,
        metal -> Int8,
        crystal -> Int8,
        deuterium -> Int8,
        metal_rate -> Float8,
        crystal_rate -> Float8,
        deuterium_rate -> Float8,
        last_update -> Timestamptz,
    }
}

diesel::table! {
    buildings (id) {
        id -> Int8,
        planet_id -> Int8,
        #[sql_name = "type"]
        type_ -> Text,
        level -> Int4,
    }
}

diesel::table! {
    fleets (id) {
        id -> Int8,
        planet_id -> Int8,
        light_fighter -> Int8,
        heavy_fighter -> Int8,
        cruiser -> Int8,
        battleship -> Int8,
        bomber -> Int8,
        colony_ship -> Int8,
    }
}

diesel::table! {
    research (id) {
        id -> Int8,
        user_id -> Int8,
        energy -> Int4,
        laser -> Int4,
        ion -> Int4,
        hyperspace -> Int4,
        plasma -> Int4,
        computer -> Int4,
    }
}

diesel::table! {
    notifications (id) {
        id -> Int8,
        user_id -> Int8,
        #[sql_name = "type"]
        type_ -> Text,
        payload -> Json,
        priority -> Text,
        created_at -> Timestamptz,
        read_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    building_queue (id) {
        id -> Int8,
        planet_id -> Int8,
        building_type -> Text,
        level -> Int4,
        enqueued_at -> Timestamptz,
        complete_at -> Timestamptz,
        status -> Text,
    }
}

diesel::table! {
    research_queue (id) {
        id -> Int8,
        user_id -> Int8,
        research_type -> Text,
        level -> Int4,
        enqueued_at -> Timestamptz,
        complete_at -> Timestamptz,
        status -> Text,
    }
}

diesel::table! {
    ship_build_queue (id) {
        id -> Int8,
        planet_id -> Int8,
        ship_type -> Text,
        count -> Int4,
        completion_time -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    fleet_missions (id) {
        id -> Int8,
        user_id -> Int8,
        origin_galaxy -> Int4,
        origin_system -> Int4,
        origin_position -> Int4,
        target_galaxy -> Int4,
        target_system -> Int4,
        target_position -> Int4,
        mission -> Text,
        speed -> Float8,
        recalled -> Bool,
        departure_time -> Timestamptz,
        arrival_time -> Timestamptz,
    }
}

diesel::table! {
    battle_reports (id) {
        id -> Int8,
        attacker_user_id -> Int8,
        defender_user_id -> Int8,
        location -> Json,
        outcome -> Json,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    espionage_reports (id) {
        id -> Int8,
        attacker_user_id -> Int8,
        defender_user_id -> Nullable<Int8>,
        location -> Json,
        snapshot -> Json,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    trade_offers (id) {
        id -> Int8,
        seller_user_id -> Int8,
        offered_resource -> Text,
        offered_amount -> Int8,
        requested_resource -> Text,
        requested_amount -> Int8,
        status -> Text,
        accepted_by -> Nullable<Int8>,
        accepted_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    trade_events (id) {
        id -> Int8,
        #[sql_name = "type"]
        type_ -> Text,
        offer_id -> Int8,
        seller_user_id -> Int8,
        buyer_user_id -> Nullable<Int8>,
        offered_resource -> Text,
        offered_amount -> Int8,
        requested_resource -> Text,
        requested_amount -> Int8,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    planets,
    buildings,
    fleets,
    research,
    notifications,
    building_queue,
    research_queue,
    ship_build_queue,
    fleet_missions,
    battle_reports,
    espionage_reports,
    trade_offers,
    trade_events,
);
