//! HTTP request handlers.

pub mod health;
pub mod rooms;

pub use health::{health_check, metrics_handler, readiness_check};
pub use rooms::{
    add_option, claim_option, create_room, delete_option, get_room, list_my_rooms,
    release_option, update_question,
};
