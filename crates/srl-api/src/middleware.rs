pub mod catch_panic;
pub mod localhost;
pub mod request_id;
pub mod trace;
