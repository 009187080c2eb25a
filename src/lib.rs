pub mod config;
pub mod db;
pub mod db_pool;
pub mod db_types;
pub mod doc_update;
pub mod filter;
pub mod handlers_diary;
pub mod handlers_health;
pub mod warp_helpers;
