pub mod cached_olarm_client;
pub mod models;
pub mod olarm_client;
