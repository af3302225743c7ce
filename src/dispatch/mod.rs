pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod payload;
pub mod rank_cache;
pub mod registry;
