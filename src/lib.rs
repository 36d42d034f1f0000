// Library for tests to access modules

pub mod backfill;
pub mod config;
pub mod error;
pub mod models;
pub mod owners;
pub mod rollup;
pub mod rollup_worker;
pub mod routes;
pub mod series;
pub mod stats_repo;
pub mod sync;
pub mod timebucket;
pub mod version;
