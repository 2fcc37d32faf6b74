pub mod catalogue;
pub mod config;
pub mod content;
pub mod domain;
pub mod download;
pub mod error;
pub mod http;
pub mod output;
pub mod paginate;
pub mod portal;
pub mod record;
pub mod search;
pub mod store;
