//! `pagedb` — a transactional, memory-mapped store for a web crawler's
//! page metadata and link graph.
//!
//! A [`PageDb`] maps URLs (by a 64-bit fingerprint, see [`hash_url`]) to
//! dense page indices and [`PageInfo`] crawl aggregates, and stores each
//! page's most recently observed outbound links keyed by index. Ingesting
//! one crawl event is a single call to [`PageDb::add`]; the link graph can
//! be streamed back out with [`PageDbLinkStream`] for consumption by an
//! external ranking algorithm implementing [`RankingAlgorithm`].
//!
//! This crate does not crawl, schedule, rank, or parse HTML — it is the
//! storage core those concerns sit on top of.

mod codec;
mod config;
mod crawled_page;
mod error;
mod hash;
mod link_stream;
mod page_db;
mod page_info;
mod ranking;

pub use config::{PageDbConfig, DEFAULT_MAP_SIZE};
pub use crawled_page::CrawledPage;
pub use error::{DbResult, Error};
pub use hash::hash_url;
pub use link_stream::{Link, PageDbLinkStream, StreamState};
pub use page_db::PageDb;
pub use page_info::PageInfo;
pub use ranking::{RankingAlgorithm, RankingScore};
