use std::collections::HashSet;
use std::fs;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::{debug, info, trace};

use crate::codec::{decode_links, decode_u64, encode_links};
use crate::config::PageDbConfig;
use crate::crawled_page::CrawledPage;
use crate::error::{DbResult, Error};
use crate::hash::hash_url;
use crate::link_stream::PageDbLinkStream;
use crate::page_info::PageInfo;
use crate::ranking::{RankingAlgorithm, RankingScore};

const DB_INFO: &str = "info";
const DB_HASH2IDX: &str = "hash2idx";
const DB_HASH2INFO: &str = "hash2info";
const DB_LINKS: &str = "links";
const DB_HITS: &str = "hits";
const DB_PAGE_RANK: &str = "page_rank";

const INFO_KEY_N_PAGES: &[u8] = b"n_pages";

type RawDb = Database<Bytes, Bytes>;

/// Owner of the KV engine environment. Exposes transactional operations
/// over the five sub-databases (`info`, `hash2idx`, `hash2info`, `links`,
/// plus the ranking-output databases) and implements the crawled-page
/// ingestion protocol. There is no state beyond the open environment and
/// its transactions — `PageDb` is otherwise a pure function of its
/// persisted bytes.
pub struct PageDb {
    env: Env,
    info: RawDb,
    hash2idx: RawDb,
    hash2info: RawDb,
    links: RawDb,
    hits: RawDb,
    page_rank: RawDb,
}

impl PageDb {
    /// Ensures `path` exists as a directory (creating it if
    /// `config.create_if_missing`), opens the KV environment, and
    /// opens/creates the five sub-databases.
    pub fn open(path: impl AsRef<Path>, config: PageDbConfig) -> DbResult<PageDb> {
        let path = path.as_ref();

        if config.create_if_missing {
            fs::create_dir_all(path)
                .map_err(|err| Error::invalid_path(format!("{}: {err}", path.display())))?;
            info!(path = %path.display(), "ensured page database directory exists");
        } else if !path.is_dir() {
            return Err(Error::invalid_path(format!(
                "{} does not exist and create_if_missing is false",
                path.display()
            )));
        }

        let mut options = EnvOpenOptions::new();
        options.map_size(config.initial_map_size).max_dbs(8);
        if config.read_only {
            options.flags(heed::EnvFlags::READ_ONLY);
        }

        // SAFETY: `path` is a directory we (or a prior run) created
        // specifically to host this environment; no other process mmaps
        // it with an incompatible layout.
        let env = unsafe { options.open(path) }?;

        let (info, hash2idx, hash2info, links, hits, page_rank) = if config.read_only {
            let rtxn = env.read_txn()?;
            (
                open_existing(&env, &rtxn, DB_INFO)?,
                open_existing(&env, &rtxn, DB_HASH2IDX)?,
                open_existing(&env, &rtxn, DB_HASH2INFO)?,
                open_existing(&env, &rtxn, DB_LINKS)?,
                open_existing(&env, &rtxn, DB_HITS)?,
                open_existing(&env, &rtxn, DB_PAGE_RANK)?,
            )
        } else {
            let mut wtxn = env.write_txn()?;
            let info: RawDb = env.create_database(&mut wtxn, Some(DB_INFO))?;
            let hash2idx: RawDb = env.create_database(&mut wtxn, Some(DB_HASH2IDX))?;
            let hash2info: RawDb = env.create_database(&mut wtxn, Some(DB_HASH2INFO))?;
            let links: RawDb = env.create_database(&mut wtxn, Some(DB_LINKS))?;
            let hits: RawDb = env.create_database(&mut wtxn, Some(DB_HITS))?;
            let page_rank: RawDb = env.create_database(&mut wtxn, Some(DB_PAGE_RANK))?;

            if info.get(&wtxn, INFO_KEY_N_PAGES)?.is_none() {
                info!("bootstrapping fresh page counter");
                info.put(&mut wtxn, INFO_KEY_N_PAGES, &0u64.to_le_bytes())?;
            }

            wtxn.commit()?;
            (info, hash2idx, hash2info, links, hits, page_rank)
        };

        Ok(PageDb {
            env,
            info,
            hash2idx,
            hash2info,
            links,
            hits,
            page_rank,
        })
    }

    /// Ingests one crawl event inside a single write transaction: resolves
    /// or allocates the page's own index, updates its `PageInfo`, resolves
    /// or allocates an index for every link target, and replaces the
    /// page's row in `links`. Returns the sequence of `(fingerprint,
    /// PageInfo)` pairs the call examined — the page itself first, then
    /// the links in declared order, deduplicated by fingerprint.
    pub fn add(&self, page: &CrawledPage) -> DbResult<Vec<(u64, PageInfo)>> {
        let mut wtxn = self.env.write_txn()?;

        let mut touched = Vec::with_capacity(1 + page.links().len());
        let mut seen = HashSet::with_capacity(1 + page.links().len());

        let h_page = hash_url(page.url());
        let (idx_page, page_info) = self.upsert_crawled(&mut wtxn, h_page, page)?;
        seen.insert(h_page);
        touched.push((h_page, page_info));
        debug!(idx = idx_page, url = page.url(), "upserted crawled page");

        let mut link_indices = Vec::with_capacity(page.links().len());
        for (link_url, link_score) in page.links() {
            let h_link = hash_url(link_url);
            if h_link == h_page {
                // No self-loops recorded.
                continue;
            }

            let (idx_link, info) =
                self.resolve_link_target(&mut wtxn, h_link, link_url, *link_score)?;
            trace!(idx = idx_link, url = link_url, "resolved link target");
            link_indices.push(idx_link);
            if seen.insert(h_link) {
                touched.push((h_link, info));
            }
        }

        self.links
            .put(&mut wtxn, &idx_page.to_le_bytes(), &encode_links(&link_indices))?;

        wtxn.commit()?;
        Ok(touched)
    }

    pub fn get_info_from_url(&self, url: &str) -> DbResult<Option<PageInfo>> {
        self.get_info_from_hash(hash_url(url))
    }

    pub fn get_info_from_hash(&self, hash: u64) -> DbResult<Option<PageInfo>> {
        let rtxn = self.env.read_txn()?;
        match self.hash2info.get(&rtxn, &hash.to_le_bytes())? {
            Some(bytes) => Ok(Some(PageInfo::load(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_idx(&self, url: &str) -> DbResult<u64> {
        let hash = hash_url(url);
        let rtxn = self.env.read_txn()?;
        match self.hash2idx.get(&rtxn, &hash.to_le_bytes())? {
            Some(bytes) => decode_u64(bytes),
            None => Err(Error::no_page(url)),
        }
    }

    /// The current page counter, `N`.
    pub fn page_count(&self) -> DbResult<u64> {
        let rtxn = self.env.read_txn()?;
        match self.info.get(&rtxn, INFO_KEY_N_PAGES)? {
            Some(bytes) => decode_u64(bytes),
            None => Ok(0),
        }
    }

    /// The targets stored for `from`'s most recent crawl, or `None` if
    /// `from` has no row in `links` (either it was never crawled, or it
    /// was crawled with no outbound links).
    pub fn get_links(&self, from: u64) -> DbResult<Option<Vec<u64>>> {
        let rtxn = self.env.read_txn()?;
        match self.links.get(&rtxn, &from.to_le_bytes())? {
            Some(bytes) => Ok(Some(decode_links(bytes)?)),
            None => Ok(None),
        }
    }

    /// Invokes `algo` over a fresh link stream on `self` and persists the
    /// resulting HITS score vector, fully replacing the prior one.
    pub fn update_hits<A>(&self, algo: &mut A) -> DbResult<()>
    where
        A: RankingAlgorithm<Score = f32>,
    {
        self.update_scores(self.hits, algo)
    }

    /// As [`Self::update_hits`], but for PageRank.
    pub fn update_page_rank<A>(&self, algo: &mut A) -> DbResult<()>
    where
        A: RankingAlgorithm<Score = f64>,
    {
        self.update_scores(self.page_rank, algo)
    }

    fn update_scores<A>(&self, db: RawDb, algo: &mut A) -> DbResult<()>
    where
        A: RankingAlgorithm,
    {
        let stream = PageDbLinkStream::new(self)?;
        let scores = algo
            .compute(stream)
            .map_err(|err| Error::internal(err.to_string()))?;

        let mut wtxn = self.env.write_txn()?;
        db.clear(&mut wtxn)?;
        for (idx, score) in scores.into_iter().enumerate() {
            db.put(&mut wtxn, &(idx as u64).to_le_bytes(), &score.to_le_bytes_vec())?;
        }
        wtxn.commit()?;
        Ok(())
    }

    /// The environment handle, exposed as the sole coupling point for
    /// external modules (ranking algorithms, the link stream) that need to
    /// open their own transaction and cursor.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn read_txn(&self) -> DbResult<RoTxn<'_>> {
        Ok(self.env.read_txn()?)
    }

    pub fn write_txn(&self) -> DbResult<RwTxn<'_>> {
        Ok(self.env.write_txn()?)
    }

    pub fn info_database(&self) -> RawDb {
        self.info
    }

    pub fn hash2idx_database(&self) -> RawDb {
        self.hash2idx
    }

    pub fn hash2info_database(&self) -> RawDb {
        self.hash2info
    }

    pub(crate) fn links_database(&self) -> RawDb {
        self.links
    }

    pub fn hits_database(&self) -> RawDb {
        self.hits
    }

    pub fn page_rank_database(&self) -> RawDb {
        self.page_rank
    }

    /// Allocates the next page index and records the `hash2idx` entry.
    /// Must run inside the same write transaction as the caller's
    /// `hash2info` insert, so a failed `add` leaves neither half behind.
    fn alloc_index(&self, wtxn: &mut RwTxn, hash: u64) -> DbResult<u64> {
        let current = match self.info.get(wtxn, INFO_KEY_N_PAGES)? {
            Some(bytes) => decode_u64(bytes)?,
            None => 0,
        };
        self.info
            .put(wtxn, INFO_KEY_N_PAGES, &(current + 1).to_le_bytes())?;
        self.hash2idx.put(wtxn, &hash.to_le_bytes(), &current.to_le_bytes())?;
        Ok(current)
    }

    /// Implements the hit/miss branch of ingestion step 2 (§4.3) for the
    /// crawled page itself.
    fn upsert_crawled(
        &self,
        wtxn: &mut RwTxn,
        hash: u64,
        page: &CrawledPage,
    ) -> DbResult<(u64, PageInfo)> {
        match self.hash2idx.get(wtxn, &hash.to_le_bytes())? {
            Some(idx_bytes) => {
                let idx = decode_u64(idx_bytes)?;
                let existing = self
                    .hash2info
                    .get(wtxn, &hash.to_le_bytes())?
                    .ok_or_else(|| {
                        Error::internal("hash2idx entry has no matching hash2info entry")
                    })?;
                let mut info = PageInfo::load(existing)?;

                if !info.content_hash.is_empty() && info.content_hash != page.content_hash() {
                    info.n_changes += 1;
                }
                info.last_crawl = page.time();
                info.score = page.score();
                info.content_hash = page.content_hash().to_vec();
                info.n_crawls += 1;

                self.hash2info.put(wtxn, &hash.to_le_bytes(), &info.dump()?)?;
                Ok((idx, info))
            }
            None => {
                let idx = self.alloc_index(wtxn, hash)?;
                let info = PageInfo {
                    url: page.url().to_string(),
                    first_crawl: page.time(),
                    last_crawl: page.time(),
                    n_crawls: 1,
                    n_changes: 0,
                    score: page.score(),
                    content_hash: page.content_hash().to_vec(),
                };
                self.hash2info.put(wtxn, &hash.to_le_bytes(), &info.dump()?)?;
                Ok((idx, info))
            }
        }
    }

    /// Implements the hit/miss branch of ingestion step 3 for a link
    /// target. On a hit, the target's `PageInfo` is left unchanged — the
    /// per-link score is discarded once a page is already known (§9, "Open
    /// question — score of known link targets": the per-page score
    /// dominates, frozen as the current behaviour).
    fn resolve_link_target(
        &self,
        wtxn: &mut RwTxn,
        hash: u64,
        url: &str,
        link_score: f32,
    ) -> DbResult<(u64, PageInfo)> {
        match self.hash2idx.get(wtxn, &hash.to_le_bytes())? {
            Some(idx_bytes) => {
                let idx = decode_u64(idx_bytes)?;
                let existing = self
                    .hash2info
                    .get(wtxn, &hash.to_le_bytes())?
                    .ok_or_else(|| {
                        Error::internal("hash2idx entry has no matching hash2info entry")
                    })?;
                Ok((idx, PageInfo::load(existing)?))
            }
            None => {
                let idx = self.alloc_index(wtxn, hash)?;
                let info = PageInfo {
                    url: url.to_string(),
                    first_crawl: 0.0,
                    last_crawl: 0.0,
                    n_crawls: 0,
                    n_changes: 0,
                    score: link_score,
                    content_hash: Vec::new(),
                };
                self.hash2info.put(wtxn, &hash.to_le_bytes(), &info.dump()?)?;
                Ok((idx, info))
            }
        }
    }
}

fn open_existing(env: &Env, rtxn: &RoTxn, name: &str) -> DbResult<RawDb> {
    env.open_database(rtxn, Some(name))?
        .ok_or_else(|| Error::invalid_path(format!("sub-database {name:?} is missing")))
}
