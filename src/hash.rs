use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Fixed for the lifetime of a database: changing it invalidates every
/// existing `hash2idx`/`hash2info`/`links` entry, since the hash is the key
/// under which all of that data is filed.
const SEED: u64 = 0;

/// Produces the 64-bit fingerprint used everywhere as the stable short key
/// for a URL. All processes touching the same database must agree
/// byte-exactly on this function and its seed.
pub fn hash_url(url: &str) -> u64 {
    xxh3_64_with_seed(url.as_bytes(), SEED)
}
