/// The information that comes with a single crawl event: the page's own
/// URL, timestamp and score, its content hash, and the outbound links
/// observed on it. `CrawledPage` is transient and input-only — it is never
/// read back from the database; [`crate::PageInfo`] is the persisted shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawledPage {
    url: String,
    links: Vec<(String, f32)>,
    time: f64,
    score: f32,
    content_hash: Vec<u8>,
}

impl CrawledPage {
    /// Creates a crawled page with no links, a zero score, and an empty
    /// content hash. Use the `with_*`/`add_link` methods to fill those in.
    pub fn new(url: impl Into<String>, time: f64) -> Self {
        CrawledPage {
            url: url.into(),
            links: Vec::new(),
            time,
            score: 0.0,
            content_hash: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Appends a link in declared order; order is preserved on storage.
    pub fn add_link(mut self, url: impl Into<String>, score: f32) -> Self {
        self.links.push((url.into(), score));
        self
    }

    /// Sets the content hash from an opaque byte buffer.
    pub fn with_content_hash_bytes(mut self, hash: impl Into<Vec<u8>>) -> Self {
        self.content_hash = hash.into();
        self
    }

    pub fn with_content_hash_u128(self, hash: u128) -> Self {
        self.with_content_hash_bytes(hash.to_le_bytes().to_vec())
    }

    pub fn with_content_hash_u64(self, hash: u64) -> Self {
        self.with_content_hash_bytes(hash.to_le_bytes().to_vec())
    }

    pub fn with_content_hash_u32(self, hash: u32) -> Self {
        self.with_content_hash_bytes(hash.to_le_bytes().to_vec())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn links(&self) -> &[(String, f32)] {
        &self.links
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn content_hash(&self) -> &[u8] {
        &self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_link_order() {
        let page = CrawledPage::new("http://a", 1.0)
            .add_link("http://b", 0.1)
            .add_link("http://c", 0.2);

        assert_eq!(
            page.links(),
            &[("http://b".to_string(), 0.1), ("http://c".to_string(), 0.2)]
        );
    }

    #[test]
    fn content_hash_constructors_agree_on_byte_length() {
        assert_eq!(
            CrawledPage::new("http://a", 0.0)
                .with_content_hash_u32(1)
                .content_hash()
                .len(),
            4
        );
        assert_eq!(
            CrawledPage::new("http://a", 0.0)
                .with_content_hash_u64(1)
                .content_hash()
                .len(),
            8
        );
        assert_eq!(
            CrawledPage::new("http://a", 0.0)
                .with_content_hash_u128(1)
                .content_hash()
                .len(),
            16
        );
    }
}
