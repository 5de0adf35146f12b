use pagedb::CrawledPage;

mod test_utils;
use test_utils::TestPageDb;

#[test]
fn s1_fresh_insert() {
    let db = TestPageDb::new_temp().unwrap();

    db.add(
        &CrawledPage::new("http://a", 1000.0)
            .with_score(0.5)
            .with_content_hash_u64(0xAA)
            .add_link("http://b", 0.1),
    )
    .unwrap();

    assert_eq!(db.page_count().unwrap(), 2);
    assert_eq!(db.get_idx("http://a").unwrap(), 0);
    assert_eq!(db.get_idx("http://b").unwrap(), 1);
    assert_eq!(
        db.get_info_from_url("http://b").unwrap().unwrap().n_crawls,
        0
    );
    assert_eq!(db.get_links(0).unwrap().unwrap(), vec![1]);
}

#[test]
fn s2_recrawl_unchanged() {
    let db = TestPageDb::new_temp().unwrap();
    db.add(
        &CrawledPage::new("http://a", 1000.0)
            .with_score(0.5)
            .with_content_hash_u64(0xAA)
            .add_link("http://b", 0.1),
    )
    .unwrap();

    db.add(&CrawledPage::new("http://a", 2000.0).with_content_hash_u64(0xAA))
        .unwrap();

    let info = db.get_info_from_url("http://a").unwrap().unwrap();
    assert_eq!(info.n_crawls, 2);
    assert_eq!(info.n_changes, 0);
    assert_eq!(info.first_crawl, 1000.0);
    assert_eq!(info.last_crawl, 2000.0);
}

#[test]
fn s3_recrawl_changed() {
    let db = TestPageDb::new_temp().unwrap();
    db.add(
        &CrawledPage::new("http://a", 1000.0)
            .with_score(0.5)
            .with_content_hash_u64(0xAA)
            .add_link("http://b", 0.1),
    )
    .unwrap();
    db.add(&CrawledPage::new("http://a", 2000.0).with_content_hash_u64(0xAA))
        .unwrap();
    db.add(&CrawledPage::new("http://a", 3000.0).with_content_hash_u64(0xBB))
        .unwrap();

    let info = db.get_info_from_url("http://a").unwrap().unwrap();
    assert_eq!(info.n_crawls, 3);
    assert_eq!(info.n_changes, 1);
    assert_eq!(info.content_hash, 0xBBu64.to_le_bytes());
}

#[test]
fn s4_self_loop_is_dropped() {
    let db = TestPageDb::new_temp().unwrap();
    db.add(&CrawledPage::new("http://c", 1.0).add_link("http://c", 0.0))
        .unwrap();

    let idx_c = db.get_idx("http://c").unwrap();
    let links = db.get_links(idx_c).unwrap().unwrap();
    assert!(!links.contains(&idx_c));
    assert!(links.is_empty());
}
