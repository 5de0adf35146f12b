use std::ops::Deref;

use pagedb::{DbResult, PageDb, PageDbConfig};
use tempfile::TempDir;

/// Sets up tracing subscriber.
#[allow(dead_code)]
pub fn setup_tracing(level: Option<&str>) {
    use tracing_subscriber::{
        fmt::{format::FmtSpan, layer},
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter_layer = level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()));
    let fmt_layer = layer().with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

/// A `PageDb` rooted in a fresh temporary directory, torn down on drop.
/// An LMDB-backed environment is itself a directory of several files, so
/// the test harness holds a `TempDir` rather than a bare path.
pub struct TestPageDb(PageDb, TempDir);

impl TestPageDb {
    pub fn new_temp() -> DbResult<Self> {
        let dir = TempDir::new().expect("failed to create temp dir");
        let db = PageDb::open(dir.path(), PageDbConfig::default())?;
        Ok(Self(db, dir))
    }
}

impl Deref for TestPageDb {
    type Target = PageDb;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
