use heed::types::Bytes;
use heed::{Database, Env, RoIter, RoTxn};
use ouroboros::self_referencing;

use crate::codec::{decode_links, decode_u64};
use crate::error::{DbResult, Error};
use crate::page_db::PageDb;

/// One edge yielded by [`PageDbLinkStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Link {
    pub from: u64,
    pub to: u64,
}

/// `init -> next -> end`, with `error` reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Init,
    Next,
    End,
    Error,
}

/// Owns the read transaction and cursor the stream walks. A `RoTxn`
/// borrows the `Env` it comes from, and the cursor in turn borrows the
/// `RoTxn` — storing both alongside each other in one struct is exactly
/// the self-referential shape `ouroboros` exists for. `env` is a cheap
/// clone of the handle (an `Arc` under the hood), so the cursor pins the
/// environment open independently of the `PageDb` that created it, which
/// matches the "long-lived readers pin the old snapshot" rule in `spec.md`
/// §5.
#[self_referencing]
struct LinkCursor {
    env: Env,
    links: Database<Bytes, Bytes>,
    #[borrows(env)]
    #[covariant]
    rtxn: RoTxn<'this>,
    #[borrows(rtxn, links)]
    #[covariant]
    iter: RoIter<'this, Bytes, Bytes>,
}

impl LinkCursor {
    fn open(env: Env, links: Database<Bytes, Bytes>) -> DbResult<Self> {
        LinkCursorTryBuilder {
            env,
            links,
            rtxn_builder: |env: &Env| env.read_txn().map_err(Error::from),
            iter_builder: |rtxn: &RoTxn<'_>, links: &Database<Bytes, Bytes>| {
                links.iter(rtxn).map_err(Error::from)
            },
        }
        .try_build()
    }
}

/// Forward-only cursor over the `links` sub-database, yielding `(from,
/// to)` edges lazily. Opens a long-lived read transaction on construction;
/// while the stream is alive no write transaction of this process may
/// commit a new snapshot the stream would see (it keeps observing the
/// snapshot as of `new`/`reset`).
pub struct PageDbLinkStream {
    cursor: LinkCursor,
    from: u64,
    /// Reusable growable buffer for the current row's targets. An ordinary
    /// `Vec` already gives the amortised O(1)-per-push behaviour that
    /// `original_source`'s hand-rolled doubling `to[]` buffer exists for;
    /// `PAGE_LINKS_MIN_LINKS = 10` is kept only as the initial capacity
    /// hint.
    to: Vec<u64>,
    i: usize,
    state: StreamState,
    last_error: Option<Error>,
}

impl PageDbLinkStream {
    /// Opens a new stream over `db`, positioned before the first key.
    pub fn new(db: &PageDb) -> DbResult<Self> {
        let cursor = LinkCursor::open(db.env().clone(), db.links_database())?;
        Ok(PageDbLinkStream {
            cursor,
            from: 0,
            to: Vec::with_capacity(10),
            i: 0,
            state: StreamState::Init,
            last_error: None,
        })
    }

    /// Advances the stream, writing the next edge into `link` on
    /// [`StreamState::Next`]. Within a row, this only pops from the
    /// in-memory `to[]` buffer; the KV engine is touched only when
    /// crossing to the next `from` key.
    pub fn next(&mut self, link: &mut Link) -> StreamState {
        loop {
            if self.i < self.to.len() {
                link.from = self.from;
                link.to = self.to[self.i];
                self.i += 1;
                self.state = StreamState::Next;
                return self.state;
            }

            match self.cursor.with_iter_mut(|iter| iter.next()) {
                None => {
                    self.state = StreamState::End;
                    return self.state;
                }
                Some(Err(err)) => {
                    self.last_error = Some(Error::from(err));
                    self.state = StreamState::Error;
                    return self.state;
                }
                Some(Ok((from_bytes, to_bytes))) => {
                    let from = match decode_u64(from_bytes) {
                        Ok(value) => value,
                        Err(err) => {
                            self.last_error = Some(err);
                            self.state = StreamState::Error;
                            return self.state;
                        }
                    };
                    let targets = match decode_links(to_bytes) {
                        Ok(value) => value,
                        Err(err) => {
                            self.last_error = Some(err);
                            self.state = StreamState::Error;
                            return self.state;
                        }
                    };

                    self.from = from;
                    self.to.clear();
                    self.to.extend_from_slice(&targets);
                    self.i = 0;
                    // loop back around: either emit from this row or, if
                    // it somehow has no targets, advance again.
                }
            }
        }
    }

    /// Repositions before the first key, re-reading the latest committed
    /// snapshot, and returns to [`StreamState::Init`].
    pub fn reset(&mut self) -> DbResult<StreamState> {
        let env = self.cursor.borrow_env().clone();
        let links = *self.cursor.borrow_links();
        self.cursor = LinkCursor::open(env, links)?;
        self.to.clear();
        self.i = 0;
        self.last_error = None;
        self.state = StreamState::Init;
        Ok(self.state)
    }

    /// The last error recorded, if the stream is in [`StreamState::Error`].
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Aborts the read transaction and releases the cursor. Equivalent to
    /// dropping the stream; provided for parity with the abstract API in
    /// `spec.md` §6.
    pub fn delete(self) {}
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{CrawledPage, PageDbConfig};

    fn open_db() -> (tempfile::TempDir, PageDb) {
        let dir = tempdir().unwrap();
        let db = PageDb::open(dir.path(), PageDbConfig::default()).unwrap();
        (dir, db)
    }

    #[test]
    fn drains_exactly_the_stored_edges() {
        let (_dir, db) = open_db();
        db.add(&CrawledPage::new("http://a", 1.0).add_link("http://b", 0.1))
            .unwrap();
        db.add(&CrawledPage::new("http://b", 2.0).add_link("http://a", 0.1))
            .unwrap();

        let mut stream = PageDbLinkStream::new(&db).unwrap();
        let mut link = Link::default();
        let mut seen = Vec::new();
        loop {
            match stream.next(&mut link) {
                StreamState::Next => seen.push(link),
                StreamState::End => break,
                other => panic!("unexpected stream state: {other:?}"),
            }
        }

        seen.sort_by_key(|l| (l.from, l.to));
        assert_eq!(
            seen,
            vec![Link { from: 0, to: 1 }, Link { from: 1, to: 0 }]
        );
    }

    #[test]
    fn reset_then_drain_yields_the_same_multiset() {
        let (_dir, db) = open_db();
        db.add(&CrawledPage::new("http://a", 1.0).add_link("http://b", 0.1))
            .unwrap();

        let mut stream = PageDbLinkStream::new(&db).unwrap();
        let mut link = Link::default();

        let mut first = Vec::new();
        while let StreamState::Next = stream.next(&mut link) {
            first.push(link);
        }

        assert_eq!(stream.reset().unwrap(), StreamState::Init);

        let mut second = Vec::new();
        while let StreamState::Next = stream.next(&mut link) {
            second.push(link);
        }

        assert_eq!(first, second);
    }
}
