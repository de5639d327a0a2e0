use std::thread;

use crate::config::HarvesterConfig;
use crate::corpus::Corpus;
use crate::error::HarvestError;
use crate::feed::{FeedClient, PageQuery};
use crate::store::MapStore;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

impl ProgressEvent {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Injected progress seam; the engine itself holds no logging state.
pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress events to the `tracing` subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        tracing::info!("{}", event.message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Running,
    Done,
}

/// Drives the paginated walk: fetch a page, persist unseen records, advance
/// the cursor from the page's last record, repeat until the feed is exhausted
/// or the download bound trips.
pub struct Harvester<C: FeedClient, S: MapStore> {
    config: HarvesterConfig,
    client: C,
    store: S,
    corpus: Corpus,
}

impl<C: FeedClient, S: MapStore> Harvester<C, S> {
    /// Builds the corpus index by scanning the store, repairing incomplete
    /// entries as they are found. This is the only repair pass of a run.
    pub fn new(
        config: HarvesterConfig,
        client: C,
        store: S,
        sink: &dyn ProgressSink,
    ) -> Result<Self, HarvestError> {
        let corpus = Corpus::scan(&store, &client, sink)?;
        Ok(Self {
            config,
            client,
            store,
            corpus,
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Walks the feed newest-first from the configured cursor, persisting
    /// every record not yet in the corpus. Returns the number of maps newly
    /// downloaded by this run; pre-existing maps are not counted.
    pub fn download_latest(&mut self, sink: &dyn ProgressSink) -> Result<u64, HarvestError> {
        let bound = self.config.effective_bound();
        let mut count: u64 = 0;
        let mut query = PageQuery::new(self.config.before.clone());
        let mut state = EngineState::Running;

        sink.event(ProgressEvent::message("downloading latest maps"));

        while state == EngineState::Running {
            let page = self.client.latest_page(&query)?;
            if page.is_empty() {
                state = EngineState::Done;
                break;
            }

            for record in &page.docs {
                if self.corpus.contains(&record.id) {
                    sink.event(ProgressEvent::message(format!(
                        "map {} already downloaded",
                        record.id
                    )));
                    continue;
                }

                sink.event(ProgressEvent::message(format!(
                    "writing meta file for map {}",
                    record.id
                )));
                let meta_path = self.store.write_meta(record)?;

                sink.event(ProgressEvent::message(format!(
                    "downloading payload for map {}",
                    record.id
                )));
                let mut body = self.client.fetch_payload(record.download_url()?)?;
                self.store.write_payload(record, &mut body)?;

                self.corpus.register(record.id.clone(), meta_path);
                count += 1;

                // strict greater-than after the increment: a bound of n
                // admits exactly n + 1 downloads
                if count > bound {
                    state = EngineState::Done;
                    break;
                }
            }

            if state == EngineState::Done {
                break;
            }

            // the cursor always derives from the page's last record, the
            // oldest seen so far, even when every record was skipped
            if let Some(last) = page.docs.last() {
                query = query.with_before(last.last_published_at.clone());
            }

            sink.event(ProgressEvent::message(format!(
                "downloaded {count}/{} maps so far",
                render_bound(self.config.n_maps)
            )));
            sink.event(ProgressEvent::message(format!(
                "requesting more maps before {}",
                query.before
            )));
            thread::sleep(self.config.delay);
        }

        Ok(count)
    }
}

fn render_bound(n_maps: Option<u64>) -> String {
    match n_maps {
        Some(n) => n.to_string(),
        None => "∞".to_string(),
    }
}
