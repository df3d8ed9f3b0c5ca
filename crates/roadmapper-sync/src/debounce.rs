//! Debounced saving of the active document to the remote store.
//!
//! Every edit re-arms a single timer. When the timer expires the latest
//! content is sent with one `update` call. A content [`Fingerprint`] of the
//! newest content sent to the store suppresses requests for content the
//! store already has or is about to have.
//!
//! Requests that have left the timer are never cancelled; a newer save
//! simply follows them. Each save carries a generation number so a slow,
//! older response cannot overwrite the fingerprint of a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use roadmapper_core::{Fingerprint, RoadmapDocument};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::remote::RemoteRoadmaps;
use crate::store::RoadmapPatch;

/// Delay between the last edit and the save request
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Default)]
struct Ledger {
    last_saved: Option<Fingerprint>,
    /// Highest generation handed out
    issued: u64,
    /// Generation of the newest save known to be on the server
    confirmed: u64,
    /// Generation of the newest save that has left the timer
    sent: u64,
    /// Content of save `sent`, cleared if that save fails
    sent_fingerprint: Option<Fingerprint>,
    in_flight: usize,
}

impl Ledger {
    /// Content the store will hold once every outstanding save has answered
    fn expected(&self) -> Option<&Fingerprint> {
        if self.sent > self.confirmed {
            self.sent_fingerprint.as_ref()
        } else {
            self.last_saved.as_ref()
        }
    }

    fn mark_sent(&mut self, job: &SaveJob) {
        self.in_flight += 1;
        self.sent = job.generation;
        self.sent_fingerprint = Some(job.fingerprint.clone());
    }
}

struct SaveJob {
    doc: RoadmapDocument,
    fingerprint: Fingerprint,
    generation: u64,
}

/// Holds the job until either the timer or a flush takes it
type JobSlot = Arc<Mutex<Option<SaveJob>>>;

struct Pending {
    slot: JobSlot,
    timer: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-timer save scheduler for one signed-in session.
///
/// Must be used from within a tokio runtime: arming the timer spawns a task.
pub struct DebouncedSaver {
    remote: RemoteRoadmaps,
    window: Duration,
    ledger: Arc<Mutex<Ledger>>,
    pending: Option<Pending>,
}

impl DebouncedSaver {
    pub fn new(remote: RemoteRoadmaps, window: Duration) -> Self {
        Self {
            remote,
            window,
            ledger: Arc::new(Mutex::new(Ledger::default())),
            pending: None,
        }
    }

    pub fn remote(&self) -> &RemoteRoadmaps {
        &self.remote
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// React to a change of the active document.
    ///
    /// Cancels any armed timer. If `doc` differs from the last saved content
    /// a new timer is armed that will send it after the debounce window.
    pub fn observe(&mut self, doc: &RoadmapDocument) {
        self.cancel();

        let fingerprint = Fingerprint::of(doc);
        let generation = {
            let mut ledger = lock(&self.ledger);
            if ledger.expected() == Some(&fingerprint) {
                trace!(roadmap_id = %doc.id, "content matches last save");
                return;
            }
            ledger.issued += 1;
            ledger.issued
        };

        let slot: JobSlot = Arc::new(Mutex::new(Some(SaveJob {
            doc: doc.clone(),
            fingerprint,
            generation,
        })));
        let timer = tokio::spawn({
            let slot = slot.clone();
            let remote = self.remote.clone();
            let ledger = self.ledger.clone();
            let window = self.window;
            async move {
                tokio::time::sleep(window).await;
                let job = lock(&slot).take();
                if let Some(job) = job {
                    lock(&ledger).mark_sent(&job);
                    // Detached so that re-arming cannot cancel a sent request.
                    tokio::spawn(send(remote, ledger, job));
                }
            }
        });
        self.pending = Some(Pending { slot, timer });
    }

    /// Send an armed save right away instead of waiting for the timer
    pub fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            let job = lock(&pending.slot).take();
            pending.timer.abort();
            if let Some(job) = job {
                debug!(roadmap_id = %job.doc.id, "flushing pending save");
                lock(&self.ledger).mark_sent(&job);
                tokio::spawn(send(self.remote.clone(), self.ledger.clone(), job));
            }
        }
    }

    /// Like [`flush`](Self::flush), but waits for the store to answer
    pub async fn flush_and_wait(&mut self) {
        if let Some(pending) = self.pending.take() {
            let job = lock(&pending.slot).take();
            pending.timer.abort();
            if let Some(job) = job {
                debug!(roadmap_id = %job.doc.id, "saving before leaving roadmap");
                lock(&self.ledger).mark_sent(&job);
                send(self.remote.clone(), self.ledger.clone(), job).await;
            }
        }
    }

    /// Drop an armed save without sending it
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            lock(&pending.slot).take();
            pending.timer.abort();
        }
    }

    /// Forget the last saved content so the next observed change is sent
    pub fn reset_fingerprint(&mut self) {
        let mut ledger = lock(&self.ledger);
        ledger.last_saved = None;
        ledger.sent_fingerprint = None;
    }

    /// Record `doc` as already present on the server
    pub fn mark_saved(&mut self, doc: &RoadmapDocument) {
        let mut ledger = lock(&self.ledger);
        ledger.last_saved = Some(Fingerprint::of(doc));
        ledger.confirmed = ledger.issued;
    }

    pub fn last_saved(&self) -> Option<Fingerprint> {
        lock(&self.ledger).last_saved.clone()
    }

    /// True while a timer is armed and has not fired
    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| lock(&pending.slot).is_some())
    }

    /// True while an `update` request is in flight
    pub fn is_saving(&self) -> bool {
        lock(&self.ledger).in_flight > 0
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Callers record the job with [`Ledger::mark_sent`] first
async fn send(remote: RemoteRoadmaps, ledger: Arc<Mutex<Ledger>>, job: SaveJob) {
    let result = remote
        .update(&job.doc.id, RoadmapPatch::from_document(&job.doc))
        .await;

    let mut ledger = lock(&ledger);
    ledger.in_flight -= 1;
    match result {
        Ok(_) if job.generation > ledger.confirmed => {
            debug!(roadmap_id = %job.doc.id, generation = job.generation, "roadmap saved");
            ledger.confirmed = job.generation;
            ledger.last_saved = Some(job.fingerprint);
        }
        Ok(_) => {
            debug!(
                roadmap_id = %job.doc.id,
                generation = job.generation,
                "stale save completed after a newer one"
            );
        }
        Err(e) => {
            warn!(roadmap_id = %job.doc.id, error = %e, "failed to save roadmap");
            if job.generation == ledger.sent {
                ledger.sent_fingerprint = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use roadmapper_core::{reduce, Action, EntryPatch, ManualClock};

    use super::*;
    use crate::auth::AuthSession;
    use crate::memory::{MemoryAuth, MemoryBackend};

    const WINDOW: Duration = Duration::from_millis(1000);

    struct Rig {
        backend: Arc<MemoryBackend>,
        saver: DebouncedSaver,
        doc: RoadmapDocument,
    }

    async fn rig() -> Rig {
        let backend = Arc::new(MemoryBackend::new(Arc::new(ManualClock::new(1_000))));
        let auth = MemoryAuth::new(backend.clone());
        let session = auth.register("ada@example.com", "pw", None).await.unwrap();
        let remote = RemoteRoadmaps::new(backend.clone(), session.token);
        let doc = remote.create(RoadmapPatch::default()).await.unwrap();
        let mut saver = DebouncedSaver::new(remote, WINDOW);
        saver.mark_saved(&doc);
        Rig {
            backend,
            saver,
            doc,
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn edit(doc: &RoadmapDocument, title: &str) -> RoadmapDocument {
        reduce(doc, Action::AddEntry(EntryPatch::title(title)), doc.last_modified + 1).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_sends_one_update_after_the_last() {
        let mut rig = rig().await;
        let mut doc = rig.doc.clone();
        for i in 0..5 {
            doc = edit(&doc, &format!("e{i}"));
            rig.saver.observe(&doc);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        // 100ms already elapsed since the last edit
        tokio::time::sleep(Duration::from_millis(850)).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 1);
        assert_eq!(rig.saver.last_saved(), Some(Fingerprint::of(&doc)));
    }

    #[tokio::test(start_paused = true)]
    async fn edits_further_apart_than_the_window_send_twice() {
        let mut rig = rig().await;
        let first = edit(&rig.doc, "a");
        rig.saver.observe(&first);
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        settle().await;

        let second = edit(&first, "b");
        rig.saver.observe(&second);
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        settle().await;

        assert_eq!(rig.backend.calls().update, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_content_issues_no_request() {
        let mut rig = rig().await;
        let mut touched = rig.doc.clone();
        touched.last_modified += 50;
        rig.saver.observe(&touched);
        assert!(!rig.saver.has_pending());

        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reverting_within_the_window_cancels_the_save() {
        let mut rig = rig().await;
        let edited = edit(&rig.doc, "temp");
        rig.saver.observe(&edited);
        assert!(rig.saver.has_pending());
        rig.saver.observe(&rig.doc.clone());
        assert!(!rig.saver.has_pending());

        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_does_not_advance_fingerprint() {
        let mut rig = rig().await;
        let before = rig.saver.last_saved();
        rig.backend.set_unavailable(true);

        let edited = edit(&rig.doc, "lost");
        rig.saver.observe(&edited);
        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.saver.last_saved(), before);
        assert!(!rig.saver.is_saving());

        // Same content observed again is retried on its own cycle
        rig.backend.set_unavailable(false);
        rig.saver.observe(&edited);
        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.saver.last_saved(), Some(Fingerprint::of(&edited)));
        assert_eq!(rig.backend.calls().update, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reverting_while_a_save_is_in_flight_sends_again() {
        let mut rig = rig().await;
        let original = rig.doc.clone();
        let edited = edit(&original, "b");
        rig.saver.observe(&edited);
        rig.saver.flush();
        assert!(rig.saver.is_saving());

        // Matches the last confirmed save, but not what is on its way
        rig.saver.observe(&original);
        assert!(rig.saver.has_pending());

        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 2);
        assert_eq!(rig.saver.last_saved(), Some(Fingerprint::of(&original)));
        let server = rig.saver.remote().get(&original.id).await.unwrap();
        assert!(server.entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_content_already_in_flight_is_not_resent() {
        let mut rig = rig().await;
        let edited = edit(&rig.doc, "b");
        rig.saver.observe(&edited);
        rig.saver.flush();
        rig.saver.observe(&edited);
        assert!(!rig.saver.has_pending());

        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_sends_immediately() {
        let mut rig = rig().await;
        let edited = edit(&rig.doc, "now");
        rig.saver.observe(&edited);
        rig.saver.flush();
        settle().await;
        assert_eq!(rig.backend.calls().update, 1);
        assert!(!rig.saver.has_pending());

        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_and_wait_completes_the_save_inline() {
        let mut rig = rig().await;
        let edited = edit(&rig.doc, "inline");
        rig.saver.observe(&edited);
        rig.saver.flush_and_wait().await;
        assert_eq!(rig.backend.calls().update, 1);
        assert_eq!(rig.saver.last_saved(), Some(Fingerprint::of(&edited)));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_fingerprint_forces_a_save() {
        let mut rig = rig().await;
        rig.saver.reset_fingerprint();
        rig.saver.observe(&rig.doc.clone());
        assert!(rig.saver.has_pending());
        tokio::time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(rig.backend.calls().update, 1);
    }
}
