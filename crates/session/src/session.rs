use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use domain::{Torrent, TorrentId, UpdateBatch};
use sync::{ApplyOutcome, TableEvent, TorrentTable};

use crate::errors::SessionError;
use crate::transport::{IdSelection, KeyGroup, ListUpdate, Transport};

/// Handle for one in-flight detail fetch. Carries the sequence stamp
/// used to reject this response if a newer request for the same ids
/// was issued before it landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub seq: u64,
    pub ids: Vec<TorrentId>,
}

/// Drives refreshes against the remote engine and keeps the local
/// torrent table consistent.
///
/// All mutation happens from the single point where responses are
/// dispatched; batches are applied in receipt order, so a later
/// batch's field values win over an earlier batch's.
pub struct Session {
    transport: Arc<dyn Transport>,
    table: TorrentTable,
    detail_seq: u64,
    latest_detail_seq: HashMap<TorrentId, u64>,
    last_full_refresh: Option<Instant>,
    full_refresh_every: Duration,
}

impl Session {
    pub fn new(
        transport: Arc<dyn Transport>,
        need_info_polls: u32,
        full_refresh_every: Duration,
    ) -> Self {
        Self {
            transport,
            table: TorrentTable::with_need_info_polls(need_info_polls),
            detail_seq: 0,
            latest_detail_seq: HashMap::new(),
            last_full_refresh: None,
            full_refresh_every,
        }
    }

    pub fn table(&self) -> &TorrentTable {
        &self.table
    }

    pub fn get(&self, id: TorrentId) -> Option<&Torrent> {
        self.table.get(id)
    }

    pub fn all_ids(&self) -> Vec<TorrentId> {
        self.table.all_ids()
    }

    /// One poll cycle: usually a cheap refresh of the active torrents,
    /// with a periodic full sweep so nothing falls through the cracks.
    pub async fn poll(&mut self) -> Result<Vec<TableEvent>, SessionError> {
        let full_due = self
            .last_full_refresh
            .map_or(true, |at| at.elapsed() >= self.full_refresh_every);

        if full_due {
            self.refresh_all_torrents().await
        } else {
            self.refresh_active_torrents().await
        }
    }

    pub async fn refresh_all_torrents(&mut self) -> Result<Vec<TableEvent>, SessionError> {
        let update = self
            .transport
            .fetch_list(IdSelection::All, KeyGroup::MainAll)
            .await?;
        self.apply_and_follow_up(update).await
    }

    pub async fn refresh_active_torrents(&mut self) -> Result<Vec<TableEvent>, SessionError> {
        let update = self
            .transport
            .fetch_list(IdSelection::Active, KeyGroup::MainStats)
            .await?;
        self.apply_and_follow_up(update).await
    }

    /// Issues a detail fetch and applies the response. Overlapping
    /// fetches for the same ids resolve through the sequence stamp:
    /// use [`begin_detail`](Self::begin_detail) +
    /// [`apply_detail`](Self::apply_detail) directly when the fetch
    /// and the apply are decoupled.
    pub async fn refresh_detail(
        &mut self,
        ids: &[TorrentId],
    ) -> Result<Vec<TableEvent>, SessionError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.begin_detail(ids);
        let batch = self.transport.fetch_detail(ids).await?;
        Ok(self.apply_detail(&request, batch))
    }

    /// Stamps a monotonic sequence on a detail fetch about to be
    /// issued for `ids`.
    pub fn begin_detail(&mut self, ids: &[TorrentId]) -> DetailRequest {
        self.detail_seq += 1;

        for &id in ids {
            self.latest_detail_seq.insert(id, self.detail_seq);
        }

        DetailRequest {
            seq: self.detail_seq,
            ids: ids.to_vec(),
        }
    }

    /// Applies a detail response, dropping per-id payloads that were
    /// superseded by a newer request before this one landed, or whose
    /// torrent was removed while the request was in flight. Ids the
    /// session has never heard of create placeholders: the remote
    /// source is authoritative.
    pub fn apply_detail(
        &mut self,
        request: &DetailRequest,
        mut batch: UpdateBatch,
    ) -> Vec<TableEvent> {
        let latest = &self.latest_detail_seq;
        batch.torrents.retain(|id, _| {
            let fresh = latest.get(id).map_or(true, |&newest| request.seq >= newest);

            if !fresh {
                debug!(%id, seq = request.seq, "dropping stale detail payload");
            }

            fresh
        });

        self.apply_list(ListUpdate { batch, full: false }).0
    }

    /// Forwards a wanted-state edit for the given file indices.
    pub async fn set_files_wanted(
        &self,
        id: TorrentId,
        file_indices: &[i32],
        wanted: bool,
    ) -> Result<(), SessionError> {
        if file_indices.is_empty() {
            return Ok(());
        }

        if self.table.get(id).is_none() {
            return Err(SessionError::TorrentNotFound(id));
        }

        self.transport.set_files_wanted(id, file_indices, wanted).await
    }

    pub async fn set_files_priority(
        &self,
        id: TorrentId,
        file_indices: &[i32],
        priority: domain::Priority,
    ) -> Result<(), SessionError> {
        if file_indices.is_empty() {
            return Ok(());
        }

        if self.table.get(id).is_none() {
            return Err(SessionError::TorrentNotFound(id));
        }

        self.transport
            .set_files_priority(id, file_indices, priority)
            .await
    }

    async fn apply_and_follow_up(
        &mut self,
        update: ListUpdate,
    ) -> Result<Vec<TableEvent>, SessionError> {
        let (mut events, need_info) = self.apply_list(update);

        // overdue placeholders get a dedicated fetch right away
        if !need_info.is_empty() {
            info!(count = need_info.len(), "fetching detail for placeholders");
            events.extend(self.refresh_detail(&need_info).await?);
        }

        Ok(events)
    }

    fn apply_list(&mut self, update: ListUpdate) -> (Vec<TableEvent>, Vec<TorrentId>) {
        if update.full {
            self.last_full_refresh = Some(Instant::now());
        }

        let removed = update.batch.removed.clone();

        if !removed.is_empty() {
            self.table.remove(&removed);

            // Tombstone: outstanding detail requests were all stamped
            // at or below the current sequence, so bumping past it
            // makes every one of them stale for this id. Only a fetch
            // begun after the removal can recreate the record.
            for &id in &removed {
                self.latest_detail_seq.insert(id, self.detail_seq + 1);
            }
        }

        let outcome = self.table.apply(&update.batch);
        let need_info: Vec<TorrentId> = outcome.need_info.iter().copied().collect();

        let mut events = outcome_events(outcome);

        if !removed.is_empty() {
            events.push(TableEvent::TorrentsRemoved(removed));
        }

        (events, need_info)
    }
}

fn outcome_events(outcome: ApplyOutcome) -> Vec<TableEvent> {
    let mut events = Vec::new();

    if !outcome.added.is_empty() {
        events.push(TableEvent::TorrentsAdded(
            outcome.added.into_iter().collect(),
        ));
    }

    if !outcome.changed.is_empty() {
        events.push(TableEvent::TorrentsChanged(
            outcome.changed.into_iter().collect(),
        ));
    }

    if !outcome.completed.is_empty() {
        events.push(TableEvent::TorrentsCompleted(
            outcome.completed.into_iter().collect(),
        ));
    }

    if !outcome.need_info.is_empty() {
        events.push(TableEvent::TorrentsNeedDetail(
            outcome.need_info.into_iter().collect(),
        ));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use domain::{Priority, TorrentField, TorrentUpdate};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List(IdSelection, KeyGroup),
        Detail(Vec<TorrentId>),
        SetWanted(TorrentId, Vec<i32>, bool),
    }

    #[derive(Default)]
    struct MockTransport {
        calls: Mutex<Vec<Call>>,
        list_responses: Mutex<Vec<ListUpdate>>,
        detail_responses: Mutex<Vec<UpdateBatch>>,
    }

    impl MockTransport {
        fn push_list(&self, update: ListUpdate) {
            self.list_responses.lock().unwrap().push(update);
        }

        fn push_detail(&self, batch: UpdateBatch) {
            self.detail_responses.lock().unwrap().push(batch);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn fetch_list(
            &self,
            selection: IdSelection,
            keys: KeyGroup,
        ) -> Result<ListUpdate, SessionError> {
            let full = selection == IdSelection::All;
            self.calls.lock().unwrap().push(Call::List(selection, keys));
            let mut queue = self.list_responses.lock().unwrap();

            if queue.is_empty() {
                Ok(ListUpdate {
                    full,
                    ..Default::default()
                })
            } else {
                Ok(queue.remove(0))
            }
        }

        async fn fetch_detail(&self, ids: &[TorrentId]) -> Result<UpdateBatch, SessionError> {
            self.calls.lock().unwrap().push(Call::Detail(ids.to_vec()));
            let mut queue = self.detail_responses.lock().unwrap();

            if queue.is_empty() {
                Ok(UpdateBatch::new())
            } else {
                Ok(queue.remove(0))
            }
        }

        async fn set_files_wanted(
            &self,
            id: TorrentId,
            file_indices: &[i32],
            wanted: bool,
        ) -> Result<(), SessionError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::SetWanted(id, file_indices.to_vec(), wanted));
            Ok(())
        }

        async fn set_files_priority(
            &self,
            _id: TorrentId,
            _file_indices: &[i32],
            _priority: Priority,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn named(id: i32, name: &str) -> ListUpdate {
        ListUpdate {
            batch: UpdateBatch::new().with(
                TorrentId(id),
                TorrentUpdate::new().with(TorrentField::Name(name.into())),
            ),
            full: true,
        }
    }

    #[tokio::test]
    async fn poll_does_a_full_sweep_then_cheap_refreshes() {
        let transport = Arc::new(MockTransport::default());
        let mut session = Session::new(transport.clone(), 2, Duration::from_secs(60));

        session.poll().await.unwrap();
        session.poll().await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                Call::List(IdSelection::All, KeyGroup::MainAll),
                Call::List(IdSelection::Active, KeyGroup::MainStats),
            ]
        );
    }

    #[tokio::test]
    async fn added_event_flows_from_list_response() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(named(1, "alpha"));

        let mut session = Session::new(transport, 2, Duration::from_secs(60));
        let events = session.poll().await.unwrap();

        assert_eq!(events, vec![TableEvent::TorrentsAdded(vec![TorrentId(1)])]);
        assert_eq!(session.get(TorrentId(1)).unwrap().name, "alpha");
    }

    #[tokio::test]
    async fn overdue_placeholder_triggers_detail_fetch() {
        let transport = Arc::new(MockTransport::default());

        // two polls of stats-only data for an unknown id
        let stats_only = || ListUpdate {
            batch: UpdateBatch::new().with(
                TorrentId(9),
                TorrentUpdate::new().with(TorrentField::PeersConnected(3)),
            ),
            full: false,
        };
        transport.push_list(stats_only());
        transport.push_list(stats_only());
        transport.push_detail(
            UpdateBatch::new().with(
                TorrentId(9),
                TorrentUpdate::new().with(TorrentField::Name("late".into())),
            ),
        );

        let mut session = Session::new(transport.clone(), 2, Duration::from_secs(60));

        let first = session.poll().await.unwrap();
        assert!(first.is_empty());

        let second = session.poll().await.unwrap();
        assert!(second.contains(&TableEvent::TorrentsNeedDetail(vec![TorrentId(9)])));
        assert!(second.contains(&TableEvent::TorrentsAdded(vec![TorrentId(9)])));
        assert!(transport.calls().contains(&Call::Detail(vec![TorrentId(9)])));
    }

    #[tokio::test]
    async fn stale_detail_response_is_rejected() {
        let transport = Arc::new(MockTransport::default());
        let mut session = Session::new(transport, 2, Duration::from_secs(60));

        let id = TorrentId(1);
        let older = session.begin_detail(&[id]);
        let newer = session.begin_detail(&[id]);

        session.apply_detail(
            &newer,
            UpdateBatch::new()
                .with(id, TorrentUpdate::new().with(TorrentField::Name("new".into()))),
        );

        // the slow first response lands afterwards and must not win
        let events = session.apply_detail(
            &older,
            UpdateBatch::new()
                .with(id, TorrentUpdate::new().with(TorrentField::Name("old".into()))),
        );

        assert!(events.is_empty());
        assert_eq!(session.get(id).unwrap().name, "new");
    }

    #[tokio::test]
    async fn detail_landing_after_removal_is_dropped() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(named(1, "alpha"));
        transport.push_list(ListUpdate {
            batch: UpdateBatch {
                removed: vec![TorrentId(1)],
                ..Default::default()
            },
            full: true,
        });

        let mut session = Session::new(transport, 2, Duration::ZERO);
        session.poll().await.unwrap();

        // a detail fetch goes out, then the removal lands first
        let in_flight = session.begin_detail(&[TorrentId(1)]);
        session.poll().await.unwrap();
        assert!(session.get(TorrentId(1)).is_none());

        let events = session.apply_detail(
            &in_flight,
            UpdateBatch::new().with(
                TorrentId(1),
                TorrentUpdate::new().with(TorrentField::Name("ghost".into())),
            ),
        );

        assert!(events.is_empty());
        assert!(session.get(TorrentId(1)).is_none());

        // a fetch begun after the removal is trusted again
        let fresh = session.begin_detail(&[TorrentId(1)]);
        let events = session.apply_detail(
            &fresh,
            UpdateBatch::new().with(
                TorrentId(1),
                TorrentUpdate::new().with(TorrentField::Name("alpha".into())),
            ),
        );
        assert_eq!(events, vec![TableEvent::TorrentsAdded(vec![TorrentId(1)])]);
    }

    #[tokio::test]
    async fn full_sweep_repeats_until_a_full_snapshot_lands() {
        let transport = Arc::new(MockTransport::default());

        // the remote answers the first complete-list query with a
        // partial batch; the sweep stays due
        transport.push_list(ListUpdate {
            batch: UpdateBatch::new().with(
                TorrentId(1),
                TorrentUpdate::new().with(TorrentField::Name("alpha".into())),
            ),
            full: false,
        });

        let mut session = Session::new(transport.clone(), 2, Duration::from_secs(60));
        session.poll().await.unwrap();
        session.poll().await.unwrap();
        session.poll().await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                Call::List(IdSelection::All, KeyGroup::MainAll),
                Call::List(IdSelection::All, KeyGroup::MainAll),
                Call::List(IdSelection::Active, KeyGroup::MainStats),
            ]
        );
    }

    #[tokio::test]
    async fn detail_response_for_unknown_id_creates_placeholder() {
        let transport = Arc::new(MockTransport::default());
        let mut session = Session::new(transport, 2, Duration::from_secs(60));

        let request = session.begin_detail(&[TorrentId(5)]);
        let events = session.apply_detail(
            &request,
            UpdateBatch::new().with(
                TorrentId(5),
                TorrentUpdate::new().with(TorrentField::Name("ghost".into())),
            ),
        );

        assert_eq!(events, vec![TableEvent::TorrentsAdded(vec![TorrentId(5)])]);
    }

    #[tokio::test]
    async fn removed_ids_are_dropped_and_can_return() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(named(1, "alpha"));
        transport.push_list(ListUpdate {
            batch: UpdateBatch {
                removed: vec![TorrentId(1)],
                ..Default::default()
            },
            full: true,
        });
        transport.push_list(named(1, "alpha"));

        let mut session = Session::new(transport, 2, Duration::ZERO);

        session.poll().await.unwrap();
        let events = session.poll().await.unwrap();
        assert!(events.contains(&TableEvent::TorrentsRemoved(vec![TorrentId(1)])));
        assert!(session.get(TorrentId(1)).is_none());

        // fresh sighting recreates the record and `added` fires again
        let events = session.poll().await.unwrap();
        assert!(events.contains(&TableEvent::TorrentsAdded(vec![TorrentId(1)])));
    }

    #[tokio::test]
    async fn file_edits_require_a_known_torrent() {
        let transport = Arc::new(MockTransport::default());
        transport.push_list(named(1, "alpha"));

        let mut session = Session::new(transport.clone(), 2, Duration::from_secs(60));
        session.poll().await.unwrap();

        session
            .set_files_wanted(TorrentId(1), &[0, 2], false)
            .await
            .unwrap();
        assert!(transport
            .calls()
            .contains(&Call::SetWanted(TorrentId(1), vec![0, 2], false)));

        let err = session
            .set_files_wanted(TorrentId(99), &[0], false)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::TorrentNotFound(TorrentId(99)));
    }
}
