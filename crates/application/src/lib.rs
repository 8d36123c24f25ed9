//! Client application - orchestrates the complete refresh flow: polls
//! the remote session, applies batches to the local mirror, and keeps
//! the detail view of the inspected torrents current.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use config::Config;
use domain::{Priority, TorrentId};
use session::{Inspector, Session, SessionError, Transport};
use sync::{NodeId, PeerDelta, TableEvent, TreeEvent};

/// Everything that changed during one tick, for the view layer to
/// render.
#[derive(Debug, Default)]
pub struct TickReport {
    pub table_events: Vec<TableEvent>,
    pub tree_events: Vec<TreeEvent>,
    pub peer_delta: PeerDelta,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.table_events.is_empty()
            && self.tree_events.is_empty()
            && self.peer_delta.is_empty()
    }
}

pub struct ClientApp {
    pub session: Session,
    pub inspector: Inspector,
    poll_interval: Duration,
    detail_interval: Duration,
    last_detail: Option<Instant>,
}

impl ClientApp {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let session = Session::new(
            transport,
            config.need_info_polls,
            config.full_refresh_every(),
        );

        Self {
            session,
            inspector: Inspector::new(),
            poll_interval: config.poll_interval(),
            detail_interval: config.detail_interval(),
            last_detail: None,
        }
    }

    /// Changes the inspected torrent set. A changed set gets an
    /// immediate detail fetch so the file list and peers fill in
    /// without waiting for the next cadence slot.
    pub async fn inspect(
        &mut self,
        ids: Vec<TorrentId>,
    ) -> Result<TickReport, SessionError> {
        if !self.inspector.set_inspected(ids) {
            return Ok(TickReport::default());
        }

        let mut report = TickReport {
            // the reset tree queued its removal events
            tree_events: self.inspector.drain_tree_events(),
            ..Default::default()
        };

        let inspected: Vec<TorrentId> = self.inspector.inspected().iter().copied().collect();

        if !inspected.is_empty() {
            report.table_events = self.session.refresh_detail(&inspected).await?;
            self.last_detail = Some(Instant::now());
        }

        report.peer_delta = self.inspector.refresh(self.session.table());
        report.tree_events.extend(self.inspector.drain_tree_events());
        Ok(report)
    }

    /// One refresh cycle: list poll, plus a detail fetch for the
    /// inspected torrents when one is due.
    pub async fn tick(&mut self) -> Result<TickReport, SessionError> {
        let mut report = TickReport {
            table_events: self.session.poll().await?,
            ..Default::default()
        };

        let inspected: Vec<TorrentId> = self.inspector.inspected().iter().copied().collect();
        let detail_due = self
            .last_detail
            .map_or(true, |at| at.elapsed() >= self.detail_interval);

        if !inspected.is_empty() && detail_due {
            report
                .table_events
                .extend(self.session.refresh_detail(&inspected).await?);
            self.last_detail = Some(Instant::now());
        }

        report.peer_delta = self.inspector.refresh(self.session.table());
        report.tree_events = self.inspector.drain_tree_events();
        Ok(report)
    }

    /// Flips `wanted` on the given file-tree nodes locally and sends
    /// only the indices that actually changed to the remote source.
    pub async fn toggle_wanted(
        &mut self,
        nodes: &[NodeId],
        wanted: bool,
    ) -> Result<Vec<TreeEvent>, SessionError> {
        let flipped = self.inspector.set_wanted(nodes, wanted);
        let events = self.inspector.drain_tree_events();

        if let Some(id) = self.inspector.single_id() {
            if !flipped.is_empty() {
                let indices: Vec<i32> = flipped.into_iter().collect();
                debug!(%id, count = indices.len(), wanted, "sending wanted edit");
                self.session.set_files_wanted(id, &indices, wanted).await?;
            }
        }

        Ok(events)
    }

    pub async fn set_priority(
        &mut self,
        nodes: &[NodeId],
        priority: Priority,
    ) -> Result<Vec<TreeEvent>, SessionError> {
        let flipped = self.inspector.set_priority(nodes, priority);
        let events = self.inspector.drain_tree_events();

        if let Some(id) = self.inspector.single_id() {
            if !flipped.is_empty() {
                let indices: Vec<i32> = flipped.into_iter().collect();
                self.session.set_files_priority(id, &indices, priority).await?;
            }
        }

        Ok(events)
    }

    /// Ticks forever at the configured poll cadence, handing each
    /// non-empty report to `on_tick`. A failed poll is logged and the
    /// loop keeps going; transient RPC errors must not kill the app.
    pub async fn run<F>(&mut self, mut on_tick: F)
    where
        F: FnMut(TickReport),
    {
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            interval.tick().await;

            match self.tick().await {
                Ok(report) => {
                    if !report.is_empty() {
                        on_tick(report);
                    }
                }
                Err(err) => error!(%err, "refresh cycle failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use domain::{
        FileEntry, TorrentField, TorrentUpdate, UpdateBatch,
    };
    use session::{IdSelection, KeyGroup, ListUpdate};
    use sync::FileTreeModel;

    #[derive(Default)]
    struct ScriptedTransport {
        list_responses: Mutex<Vec<ListUpdate>>,
        detail_responses: Mutex<Vec<UpdateBatch>>,
        wanted_calls: Mutex<Vec<(TorrentId, Vec<i32>, bool)>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch_list(
            &self,
            _selection: IdSelection,
            _keys: KeyGroup,
        ) -> Result<ListUpdate, SessionError> {
            let mut queue = self.list_responses.lock().unwrap();

            if queue.is_empty() {
                Ok(ListUpdate::default())
            } else {
                Ok(queue.remove(0))
            }
        }

        async fn fetch_detail(&self, _ids: &[TorrentId]) -> Result<UpdateBatch, SessionError> {
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
            self.wanted_calls
                .lock()
                .unwrap()
                .push((id, file_indices.to_vec(), wanted));
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

    fn files_update() -> TorrentUpdate {
        TorrentUpdate::new()
            .with(TorrentField::Name("album".into()))
            .with(TorrentField::Files(vec![
                FileEntry {
                    index: 0,
                    path: "album/one.flac".into(),
                    size: 10,
                    have: 0,
                    wanted: true,
                    priority: Priority::Normal,
                },
                FileEntry {
                    index: 1,
                    path: "album/two.flac".into(),
                    size: 20,
                    have: 0,
                    wanted: true,
                    priority: Priority::Normal,
                },
            ]))
    }

    #[tokio::test]
    async fn tick_surfaces_added_torrents() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.list_responses.lock().unwrap().push(ListUpdate {
            batch: UpdateBatch::new().with(
                TorrentId(1),
                TorrentUpdate::new().with(TorrentField::Name("alpha".into())),
            ),
            full: true,
        });

        let mut app = ClientApp::new(&Config::default(), transport);
        let report = app.tick().await.unwrap();

        assert_eq!(
            report.table_events,
            vec![TableEvent::TorrentsAdded(vec![TorrentId(1)])]
        );
    }

    #[tokio::test]
    async fn inspecting_builds_tree_and_edits_round_trip() {
        let id = TorrentId(1);
        let transport = Arc::new(ScriptedTransport::default());
        transport
            .detail_responses
            .lock()
            .unwrap()
            .push(UpdateBatch::new().with(id, files_update()));

        let mut app = ClientApp::new(&Config::default(), transport.clone());
        let report = app.inspect(vec![id]).await.unwrap();

        assert!(!report.tree_events.is_empty());
        let album = app.inspector.tree().node("album").unwrap();
        assert_eq!(app.inspector.tree().size(album), 30);

        // unticking the directory sends exactly the flipped leaves
        app.toggle_wanted(&[album], false).await.unwrap();
        assert_eq!(
            wanted_calls(&transport),
            vec![(id, vec![0, 1], false)]
        );

        // repeating the edit flips nothing and sends nothing
        app.toggle_wanted(&[album], false).await.unwrap();
        assert_eq!(wanted_calls(&transport).len(), 1);

        let root = FileTreeModel::root();
        assert_eq!(app.inspector.tree().wanted_sizes(root), (0, 0));
    }

    #[tokio::test]
    async fn re_inspecting_the_same_set_is_a_no_op() {
        let id = TorrentId(1);
        let transport = Arc::new(ScriptedTransport::default());
        transport
            .detail_responses
            .lock()
            .unwrap()
            .push(UpdateBatch::new().with(id, files_update()));

        let mut app = ClientApp::new(&Config::default(), transport);
        app.inspect(vec![id]).await.unwrap();

        let report = app.inspect(vec![id]).await.unwrap();
        assert!(report.is_empty());
        assert!(!app.inspector.tree().is_empty());
    }

    fn wanted_calls(transport: &ScriptedTransport) -> Vec<(TorrentId, Vec<i32>, bool)> {
        transport.wanted_calls.lock().unwrap().clone()
    }
}
