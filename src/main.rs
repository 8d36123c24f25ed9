use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use application::ClientApp;
use config::Config;
use domain::{Priority, TorrentId, UpdateBatch};
use session::{IdSelection, KeyGroup, ListUpdate, SessionError, Transport};

/// Stand-in transport until an RPC client is wired in. Answers every
/// fetch with an empty batch, so the app runs its refresh loop against
/// an idle remote.
struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn fetch_list(
        &self,
        _selection: IdSelection,
        _keys: KeyGroup,
    ) -> Result<ListUpdate, SessionError> {
        Ok(ListUpdate::default())
    }

    async fn fetch_detail(&self, _ids: &[TorrentId]) -> Result<UpdateBatch, SessionError> {
        Ok(UpdateBatch::new())
    }

    async fn set_files_wanted(
        &self,
        _id: TorrentId,
        _file_indices: &[i32],
        _wanted: bool,
    ) -> Result<(), SessionError> {
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

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env(None);
    info!(
        remote_url = %config.remote_url,
        poll_interval_ms = config.poll_interval_ms,
        "starting torrent client core"
    );

    let mut app = ClientApp::new(&config, Arc::new(NullTransport));

    app.run(|report| {
        for event in &report.table_events {
            info!(?event, "table update");
        }

        for event in &report.tree_events {
            info!(?event, "file tree update");
        }

        if !report.peer_delta.is_empty() {
            info!(
                added = report.peer_delta.added.len(),
                updated = report.peer_delta.updated.len(),
                removed = report.peer_delta.removed.len(),
                "peer roster update"
            );
        }
    })
    .await;
}
