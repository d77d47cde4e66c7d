//! File host: a worker thread that owns all disk access for a command.
//!
//! Every request carries its own [`RequestId`], and the response echoes it.
//! Several requests of the same kind may be in flight at once, and each
//! caller gets back exactly the response to its own request regardless of
//! the order in which they complete. Responses that arrive for someone else
//! are buffered until asked for.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::io::file_ops::{self, DropCheck, DropPlan};
use crate::io::workspace_io::scan_tree;
use crate::model::config::WorkspaceConfig;
use crate::model::node::TreeNode;
use crate::model::timeline::TimelineEntry;
use crate::model::workspace::META_DIR;

/// Correlation id for one host request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        RequestId(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FsOp {
    List,
    Read { key: String },
    Write { key: String, content: String },
    MakeNote { key: String },
    MakeDir { key: String },
    Trash { key: String },
    Rename { from: String, to: String },
    CheckDrop { plan: DropPlan },
    ExecuteDrop { plan: DropPlan, replace: bool },
    Timeline { folder: String, preview_lines: usize, preview_width: usize },
}

impl FsOp {
    fn name(&self) -> &'static str {
        match self {
            FsOp::List => "list",
            FsOp::Read { .. } => "read",
            FsOp::Write { .. } => "write",
            FsOp::MakeNote { .. } => "make_note",
            FsOp::MakeDir { .. } => "make_dir",
            FsOp::Trash { .. } => "trash",
            FsOp::Rename { .. } => "rename",
            FsOp::CheckDrop { .. } => "check_drop",
            FsOp::ExecuteDrop { .. } => "execute_drop",
            FsOp::Timeline { .. } => "timeline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FsReply {
    Tree(Vec<TreeNode>),
    Content(String),
    Done,
    Trashed(PathBuf),
    Drop(DropCheck),
    Timeline(Vec<TimelineEntry>),
}

#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    pub op: FsOp,
}

#[derive(Debug)]
pub struct Response {
    pub id: RequestId,
    pub result: Result<FsReply, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("file host is not running")]
    Disconnected,
    #[error("file host request {0} timed out")]
    Timeout(RequestId),
    #[error("{0}")]
    Failed(String),
    #[error("file host sent an unexpected reply to {0}")]
    UnexpectedReply(&'static str),
}

/// Spawns the worker thread.
pub struct FileHost;

impl FileHost {
    pub fn spawn(root: PathBuf, config: &WorkspaceConfig) -> HostClient {
        let (req_tx, req_rx) = mpsc::channel::<Request>();
        let (resp_tx, resp_rx) = mpsc::channel::<Response>();
        let extension = config.notes.extension.clone();

        let handle = std::thread::spawn(move || {
            let meta_dir = root.join(META_DIR);
            for req in req_rx {
                let op_name = req.op.name();
                let result = execute(&root, &meta_dir, &extension, req.op);
                if let Err(e) = &result {
                    tracing::debug!(id = %req.id, op = op_name, "host request failed: {}", e);
                }
                if resp_tx.send(Response { id: req.id, result }).is_err() {
                    break;
                }
            }
            tracing::trace!("file host stopped");
        });

        HostClient {
            tx: Some(req_tx),
            rx: resp_rx,
            pending: HashMap::new(),
            timeout: Duration::from_millis(config.host.timeout_ms),
            handle: Some(handle),
        }
    }
}

fn execute(
    root: &std::path::Path,
    meta_dir: &std::path::Path,
    extension: &str,
    op: FsOp,
) -> Result<FsReply, String> {
    let reply = match op {
        FsOp::List => FsReply::Tree(scan_tree(root, extension).map_err(|e| e.to_string())?),
        FsOp::Read { key } => FsReply::Content(file_ops::read_note(root, &key).map_err(|e| e.to_string())?),
        FsOp::Write { key, content } => {
            file_ops::write_note(root, meta_dir, &key, &content).map_err(|e| e.to_string())?;
            FsReply::Done
        }
        FsOp::MakeNote { key } => {
            file_ops::make_note(root, &key).map_err(|e| e.to_string())?;
            FsReply::Done
        }
        FsOp::MakeDir { key } => {
            file_ops::make_dir(root, &key).map_err(|e| e.to_string())?;
            FsReply::Done
        }
        FsOp::Trash { key } => FsReply::Trashed(file_ops::trash(root, meta_dir, &key).map_err(|e| e.to_string())?),
        FsOp::Rename { from, to } => {
            file_ops::rename(root, &from, &to).map_err(|e| e.to_string())?;
            FsReply::Done
        }
        FsOp::CheckDrop { plan } => FsReply::Drop(file_ops::check_drop(root, &plan).map_err(|e| e.to_string())?),
        FsOp::ExecuteDrop { plan, replace } => {
            FsReply::Drop(file_ops::execute_drop(root, meta_dir, &plan, replace).map_err(|e| e.to_string())?)
        }
        FsOp::Timeline {
            folder,
            preview_lines,
            preview_width,
        } => {
            let tree = scan_tree(root, extension).map_err(|e| e.to_string())?;
            let entries = file_ops::timeline_entries(root, &tree, &folder, preview_lines, preview_width)
                .map_err(|e| e.to_string())?;
            FsReply::Timeline(entries)
        }
    };
    Ok(reply)
}

/// Caller side of the file host.
pub struct HostClient {
    tx: Option<mpsc::Sender<Request>>,
    rx: mpsc::Receiver<Response>,
    pending: HashMap<RequestId, Result<FsReply, String>>,
    timeout: Duration,
    handle: Option<JoinHandle<()>>,
}

impl HostClient {
    /// Queue a request and return its id without waiting.
    pub fn send(&self, op: FsOp) -> Result<RequestId, HostError> {
        let id = RequestId::new();
        tracing::trace!(%id, op = op.name(), "host request");
        self.tx
            .as_ref()
            .ok_or(HostError::Disconnected)?
            .send(Request { id, op })
            .map_err(|_| HostError::Disconnected)?;
        Ok(id)
    }

    /// Wait for the response to `id`, buffering any others that arrive first.
    pub fn wait(&mut self, id: RequestId) -> Result<FsReply, HostError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(result) = self.pending.remove(&id) {
                return result.map_err(HostError::Failed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(resp) if resp.id == id => return resp.result.map_err(HostError::Failed),
                Ok(resp) => {
                    self.pending.insert(resp.id, resp.result);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => return Err(HostError::Timeout(id)),
                Err(mpsc::RecvTimeoutError::Disconnected) => return Err(HostError::Disconnected),
            }
        }
    }

    pub fn call(&mut self, op: FsOp) -> Result<FsReply, HostError> {
        let id = self.send(op)?;
        self.wait(id)
    }

    // -----------------------------------------------------------------------
    // Typed wrappers
    // -----------------------------------------------------------------------

    pub fn list(&mut self) -> Result<Vec<TreeNode>, HostError> {
        match self.call(FsOp::List)? {
            FsReply::Tree(tree) => Ok(tree),
            _ => Err(HostError::UnexpectedReply("list")),
        }
    }

    pub fn read(&mut self, key: &str) -> Result<String, HostError> {
        match self.call(FsOp::Read { key: key.to_string() })? {
            FsReply::Content(text) => Ok(text),
            _ => Err(HostError::UnexpectedReply("read")),
        }
    }

    pub fn trash(&mut self, key: &str) -> Result<PathBuf, HostError> {
        match self.call(FsOp::Trash { key: key.to_string() })? {
            FsReply::Trashed(path) => Ok(path),
            _ => Err(HostError::UnexpectedReply("trash")),
        }
    }

    pub fn timeline(
        &mut self,
        folder: &str,
        preview_lines: usize,
        preview_width: usize,
    ) -> Result<Vec<TimelineEntry>, HostError> {
        let op = FsOp::Timeline {
            folder: folder.to_string(),
            preview_lines,
            preview_width,
        };
        match self.call(op)? {
            FsReply::Timeline(entries) => Ok(entries),
            _ => Err(HostError::UnexpectedReply("timeline")),
        }
    }

    pub fn drop_op(&mut self, op: FsOp) -> Result<DropCheck, HostError> {
        let name = op.name();
        match self.call(op)? {
            FsReply::Drop(check) => Ok(check),
            _ => Err(HostError::UnexpectedReply(name)),
        }
    }

    /// Run an operation whose only result is success.
    pub fn run(&mut self, op: FsOp) -> Result<(), HostError> {
        let name = op.name();
        match self.call(op)? {
            FsReply::Done => Ok(()),
            _ => Err(HostError::UnexpectedReply(name)),
        }
    }
}

impl Drop for HostClient {
    fn drop(&mut self) {
        // closing the request channel ends the worker loop
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
