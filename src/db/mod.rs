//! SQLite-backed key-value storage.
//!
//! A dedicated worker thread owns the connection; callers submit closures and
//! await the reply. Collections are stored as whole JSON documents and
//! overwritten on every save.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
mod repositories;

pub use repositories::checkpoint::RunCheckpoint;
pub use repositories::keys;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Message {
    Run(Job),
    Close,
}

/// Where the connection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Memory,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Memory => f.write_str("memory"),
        }
    }
}

struct Worker {
    jobs: mpsc::Sender<Message>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };
        if self.jobs.send(Message::Close).is_err() {
            error!("Storage worker already gone at shutdown");
        }
        if let Err(err) = handle.join() {
            error!("Storage worker panicked: {err:?}");
        }
    }
}

#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    location: Arc<Location>,
}

impl Database {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        Self::start(Location::File(db_path))
    }

    /// Private database that disappears with the last handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::start(Location::Memory)
    }

    fn start(location: Location) -> Result<Self> {
        let (jobs, inbox) = mpsc::channel::<Message>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let target = location.clone();

        let thread = thread::Builder::new()
            .name("speechtimer-db".into())
            .spawn(move || match connect(&target) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve(conn, inbox);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn storage worker")?;

        ready_rx
            .recv()
            .context("storage worker exited before it was ready")??;
        info!("Storage ready at {location}");

        Ok(Self {
            worker: Arc::new(Worker {
                jobs,
                thread: Mutex::new(Some(thread)),
            }),
            location: Arc::new(location),
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn path(&self) -> Option<&Path> {
        match self.location.as_ref() {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Runs `task` on the worker thread and waits for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                error!("Storage caller went away before its reply");
            }
        });

        self.worker
            .jobs
            .send(Message::Run(job))
            .map_err(|_| anyhow!("storage worker is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage worker dropped the request"))?
    }
}

fn connect(location: &Location) -> Result<Connection> {
    let mut conn = match location {
        Location::File(path) => Connection::open(path),
        Location::Memory => Connection::open_in_memory(),
    }
    .with_context(|| format!("failed to open SQLite database at {location}"))?;

    if let Location::File(_) = location {
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }
    }

    migrations::run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn serve(mut conn: Connection, inbox: mpsc::Receiver<Message>) {
    while let Ok(message) = inbox.recv() {
        match message {
            Message::Run(job) => job(&mut conn),
            Message::Close => break,
        }
    }
    info!("Storage worker shutting down");
}
