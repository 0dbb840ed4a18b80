use super::CommandProcessor;
use crate::bank::AccountStore;
use crate::common::MAX_LINE_LENGTH;
use crate::net::read_line_limited;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Closing,
    Closed,
}

/// One client connection. The socket is owned by whoever takes it first:
/// `run`, or `stop` when the session never started.
pub struct Session {
    id: u64,
    remote: SocketAddr,
    state: Mutex<SessionState>,
    stream: Mutex<Option<TcpStream>>,
    shutdown: watch::Sender<bool>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Session {
    pub fn new(id: u64, stream: TcpStream, remote: SocketAddr) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            id,
            remote,
            state: Mutex::new(SessionState::Created),
            stream: Mutex::new(Some(stream)),
            shutdown,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn begin_closing(&self) {
        let mut state = lock(&self.state);
        if matches!(*state, SessionState::Created | SessionState::Running) {
            *state = SessionState::Closing;
        }
    }

    fn mark_closed(&self) {
        let mut state = lock(&self.state);
        if *state != SessionState::Closed {
            *state = SessionState::Closed;
            log::debug!("Session {} closed", self.id);
        }
    }

    /// Asks the session to end. Safe to call any number of times, from any
    /// task, also while the session is shutting down on its own.
    pub fn stop(&self) {
        self.begin_closing();
        self.shutdown.send_replace(true);
        let unstarted = lock(&self.stream).take();
        if let Some(stream) = unstarted {
            drop(stream);
            self.mark_closed();
        }
    }

    /// Serves requests until the client disconnects or `stop` is called.
    pub async fn run<S: AccountStore>(&self, processor: Arc<CommandProcessor<S>>) {
        let stream = match lock(&self.stream).take() {
            Some(stream) => stream,
            None => return,
        };
        let mut shutdown = self.shutdown.subscribe();
        {
            let mut state = lock(&self.state);
            if *state == SessionState::Created {
                *state = SessionState::Running;
            }
        }

        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);
        while !*shutdown.borrow() {
            let line = tokio::select! {
                _ = shutdown.changed() => break,
                line = read_line_limited(&mut reader, MAX_LINE_LENGTH) => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::debug!("Client {} ({}) closed the connection", self.id, self.remote);
                    break;
                }
                Err(e) => {
                    log::warn!("Client {} ({}) read failed: {}", self.id, self.remote, e);
                    break;
                }
            };
            log::info!("Request from {} | {}", self.remote, line);
            let response = tokio::select! {
                _ = shutdown.changed() => break,
                response = processor.process_line(&line) => response,
            };
            if let Some(response) = response {
                log::info!("Response to {} | {}", self.remote, response);
                let data = format!("{}\n", response);
                let written = tokio::select! {
                    _ = shutdown.changed() => break,
                    written = write.write_all(data.as_bytes()) => written,
                };
                if let Err(e) = written {
                    log::warn!("Client {} ({}) write failed: {}", self.id, self.remote, e);
                    break;
                }
            }
        }

        self.begin_closing();
        let _ = write.shutdown().await;
        self.mark_closed();
    }
}
