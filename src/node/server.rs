use super::{CommandProcessor, NodeContext, NodeError, Session};
use crate::bank::AccountStore;
use crate::common::{
    ACCEPT_ERROR_BACKOFF, ACCEPT_LOOP_JOIN_TIMEOUT, CAPACITY_GRACE_DELAY, SESSION_JOIN_TIMEOUT,
};
use crate::net::configure_keepalive;
use crate::protocol::CAPACITY_RESPONSE;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

struct RegisteredSession {
    session: Arc<Session>,
    task: JoinHandle<()>,
}

struct Shared<S: AccountStore> {
    context: Arc<NodeContext<S>>,
    processor: Arc<CommandProcessor<S>>,
    sessions: RwLock<HashMap<u64, RegisteredSession>>,
    next_id: AtomicU64,
    shutdown: watch::Receiver<bool>,
}

/// Accepts client connections and runs one session task per client.
pub struct ConnectionServer<S: AccountStore + 'static> {
    shared: Arc<Shared<S>>,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_loop: Mutex<Option<JoinHandle<()>>>,
}

impl<S: AccountStore + 'static> ConnectionServer<S> {
    /// Binds to the configured ip and port and starts accepting.
    pub async fn start(context: Arc<NodeContext<S>>) -> Result<Self, NodeError> {
        let listener =
            TcpListener::bind((context.config.ip, context.config.port)).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_recv) = watch::channel(false);
        let shared = Arc::new(Shared {
            processor: Arc::new(CommandProcessor::new(Arc::clone(&context))),
            context,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            shutdown: shutdown_recv,
        });
        let accept_loop = tokio::spawn(accept_loop(Arc::clone(&shared), listener));
        log::info!("Listening on {}", local_addr);
        Ok(Self {
            shared,
            local_addr,
            shutdown,
            accept_loop: Mutex::new(Some(accept_loop)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn context(&self) -> &Arc<NodeContext<S>> {
        &self.shared.context
    }

    pub async fn active_sessions(&self) -> usize {
        self.shared.sessions.read().await.len()
    }

    pub async fn sessions(&self) -> Vec<Arc<Session>> {
        self.shared
            .sessions
            .read()
            .await
            .values()
            .map(|s| Arc::clone(&s.session))
            .collect()
    }

    /// A receiver that flips to `true` once `stop` is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stops accepting, then stops every session. Each join is bounded and
    /// tasks that overrun it are aborted.
    pub async fn stop(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        log::info!("Stopping server on {}", self.local_addr);

        if let Some(mut handle) = self.accept_loop.lock().await.take() {
            if timeout(ACCEPT_LOOP_JOIN_TIMEOUT, &mut handle).await.is_err() {
                log::warn!("Accept loop did not stop in time, aborting");
                handle.abort();
            }
        }

        let sessions = self
            .shared
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, s)| s)
            .collect::<Vec<_>>();
        for registered in sessions.iter() {
            registered.session.stop();
        }
        for mut registered in sessions {
            if timeout(SESSION_JOIN_TIMEOUT, &mut registered.task)
                .await
                .is_err()
            {
                log::warn!("Session {} did not stop in time, aborting", registered.session.id());
                registered.task.abort();
            }
        }
        log::info!("Server on {} stopped", self.local_addr);
    }
}

async fn accept_loop<S: AccountStore + 'static>(shared: Arc<Shared<S>>, listener: TcpListener) {
    let mut shutdown = shared.shutdown.clone();
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => handle_incoming(&shared, stream, remote).await,
                Err(e) => {
                    log::error!("Error happened while accepting a client: {}", e);
                    sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
    drop(listener);
    log::debug!("Accept loop finished");
}

async fn handle_incoming<S: AccountStore + 'static>(
    shared: &Arc<Shared<S>>,
    stream: TcpStream,
    remote: SocketAddr,
) {
    if let Err(e) = configure_keepalive(&stream, shared.context.config.timeout()) {
        log::warn!("Could not enable keep-alive for {}: {}", remote, e);
    }

    let mut sessions = shared.sessions.write().await;
    if sessions.len() >= shared.context.config.max_connections {
        drop(sessions);
        shared.context.observer.session_rejected(remote);
        tokio::spawn(reject(stream, shared.shutdown.clone()));
        return;
    }

    let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
    let session = Arc::new(Session::new(id, stream, remote));
    let task = tokio::spawn({
        let shared = Arc::clone(shared);
        let session = Arc::clone(&session);
        async move {
            session.run(Arc::clone(&shared.processor)).await;
            shared.sessions.write().await.remove(&session.id());
            shared
                .context
                .observer
                .session_closed(session.id(), session.remote());
        }
    });
    sessions.insert(id, RegisteredSession { session, task });
    shared.context.observer.session_opened(id, remote);
}

/// Tells the client the node is full and hangs up after a grace delay.
async fn reject(mut stream: TcpStream, mut shutdown: watch::Receiver<bool>) {
    let _ = stream
        .write_all(format!("{}\n", CAPACITY_RESPONSE).as_bytes())
        .await;
    if !*shutdown.borrow() {
        tokio::select! {
            _ = shutdown.changed() => {}
            _ = sleep(CAPACITY_GRACE_DELAY) => {}
        }
    }
    let _ = stream.shutdown().await;
}
