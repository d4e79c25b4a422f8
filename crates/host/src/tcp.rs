use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use services::{QuizService, Session};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::driver::{SessionEnd, drive};

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Listener that gives every accepted connection its own session over the
/// shared quiz store.
pub struct TcpHost {
    listener: TcpListener,
    quizzes: Arc<QuizService>,
}

impl TcpHost {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns the bind error, e.g. when the port is already in use.
    pub async fn bind(addr: impl ToSocketAddrs, quizzes: Arc<QuizService>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, quizzes })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    ///
    /// Errors on a single connection only end that connection; failed accepts
    /// are logged and retried after a short pause.
    pub async fn serve(self) {
        match self.listener.local_addr() {
            Ok(addr) => info!("listening on {addr}"),
            Err(err) => warn!("listening on unknown address: {err}"),
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let quizzes = Arc::clone(&self.quizzes);
                    tokio::spawn(handle_connection(stream, peer, quizzes));
                }
                Err(err) => pause_after_accept_error(&err).await,
            }
        }
    }
}

async fn pause_after_accept_error(err: &io::Error) {
    warn!("accept failed: {err}, retrying in {ACCEPT_BACKOFF:?}");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, quizzes: Arc<QuizService>) {
    info!("{peer} connected");
    let (reader, writer) = stream.into_split();

    match drive(Session::new(quizzes), BufReader::new(reader), writer).await {
        Ok(SessionEnd::Quit) => info!("{peer} quit"),
        Ok(SessionEnd::Disconnected) => info!("{peer} disconnected"),
        Err(err) => warn!("{peer} session ended with error: {err}"),
    }
}
