//! TCP broadcast of fused 3D points.
//!
//! Thread model: one accept thread owns the listening socket; every client
//! gets a bounded queue and a dedicated writer thread. The broadcaster only
//! ever `try_send`s, so a client that stops draining its queue is dropped
//! instead of stalling the capture cycle. Per client, points arrive in
//! fusion order; there is no history for late joiners.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use nalgebra::Point3;
use parking_lot::Mutex;

/// Per-client queue depth. A client this many points behind the producer is
/// considered unable to keep up and is disconnected.
const CLIENT_QUEUE_CAPACITY: usize = 8;

const ACCEPT_POLL: Duration = Duration::from_millis(25);

/// Serialize one fused point as the wire line: three space-separated fixed
/// 6-decimal numbers, newline-terminated.
pub fn format_point(p: &Point3<f64>) -> String {
    format!("{:.6} {:.6} {:.6}\n", p.x, p.y, p.z)
}

struct Client {
    id: u64,
    peer: SocketAddr,
    sender: Sender<Point3<f64>>,
}

#[derive(Default)]
struct ClientRegistry {
    clients: Mutex<Vec<Client>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    fn add(&self, peer: SocketAddr, sender: Sender<Point3<f64>>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().push(Client { id, peer, sender });
        id
    }

    fn remove(&self, id: u64) {
        self.clients.lock().retain(|c| c.id != id);
    }

    fn clear(&self) {
        self.clients.lock().clear();
    }

    fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Enqueue `point` for every connected client. Clients whose queue is
    /// full or whose writer died are removed; removal never affects
    /// delivery to the remaining clients.
    fn broadcast(&self, point: &Point3<f64>) -> usize {
        let mut clients = self.clients.lock();
        clients.retain(|client| match client.sender.try_send(*point) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("client {} ({}) cannot keep up, dropping", client.id, client.peer);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::info!("client {} ({}) disconnected", client.id, client.peer);
                false
            }
        });
        clients.len()
    }
}

/// Cloneable producer-side handle used by the pipeline's publish step.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    /// Send one fused point to all currently connected clients; returns how
    /// many clients remain connected afterwards.
    pub fn broadcast(&self, point: &Point3<f64>) -> usize {
        self.registry.broadcast(point)
    }

    #[cfg(test)]
    fn register_raw(&self, peer: SocketAddr, sender: Sender<Point3<f64>>) -> u64 {
        self.registry.add(peer, sender)
    }
}

/// Streams every fused point to all connected TCP clients.
pub struct StreamServer {
    local_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    stop: Arc<AtomicBool>,
    accept_handle: Option<JoinHandle<()>>,
    writer_handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl StreamServer {
    /// Bind the listening socket and start accepting clients. Port 0 binds
    /// an ephemeral port, reported by [`local_addr`](Self::local_addr).
    pub fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let registry = Arc::new(ClientRegistry::default());
        let stop = Arc::new(AtomicBool::new(false));
        let writer_handles = Arc::new(Mutex::new(Vec::new()));

        let accept_handle = {
            let registry = registry.clone();
            let stop = stop.clone();
            let writer_handles = writer_handles.clone();
            thread::Builder::new()
                .name("quadtrack-accept".into())
                .spawn(move || accept_loop(listener, registry, stop, writer_handles))?
        };

        log::info!("stream server listening on {local_addr}");
        Ok(Self {
            local_addr,
            registry,
            stop,
            accept_handle: Some(accept_handle),
            writer_handles,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    pub fn broadcaster(&self) -> Broadcaster {
        Broadcaster {
            registry: self.registry.clone(),
        }
    }

    /// Stop accepting, drop every client and join all server threads.
    /// Queued points are still flushed to their sockets before the writer
    /// threads exit. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.clear();
        for handle in self.writer_handles.lock().drain(..) {
            let _ = handle.join();
        }
        log::info!("stream server on {} stopped", self.local_addr);
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    stop: Arc<AtomicBool>,
    writer_handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let (sender, receiver) = bounded::<Point3<f64>>(CLIENT_QUEUE_CAPACITY);
                let id = registry.add(peer, sender);
                log::info!("client {id} connected from {peer}");

                let writer_registry = registry.clone();
                let spawned = thread::Builder::new()
                    .name(format!("quadtrack-client-{id}"))
                    .spawn(move || client_writer(stream, receiver, writer_registry, id, peer));
                match spawned {
                    Ok(handle) => writer_handles.lock().push(handle),
                    Err(e) => {
                        log::warn!("failed to spawn writer for client {id}: {e}");
                        registry.remove(id);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                log::error!("accept failed: {e}");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
    // Listening socket is released when the loop ends.
}

/// Drains one client's queue onto its socket. Exits when the client is
/// removed from the registry (sender dropped) or the socket write fails.
fn client_writer(
    mut stream: TcpStream,
    receiver: Receiver<Point3<f64>>,
    registry: Arc<ClientRegistry>,
    id: u64,
    peer: SocketAddr,
) {
    while let Ok(point) = receiver.recv() {
        let line = format_point(&point);
        if let Err(e) = stream.write_all(line.as_bytes()) {
            log::info!("client {id} ({peer}) write failed, dropping: {e}");
            registry.remove(id);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_peer() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn wire_format_is_fixed_decimal() {
        let line = format_point(&Point3::new(1.0, -2.5, 0.125));
        assert_eq!(line, "1.000000 -2.500000 0.125000\n");
    }

    #[test]
    fn slow_client_is_dropped_within_bounded_broadcasts() {
        let server = StreamServer::bind("127.0.0.1:0").unwrap();
        let broadcaster = server.broadcaster();

        // A stalled client: bounded queue with no one draining it.
        let (stalled_sender, _stalled_receiver) = bounded(2);
        broadcaster.register_raw(test_peer(), stalled_sender);

        // A responsive client drained after every broadcast.
        let (live_sender, live_receiver) = bounded(8);
        broadcaster.register_raw(test_peer(), live_sender);

        let mut delivered = Vec::new();
        for i in 0..4 {
            let p = Point3::new(i as f64, 0.0, 0.0);
            broadcaster.broadcast(&p);
            while let Ok(got) = live_receiver.try_recv() {
                delivered.push(got);
            }
        }

        // The stalled client is gone after its queue filled (2 points plus
        // the failing third), the live one saw every broadcast in order.
        assert_eq!(server.client_count(), 1);
        assert_eq!(
            delivered,
            (0..4).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect::<Vec<_>>()
        );
        server.shutdown();
    }

    #[test]
    fn broadcast_without_clients_is_a_no_op() {
        let server = StreamServer::bind("127.0.0.1:0").unwrap();
        assert_eq!(server.broadcaster().broadcast(&Point3::origin()), 0);
        server.shutdown();
    }
}
