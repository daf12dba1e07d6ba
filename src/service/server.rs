use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender};

use crate::renderer::PickResolver;
use crate::service::hub::{ClientId, DEFAULT_DELIVERY_TIMEOUT, DEFAULT_OUTBOUND_CAPACITY, Hub};
use crate::service::protocol::parse_query;
use crate::service::stats::{ServiceStats, StatsSnapshot};
use crate::service::worker::{PickCommand, PickWorker};

const ACCEPT_POLL: Duration = Duration::from_millis(10);
/// Longest query line accepted; a client that exceeds it is disconnected.
pub const MAX_LINE_BYTES: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub delivery_timeout: Duration,
    pub outbound_capacity: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Owns the connection hub, the pick worker and the listening socket.
pub struct QueryService {
    listener: TcpListener,
    hub: Arc<Hub>,
    worker: PickWorker,
    stats: Arc<ServiceStats>,
    shutdown: Arc<AtomicBool>,
}

impl QueryService {
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        resolver: PickResolver,
        options: ServiceOptions,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let stats = Arc::new(ServiceStats::default());
        let hub = Arc::new(Hub::new(
            options.outbound_capacity,
            options.delivery_timeout,
            Arc::clone(&stats),
        ));
        let worker = PickWorker::spawn(resolver, Arc::clone(&hub), Arc::clone(&stats));

        Ok(Self {
            listener,
            hub,
            worker,
            stats,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Raising this flag makes [`QueryService::run`] return.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn run(&self) -> io::Result<()> {
        log::info!("query service listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.accept(stream) {
                        log::warn!("dropping connection from {peer}: {e}");
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => log::warn!("accept failed: {e}"),
            }
        }

        self.hub.close_all();
        log::info!("query service stopped: {:?}", self.stats());
        Ok(())
    }

    fn accept(&self, stream: TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(self.hub.delivery_timeout()))?;
        let reader = stream.try_clone()?;

        let (id, outbound) = self.hub.register();

        let hub = Arc::clone(&self.hub);
        thread::spawn(move || write_loop(id, stream, outbound, hub));

        let hub = Arc::clone(&self.hub);
        let stats = Arc::clone(&self.stats);
        let tx_cmd = self.worker.sender();
        thread::spawn(move || read_loop(id, reader, tx_cmd, hub, stats));
        Ok(())
    }
}

fn read_loop(
    id: ClientId,
    stream: TcpStream,
    tx_cmd: Sender<PickCommand>,
    hub: Arc<Hub>,
    stats: Arc<ServiceStats>,
) {
    let mut reader = BufReader::new(&stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.by_ref().take(MAX_LINE_BYTES).read_line(&mut line) {
            Ok(0) => break,
            Ok(n) if n as u64 == MAX_LINE_BYTES && !line.ends_with('\n') => {
                stats.malformed.fetch_add(1, Ordering::Relaxed);
                log::warn!("client {id}: query line over {MAX_LINE_BYTES} bytes, disconnecting");
                break;
            }
            Ok(_) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_query(&line) {
                    Ok(query) => {
                        if tx_cmd.send(PickCommand::Pick { client: id, query }).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        stats.malformed.fetch_add(1, Ordering::Relaxed);
                        log::warn!("client {id}: skipping malformed query: {e}");
                    }
                }
            }
            Err(e) => {
                log::debug!("client {id}: read failed: {e}");
                break;
            }
        }
    }
    hub.unregister(id);
    let _ = stream.shutdown(Shutdown::Both);
}

fn write_loop(id: ClientId, mut stream: TcpStream, outbound: Receiver<String>, hub: Arc<Hub>) {
    for message in outbound.iter() {
        let written = stream
            .write_all(message.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush());
        if let Err(e) = written {
            log::debug!("client {id}: write failed: {e}");
            break;
        }
    }
    hub.unregister(id);
    let _ = stream.shutdown(Shutdown::Both);
}
