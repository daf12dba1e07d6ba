use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::renderer::PickResolver;
use crate::service::hub::{ClientId, Hub};
use crate::service::protocol::{QueryMessage, ResultMessage};
use crate::service::stats::ServiceStats;

pub enum PickCommand {
    Pick { client: ClientId, query: QueryMessage },
    Stop,
}

/// Single thread that owns the resolver. Every query from every client goes
/// through its queue, so picks never overlap.
pub struct PickWorker {
    tx_cmd: Sender<PickCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PickWorker {
    pub fn spawn(resolver: PickResolver, hub: Arc<Hub>, stats: Arc<ServiceStats>) -> Self {
        let (tx_cmd, rx_cmd) = channel::unbounded::<PickCommand>();
        let thread_handle = thread::spawn(move || {
            pick_thread(rx_cmd, resolver, hub, stats);
        });
        Self {
            tx_cmd,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn sender(&self) -> Sender<PickCommand> {
        self.tx_cmd.clone()
    }

    pub fn stop(&mut self) {
        let _ = self.tx_cmd.send(PickCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PickWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pick_thread(
    rx_cmd: Receiver<PickCommand>,
    resolver: PickResolver,
    hub: Arc<Hub>,
    stats: Arc<ServiceStats>,
) {
    for cmd in rx_cmd.iter() {
        match cmd {
            PickCommand::Pick { client, query } => {
                let outcome = resolver.pick(query.pixel_x, query.pixel_y);
                stats.record_pick(outcome.is_ok());
                if let Err(miss) = &outcome {
                    log::debug!("client {client}: {miss}");
                }

                match ResultMessage::from_outcome(&outcome).to_line() {
                    Ok(line) => {
                        hub.publish(client, &line);
                    }
                    Err(e) => log::error!("failed to encode result: {e}"),
                }
            }
            PickCommand::Stop => break,
        }
    }
    log::debug!("pick worker stopped");
}
