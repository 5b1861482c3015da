//! btleplug implementation of the [`Transport`] port.
//!
//! Each handle gets a [`Worker`] task that owns its `Peripheral` and executes
//! the queued commands one after another, so completions come out in the
//! order the commands went in. Workers and their notification pumps report
//! into one event channel; the adapter-wide disconnect watcher feeds the
//! workers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use btleplug::api::{Central, CentralEvent, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral, PeripheralId as NativeId};
use tokio::runtime::Handle as Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt as _};

use volv0x_app::ports::Transport;
use volv0x_domain::connection::ConnectionPhase;
use volv0x_domain::event::TransportEvent;
use volv0x_domain::gatt::{CharacteristicDescriptor, DescriptorRef, GattStatus, WriteType};
use volv0x_domain::id::{HandleId, PeripheralId};

use crate::error::BleError;
use crate::worker::{Job, Worker};

struct Link {
    native: NativeId,
    jobs: mpsc::UnboundedSender<Job>,
}

type Links = Arc<Mutex<HashMap<HandleId, Link>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Transport`] backed by a btleplug adapter.
///
/// Peripherals must be [`register`](Self::register)ed (usually straight from
/// the scanner) before a handle can be opened on them.
pub struct BtleplugTransport {
    runtime: Runtime,
    events: mpsc::Sender<TransportEvent>,
    known: Mutex<HashMap<PeripheralId, Peripheral>>,
    links: Links,
    workers: Workers,
    watcher: JoinHandle<()>,
}

impl BtleplugTransport {
    /// Create the transport and the receiving end of its event channel.
    ///
    /// Must be called from within a tokio runtime; workers are spawned on it.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::Scan`] when the adapter event stream cannot be
    /// opened.
    pub async fn new(
        central: &Adapter,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), BleError> {
        let central_events = central.events().await?;
        let links = Links::default();
        let watcher = tokio::spawn(watch_disconnects(central_events, Arc::clone(&links)));
        let (events, receiver) = mpsc::channel(capacity);

        let transport = Self {
            runtime: Runtime::current(),
            events,
            known: Mutex::default(),
            links,
            workers: Workers::default(),
            watcher,
        };
        Ok((transport, receiver))
    }

    /// Make `peripheral` available to [`Transport::open`].
    pub fn register(&self, peripheral: Peripheral) -> PeripheralId {
        let id = PeripheralId::new(peripheral.address().to_string());
        lock(&self.known).insert(id.clone(), peripheral);
        id
    }

    /// Wait until the workers of released handles have finished.
    ///
    /// A worker exits once its handle is [`release`](Transport::release)d
    /// (or the event receiver is gone), after the final disconnect went out.
    /// Workers of handles that are still open keep this pending.
    pub async fn closed(&self) {
        self.workers.join().await;
    }

    fn enqueue(&self, handle: HandleId, job: Job) -> bool {
        let links = lock(&self.links);
        let Some(link) = links.get(&handle) else {
            tracing::debug!(%handle, ?job, "command for unknown handle dropped");
            return false;
        };
        if link.jobs.send(job).is_err() {
            tracing::warn!(%handle, "transport worker is gone");
            return false;
        }
        true
    }

    fn report_connect_failure(&self, handle: HandleId) {
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let event = TransportEvent::ConnectionStateChanged {
                handle,
                status: GattStatus::FAILURE,
                phase: ConnectionPhase::Disconnected,
            };
            let _ = events.send(event).await;
        });
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

impl Transport for BtleplugTransport {
    fn open(&self, peripheral: &PeripheralId) -> HandleId {
        let handle = HandleId::new();
        let native = lock(&self.known).get(peripheral).cloned();
        let Some(native) = native else {
            tracing::warn!(%peripheral, "open requested for a peripheral that was never scanned");
            self.report_connect_failure(handle);
            return handle;
        };

        let (jobs, queue) = mpsc::unbounded_channel();
        let link = Link {
            native: native.id(),
            jobs,
        };
        let worker = Worker::new(handle, native, self.events.clone());
        self.workers.track(self.runtime.spawn(worker.run(queue)));

        let _ = link.jobs.send(Job::Connect);
        lock(&self.links).insert(handle, link);
        tracing::debug!(%handle, %peripheral, "transport handle opened");
        handle
    }

    fn reconnect(&self, handle: HandleId) {
        if !self.enqueue(handle, Job::Connect) {
            self.report_connect_failure(handle);
        }
    }

    fn close(&self, handle: HandleId) {
        self.enqueue(handle, Job::Close);
    }

    fn release(&self, handle: HandleId) {
        if let Some(link) = lock(&self.links).remove(&handle) {
            let _ = link.jobs.send(Job::Release);
        }
    }

    fn discover_services(&self, handle: HandleId) {
        self.enqueue(handle, Job::Discover);
    }

    fn write_descriptor(&self, handle: HandleId, descriptor: &DescriptorRef, value: &[u8]) {
        self.enqueue(
            handle,
            Job::WriteDescriptor {
                descriptor: *descriptor,
                value: value.to_vec(),
            },
        );
    }

    fn write_characteristic(
        &self,
        handle: HandleId,
        characteristic: &CharacteristicDescriptor,
        value: &[u8],
        write_type: WriteType,
    ) {
        self.enqueue(
            handle,
            Job::WriteCharacteristic {
                characteristic: characteristic.clone(),
                value: value.to_vec(),
                write_type,
            },
        );
    }

    fn read_characteristic(&self, handle: HandleId, characteristic: &CharacteristicDescriptor) {
        self.enqueue(
            handle,
            Job::Read {
                characteristic: characteristic.clone(),
            },
        );
    }

    fn request_mtu(&self, handle: HandleId, size: u16) {
        self.enqueue(handle, Job::RequestMtu { size });
    }
}

/// Forward adapter-level disconnects to the workers of the affected links.
async fn watch_disconnects<S>(mut events: S, links: Links)
where
    S: Stream<Item = CentralEvent> + Unpin,
{
    while let Some(event) = events.next().await {
        if let CentralEvent::DeviceDisconnected(id) = event {
            for link in lock(&links).values().filter(|link| link.native == id) {
                let _ = link.jobs.send(Job::LinkLost);
            }
        }
    }
}

/// Join handles of the spawned workers.
#[derive(Default)]
struct Workers(Mutex<Vec<JoinHandle<()>>>);

impl Workers {
    fn track(&self, worker: JoinHandle<()>) {
        let mut workers = lock(&self.0);
        workers.retain(|worker| !worker.is_finished());
        workers.push(worker);
    }

    async fn join(&self) {
        let workers = std::mem::take(&mut *lock(&self.0));
        for worker in workers {
            if let Err(err) = worker.await {
                tracing::warn!(%err, "transport worker ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn should_wait_for_tracked_workers() {
        let workers = Workers::default();
        let finished = Arc::new(AtomicUsize::new(0));
        for delay in [5, 20] {
            let finished = Arc::clone(&finished);
            workers.track(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            }));
        }

        workers.join().await;

        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_drop_finished_workers_when_tracking() {
        let workers = Workers::default();
        let done = tokio::spawn(async {});
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(done.is_finished());
        workers.track(done);

        workers.track(tokio::spawn(std::future::pending()));

        assert_eq!(lock(&workers.0).len(), 1);
        lock(&workers.0)[0].abort();
        workers.join().await;
        assert!(lock(&workers.0).is_empty());
    }
}
