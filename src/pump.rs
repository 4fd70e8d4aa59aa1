//! Periodic tick source that drives display refresh and countdown polling.
//!
//! The timing state itself never waits; only this worker thread does.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

const FALLBACK_INTERVAL: Duration = Duration::from_millis(100);

enum PumpOp {
    SetInterval(Duration),
    Quit,
}

pub struct TickScheduler {
    control: Sender<PumpOp>,
    worker: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Spawn the pump thread. `on_tick` runs on that thread once per interval.
    pub fn start<F>(interval: Duration, on_tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (control, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("tick-pump".to_string())
            .spawn(move || pump_thread(rx, interval, on_tick))?;
        debug!("tick pump started every {:?}", interval);
        Ok(Self {
            control,
            worker: Some(worker),
        })
    }

    pub fn set_interval(&self, interval: Duration) {
        self.control.send(PumpOp::SetInterval(interval)).ok();
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop ticking. When this returns no further tick will run, unless it
    /// was called from inside a tick, in which case the pump exits as soon
    /// as that tick returns.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.control.send(PumpOp::Quit).ok();
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!("tick pump panicked");
        }
        debug!("tick pump stopped");
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pump_thread<F: FnMut()>(control: Receiver<PumpOp>, interval: Duration, mut on_tick: F) {
    let mut interval = sanitize(interval);
    loop {
        match control.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => on_tick(),
            Ok(PumpOp::SetInterval(new)) => interval = sanitize(new),
            Ok(PumpOp::Quit) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn sanitize(interval: Duration) -> Duration {
    if interval.is_zero() {
        FALLBACK_INTERVAL
    } else {
        interval
    }
}
