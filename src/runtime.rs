//! Cooperative runtime: the control thread.
//!
//! Runs every periodic loop of the controller on one `edge-executor`
//! `LocalExecutor`, with `async-io-mini` timers as the only suspension
//! points.  Components are shared as `Rc<RefCell<_>>` and a borrow is
//! never held across an `.await`, so each loop body runs as one critical
//! section.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  Control thread (futures_lite::future::block_on)             │
//!  │  ┌────────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                          │  │
//!  │  │  ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌─────────────┐  │  │
//!  │  │  │ Valves  │ │  Leaks   │ │  Flush  │ │ Boot check  │  │  │
//!  │  │  │  1s ⏱   │ │ 1s ⏱     │ │  5s ⏱   │ │ one-shot 2s │  │  │
//!  │  │  └─────────┘ └──────────┘ └─────────┘ └─────────────┘  │  │
//!  │  │  ┌─────────────┐ ┌──────────────────────────────────┐  │  │
//!  │  │  │ Temps  30s ⏱│ │ Commands (wake-on-send)          │  │  │
//!  │  │  └─────────────┘ └──────────────────────────────────┘  │  │
//!  │  └────────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::commands::AppCommand;
use crate::app::ports::{EventSink, FilePort};
use crate::app::service::LeakController;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::state::FlushOutcome;

/// Channel depth for inbound commands.
const COMMAND_DEPTH: usize = 8;

/// How often loops re-check the cancel token while otherwise idle.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Inbound command channel: buttons / console / API → control thread.
pub static COMMANDS: Channel<CriticalSectionRawMutex, AppCommand, COMMAND_DEPTH> = Channel::new();

/// Queue a command for the control thread.  Returns `false` when the
/// channel is full and the command was dropped.
pub fn submit(cmd: AppCommand) -> bool {
    if COMMANDS.try_send(cmd).is_err() {
        warn!("APP: command channel full, dropping {}", cmd.name());
        return false;
    }
    true
}

// ── Cancellation ──────────────────────────────────────────────

/// Cooperative stop flag, checked at the top of every loop body.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Loops ─────────────────────────────────────────────────────

type Shared<T> = Rc<RefCell<T>>;

async fn valve_loop<S: EventSink>(ctl: Shared<LeakController>, sink: Shared<S>, cancel: CancelToken) {
    loop {
        Timer::after(Duration::from_secs(1)).await;
        if cancel.is_cancelled() {
            break;
        }
        ctl.borrow_mut().tick_valves(&mut *sink.borrow_mut());
    }
}

async fn leak_loop<S: EventSink>(
    ctl: Shared<LeakController>,
    sink: Shared<S>,
    interval: Duration,
    cancel: CancelToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        ctl.borrow_mut().sample_leaks(&mut *sink.borrow_mut());
        Timer::after(interval).await;
    }
}

async fn temperature_loop<S: EventSink>(
    ctl: Shared<LeakController>,
    sink: Shared<S>,
    interval: Duration,
    cancel: CancelToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        ctl.borrow_mut().sample_temperatures(&mut *sink.borrow_mut());
        Timer::after(interval).await;
    }
}

/// Re-check a power-on leak once the probes have settled.
async fn boot_check<S: EventSink>(ctl: Shared<LeakController>, sink: Shared<S>, delay: Duration) {
    if !ctl.borrow().guard().startup_pending() {
        return;
    }
    Timer::after(delay).await;
    ctl.borrow_mut().verify_startup_leak(&mut *sink.borrow_mut());
}

async fn flush_loop<F: FilePort, S: EventSink>(
    ctl: Shared<LeakController>,
    fs: Shared<F>,
    sink: Shared<S>,
    tick: Duration,
    cancel: CancelToken,
) {
    loop {
        Timer::after(tick).await;
        if cancel.is_cancelled() {
            break;
        }
        // Failures are logged and emitted by the controller.
        let _ = ctl
            .borrow_mut()
            .flush_tick(&mut *fs.borrow_mut(), &mut *sink.borrow_mut());
    }
}

/// Handle commands until `Shutdown` arrives.
async fn command_loop<S: EventSink>(ctl: Shared<LeakController>, sink: Shared<S>) {
    loop {
        let cmd = COMMANDS.receive().await;
        if cmd == AppCommand::Shutdown {
            info!("APP: shutdown requested");
            return;
        }
        // Rejections are logged and emitted by the controller.
        let _ = ctl.borrow_mut().handle_command(cmd, &mut *sink.borrow_mut());
    }
}

async fn until_cancelled(cancel: CancelToken) {
    while !cancel.is_cancelled() {
        Timer::after(CANCEL_POLL).await;
    }
}

// ── Entry point ───────────────────────────────────────────────

/// Start the controller and run its loops on the calling thread until a
/// `Shutdown` command or `cancel`.  Returns the result of the final flush.
pub fn run<F: FilePort, S: EventSink>(
    controller: LeakController,
    fs: F,
    sink: S,
    config: &SystemConfig,
    cancel: CancelToken,
) -> Result<FlushOutcome> {
    let ctl: Shared<LeakController> = Rc::new(RefCell::new(controller));
    let fs: Shared<F> = Rc::new(RefCell::new(fs));
    let sink: Shared<S> = Rc::new(RefCell::new(sink));

    ctl.borrow_mut()
        .start(&mut *fs.borrow_mut(), &mut *sink.borrow_mut());

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    let sample_interval = Duration::from_millis(u64::from(config.leak_sample_interval_ms));
    let stabilization = Duration::from_millis(u64::from(config.startup_stabilization_ms));
    let flush_tick = Duration::from_secs(u64::from(config.flush_tick_secs));
    let temp_interval = Duration::from_secs(u64::from(config.temp_poll_interval_secs));

    executor
        .spawn(valve_loop(ctl.clone(), sink.clone(), cancel.clone()))
        .detach();
    executor
        .spawn(leak_loop(ctl.clone(), sink.clone(), sample_interval, cancel.clone()))
        .detach();
    executor
        .spawn(temperature_loop(ctl.clone(), sink.clone(), temp_interval, cancel.clone()))
        .detach();
    executor
        .spawn(boot_check(ctl.clone(), sink.clone(), stabilization))
        .detach();
    executor
        .spawn(flush_loop(ctl.clone(), fs.clone(), sink.clone(), flush_tick, cancel.clone()))
        .detach();

    info!(
        "APP: runtime started (sample {}ms, temps {}s, flush tick {}s)",
        config.leak_sample_interval_ms, config.temp_poll_interval_secs, config.flush_tick_secs
    );

    futures_lite::future::block_on(executor.run(futures_lite::future::or(
        command_loop(ctl.clone(), sink.clone()),
        until_cancelled(cancel.clone()),
    )));

    cancel.cancel();
    ctl.borrow_mut()
        .shutdown(&mut *fs.borrow_mut(), &mut *sink.borrow_mut())
}
