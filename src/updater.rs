/*
 * Fixed-rate periodic callback source. Each `Updater` owns one named timer
 * thread; the elapsed time handed to the callback is measured with `Instant`
 * since that updater's own previous tick, so two updaters never influence
 * each other's timing.
 *
 * The timer sleeps on the stop channel with `recv_timeout`, which doubles as
 * the wake-up signal when `stop` is called.
 */
use crate::error::{PlatformError, Result as PlatformResult};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Returned by a tick callback to keep the timer running or end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/*
 * Shared flag raised when the owning updater is asked to stop. Callbacks that
 * block (e.g. waiting for the UI thread) poll it so `stop` never waits on a
 * tick that can no longer complete.
 */
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct TimerHandle {
    stop_tx: Sender<()>,
    token: StopToken,
    running: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Updater {
    name: String,
    rate_hz: u32,
    timer: Option<TimerHandle>,
}

impl Updater {
    pub fn new(name: &str, rate_hz: u32) -> Self {
        Self {
            name: name.to_string(),
            rate_hz,
            timer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Takes effect on the next `start`.
    pub fn set_rate_hz(&mut self, rate_hz: u32) {
        self.rate_hz = rate_hz;
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }

    /// True while the timer thread is alive and has not been told to stop.
    pub fn is_running(&self) -> bool {
        self.timer
            .as_ref()
            .is_some_and(|t| t.running.load(Ordering::SeqCst) && !t.token.is_stopped())
    }

    /*
     * Spawns the timer thread. `on_tick` receives the seconds elapsed since
     * the previous tick of this updater and the updater's stop token. A
     * running updater is stopped first.
     */
    pub fn start<F>(&mut self, mut on_tick: F) -> PlatformResult<()>
    where
        F: FnMut(f64, &StopToken) -> TickFlow + Send + 'static,
    {
        if self.rate_hz == 0 {
            return Err(PlatformError::OperationFailed(format!(
                "updater '{}' needs a positive rate",
                self.name
            )));
        }
        if self.timer.is_some() {
            log::debug!("Updater '{}': restarting", self.name);
            self.stop();
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let token = StopToken::new();
        let running = Arc::new(AtomicBool::new(true));
        let interval = self.interval();

        let thread_token = token.clone();
        let thread_running = Arc::clone(&running);
        let thread_name = self.name.clone();
        let join = thread::Builder::new()
            .name(format!("updater-{}", self.name))
            .spawn(move || {
                let mut last_tick = Instant::now();
                let mut deadline = last_tick + interval;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if thread_token.is_stopped() {
                        break;
                    }

                    let now = Instant::now();
                    let elapsed = now.duration_since(last_tick).as_secs_f64();
                    last_tick = now;
                    // A slow tick delays the next one instead of bursting to catch up.
                    deadline = (deadline + interval).max(now);

                    if on_tick(elapsed, &thread_token) == TickFlow::Stop {
                        log::debug!("Updater '{thread_name}': callback requested stop");
                        break;
                    }
                }
                thread_running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                PlatformError::InitializationFailed(format!(
                    "could not spawn updater thread '{}': {e}",
                    self.name
                ))
            })?;

        log::debug!("Updater '{}': started at {} Hz", self.name, self.rate_hz);
        self.timer = Some(TimerHandle {
            stop_tx,
            token,
            running,
            join,
        });
        Ok(())
    }

    /// Signals the timer thread and joins it. Safe to call when not running.
    pub fn stop(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        timer.token.stop();
        let _ = timer.stop_tx.send(());
        if timer.join.join().is_err() {
            log::error!("Updater '{}': timer thread panicked", self.name);
        } else {
            log::debug!("Updater '{}': stopped", self.name);
        }
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        self.stop();
    }
}
