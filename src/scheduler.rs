//! The scan scheduler: a fixed-period cooperative loop running on its
//! own worker thread, driven by a bounded control channel and
//! reporting telemetry on a bounded status channel plus a synchronous
//! snapshot getter — a command/status pair, not a blocking RPC, so
//! neither side ever waits on the other beyond the channels' capacity.
//!
//! Mirrors the teacher crate's player-thread shape: a dedicated
//! `std::thread`, `crossbeam_channel` for commands in and status out,
//! `select!`/`try_recv` to stay responsive without spinning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};

use crate::config::EngineConfig;
use crate::element::Program;
use crate::error::{CoreError, SoftErrorCounters};
use crate::evaluator::{self, ProgramState};
use crate::image::{IOImage, Image};
use crate::resolver::{self, ExecutionOrder};

/// The scheduler's three run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Stopped,
    Running,
    SingleStep,
}

/// Messages accepted on the control channel.
#[derive(Debug)]
pub enum ControlMsg {
    Run,
    Stop,
    Step,
    Reset,
    LoadProgram(Program),
}

/// Read-only telemetry the scheduler exposes, both pushed on the
/// status channel after every scan and available synchronously via
/// `Scheduler::telemetry()` for collaborators that poll instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub run_mode: RunMode,
    pub scan_count: u64,
    pub scan_overrun_count: u64,
    pub current_scan_period_actual: Duration,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Stopped,
            scan_count: 0,
            scan_overrun_count: 0,
            current_scan_period_actual: Duration::ZERO,
        }
    }
}

/// Owns the worker thread, the control/status channels, and the I/O
/// image. Dropping a `Scheduler` signals the worker to exit by closing
/// the control channel and joins it, so no worker outlives its owner.
pub struct Scheduler {
    control_tx: Sender<ControlMsg>,
    status_rx: Receiver<Telemetry>,
    telemetry: Arc<Mutex<Telemetry>>,
    io_image: Arc<IOImage>,
    counters: Arc<SoftErrorCounters>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Validate and load `program`, then spawn the worker thread in the
    /// `STOPPED` state. Callers send `Run`/`Step` to start scanning.
    pub fn spawn(program: Program, config: EngineConfig) -> Result<Self, CoreError> {
        program.validate()?;
        let order = resolver::resolve(&program);

        let (control_tx, control_rx) = bounded::<ControlMsg>(64);
        let (status_tx, status_rx) = bounded::<Telemetry>(16);

        let counters = Arc::new(SoftErrorCounters::new());
        let io_image = Arc::new(IOImage::new(counters.clone()));
        let telemetry = Arc::new(Mutex::new(Telemetry::default()));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let worker = {
            let io_image = io_image.clone();
            let counters = counters.clone();
            let telemetry = telemetry.clone();
            let stop_flag = stop_flag.clone();
            thread::Builder::new()
                .name("ladderscan-scheduler".into())
                .spawn(move || {
                    scan_loop(
                        control_rx, status_tx, io_image, counters, telemetry, stop_flag, program, order, config,
                    );
                })
                .expect("failed to spawn scheduler thread")
        };

        Ok(Self {
            control_tx,
            status_rx,
            telemetry,
            io_image,
            counters,
            stop_flag,
            worker: Some(worker),
        })
    }

    pub fn control(&self) -> Sender<ControlMsg> {
        self.control_tx.clone()
    }

    /// A clone of the status-report receiver; each message is a
    /// telemetry snapshot pushed after every completed scan.
    pub fn status(&self) -> Receiver<Telemetry> {
        self.status_rx.clone()
    }

    /// Synchronous telemetry read, for collaborators that poll rather
    /// than subscribe to the status channel.
    pub fn telemetry(&self) -> Telemetry {
        *self.telemetry.lock().expect("telemetry mutex poisoned")
    }

    pub fn io_image(&self) -> Arc<IOImage> {
        self.io_image.clone()
    }

    pub fn soft_error_counters(&self) -> Arc<SoftErrorCounters> {
        self.counters.clone()
    }

    pub fn run(&self) {
        let _ = self.control_tx.send(ControlMsg::Run);
    }

    pub fn stop(&self) {
        let _ = self.control_tx.send(ControlMsg::Stop);
    }

    pub fn step(&self) {
        let _ = self.control_tx.send(ControlMsg::Step);
    }

    pub fn reset(&self) {
        let _ = self.control_tx.send(ControlMsg::Reset);
    }

    /// Validate `program` before handing it to the worker: a rejected
    /// program never reaches the running scheduler, which therefore
    /// stays `STOPPED` with whatever program it already had.
    pub fn load_program(&self, program: Program) -> Result<(), CoreError> {
        program.validate()?;
        let _ = self.control_tx.send(ControlMsg::LoadProgram(program));
        Ok(())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        // Dropping control_tx (by letting it go out of scope with self)
        // would disconnect the channel, but we hold a clone in `self`
        // until the struct itself drops; send a Stop so a blocked
        // STOPPED-state worker wakes and observes the flag promptly.
        let _ = self.control_tx.send(ControlMsg::Stop);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn scan_loop(
    control_rx: Receiver<ControlMsg>,
    status_tx: Sender<Telemetry>,
    io_image: Arc<IOImage>,
    counters: Arc<SoftErrorCounters>,
    telemetry: Arc<Mutex<Telemetry>>,
    stop_flag: Arc<AtomicBool>,
    mut program: Program,
    mut order: ExecutionOrder,
    config: EngineConfig,
) {
    let mut state = ProgramState::new();
    let mut previous_image = Image::new();
    let mut run_mode = RunMode::Stopped;
    let mut scan_count: u64 = 0;
    let scan_period = config.scan_period();

    loop {
        if stop_flag.load(Ordering::SeqCst) {
            log::info!("scheduler shutting down");
            return;
        }

        match run_mode {
            RunMode::Stopped => {
                // No scan to run: block on the control channel rather
                // than busy-waiting. A closed channel means the owning
                // `Scheduler` was dropped.
                select! {
                    recv(control_rx) -> msg => match msg {
                        Ok(msg) => apply_control(msg, &mut run_mode, &mut program, &mut order, &io_image, &mut state, &mut previous_image),
                        Err(_) => return,
                    },
                }
            }
            RunMode::Running | RunMode::SingleStep => {
                let tick_start = Instant::now();

                let image_in = io_image.snapshot();
                let image_out = evaluator::run_scan(
                    &program,
                    &order,
                    &image_in,
                    &previous_image,
                    config.scan_period_secs(),
                    &mut state,
                    &counters,
                );
                io_image.commit(&image_out);
                previous_image = image_in;
                scan_count += 1;

                if run_mode == RunMode::SingleStep {
                    run_mode = RunMode::Stopped;
                }

                // Drain any pending control messages non-blocking, apply
                // them, then sleep to the next tick boundary.
                loop {
                    match control_rx.try_recv() {
                        Ok(msg) => apply_control(msg, &mut run_mode, &mut program, &mut order, &io_image, &mut state, &mut previous_image),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => return,
                    }
                }

                let elapsed = tick_start.elapsed();
                let overran = elapsed >= scan_period;
                if overran {
                    counters.record_scan_overrun();
                    log::warn!("scan overran period: {elapsed:?} >= {scan_period:?}");
                } else {
                    thread::sleep(scan_period - elapsed);
                }

                let actual = tick_start.elapsed();
                let snapshot = Telemetry {
                    run_mode,
                    scan_count,
                    scan_overrun_count: counters.scan_overrun_count(),
                    current_scan_period_actual: actual,
                };
                *telemetry.lock().expect("telemetry mutex poisoned") = snapshot;
                let _ = status_tx.try_send(snapshot);

                log::trace!("scan {scan_count} complete in {actual:?}");
            }
        }
    }
}

fn apply_control(
    msg: ControlMsg,
    run_mode: &mut RunMode,
    program: &mut Program,
    order: &mut ExecutionOrder,
    io_image: &Arc<IOImage>,
    state: &mut ProgramState,
    previous_image: &mut Image,
) {
    match msg {
        ControlMsg::Run => {
            log::info!("scheduler: run");
            *run_mode = RunMode::Running;
        }
        ControlMsg::Stop => {
            log::info!("scheduler: stop");
            *run_mode = RunMode::Stopped;
        }
        ControlMsg::Step => {
            log::info!("scheduler: step");
            *run_mode = RunMode::SingleStep;
        }
        ControlMsg::Reset => {
            log::info!("scheduler: reset");
            io_image.clear();
            state.clear();
            *previous_image = Image::new();
        }
        ControlMsg::LoadProgram(new_program) => match new_program.validate() {
            Ok(()) => {
                log::info!("scheduler: loading program {:?}", new_program.name);
                *order = resolver::resolve(&new_program);
                *program = new_program;
                state.clear();
            }
            Err(err) => {
                log::error!("scheduler: rejected program load: {err}");
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::image::Value;
    use std::time::Duration as StdDuration;

    fn passthrough_program() -> Program {
        Program::new(
            "passthrough",
            vec![crate::element::Rung::new(vec![
                Element::contact("c1", "in1", true),
                Element::coil("coil1", "out1"),
            ])],
        )
    }

    fn wait_for_scan(scheduler: &Scheduler, at_least: u64) {
        for _ in 0..200 {
            if scheduler.telemetry().scan_count >= at_least {
                return;
            }
            thread::sleep(StdDuration::from_millis(5));
        }
        panic!("scheduler never reached scan_count >= {at_least}");
    }

    #[test]
    fn starts_stopped_and_does_not_scan_until_run() {
        let scheduler = Scheduler::spawn(passthrough_program(), EngineConfig::new(20)).unwrap();
        thread::sleep(StdDuration::from_millis(50));
        assert_eq!(scheduler.telemetry().scan_count, 0);
    }

    #[test]
    fn run_drives_the_scan_loop_and_commits_outputs() {
        let scheduler = Scheduler::spawn(passthrough_program(), EngineConfig::new(10)).unwrap();
        let image = scheduler.io_image();
        image.set("in1", Value::Bit(true));
        scheduler.run();
        wait_for_scan(&scheduler, 1);
        assert_eq!(image.get_bit("out1"), true);
        scheduler.stop();
    }

    #[test]
    fn step_runs_exactly_one_scan_then_returns_to_stopped() {
        let scheduler = Scheduler::spawn(passthrough_program(), EngineConfig::new(10)).unwrap();
        scheduler.step();
        wait_for_scan(&scheduler, 1);
        thread::sleep(StdDuration::from_millis(50));
        assert_eq!(scheduler.telemetry().scan_count, 1);
        assert_eq!(scheduler.telemetry().run_mode, RunMode::Stopped);
    }

    #[test]
    fn reset_clears_the_image_and_block_state() {
        let scheduler = Scheduler::spawn(passthrough_program(), EngineConfig::new(10)).unwrap();
        let image = scheduler.io_image();
        image.set("in1", Value::Bit(true));
        scheduler.run();
        wait_for_scan(&scheduler, 1);
        scheduler.stop();

        scheduler.reset();
        thread::sleep(StdDuration::from_millis(30));
        assert_eq!(image.get_bit("in1"), false);
        assert_eq!(image.get_bit("out1"), false);
    }

    #[test]
    fn load_program_rejects_multiple_drivers_and_keeps_running_the_old_one() {
        let scheduler = Scheduler::spawn(passthrough_program(), EngineConfig::new(10)).unwrap();
        let bad = Program::new(
            "bad",
            vec![
                crate::element::Rung::new(vec![Element::coil("a", "x")]),
                crate::element::Rung::new(vec![Element::coil("b", "x")]),
            ],
        );
        let result = scheduler.load_program(bad);
        assert!(matches!(result, Err(CoreError::MultipleDrivers(_))));

        let image = scheduler.io_image();
        image.set("in1", Value::Bit(true));
        scheduler.run();
        wait_for_scan(&scheduler, 1);
        assert_eq!(image.get_bit("out1"), true, "old passthrough program must still be in effect");
    }
}
