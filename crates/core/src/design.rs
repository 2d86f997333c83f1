//! Top level: power-on reset, PLL, reset synchronizers, tone generator,
//! frame latch and I2S transmitter on one shared timeline.
//!
//! Clock domains:
//! - **reference** (oscillator): POR countdown, PLL lock counter
//! - **system** (PLL output A): tone generator
//! - **transmit** (PLL output B): I2S transmitter
//! - **frame** (LRCLK rising edge): sample latch
//!
//! When several domains have an edge at the same instant, every one of them
//! sees the values registered before that instant, as flip-flops would.

use crate::audio::i2s::{Channel, TxEvents, TICKS_PER_FRAME};
use crate::audio::{FrameLatch, I2sTransmitter, Sample, ToneSampleGenerator, ToneState, WaveTable};
use crate::clocking::por::POR_INITIAL_COUNT;
use crate::clocking::{
    ClockDomain, EdgeScheduler, Edges, PllClockGenerator, PllState, PowerOnReset,
    ResetSynchronizer,
};
use crate::config::{ConfigError, DesignConfig, ValidatedConfig};
use crate::logging::{log, LogCategory, LogLevel};
use crate::platform::{ClockSignal, Direction, Platform, PlatformError, Signal};
use crate::state::StateError;
use crate::trace::{PinLevels, WaveTrace};
use crate::types::AudioFrame;
use crate::Design;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Top-level design errors
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error("No frame transmitted within {waited_ps} ps (PLL held in reset?)")]
    NoFrame { waited_ps: u64 },
    #[error("Save-state error: {0}")]
    State(#[from] StateError),
    #[error("Save-state format error: {0}")]
    SaveFormat(#[from] serde_json::Error),
}

/// Board lines the design drives or reads
#[derive(Debug, Clone)]
pub struct DesignPins {
    pub clk12: Signal,
    pub user_btn_n: Signal,
    pub mclk: Signal,
    pub sclk: Signal,
    pub lrclk: Signal,
    pub sdo: Signal,
    /// Second header carrying copies of the four I2S lines
    pub mirror: [Signal; 4],
    pub trigger: Signal,
}

impl DesignPins {
    pub fn request(platform: &mut dyn Platform) -> Result<Self, PlatformError> {
        let mut input = |name: &str| -> Result<Signal, PlatformError> {
            let sig = platform.request(name, 0)?;
            sig.expect(Direction::Input, 1)?;
            Ok(sig)
        };
        let clk12 = input("clk12")?;
        let user_btn_n = input("user_btn_n")?;

        let mut output = |name: &str| -> Result<Signal, PlatformError> {
            let sig = platform.request(name, 0)?;
            sig.expect(Direction::Output, 1)?;
            Ok(sig)
        };
        Ok(Self {
            clk12,
            user_btn_n,
            sclk: output("pmod1_0")?,
            lrclk: output("pmod1_1")?,
            sdo: output("pmod1_2")?,
            mclk: output("pmod1_3")?,
            mirror: [
                output("pmod2_0")?,
                output("pmod2_1")?,
                output("pmod2_2")?,
                output("pmod2_3")?,
            ],
            trigger: output("pmod1_7")?,
        })
    }
}

/// Edges seen per domain since power-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickCounters {
    pub reference: u64,
    pub system: u64,
    pub transmit: u64,
    /// LRCLK rising edges
    pub frames: u64,
}

/// What one scheduler step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub edges: Edges,
    pub tone_advanced: bool,
    pub tx: TxEvents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DesignState {
    version: u32,
    scheduler: EdgeScheduler,
    user_btn_n: bool,
    counters: TickCounters,
    por: PowerOnReset,
    pll: PllState,
    sys_reset: ResetSynchronizer,
    i2s_reset: ResetSynchronizer,
    tone: ToneState,
    latch: FrameLatch,
    tx: I2sTransmitter,
}

const STATE_VERSION: u32 = 1;

pub struct ToneDesign {
    config: ValidatedConfig,
    pins: DesignPins,
    por: PowerOnReset,
    pll: PllClockGenerator,
    sys_reset: ResetSynchronizer,
    i2s_reset: ResetSynchronizer,
    tone: ToneSampleGenerator,
    latch: FrameLatch,
    tx: I2sTransmitter,
    scheduler: EdgeScheduler,
    user_btn_n: bool,
    counters: TickCounters,
    frame_timeout_ps: u64,
    trace: Option<WaveTrace>,
}

impl ToneDesign {
    /// Validate `config`, claim the board lines, and declare every derived
    /// clock to the platform. Nothing runs until the first step.
    pub fn build(config: &DesignConfig, platform: &mut dyn Platform) -> Result<Self, DesignError> {
        let config = config.validate()?;
        let pins = DesignPins::request(platform)?;

        let pll = PllClockGenerator::new(config.pll, config.reference_hz, config.pll_lock_ticks)?;
        pll.declare_constraints(platform)?;
        let sample_clk = ClockSignal::new(
            "sample_clk",
            pll.output_hz() / TICKS_PER_FRAME as f64,
        );
        platform.declare_clock_period(&sample_clk, sample_clk.period_ns())?;

        let tone = ToneSampleGenerator::with_threshold(
            WaveTable::sine(),
            config.tone_ticks,
            config.sample_width,
        );

        let mut scheduler = EdgeScheduler::new();
        scheduler.add_clock(ClockDomain::Reference, config.reference_hz);
        scheduler.add_clock(ClockDomain::System, pll.output_hz());
        scheduler.add_clock(ClockDomain::Transmit, pll.output_hz());

        let reference_ps = scheduler.period_of(ClockDomain::Reference).unwrap_or(1);
        let transmit_ps = scheduler.period_of(ClockDomain::Transmit).unwrap_or(1);
        let power_up_ticks = POR_INITIAL_COUNT as u64 + 1 + config.pll_lock_ticks as u64;
        let frame_timeout_ps =
            reference_ps * (power_up_ticks + 4) + transmit_ps * TICKS_PER_FRAME as u64 * 4;

        log(LogCategory::Platform, LogLevel::Info, || {
            format!(
                "design built: {:.3} MHz domains, {} Hz tone, {}-bit samples",
                pll.output_hz() / 1e6,
                config.tone.tone_hz,
                config.sample_width.bits()
            )
        });

        Ok(Self {
            latch: FrameLatch::new(config.sample_width),
            config,
            pins,
            por: PowerOnReset::new(),
            pll,
            sys_reset: ResetSynchronizer::new("sys"),
            i2s_reset: ResetSynchronizer::new("i2s"),
            tone,
            tx: I2sTransmitter::new(),
            scheduler,
            user_btn_n: true,
            counters: TickCounters::default(),
            frame_timeout_ps,
            trace: None,
        })
    }

    /// Advance to the next clock edge and run every domain clocked there.
    pub fn step(&mut self) -> StepReport {
        let edges = self.scheduler.advance();
        let mut report = StepReport {
            edges,
            ..Default::default()
        };

        // Registered values from before this instant.
        let release = ResetSynchronizer::release_condition(self.por.done(), self.pll.locked());
        let (left, right) = (self.latch.left(), self.latch.right());

        if edges.contains(ClockDomain::Reference) {
            self.counters.reference += 1;
            self.por.tick();
            self.pll.tick(self.user_btn_n);
        }

        if edges.contains(ClockDomain::System) {
            self.counters.system += 1;
            let reset = self.sys_reset.tick(release);
            report.tone_advanced = self.tone.tick(reset);
        }

        if edges.contains(ClockDomain::Transmit) {
            self.counters.transmit += 1;
            let reset = self.i2s_reset.tick(release);
            report.tx = self.tx.tick(reset, left, right);
            if report.tx.lrclk_rose() {
                self.counters.frames += 1;
                self.latch.clock(self.tone.left(), self.tone.right());
            }
        }

        if let Some(trace) = self.trace.as_mut() {
            let levels = PinLevels {
                i2s: self.tx.pins(),
                trigger: self.tone.trigger(),
            };
            trace.record(self.scheduler.now_ps(), levels);
        }
        report
    }

    /// Step until simulated time reaches `time_ps`.
    pub fn run_until(&mut self, time_ps: u64) {
        while self.scheduler.now_ps() < time_ps {
            if self.step().edges.is_empty() {
                break;
            }
        }
    }

    /// Step until both domain resets have been released, or the timeout passes.
    pub fn run_until_running(&mut self) -> Result<(), DesignError> {
        let deadline = self.scheduler.now_ps() + self.frame_timeout_ps;
        while self.sys_reset.is_asserted() || self.i2s_reset.is_asserted() {
            if self.scheduler.now_ps() >= deadline || self.step().edges.is_empty() {
                return Err(DesignError::NoFrame {
                    waited_ps: self.frame_timeout_ps,
                });
            }
        }
        Ok(())
    }

    /// Drive the board's user button. Pressing it holds the PLL in reset.
    pub fn set_user_button(&mut self, pressed: bool) {
        self.user_btn_n = !pressed;
    }

    pub fn enable_trace(&mut self, capacity: usize, include_mclk: bool) {
        self.trace = Some(WaveTrace::new(capacity, include_mclk));
    }

    pub fn trace(&self) -> Option<&WaveTrace> {
        self.trace.as_ref()
    }

    /// Level of every output line the design claimed.
    pub fn outputs(&self) -> Vec<(&Signal, bool)> {
        let pins = self.tx.pins();
        let p = &self.pins;
        vec![
            (&p.mclk, pins.mclk),
            (&p.sclk, pins.sclk),
            (&p.lrclk, pins.lrclk),
            (&p.sdo, pins.sdo),
            (&p.mirror[0], pins.mclk),
            (&p.mirror[1], pins.lrclk),
            (&p.mirror[2], pins.sclk),
            (&p.mirror[3], pins.sdo),
            (&p.trigger, self.tone.trigger()),
        ]
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn pins(&self) -> &DesignPins {
        &self.pins
    }

    pub fn por(&self) -> &PowerOnReset {
        &self.por
    }

    pub fn pll(&self) -> &PllClockGenerator {
        &self.pll
    }

    pub fn tone(&self) -> &ToneSampleGenerator {
        &self.tone
    }

    pub fn latch(&self) -> &FrameLatch {
        &self.latch
    }

    pub fn transmitter(&self) -> &I2sTransmitter {
        &self.tx
    }

    pub fn sys_reset_asserted(&self) -> bool {
        self.sys_reset.is_asserted()
    }

    pub fn i2s_reset_asserted(&self) -> bool {
        self.i2s_reset.is_asserted()
    }

    pub fn counters(&self) -> TickCounters {
        self.counters
    }

    pub fn now_ps(&self) -> u64 {
        self.scheduler.now_ps()
    }

    /// Load a save-state, reporting exactly which register was refused.
    /// The design is left untouched on error.
    pub fn restore_state(&mut self, v: &Value) -> Result<(), DesignError> {
        let state: DesignState = serde_json::from_value(v.clone())?;
        self.check_state(&state)?;

        let mut tone = self.tone.clone();
        tone.restore(state.tone)?;
        let mut tx = I2sTransmitter::new();
        tx.restore(state.tx)?;

        self.tone = tone;
        self.tx = tx;
        self.scheduler = state.scheduler;
        self.user_btn_n = state.user_btn_n;
        self.counters = state.counters;
        self.por = state.por;
        self.pll.restore(state.pll);
        self.sys_reset = state.sys_reset;
        self.i2s_reset = state.i2s_reset;
        self.latch = state.latch;
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
        log(LogCategory::Platform, LogLevel::Info, || {
            format!("save-state loaded at {} ps", self.scheduler.now_ps())
        });
        Ok(())
    }

    fn check_state(&self, state: &DesignState) -> Result<(), StateError> {
        if state.version != STATE_VERSION {
            return Err(StateError::Version(state.version));
        }
        state.scheduler.check()?;
        for domain in [ClockDomain::Reference, ClockDomain::System, ClockDomain::Transmit] {
            if state.scheduler.period_of(domain) != self.scheduler.period_of(domain) {
                return Err(StateError::ClockMismatch(domain));
            }
        }
        let expected = self.config.sample_width;
        for sample in [state.latch.left(), state.latch.right()] {
            if sample.width() != expected {
                return Err(StateError::WidthMismatch {
                    expected: expected.bits(),
                    actual: sample.width().bits(),
                });
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> DesignState {
        DesignState {
            version: STATE_VERSION,
            scheduler: self.scheduler.clone(),
            user_btn_n: self.user_btn_n,
            counters: self.counters,
            por: self.por.clone(),
            pll: self.pll.state(),
            sys_reset: self.sys_reset.clone(),
            i2s_reset: self.i2s_reset.clone(),
            tone: self.tone.state(),
            latch: self.latch,
            tx: self.tx.clone(),
        }
    }
}

impl Design for ToneDesign {
    type Error = DesignError;

    fn power_cycle(&mut self) {
        log(LogCategory::Reset, LogLevel::Info, || "power cycle".to_string());
        self.por.power_cycle();
        self.pll.power_cycle();
        self.sys_reset.power_cycle();
        self.i2s_reset.power_cycle();
        self.tone.reset();
        self.latch = FrameLatch::new(self.config.sample_width);
        self.tx.reset();
        self.scheduler.rewind();
        self.counters = TickCounters::default();
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
    }

    fn step_frame(&mut self) -> Result<AudioFrame, DesignError> {
        let deadline = self.scheduler.now_ps() + self.frame_timeout_ps;
        let mut left: Option<i32> = None;

        while self.scheduler.now_ps() < deadline {
            let report = self.step();
            if report.edges.is_empty() {
                break;
            }
            match report.tx.reload {
                Some(Channel::Left) => {
                    left = Some(Sample::word_to_i32(self.tx.shift_register()));
                }
                Some(Channel::Right) => {
                    if let Some(left) = left {
                        return Ok(AudioFrame {
                            left,
                            right: Sample::word_to_i32(self.tx.shift_register()),
                        });
                    }
                }
                None => {}
            }
        }
        Err(DesignError::NoFrame {
            waited_ps: self.frame_timeout_ps,
        })
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        match self.restore_state(v) {
            Ok(()) => Ok(()),
            Err(DesignError::SaveFormat(e)) => Err(e),
            Err(e) => Err(serde_json::Error::custom(e)),
        }
    }
}
