use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt as _;

use crate::error::Error;
use crate::error::Result;
use crate::sim::RunState;
use crate::sim::Simulator;
use crate::sim::StepOutcome;

/// Control signals accepted by the driver while it serves a run.
#[derive(Debug)]
pub enum Control {
    Start,
    Pause,
    Resume,
    Reset(usize),
}

/// Events delivered to a sink as the run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Step(StepOutcome),
    Complete { faults: u64, hits: u64 },
}

/// The emission boundary between the simulator and whatever renders
/// its outcomes. Renderers subscribe here, the simulator never
/// reaches into a display.
#[async_trait]
pub trait Sink: Send {
    async fn emit(&mut self, event: Event) -> Result<()>;
}

/// A sink that forwards events into an unbounded channel, for
/// consumers that want to read the run as a stream.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        self.tx.send(event)?;
        Ok(())
    }
}

struct EventLoopContext {
    /// the simulator being driven, stepped exactly once per tick
    /// while it is running.
    sim: Simulator,
    /// channel for receiving control signals, paired with control_tx,
    /// will be consumed into the eventloop.
    control_rx: mpsc::UnboundedReceiver<(Control, oneshot::Sender<Result<()>>)>,
    /// channel for receiving run state queries, paired with state_tx,
    /// will be consumed into the eventloop.
    state_rx: mpsc::UnboundedReceiver<((), oneshot::Sender<RunState>)>,
    /// destination for step outcomes and the completion notice.
    sink: Box<dyn Sink>,
}

/// Owns the recurring tick that advances a [`Simulator`], decoupling
/// when to advance from what advancing does. The driver is the only
/// logical accessor of the simulator for the duration of a run;
/// callers talk to it over channels and cancel it by dropping the
/// done sender passed to [`Driver::serve`].
pub struct Driver {
    tick_interval: Duration,

    /// channel for control signals, paired with the control_rx in
    /// the eventloop.
    control_tx: mpsc::UnboundedSender<(Control, oneshot::Sender<Result<()>>)>,

    /// channel for run state queries, paired with the state_rx in
    /// the eventloop.
    state_tx: mpsc::UnboundedSender<((), oneshot::Sender<RunState>)>,

    /// eventloop context, will be consumed by the eventloop, use
    /// mutex here for the interior mutability across threads.
    context: Mutex<Option<EventLoopContext>>,
}

impl Driver {
    pub fn new(sim: Simulator, sink: Box<dyn Sink>, tick_interval: Duration) -> Driver {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = mpsc::unbounded_channel();
        let context = EventLoopContext { sim, control_rx, state_rx, sink };
        Driver { tick_interval, control_tx, state_tx, context: Mutex::new(Some(context)) }
    }

    pub async fn serve(&self, done: broadcast::Receiver<()>) -> Result<()> {
        let context = self
            .context
            .lock()?
            .take()
            .ok_or_else(|| Error::internal("driver is already serving"))?;
        let eventloop = tokio::spawn(Self::eventloop(context, self.tick_interval, done));
        eventloop.await?
    }

    /// run the event loop, stepping the simulator once per tick while
    /// it is running and relaying control signals in between ticks.
    async fn eventloop(
        context: EventLoopContext,
        tick_interval: Duration,
        mut done: broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut sim = context.sim;
        let mut sink = context.sink;
        let mut control_rx = UnboundedReceiverStream::new(context.control_rx);
        let mut state_rx = UnboundedReceiverStream::new(context.state_rx);

        let mut ticker = tokio::time::interval(tick_interval);
        loop {
            tokio::select! {
                _ = done.recv() => {
                    return Ok(())
                }

                _ = ticker.tick() => {
                    if sim.state() != RunState::Running {
                        continue;
                    }
                    match sim.step() {
                        Some(outcome) => {
                            debug!("stepped {}", outcome);
                            sink.emit(Event::Step(outcome)).await?;
                            if sim.state() == RunState::Completed {
                                info!("run complete, {} faults, {} hits", sim.faults(), sim.hits());
                                sink.emit(Event::Complete {
                                    faults: sim.faults(),
                                    hits: sim.hits(),
                                }).await?;
                            }
                        }
                        None => {
                            // stale tick against an exhausted run
                            sink.emit(Event::Complete {
                                faults: sim.faults(),
                                hits: sim.hits(),
                            }).await?;
                        }
                    }
                },

                Some((control, res_tx)) = control_rx.next() => {
                    debug!("control {:?}", control);
                    let result = match control {
                        Control::Start => {
                            sim.start();
                            Ok(())
                        }
                        Control::Pause => {
                            sim.pause();
                            Ok(())
                        }
                        Control::Resume => {
                            sim.resume();
                            Ok(())
                        }
                        // the eventloop serializes this behind any
                        // in-flight tick, so a reset never races a
                        // stale step.
                        Control::Reset(frame_count) => sim.reset(frame_count),
                    };
                    if res_tx.send(result).is_err() {
                        return Err(Error::internal("control response receiver dropped"));
                    }
                }

                Some((_, res_tx)) = state_rx.next() => {
                    if res_tx.send(sim.state()).is_err() {
                        return Err(Error::internal("state response receiver dropped"));
                    }
                }
            }
        }
    }

    async fn execute(&self, control: Control) -> Result<()> {
        let (res_tx, res_rx) = oneshot::channel();
        if self.control_tx.send((control, res_tx)).is_err() {
            return Err(Error::internal("control channel is closed or dropped"));
        }
        res_rx.await?
    }

    pub async fn start(&self) -> Result<()> {
        self.execute(Control::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.execute(Control::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.execute(Control::Resume).await
    }

    pub async fn reset(&self, frame_count: usize) -> Result<()> {
        self.execute(Control::Reset(frame_count)).await
    }

    pub async fn get_state(&self) -> Result<RunState> {
        let (res_tx, res_rx) = oneshot::channel();
        if self.state_tx.send(((), res_tx)).is_err() {
            return Err(Error::internal("state channel is closed or dropped"));
        }
        Ok(res_rx.await?)
    }
}
