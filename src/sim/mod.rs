use std::collections::VecDeque;
use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// A page identifier. Any comparable token would do, numeric is
/// the classroom convention.
pub type Page = u64;

/// The lifecycle state of one simulation run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// The committed effect of processing one page reference. `frames` is
/// a snapshot taken after the reference took effect; presentation
/// layers read it, they never reach back into the simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// 0-based position of the reference just processed.
    pub step: usize,
    pub page: Page,
    pub fault: bool,
    pub frames: Vec<Option<Page>>,
    /// Cumulative fault count, including this step.
    pub faults: u64,
    /// Cumulative hit count, including this step.
    pub hits: u64,
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let result = if self.fault { "fault" } else { "hit" };
        write!(f, "{{t={}, page={}, {}, frames=[", self.step, self.page, result)?;
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match frame {
                Some(page) => write!(f, "{}", page)?,
                None => write!(f, "-")?,
            }
        }
        write!(f, "]}}")
    }
}

/// A FIFO page-replacement simulation over a fixed reference sequence.
///
/// The simulator owns the frame set, the eviction queue, the cursor
/// and the counters; it advances one reference per `step` call and
/// knows nothing about when those calls happen. Scheduling belongs to
/// the driver, rendering to whatever consumes the emitted outcomes.
#[derive(Debug)]
pub struct Simulator {
    /// The input tape, immutable for the lifetime of the run.
    sequence: Vec<Page>,
    /// One slot per physical memory frame, `None` until first filled.
    frames: Vec<Option<Page>>,
    /// Resident pages in arrival order, oldest at the front. Holds
    /// exactly the occupied frame contents, in a different order.
    queue: VecDeque<Page>,
    /// Index of the next reference to process.
    cursor: usize,
    faults: u64,
    hits: u64,
    state: RunState,
}

impl Simulator {
    pub fn new(sequence: Vec<Page>, frame_count: usize) -> Result<Simulator> {
        if frame_count == 0 {
            return Err(Error::invalid_configuration("frame count must be positive"));
        }
        if sequence.is_empty() {
            return Err(Error::invalid_configuration("reference sequence must not be empty"));
        }
        Ok(Simulator {
            sequence,
            frames: vec![None; frame_count],
            queue: VecDeque::new(),
            cursor: 0,
            faults: 0,
            hits: 0,
            state: RunState::Idle,
        })
    }

    /// Process the next page reference and return its outcome, or
    /// `None` once the sequence is exhausted. The terminal transition
    /// is sticky: a completed run accepts no further steps until
    /// `reset`.
    ///
    /// A step is atomic. It either fully commits one reference's
    /// effect on the frame set, queue and counters, or commits nothing
    /// and flips to `Completed`.
    pub fn step(&mut self) -> Option<StepOutcome> {
        if self.cursor >= self.sequence.len() {
            self.state = RunState::Completed;
            return None;
        }
        let page = self.sequence[self.cursor];
        let fault = !self.frames.contains(&Some(page));
        if fault {
            self.faults += 1;
            if self.queue.len() < self.frames.len() {
                // warm-up: frames fill in arrival order
                self.queue.push_back(page);
                self.frames[self.queue.len() - 1] = Some(page);
            } else {
                // the queue mirrors a full frame set here, so the
                // front entry always exists
                let oldest = self.queue.pop_front().unwrap();
                let slot = self
                    .frames
                    .iter()
                    .position(|&frame| frame == Some(oldest))
                    .unwrap_or_else(|| {
                        panic!("page {} at the front of the fifo queue is not resident", oldest)
                    });
                self.queue.push_back(page);
                self.frames[slot] = Some(page);
            }
        } else {
            // pure FIFO: a hit never reorders the queue
            self.hits += 1;
        }
        let outcome = StepOutcome {
            step: self.cursor,
            page,
            fault,
            frames: self.frames.clone(),
            faults: self.faults,
            hits: self.hits,
        };
        self.cursor += 1;
        if self.cursor >= self.sequence.len() {
            self.state = RunState::Completed;
        }
        Some(outcome)
    }

    /// Begin the run. Only meaningful from `Idle`, a no-op otherwise.
    pub fn start(&mut self) {
        if self.state == RunState::Idle {
            self.state = RunState::Running;
        }
    }

    /// Stop accepting scheduled steps. Idempotent, and a no-op unless
    /// currently `Running`.
    pub fn pause(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Paused;
        }
    }

    /// Undo a `pause`. Idempotent, and a no-op unless currently
    /// `Paused`; internal run state is otherwise untouched.
    pub fn resume(&mut self) {
        if self.state == RunState::Paused {
            self.state = RunState::Running;
        }
    }

    /// Re-run initialization against the same sequence, legal in any
    /// state. The frame count may differ from the one configured
    /// before.
    pub fn reset(&mut self, frame_count: usize) -> Result<()> {
        if frame_count == 0 {
            return Err(Error::invalid_configuration("frame count must be positive"));
        }
        self.frames = vec![None; frame_count];
        self.queue.clear();
        self.cursor = 0;
        self.faults = 0;
        self.hits = 0;
        self.state = RunState::Idle;
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn frames(&self) -> &[Option<Page>] {
        &self.frames
    }

    pub fn sequence(&self) -> &[Page] {
        &self.sequence
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // queue/frame bookkeeping that must hold in every reachable state
    fn check_invariants(sim: &Simulator) {
        let mut occupied: Vec<Page> = sim.frames.iter().flatten().copied().collect();
        assert_eq!(sim.queue.len(), occupied.len());
        assert!(sim.queue.len() <= sim.frames.len());

        let mut resident: Vec<Page> = sim.queue.iter().copied().collect();
        occupied.sort_unstable();
        resident.sort_unstable();
        assert_eq!(resident, occupied);

        assert_eq!(sim.faults + sim.hits, sim.cursor as u64);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            Simulator::new(vec![1, 2, 3], 0),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(Simulator::new(vec![], 3), Err(Error::InvalidConfiguration(_))));

        let mut sim = Simulator::new(vec![1, 2, 3], 3).unwrap();
        assert!(matches!(sim.reset(0), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_initial_state() -> Result<()> {
        let sim = Simulator::new(vec![1, 2, 3], 3)?;
        assert_eq!(RunState::Idle, sim.state());
        assert_eq!(vec![None, None, None], sim.frames());
        assert_eq!(0, sim.cursor());
        assert_eq!(0, sim.faults());
        assert_eq!(0, sim.hits());
        Ok(())
    }

    #[test]
    fn test_warm_up_fills_in_arrival_order() -> Result<()> {
        let mut sim = Simulator::new(vec![5, 9, 2], 3)?;

        let outcome = sim.step().unwrap();
        assert!(outcome.fault);
        assert_eq!(vec![Some(5), None, None], outcome.frames);

        let outcome = sim.step().unwrap();
        assert!(outcome.fault);
        assert_eq!(vec![Some(5), Some(9), None], outcome.frames);

        let outcome = sim.step().unwrap();
        assert!(outcome.fault);
        assert_eq!(vec![Some(5), Some(9), Some(2)], outcome.frames);

        Ok(())
    }

    #[test]
    fn test_hit_leaves_frames_and_queue_untouched() -> Result<()> {
        let mut sim = Simulator::new(vec![1, 2, 1, 2], 3)?;
        sim.step().unwrap();
        sim.step().unwrap();
        let frames_before = sim.frames().to_vec();
        let queue_before: Vec<Page> = sim.queue.iter().copied().collect();

        let outcome = sim.step().unwrap();
        assert!(!outcome.fault);
        assert_eq!(frames_before, sim.frames());
        assert_eq!(queue_before, sim.queue.iter().copied().collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_eviction_victim_is_longest_resident() -> Result<()> {
        // 1 and 2 arrive first; the hit on 1 must not save it from
        // eviction, FIFO ignores recency.
        let mut sim = Simulator::new(vec![1, 2, 1, 3, 4], 2)?;
        sim.step().unwrap(); // 1 fault, frames [1, -]
        sim.step().unwrap(); // 2 fault, frames [1, 2]
        sim.step().unwrap(); // 1 hit

        let outcome = sim.step().unwrap(); // 3 evicts 1, the oldest
        assert!(outcome.fault);
        assert_eq!(vec![Some(3), Some(2)], outcome.frames);

        let outcome = sim.step().unwrap(); // 4 evicts 2
        assert!(outcome.fault);
        assert_eq!(vec![Some(3), Some(4)], outcome.frames);
        Ok(())
    }

    #[test]
    fn test_invariants_hold_at_every_step() -> Result<()> {
        let sequence = vec![7, 0, 1, 2, 0, 3, 0, 4, 2, 3, 0, 3, 2, 1, 2, 0, 1, 7, 0, 1];
        for frame_count in 1..=5 {
            let mut sim = Simulator::new(sequence.clone(), frame_count)?;
            check_invariants(&sim);
            let (mut faults, mut hits) = (0, 0);
            while let Some(outcome) = sim.step() {
                check_invariants(&sim);
                // counters are monotonically non-decreasing
                assert!(outcome.faults >= faults);
                assert!(outcome.hits >= hits);
                faults = outcome.faults;
                hits = outcome.hits;
            }
            assert_eq!(sequence.len() as u64, faults + hits);
        }
        Ok(())
    }

    #[test]
    fn test_scenario_classroom_sequence() -> Result<()> {
        // the canned classroom run, derived by hand: 8 references
        // against 3 frames produce 7 faults and a single hit on the
        // second reference of page 0.
        let mut sim = Simulator::new(vec![7, 0, 1, 2, 0, 3, 0, 4], 3)?;

        let expected = [
            (7, true, [Some(7), None, None]),
            (0, true, [Some(7), Some(0), None]),
            (1, true, [Some(7), Some(0), Some(1)]),
            (2, true, [Some(2), Some(0), Some(1)]), // evicts 7
            (0, false, [Some(2), Some(0), Some(1)]),
            (3, true, [Some(2), Some(3), Some(1)]), // evicts 0
            (0, true, [Some(2), Some(3), Some(0)]), // evicts 1
            (4, true, [Some(4), Some(3), Some(0)]), // evicts 2
        ];
        for (i, (page, fault, frames)) in expected.iter().enumerate() {
            let outcome = sim.step().unwrap();
            assert_eq!(i, outcome.step);
            assert_eq!(*page, outcome.page);
            assert_eq!(*fault, outcome.fault);
            assert_eq!(frames.to_vec(), outcome.frames);
        }
        assert_eq!(7, sim.faults());
        assert_eq!(1, sim.hits());
        assert_eq!(RunState::Completed, sim.state());
        Ok(())
    }

    #[test]
    fn test_scenario_single_frame() -> Result<()> {
        let mut sim = Simulator::new(vec![1, 1, 1], 1)?;

        let outcome = sim.step().unwrap();
        assert!(outcome.fault);
        assert_eq!(vec![Some(1)], outcome.frames);

        assert!(!sim.step().unwrap().fault);
        assert!(!sim.step().unwrap().fault);

        assert_eq!(1, sim.faults());
        assert_eq!(2, sim.hits());
        Ok(())
    }

    #[test]
    fn test_scenario_reset_after_partial_run() -> Result<()> {
        let mut sim = Simulator::new(vec![1, 2, 3, 4], 2)?;
        sim.start();
        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(2, sim.faults());

        sim.reset(3)?;
        assert_eq!(RunState::Idle, sim.state());
        assert_eq!(vec![None, None, None], sim.frames());
        assert_eq!(0, sim.cursor());
        assert_eq!(0, sim.faults());
        assert_eq!(0, sim.hits());

        // the run replays from the top against the new frame count
        let outcome = sim.step().unwrap();
        assert_eq!(0, outcome.step);
        assert_eq!(1, outcome.page);
        Ok(())
    }

    #[test]
    fn test_termination_is_sticky() -> Result<()> {
        let mut sim = Simulator::new(vec![1, 2], 2)?;
        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(RunState::Completed, sim.state());

        // further steps are no-ops and leave the counters alone
        assert_eq!(None, sim.step());
        assert_eq!(None, sim.step());
        assert_eq!(RunState::Completed, sim.state());
        assert_eq!(2, sim.faults());
        assert_eq!(0, sim.hits());
        Ok(())
    }

    #[test]
    fn test_pause_resume_idempotence() -> Result<()> {
        let mut sim = Simulator::new(vec![1, 2], 2)?;

        // neither control means anything before start
        sim.pause();
        assert_eq!(RunState::Idle, sim.state());
        sim.resume();
        assert_eq!(RunState::Idle, sim.state());

        sim.start();
        assert_eq!(RunState::Running, sim.state());
        sim.start();
        assert_eq!(RunState::Running, sim.state());

        sim.pause();
        sim.pause();
        assert_eq!(RunState::Paused, sim.state());

        sim.resume();
        sim.resume();
        assert_eq!(RunState::Running, sim.state());
        Ok(())
    }

    #[test]
    fn test_step_outcome_display() -> Result<()> {
        let mut sim = Simulator::new(vec![7, 0], 3)?;
        let outcome = sim.step().unwrap();
        assert_eq!("{t=0, page=7, fault, frames=[7 - -]}", format!("{}", outcome));
        Ok(())
    }
}
