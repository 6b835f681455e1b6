//! Tick Scheduler
//!
//! One base tick drives every periodic race task. Each task runs every
//! `n` base ticks and can be cancelled on its own; stopping a race cancels
//! them all, so nothing keeps firing after the race is over.

use std::{fmt, time::Duration};

/// Periodic race tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Advance car positions
    Animation,
    /// Refresh the gas price
    GasRefresh,
    /// Let opponents act
    OpponentSimulation,
    /// Tick the race clock
    Countdown,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Animation => "animation",
            Self::GasRefresh => "gas-refresh",
            Self::OpponentSimulation => "opponent-simulation",
            Self::Countdown => "countdown",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
struct ScheduledTask {
    kind: TaskKind,
    every: u64,
    /// Base ticks since this task last ran
    elapsed: u64,
}

/// Single tick source for all periodic tasks
#[derive(Clone, Debug)]
pub struct Scheduler {
    base_tick: Duration,
    tasks: Vec<ScheduledTask>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(base_tick: Duration) -> Self {
        Self {
            base_tick,
            tasks: Vec::new(),
            ticks: 0,
        }
    }

    pub fn base_tick(&self) -> Duration {
        self.base_tick
    }

    /// Base ticks elapsed since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run `kind` every `period`, rounded to whole base ticks (at least one)
    ///
    /// Rescheduling an active task replaces its period and restarts it.
    pub fn schedule(&mut self, kind: TaskKind, period: Duration) {
        let base = self.base_tick.as_millis().max(1);
        let every = ((period.as_millis() + base / 2) / base).max(1) as u64;

        self.tasks.retain(|task| task.kind != kind);
        self.tasks.push(ScheduledTask {
            kind,
            every,
            elapsed: 0,
        });
        tracing::debug!("Scheduled {} every {} ticks", kind, every);
    }

    /// Stop running `kind`; returns whether it was scheduled
    pub fn cancel(&mut self, kind: TaskKind) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.kind != kind);
        let cancelled = self.tasks.len() != before;
        if cancelled {
            tracing::debug!("Cancelled {}", kind);
        }
        cancelled
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_scheduled(&self, kind: TaskKind) -> bool {
        self.tasks.iter().any(|task| task.kind == kind)
    }

    /// Effective period of `kind` after rounding to base ticks
    pub fn period(&self, kind: TaskKind) -> Option<Duration> {
        self.tasks
            .iter()
            .find(|task| task.kind == kind)
            .map(|task| {
                self.base_tick
                    .saturating_mul(u32::try_from(task.every).unwrap_or(u32::MAX))
            })
    }

    pub fn active_tasks(&self) -> Vec<TaskKind> {
        self.tasks.iter().map(|task| task.kind).collect()
    }

    /// Advance one base tick and return the tasks due now, in schedule order
    pub fn advance(&mut self) -> Vec<TaskKind> {
        self.ticks += 1;
        let mut due = Vec::new();
        for task in &mut self.tasks {
            task.elapsed += 1;
            if task.elapsed >= task.every {
                task.elapsed = 0;
                due.push(task.kind);
            }
        }
        due
    }
}
