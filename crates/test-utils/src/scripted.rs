use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::bail;
use taskdag::types::Direction;
use taskdag::{RepeatPolicy, Task, TaskContext, TaskCore};

/// What a scripted action does on a given attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    /// Fail the first `n` attempts, then succeed.
    FailTimes(u32),
    AlwaysFail,
    Panic,
    /// Sleep, then succeed.
    Sleep(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Start,
    Finish,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub task: String,
    pub direction: Direction,
    pub attempt: u32,
    pub mark: Mark,
    pub at: Instant,
}

/// Shared log of every scripted action, with a live concurrency gauge.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Record>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, task: &str, direction: Direction, attempt: u32, mark: Mark) {
        self.records.lock().unwrap().push(Record {
            task: task.to_string(),
            direction,
            attempt,
            mark,
            at: Instant::now(),
        });
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Highest number of actions that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn marks(&self, task: &str, direction: Direction, mark: Mark) -> Vec<Instant> {
        self.records()
            .into_iter()
            .filter(|r| r.task == task && r.direction == direction && r.mark == mark)
            .map(|r| r.at)
            .collect()
    }

    pub fn start_count(&self, task: &str, direction: Direction) -> usize {
        self.marks(task, direction, Mark::Start).len()
    }

    pub fn first_start(&self, task: &str, direction: Direction) -> Option<Instant> {
        self.marks(task, direction, Mark::Start).into_iter().min()
    }

    pub fn last_finish(&self, task: &str, direction: Direction) -> Option<Instant> {
        self.marks(task, direction, Mark::Finish).into_iter().max()
    }

    /// Task names in the order they finished successfully.
    pub fn finish_order(&self, direction: Direction) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.direction == direction && r.mark == Mark::Finish)
            .map(|r| r.task)
            .collect()
    }

    /// Task names in the order they were first started.
    pub fn start_order(&self, direction: Direction) -> Vec<String> {
        let mut seen = Vec::new();
        for r in self.records() {
            if r.direction == direction && r.mark == Mark::Start && !seen.contains(&r.task) {
                seen.push(r.task);
            }
        }
        seen
    }
}

/// A task whose actions follow a [`Script`] and report to a [`Recorder`].
#[derive(Debug, Clone)]
pub struct ScriptedTask {
    core: TaskCore,
    perform: Script,
    reverse: Script,
    fix_fails: bool,
    recorder: Recorder,
}

impl ScriptedTask {
    pub fn new(name: &str, recorder: &Recorder) -> Self {
        Self {
            core: TaskCore::new(name),
            perform: Script::Succeed,
            reverse: Script::Succeed,
            fix_fails: false,
            recorder: recorder.clone(),
        }
    }

    pub fn perform_script(mut self, script: Script) -> Self {
        self.perform = script;
        self
    }

    pub fn reverse_script(mut self, script: Script) -> Self {
        self.reverse = script;
        self
    }

    pub fn repeat(mut self, policy: RepeatPolicy) -> Self {
        self.core = self.core.with_repeat(policy);
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.core = self.core.with_role(role);
        self
    }

    /// Make `fix_arguments` fail.
    pub fn unresolvable(mut self) -> Self {
        self.fix_fails = true;
        self
    }

    fn act(&self, script: Script, ctx: &TaskContext<'_>) -> anyhow::Result<()> {
        let name = self.core.name();
        let direction = ctx.direction();
        let attempt = ctx.attempt();

        self.recorder.enter();
        self.recorder.push(name, direction, attempt, Mark::Start);

        let outcome = match script {
            Script::Succeed => Ok(()),
            Script::FailTimes(n) if attempt <= n => Err(format!("scripted failure {attempt}/{n}")),
            Script::FailTimes(_) => Ok(()),
            Script::AlwaysFail => Err(format!("scripted failure on attempt {attempt}")),
            Script::Sleep(d) => {
                thread::sleep(d);
                Ok(())
            }
            Script::Panic => {
                self.recorder.push(name, direction, attempt, Mark::Fail);
                self.recorder.leave();
                panic!("scripted panic in {name}");
            }
        };

        let mark = if outcome.is_ok() { Mark::Finish } else { Mark::Fail };
        self.recorder.push(name, direction, attempt, mark);
        self.recorder.leave();

        match outcome {
            Ok(()) => Ok(()),
            Err(msg) => bail!("{msg}"),
        }
    }
}

impl Task for ScriptedTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn perform(&self, ctx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.act(self.perform, ctx)
    }

    fn reverse(&self, ctx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.act(self.reverse, ctx)
    }

    fn fix_arguments(&self) -> anyhow::Result<()> {
        if self.fix_fails {
            bail!("argument of '{}' cannot be resolved", self.core.name());
        }
        Ok(())
    }
}
