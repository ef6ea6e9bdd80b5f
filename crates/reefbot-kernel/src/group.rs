//! Command composition.
//!
//! Groups are ordinary [`Command`]s, so the scheduler treats them like any
//! other: a group requires the union of its members' requirements and holds
//! all of them for as long as it is scheduled.
//!
//! | Group | Runs | Finished when |
//! |---|---|---|
//! | [`Sequence`] | members one after another | the last member finishes |
//! | [`Parallel`] | all members at once | every member has finished |
//! | [`Race`] | all members at once | any member finishes |
//! | [`Wait`] | nothing | `n` ticks have elapsed |
//! | [`Timeout`] | one member | the member finishes or `n` ticks elapse |
//!
//! Members of a [`Parallel`] or [`Race`] run in the same tick, so they may not
//! share an actuator.
//!
//! # Example
//!
//! ```
//! use reefbot_kernel::group::{CommandExt, Sequence, Wait};
//! use reefbot_kernel::Command;
//!
//! let routine = Sequence::new("pause twice", vec![Wait::new(2).boxed(), Wait::new(3).boxed()])
//!     .with_timeout(4);
//! assert!(routine.requirements().is_empty());
//! assert_eq!(routine.name(), "pause twice");
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use reefbot_types::{ActuatorId, RobotError};

use crate::command::{Command, Outputs};

/// Number of ticks of `period` needed to cover `duration`, rounded up.
pub fn ticks_for(duration: Duration, period: Duration) -> u32 {
    if period.is_zero() {
        return 0;
    }
    let ticks = duration.as_nanos().div_ceil(period.as_nanos());
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Builder helpers available on every command.
pub trait CommandExt: Command + Sized + 'static {
    fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }

    /// Interrupt this command after `ticks` executes.
    fn with_timeout(self, ticks: u32) -> Timeout {
        Timeout::new(self.boxed(), ticks)
    }
}

impl<C: Command + 'static> CommandExt for C {}

// ─────────────────────────────────────────────────────────────────────────────
// Member
// ─────────────────────────────────────────────────────────────────────────────

/// One child of a group with its requirements read once at construction.
struct Member {
    command: Box<dyn Command>,
    name: String,
    requirements: BTreeSet<ActuatorId>,
}

impl Member {
    fn new(command: Box<dyn Command>) -> Self {
        Self {
            name: command.name().to_string(),
            requirements: command.requirements(),
            command,
        }
    }

    fn initialize(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        let mut out = out.scoped(&self.requirements, &self.name);
        self.command.initialize(&mut out)
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        let mut out = out.scoped(&self.requirements, &self.name);
        self.command.execute(&mut out)
    }

    fn end(&mut self, out: &mut Outputs<'_>, interrupted: bool) -> Result<(), RobotError> {
        let mut out = out.scoped(&self.requirements, &self.name);
        self.command.end(&mut out, interrupted)
    }

    fn is_finished(&self) -> bool {
        self.command.is_finished()
    }
}

fn members(commands: Vec<Box<dyn Command>>) -> Vec<Member> {
    commands.into_iter().map(Member::new).collect()
}

fn union(members: &[Member]) -> BTreeSet<ActuatorId> {
    members
        .iter()
        .flat_map(|m| m.requirements.iter().copied())
        .collect()
}

/// Reject members that would drive the same actuator in one tick.
fn disjoint(group: &str, members: &[Member]) -> Result<(), RobotError> {
    let mut seen = BTreeSet::new();
    for member in members {
        for actuator in &member.requirements {
            if !seen.insert(*actuator) {
                return Err(RobotError::Config(format!(
                    "group '{group}': member '{}' shares {actuator} with another member",
                    member.name
                )));
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Sequence
// ─────────────────────────────────────────────────────────────────────────────

/// Runs members in order.  When a member finishes it ends and the next one
/// initializes in the same tick; the next one first executes on the
/// following tick.
pub struct Sequence {
    name: String,
    members: Vec<Member>,
    requirements: BTreeSet<ActuatorId>,
    current: usize,
}

impl Sequence {
    pub fn new(name: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        let members = members(commands);
        Self {
            name: name.into(),
            requirements: union(&members),
            members,
            current: 0,
        }
    }
}

impl Command for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        self.requirements.clone()
    }

    fn initialize(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.current = 0;
        match self.members.first_mut() {
            Some(first) => first.initialize(out),
            None => Ok(()),
        }
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        let Some(member) = self.members.get_mut(self.current) else {
            return Ok(());
        };
        member.execute(out)?;
        if member.is_finished() {
            member.end(out, false)?;
            self.current += 1;
            if let Some(next) = self.members.get_mut(self.current) {
                next.initialize(out)?;
            }
        }
        Ok(())
    }

    fn end(&mut self, out: &mut Outputs<'_>, interrupted: bool) -> Result<(), RobotError> {
        match self.members.get_mut(self.current) {
            Some(member) if interrupted => member.end(out, true),
            _ => Ok(()),
        }
    }

    fn is_finished(&self) -> bool {
        self.current >= self.members.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parallel
// ─────────────────────────────────────────────────────────────────────────────

/// Runs every member each tick until all of them have finished.
pub struct Parallel {
    name: String,
    members: Vec<Member>,
    requirements: BTreeSet<ActuatorId>,
    running: Vec<bool>,
}

impl Parallel {
    /// # Errors
    ///
    /// [`RobotError::Config`] when two members require the same actuator.
    pub fn new(name: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Result<Self, RobotError> {
        let name = name.into();
        let members = members(commands);
        disjoint(&name, &members)?;
        Ok(Self {
            name,
            requirements: union(&members),
            running: vec![false; members.len()],
            members,
        })
    }
}

impl Command for Parallel {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        self.requirements.clone()
    }

    fn initialize(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        for (member, running) in self.members.iter_mut().zip(&mut self.running) {
            *running = true;
            member.initialize(out)?;
        }
        Ok(())
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        for (member, running) in self.members.iter_mut().zip(&mut self.running) {
            if !*running {
                continue;
            }
            member.execute(out)?;
            if member.is_finished() {
                *running = false;
                member.end(out, false)?;
            }
        }
        Ok(())
    }

    fn end(&mut self, out: &mut Outputs<'_>, interrupted: bool) -> Result<(), RobotError> {
        let mut first_error = None;
        for (member, running) in self.members.iter_mut().zip(&mut self.running) {
            if std::mem::take(running)
                && let Err(e) = member.end(out, interrupted)
            {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn is_finished(&self) -> bool {
        !self.running.contains(&true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Race
// ─────────────────────────────────────────────────────────────────────────────

/// Runs every member each tick until any one of them finishes.  The others
/// end interrupted.
pub struct Race {
    name: String,
    members: Vec<Member>,
    requirements: BTreeSet<ActuatorId>,
    finished: bool,
}

impl Race {
    /// # Errors
    ///
    /// [`RobotError::Config`] when the race is empty or two members require
    /// the same actuator.
    pub fn new(name: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Result<Self, RobotError> {
        let name = name.into();
        if commands.is_empty() {
            return Err(RobotError::Config(format!("race '{name}' has no members")));
        }
        let members = members(commands);
        disjoint(&name, &members)?;
        Ok(Self {
            name,
            requirements: union(&members),
            members,
            finished: false,
        })
    }
}

impl Command for Race {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        self.requirements.clone()
    }

    fn initialize(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.finished = false;
        for member in &mut self.members {
            member.initialize(out)?;
        }
        Ok(())
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        for member in &mut self.members {
            member.execute(out)?;
            if member.is_finished() {
                self.finished = true;
            }
        }
        Ok(())
    }

    fn end(&mut self, out: &mut Outputs<'_>, _interrupted: bool) -> Result<(), RobotError> {
        let mut first_error = None;
        for member in &mut self.members {
            let interrupted = !member.is_finished();
            if let Err(e) = member.end(out, interrupted) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wait / Timeout
// ─────────────────────────────────────────────────────────────────────────────

/// Does nothing for `ticks` executes.  Requires no actuators.
pub struct Wait {
    ticks: u32,
    elapsed: u32,
}

impl Wait {
    pub fn new(ticks: u32) -> Self {
        Self { ticks, elapsed: 0 }
    }
}

impl Command for Wait {
    fn name(&self) -> &str {
        "wait"
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        BTreeSet::new()
    }

    fn initialize(&mut self, _out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.elapsed = 0;
        Ok(())
    }

    fn execute(&mut self, _out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.elapsed = self.elapsed.saturating_add(1);
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.ticks
    }
}

/// Interrupts its member after `ticks` executes unless it finishes first.
pub struct Timeout {
    member: Member,
    ticks: u32,
    elapsed: u32,
}

impl Timeout {
    pub fn new(command: Box<dyn Command>, ticks: u32) -> Self {
        Self {
            member: Member::new(command),
            ticks,
            elapsed: 0,
        }
    }

    /// `true` once the tick budget is used up.
    pub fn timed_out(&self) -> bool {
        self.elapsed >= self.ticks
    }
}

impl Command for Timeout {
    fn name(&self) -> &str {
        &self.member.name
    }

    fn requirements(&self) -> BTreeSet<ActuatorId> {
        self.member.requirements.clone()
    }

    fn initialize(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.elapsed = 0;
        self.member.initialize(out)
    }

    fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
        self.elapsed = self.elapsed.saturating_add(1);
        self.member.execute(out)
    }

    fn end(&mut self, out: &mut Outputs<'_>, interrupted: bool) -> Result<(), RobotError> {
        let interrupted = interrupted || !self.member.is_finished();
        self.member.end(out, interrupted)
    }

    fn is_finished(&self) -> bool {
        self.timed_out() || self.member.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use reefbot_hal::SimBank;
    use reefbot_types::Channel;

    use super::*;
    use crate::scheduler::Scheduler;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Sets a fixed effort on one actuator and finishes after `ticks`.
    struct Step {
        name: &'static str,
        actuator: Option<ActuatorId>,
        effort: f64,
        ticks: Option<u32>,
        done: u32,
        log: Log,
    }

    impl Step {
        fn make(
            name: &'static str,
            actuator: Option<ActuatorId>,
            ticks: Option<u32>,
            log: &Log,
        ) -> Box<dyn Command> {
            Box::new(Self {
                name,
                actuator,
                effort: 0.3,
                ticks,
                done: 0,
                log: log.clone(),
            })
        }
    }

    impl Command for Step {
        fn name(&self) -> &str {
            self.name
        }

        fn requirements(&self) -> BTreeSet<ActuatorId> {
            self.actuator.into_iter().collect()
        }

        fn initialize(&mut self, _out: &mut Outputs<'_>) -> Result<(), RobotError> {
            self.done = 0;
            self.log.borrow_mut().push(format!("{}.init", self.name));
            Ok(())
        }

        fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
            self.done += 1;
            self.log.borrow_mut().push(format!("{}.exec", self.name));
            if let Some(actuator) = self.actuator {
                for channel in actuator.channels() {
                    out.set_effort(*channel, self.effort)?;
                }
            }
            Ok(())
        }

        fn end(&mut self, _out: &mut Outputs<'_>, interrupted: bool) -> Result<(), RobotError> {
            self.log
                .borrow_mut()
                .push(format!("{}.end({interrupted})", self.name));
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.ticks.is_some_and(|t| self.done >= t)
        }
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn ticks_for_rounds_up() {
        let period = Duration::from_millis(20);
        assert_eq!(ticks_for(Duration::from_secs(1), period), 50);
        assert_eq!(ticks_for(Duration::from_millis(3250), period), 163);
        assert_eq!(ticks_for(Duration::from_millis(1), period), 1);
        assert_eq!(ticks_for(Duration::ZERO, period), 0);
    }

    #[test]
    fn sequence_runs_members_in_order() {
        let log = Log::default();
        let mut seq = Sequence::new(
            "seq",
            vec![
                Step::make("a", Some(ActuatorId::Roller), Some(1), &log),
                Step::make("b", Some(ActuatorId::Arm), Some(2), &log),
            ],
        );
        assert_eq!(
            seq.requirements(),
            BTreeSet::from([ActuatorId::Roller, ActuatorId::Arm])
        );

        let mut bank = SimBank::full();
        let owned = seq.requirements();
        let mut out = Outputs::new(&mut bank, &owned, "seq");

        seq.initialize(&mut out).unwrap();
        seq.execute(&mut out).unwrap();
        assert!(!seq.is_finished());
        seq.execute(&mut out).unwrap();
        seq.execute(&mut out).unwrap();
        assert!(seq.is_finished());
        seq.end(&mut out, false).unwrap();

        assert_eq!(
            take(&log),
            vec!["a.init", "a.exec", "a.end(false)", "b.init", "b.exec", "b.exec", "b.end(false)"]
        );
    }

    #[test]
    fn interrupted_sequence_ends_only_current_member() {
        let log = Log::default();
        let mut seq = Sequence::new(
            "seq",
            vec![
                Step::make("a", None, None, &log),
                Step::make("b", None, None, &log),
            ],
        );
        let mut bank = SimBank::full();
        let owned = seq.requirements();
        let mut out = Outputs::new(&mut bank, &owned, "seq");

        seq.initialize(&mut out).unwrap();
        seq.execute(&mut out).unwrap();
        seq.end(&mut out, true).unwrap();
        assert_eq!(take(&log), vec!["a.init", "a.exec", "a.end(true)"]);
    }

    #[test]
    fn empty_sequence_finishes_immediately() {
        let seq = Sequence::new("empty", Vec::new());
        assert!(seq.is_finished());
    }

    #[test]
    fn parallel_waits_for_every_member() {
        let log = Log::default();
        let mut par = Parallel::new(
            "par",
            vec![
                Step::make("short", Some(ActuatorId::Roller), Some(1), &log),
                Step::make("long", Some(ActuatorId::Arm), Some(3), &log),
            ],
        )
        .unwrap();
        let mut bank = SimBank::full();
        let owned = par.requirements();
        let mut out = Outputs::new(&mut bank, &owned, "par");

        par.initialize(&mut out).unwrap();
        for _ in 0..2 {
            par.execute(&mut out).unwrap();
            assert!(!par.is_finished());
        }
        par.execute(&mut out).unwrap();
        assert!(par.is_finished());

        let log = take(&log);
        assert_eq!(log.iter().filter(|l| *l == "short.exec").count(), 1);
        assert_eq!(log.iter().filter(|l| *l == "long.exec").count(), 3);
        assert!(log.contains(&"short.end(false)".to_string()));
        assert!(log.contains(&"long.end(false)".to_string()));
    }

    #[test]
    fn race_interrupts_the_losers() {
        let log = Log::default();
        let mut race = Race::new(
            "race",
            vec![
                Step::make("drive", Some(ActuatorId::Drivetrain), None, &log),
                Step::make("timer", None, Some(2), &log),
            ],
        )
        .unwrap();
        let mut bank = SimBank::full();
        let owned = race.requirements();
        let mut out = Outputs::new(&mut bank, &owned, "race");

        race.initialize(&mut out).unwrap();
        race.execute(&mut out).unwrap();
        assert!(!race.is_finished());
        race.execute(&mut out).unwrap();
        assert!(race.is_finished());
        race.end(&mut out, false).unwrap();

        let log = take(&log);
        assert!(log.contains(&"drive.end(true)".to_string()));
        assert!(log.contains(&"timer.end(false)".to_string()));
    }

    #[test]
    fn overlapping_members_are_rejected() {
        let log = Log::default();
        let overlapping = || {
            vec![
                Step::make("a", Some(ActuatorId::Arm), None, &log),
                Step::make("b", Some(ActuatorId::Arm), None, &log),
            ]
        };
        assert!(matches!(
            Parallel::new("p", overlapping()),
            Err(RobotError::Config(_))
        ));
        assert!(matches!(Race::new("r", overlapping()), Err(RobotError::Config(_))));
        assert!(matches!(Race::new("r", Vec::new()), Err(RobotError::Config(_))));
    }

    #[test]
    fn timeout_interrupts_a_running_member() {
        let log = Log::default();
        let mut timed = Step::make("spin", Some(ActuatorId::Roller), None, &log).with_timeout(2);
        let mut bank = SimBank::full();
        let owned = timed.requirements();
        let mut out = Outputs::new(&mut bank, &owned, "spin");

        timed.initialize(&mut out).unwrap();
        timed.execute(&mut out).unwrap();
        assert!(!timed.is_finished());
        timed.execute(&mut out).unwrap();
        assert!(timed.is_finished());
        assert!(timed.timed_out());
        timed.end(&mut out, false).unwrap();

        assert_eq!(take(&log).last().map(String::as_str), Some("spin.end(true)"));
    }

    #[test]
    fn wait_counts_ticks() {
        let mut wait = Wait::new(2);
        let mut bank = SimBank::full();
        let owned = wait.requirements();
        let mut out = Outputs::new(&mut bank, &owned, "wait");
        wait.initialize(&mut out).unwrap();
        wait.execute(&mut out).unwrap();
        assert!(!wait.is_finished());
        wait.execute(&mut out).unwrap();
        assert!(wait.is_finished());
    }

    #[test]
    fn scheduled_group_holds_the_union_of_requirements() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let arm = s
            .register(Step::make("arm hold", Some(ActuatorId::Arm), None, &log))
            .unwrap();
        let group = s
            .register(Sequence::new(
                "auto",
                vec![
                    Step::make("drive", Some(ActuatorId::Drivetrain), Some(1), &log),
                    Step::make("eject", Some(ActuatorId::Arm), Some(1), &log),
                ],
            ))
            .unwrap();

        s.schedule(arm).unwrap();
        s.schedule(group).unwrap();
        assert!(!s.is_scheduled(arm));
        assert_eq!(s.owner(ActuatorId::Arm), Some(group));
        assert_eq!(s.owner(ActuatorId::Drivetrain), Some(group));

        s.tick();
        assert_eq!(s.bank().effort(Channel::DriveLeft), Some(0.3));
        s.tick();
        assert_eq!(s.bank().effort(Channel::Arm), Some(0.3));
        assert!(!s.is_scheduled(group));
        assert_eq!(s.owner(ActuatorId::Drivetrain), None);
    }
}
