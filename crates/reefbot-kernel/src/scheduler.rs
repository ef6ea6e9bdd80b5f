//! [`Scheduler`] – the resource arbiter.
//!
//! The scheduler owns the [`ActuatorBank`], every registered [`Command`], the
//! [`OwnershipTable`] and the [`BindingTable`].  It is the only component
//! that moves commands through their lifecycle.  Each call to
//! [`Scheduler::tick`] performs, in order:
//!
//! 1. **Poll** – every binding is sampled in registration order and the
//!    resulting schedule / cancel / toggle requests are collected.
//! 2. **Resolve** – requests are applied in order.  Scheduling a command
//!    ends every other owner of any actuator it requires (`interrupted =
//!    true`), installs it as owner and runs its `initialize`.  All ownership
//!    changes complete before any `execute` runs.
//! 3. **Execute** – `execute` runs exactly once for every scheduled command,
//!    in the order the commands were scheduled.
//! 4. **Finish** – commands whose `is_finished` returns `true` end with
//!    `interrupted = false` and release their actuators.  Default commands
//!    are then scheduled for actuators left without an owner; they
//!    initialize now and first execute on the next tick.
//!
//! # Faults
//!
//! An error returned from any lifecycle step never escapes `tick`.  The
//! offending command is ended with `interrupted = true`, its actuators are
//! released (and fall back to their default command), the fault is logged
//! with `tracing` and published to the [`EventSink`], and the remaining
//! commands keep running.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use reefbot_hal::SimBank;
//! use reefbot_kernel::{Command, Outputs, Scheduler};
//! use reefbot_types::{ActuatorId, Channel, RobotError};
//!
//! struct Intake;
//!
//! impl Command for Intake {
//!     fn requirements(&self) -> BTreeSet<ActuatorId> {
//!         BTreeSet::from([ActuatorId::Roller])
//!     }
//!     fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
//!         out.set_effort(Channel::Roller, -0.8)
//!     }
//! }
//!
//! let mut scheduler = Scheduler::new(SimBank::full());
//! let intake = scheduler.register(Intake).unwrap();
//! scheduler.schedule(intake).unwrap();
//! scheduler.tick();
//!
//! assert_eq!(scheduler.owner(ActuatorId::Roller), Some(intake));
//! assert_eq!(scheduler.bank().effort(Channel::Roller), Some(-0.8));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use reefbot_hal::ActuatorBank;
use reefbot_types::{ActuatorId, EventPayload, EventSink, NullSink, OwnershipEntry, RobotError};
use tracing::{debug, warn};

use crate::command::{Command, CommandHandle, CommandState, Outputs};
use crate::ownership::OwnershipTable;
use crate::trigger::{BindingKind, BindingTable, Request, Trigger, TriggerBinding};
use crate::watchdog::TickWatchdog;

const SOURCE: &str = "reefbot-kernel::scheduler";

// ─────────────────────────────────────────────────────────────────────────────
// Internal slot
// ─────────────────────────────────────────────────────────────────────────────

struct Slot {
    command: Box<dyn Command>,
    name: String,
    requirements: BTreeSet<ActuatorId>,
    state: CommandState,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Initialize,
    Execute,
    End { interrupted: bool },
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Single-threaded cooperative command scheduler and actuator arbiter.
pub struct Scheduler {
    bank: ActuatorBank,
    slots: Vec<Slot>,
    /// Scheduled commands in the order they were scheduled.
    scheduled: Vec<CommandHandle>,
    ownership: OwnershipTable,
    defaults: BTreeMap<ActuatorId, CommandHandle>,
    bindings: BindingTable,
    sink: Box<dyn EventSink>,
    watchdog: TickWatchdog,
    overruns: u64,
    last_ownership: Vec<OwnershipEntry>,
}

impl Scheduler {
    /// Create a scheduler that arbitrates access to `bank`.
    pub fn new(bank: ActuatorBank) -> Self {
        Self {
            bank,
            slots: Vec::new(),
            scheduled: Vec::new(),
            ownership: OwnershipTable::new(),
            defaults: BTreeMap::new(),
            bindings: BindingTable::new(),
            sink: Box::new(NullSink),
            watchdog: TickWatchdog::default(),
            overruns: 0,
            last_ownership: Vec::new(),
        }
    }

    /// Publish faults and ownership changes to `sink`.
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Control period used by the loop overrun watchdog.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.watchdog = TickWatchdog::new(period);
        self
    }

    // ── Construction-time configuration ──────────────────────────────────────

    /// Register `command` and return its handle.
    ///
    /// # Errors
    ///
    /// [`RobotError::Config`] when the command requires an actuator that has
    /// no motor registered in the bank.
    pub fn register(&mut self, command: impl Command + 'static) -> Result<CommandHandle, RobotError> {
        let requirements = command.requirements();
        let name = command.name().to_string();
        if let Some(missing) = requirements.iter().find(|a| !self.bank.has_actuator(**a)) {
            return Err(RobotError::Config(format!(
                "command '{name}' requires {missing}, which has no registered motor"
            )));
        }
        let handle = CommandHandle::from_index(self.slots.len());
        debug!(command = %name, %handle, ?requirements, "command registered");
        self.slots.push(Slot {
            command: Box::new(command),
            name,
            requirements,
            state: CommandState::Idle,
        });
        Ok(handle)
    }

    /// Make `command` the fallback owner of `actuator`.
    ///
    /// # Errors
    ///
    /// [`RobotError::UnknownCommand`] for a handle this scheduler did not
    /// issue; [`RobotError::Config`] when the command does not require
    /// `actuator`.
    pub fn set_default_command(
        &mut self,
        actuator: ActuatorId,
        command: CommandHandle,
    ) -> Result<(), RobotError> {
        let slot = self.slot(command)?;
        if !slot.requirements.contains(&actuator) {
            return Err(RobotError::Config(format!(
                "default command '{}' for {actuator} does not require it",
                slot.name
            )));
        }
        self.defaults.insert(actuator, command);
        Ok(())
    }

    /// Append a binding to the table.  See [`crate::trigger`] for the
    /// precedence rule.
    ///
    /// # Errors
    ///
    /// [`RobotError::UnknownCommand`] for a handle this scheduler did not
    /// issue.
    pub fn bind(
        &mut self,
        trigger: Trigger,
        kind: BindingKind,
        command: CommandHandle,
    ) -> Result<(), RobotError> {
        self.slot(command)?;
        self.bindings.push(TriggerBinding::new(trigger, kind, command));
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn bank(&self) -> &ActuatorBank {
        &self.bank
    }

    /// Direct bank access for startup configuration and disabled-mode
    /// shutdown.  Must not be used to drive an actuator that has an owner.
    pub fn bank_mut(&mut self) -> &mut ActuatorBank {
        &mut self.bank
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Ticks that took longer than the control period so far.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn owner(&self, actuator: ActuatorId) -> Option<CommandHandle> {
        self.ownership.owner(actuator)
    }

    pub fn default_command(&self, actuator: ActuatorId) -> Option<CommandHandle> {
        self.defaults.get(&actuator).copied()
    }

    pub fn is_scheduled(&self, command: CommandHandle) -> bool {
        self.scheduled.contains(&command)
    }

    /// Scheduled commands in scheduling order.
    pub fn scheduled(&self) -> &[CommandHandle] {
        &self.scheduled
    }

    pub fn state(&self, command: CommandHandle) -> Option<CommandState> {
        self.slots.get(command.index()).map(|s| s.state)
    }

    pub fn name(&self, command: CommandHandle) -> Option<&str> {
        self.slots.get(command.index()).map(|s| s.name.as_str())
    }

    /// Owner of every actuator present in the bank, in actuator order.
    pub fn ownership(&self) -> Vec<OwnershipEntry> {
        ActuatorId::ALL
            .into_iter()
            .filter(|a| self.bank.has_actuator(*a))
            .map(|actuator| OwnershipEntry {
                actuator,
                command: self
                    .ownership
                    .owner(actuator)
                    .and_then(|h| self.name(h))
                    .map(str::to_string),
            })
            .collect()
    }

    // ── Direct transitions ───────────────────────────────────────────────────

    /// Schedule `command` now, preempting the owners of its requirements.
    /// No-op when it is already scheduled.
    ///
    /// # Errors
    ///
    /// [`RobotError::UnknownCommand`] for a handle this scheduler did not
    /// issue.  Faults raised by the command's `initialize` are handled
    /// internally and not returned.
    pub fn schedule(&mut self, command: CommandHandle) -> Result<(), RobotError> {
        self.slot(command)?;
        self.start(command);
        Ok(())
    }

    /// End `command` with `interrupted = true`.  No-op when it is not
    /// scheduled.
    ///
    /// # Errors
    ///
    /// [`RobotError::UnknownCommand`] for a handle this scheduler did not
    /// issue.
    pub fn cancel(&mut self, command: CommandHandle) -> Result<(), RobotError> {
        self.slot(command)?;
        self.stop(command, true);
        Ok(())
    }

    /// Interrupt every scheduled command, most recently scheduled first.
    pub fn cancel_all(&mut self) {
        while let Some(&command) = self.scheduled.last() {
            self.stop(command, true);
        }
    }

    // ── The tick ─────────────────────────────────────────────────────────────

    /// Advance every command by one period.  Never fails: command faults are
    /// contained here.
    pub fn tick(&mut self) {
        self.watchdog.reset();

        let requests = self.bindings.poll();
        self.watchdog.epoch("poll_bindings");

        for request in requests {
            match request {
                Request::Schedule(command) => self.start(command),
                Request::Cancel(command) => self.stop(command, true),
                Request::Toggle(command) => {
                    if self.is_scheduled(command) {
                        self.stop(command, true);
                    } else {
                        self.start(command);
                    }
                }
            }
        }
        self.watchdog.epoch("resolve_ownership");

        let running = self.scheduled.clone();
        for &command in &running {
            if !self.is_scheduled(command) {
                continue;
            }
            if let Err(e) = self.run_step(command, Step::Execute) {
                self.fault(command, e);
            }
            let name = self.slots[command.index()].name.clone();
            self.watchdog.epoch(name);
        }

        for &command in &running {
            if self.is_scheduled(command) && self.slots[command.index()].command.is_finished() {
                self.stop(command, false);
            }
        }

        self.schedule_defaults();
        self.publish_ownership();
        if self.watchdog.finish().is_some() {
            self.overruns += 1;
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn slot(&self, command: CommandHandle) -> Result<&Slot, RobotError> {
        self.slots
            .get(command.index())
            .ok_or(RobotError::UnknownCommand(command.index()))
    }

    fn start(&mut self, command: CommandHandle) {
        if self.is_scheduled(command) {
            return;
        }
        let requirements = self.slots[command.index()].requirements.clone();
        for owner in self.ownership.conflicts(command, &requirements) {
            debug!(
                preempted = %self.slots[owner.index()].name,
                by = %self.slots[command.index()].name,
                "preempting owner"
            );
            self.stop(owner, true);
        }
        self.ownership.claim(command, &requirements);
        self.scheduled.push(command);

        self.slots[command.index()].state = CommandState::Initializing;
        debug!(command = %self.slots[command.index()].name, "initialize");
        match self.run_step(command, Step::Initialize) {
            Ok(()) => self.slots[command.index()].state = CommandState::Executing,
            Err(e) => self.fault(command, e),
        }
    }

    fn stop(&mut self, command: CommandHandle, interrupted: bool) {
        if !self.is_scheduled(command) {
            return;
        }
        self.slots[command.index()].state = CommandState::Ending;
        debug!(command = %self.slots[command.index()].name, interrupted, "end");
        if let Err(e) = self.run_step(command, Step::End { interrupted }) {
            self.report_fault(command, &e);
        }
        self.scheduled.retain(|c| *c != command);
        self.ownership.release(command);
        self.slots[command.index()].state = CommandState::Idle;
    }

    fn fault(&mut self, command: CommandHandle, error: RobotError) {
        self.report_fault(command, &error);
        self.stop(command, true);
    }

    fn report_fault(&self, command: CommandHandle, error: &RobotError) {
        let name = &self.slots[command.index()].name;
        warn!(command = %name, error = %error, "command fault");
        self.sink.publish(
            SOURCE,
            EventPayload::CommandFault {
                command: name.clone(),
                details: error.to_string(),
            },
        );
    }

    fn run_step(&mut self, command: CommandHandle, step: Step) -> Result<(), RobotError> {
        let Slot {
            command: body,
            name,
            requirements,
            ..
        } = &mut self.slots[command.index()];
        let mut out = Outputs::new(&mut self.bank, &*requirements, name.as_str());
        match step {
            Step::Initialize => body.initialize(&mut out),
            Step::Execute => body.execute(&mut out),
            Step::End { interrupted } => body.end(&mut out, interrupted),
        }
    }

    fn schedule_defaults(&mut self) {
        let defaults: Vec<CommandHandle> = self.defaults.values().copied().collect();
        for command in defaults {
            if self.is_scheduled(command) {
                continue;
            }
            if self.ownership.all_free(&self.slots[command.index()].requirements) {
                self.start(command);
            }
        }
    }

    fn publish_ownership(&mut self) {
        let current = self.ownership();
        if current != self.last_ownership {
            debug!(?current, "ownership changed");
            self.sink.publish(SOURCE, EventPayload::Ownership(current.clone()));
            self.last_ownership = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use reefbot_hal::{FaultSwitch, FaultyMotor, SimBank};
    use reefbot_types::Channel;

    use super::*;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every lifecycle call into a shared log.
    struct Probe {
        name: &'static str,
        requires: Vec<ActuatorId>,
        log: Log,
        effort: f64,
        finish_after: Option<u32>,
        executed: u32,
        fail_execute: Rc<Cell<bool>>,
    }

    impl Probe {
        fn new(name: &'static str, requires: &[ActuatorId], log: &Log) -> Self {
            Self {
                name,
                requires: requires.to_vec(),
                log: log.clone(),
                effort: 0.5,
                finish_after: None,
                executed: 0,
                fail_execute: Rc::new(Cell::new(false)),
            }
        }

        fn finishing_after(mut self, ticks: u32) -> Self {
            self.finish_after = Some(ticks);
            self
        }

        fn with_effort(mut self, effort: f64) -> Self {
            self.effort = effort;
            self
        }
    }

    impl Command for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn requirements(&self) -> BTreeSet<ActuatorId> {
            self.requires.iter().copied().collect()
        }

        fn initialize(&mut self, _out: &mut Outputs<'_>) -> Result<(), RobotError> {
            self.executed = 0;
            self.log.borrow_mut().push(format!("{}.initialize", self.name));
            Ok(())
        }

        fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
            self.log.borrow_mut().push(format!("{}.execute", self.name));
            if self.fail_execute.get() {
                return Err(RobotError::CommandFault {
                    command: self.name.to_string(),
                    details: "boom".to_string(),
                });
            }
            self.executed += 1;
            for actuator in &self.requires {
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
            self.finish_after.is_some_and(|n| self.executed >= n)
        }
    }

    fn scripted() -> (Rc<Cell<bool>>, Trigger) {
        let flag = Rc::new(Cell::new(false));
        let reader = flag.clone();
        (flag, Trigger::new(move || reader.get()))
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    /// Collects published payloads.
    #[derive(Clone, Default)]
    struct RecordingSink(Rc<RefCell<Vec<EventPayload>>>);

    impl EventSink for RecordingSink {
        fn publish(&self, _source: &str, payload: EventPayload) {
            self.0.borrow_mut().push(payload);
        }
    }

    fn assert_single_owner(scheduler: &Scheduler) {
        for actuator in ActuatorId::ALL {
            let holders = scheduler
                .scheduled()
                .iter()
                .filter(|h| scheduler.slots[h.index()].requirements.contains(&actuator))
                .count();
            assert!(holders <= 1, "{actuator} held by {holders} commands");
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn scheduled_command_initializes_then_executes_each_tick() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let h = s.register(Probe::new("intake", &[ActuatorId::Roller], &log)).unwrap();

        s.schedule(h).unwrap();
        assert_eq!(s.state(h), Some(CommandState::Executing));
        s.tick();
        s.tick();

        assert_eq!(
            take(&log),
            vec!["intake.initialize", "intake.execute", "intake.execute"]
        );
        assert_eq!(s.bank().effort(Channel::Roller), Some(0.5));
    }

    #[test]
    fn scheduling_twice_is_a_noop() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let h = s.register(Probe::new("intake", &[ActuatorId::Roller], &log)).unwrap();
        s.schedule(h).unwrap();
        s.schedule(h).unwrap();
        assert_eq!(take(&log), vec!["intake.initialize"]);
        assert_eq!(s.scheduled(), &[h]);
    }

    #[test]
    fn preemption_ends_old_owner_before_new_one_initializes() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let first = s.register(Probe::new("first", &[ActuatorId::Arm], &log)).unwrap();
        let second = s
            .register(Probe::new("second", &[ActuatorId::Arm], &log).with_effort(-0.1))
            .unwrap();
        let (pressed, trigger) = scripted();
        s.bind(trigger, BindingKind::WhileTrue, second).unwrap();

        s.schedule(first).unwrap();
        s.tick();
        take(&log);

        pressed.set(true);
        s.tick();

        assert_eq!(
            take(&log),
            vec!["first.end(true)", "second.initialize", "second.execute"]
        );
        assert!(!s.is_scheduled(first));
        assert_eq!(s.owner(ActuatorId::Arm), Some(second));
        assert_eq!(s.bank().effort(Channel::Arm), Some(-0.1));
    }

    #[test]
    fn releasing_while_true_falls_back_to_default() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let drive = s.register(Probe::new("drive", &[ActuatorId::Drivetrain], &log)).unwrap();
        let slow = s
            .register(Probe::new("slow", &[ActuatorId::Drivetrain], &log).with_effort(0.1))
            .unwrap();
        s.set_default_command(ActuatorId::Drivetrain, drive).unwrap();
        let (held, trigger) = scripted();
        s.bind(trigger, BindingKind::WhileTrue, slow).unwrap();

        s.tick(); // default installed at the end of the tick
        assert_eq!(s.owner(ActuatorId::Drivetrain), Some(drive));
        held.set(true);
        s.tick();
        assert_eq!(s.owner(ActuatorId::Drivetrain), Some(slow));
        take(&log);

        held.set(false);
        s.tick();
        assert_eq!(take(&log), vec!["slow.end(true)", "drive.initialize"]);
        assert_eq!(s.owner(ActuatorId::Drivetrain), Some(drive));

        s.tick();
        assert_eq!(take(&log), vec!["drive.execute"]);
    }

    #[test]
    fn finished_command_ends_without_interruption() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let h = s
            .register(Probe::new("eject", &[ActuatorId::Roller], &log).finishing_after(2))
            .unwrap();
        s.schedule(h).unwrap();
        s.tick();
        s.tick();
        s.tick();
        assert_eq!(
            take(&log),
            vec![
                "eject.initialize",
                "eject.execute",
                "eject.execute",
                "eject.end(false)"
            ]
        );
        assert_eq!(s.owner(ActuatorId::Roller), None);
        assert_eq!(s.state(h), Some(CommandState::Idle));
    }

    #[test]
    fn later_binding_wins_a_simultaneous_conflict() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let a = s.register(Probe::new("a", &[ActuatorId::Roller], &log)).unwrap();
        let b = s.register(Probe::new("b", &[ActuatorId::Roller], &log)).unwrap();
        let (pressed, t1) = scripted();
        let reader = pressed.clone();
        let t2 = Trigger::new(move || reader.get());
        s.bind(t1, BindingKind::WhileTrue, a).unwrap();
        s.bind(t2, BindingKind::WhileTrue, b).unwrap();

        pressed.set(true);
        s.tick();

        assert_eq!(
            take(&log),
            vec!["a.initialize", "a.end(true)", "b.initialize", "b.execute"]
        );
        assert_eq!(s.owner(ActuatorId::Roller), Some(b));
    }

    #[test]
    fn multi_actuator_command_executes_once_and_preempts_all_owners() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let roller = s.register(Probe::new("roller", &[ActuatorId::Roller], &log)).unwrap();
        let arm = s.register(Probe::new("arm", &[ActuatorId::Arm], &log)).unwrap();
        let both = s
            .register(Probe::new("both", &[ActuatorId::Roller, ActuatorId::Arm], &log))
            .unwrap();

        s.schedule(roller).unwrap();
        s.schedule(arm).unwrap();
        s.schedule(both).unwrap();
        take(&log);
        s.tick();

        assert_eq!(take(&log), vec!["both.execute"]);
        assert_eq!(s.scheduled(), &[both]);
        assert_single_owner(&s);
    }

    #[test]
    fn execute_fault_is_isolated() {
        let log = Log::default();
        let sink = RecordingSink::default();
        let mut s = Scheduler::new(SimBank::full()).with_sink(Box::new(sink.clone()));
        let faulty = Probe::new("faulty", &[ActuatorId::Roller], &log);
        let fail = faulty.fail_execute.clone();
        let faulty = s.register(faulty).unwrap();
        let healthy = s.register(Probe::new("healthy", &[ActuatorId::Arm], &log)).unwrap();

        s.schedule(faulty).unwrap();
        s.schedule(healthy).unwrap();
        fail.set(true);
        take(&log);
        s.tick();

        assert_eq!(
            take(&log),
            vec!["faulty.execute", "faulty.end(true)", "healthy.execute"]
        );
        assert!(!s.is_scheduled(faulty));
        assert!(s.is_scheduled(healthy));
        assert_eq!(s.owner(ActuatorId::Roller), None);
        assert!(sink.0.borrow().iter().any(|p| matches!(
            p,
            EventPayload::CommandFault { command, .. } if command == "faulty"
        )));
    }

    #[test]
    fn hardware_fault_reverts_to_default_owner() {
        let log = Log::default();
        let switch = FaultSwitch::new();
        let bank = SimBank::new()
            .with_drivetrain()
            .with_roller()
            .with_arm()
            .with_motor(FaultyMotor::new(Channel::Climber, switch.clone()))
            .build();
        let mut s = Scheduler::new(bank);
        let hold = s
            .register(Probe::new("hold", &[ActuatorId::Climber], &log).with_effort(0.0))
            .unwrap();
        let climb = s.register(Probe::new("climb", &[ActuatorId::Climber], &log)).unwrap();
        s.set_default_command(ActuatorId::Climber, hold).unwrap();

        s.schedule(climb).unwrap();
        switch.trip();
        take(&log);
        s.tick();

        assert_eq!(
            take(&log),
            vec!["climb.execute", "climb.end(true)", "hold.initialize"]
        );
        assert_eq!(s.owner(ActuatorId::Climber), Some(hold));
    }

    #[test]
    fn writing_an_unowned_channel_is_a_fault() {
        struct Rogue;
        impl Command for Rogue {
            fn requirements(&self) -> BTreeSet<ActuatorId> {
                BTreeSet::from([ActuatorId::Roller])
            }
            fn execute(&mut self, out: &mut Outputs<'_>) -> Result<(), RobotError> {
                out.set_effort(Channel::Arm, 1.0)
            }
        }

        let mut s = Scheduler::new(SimBank::full());
        let rogue = s.register(Rogue).unwrap();
        s.schedule(rogue).unwrap();
        s.tick();

        assert!(!s.is_scheduled(rogue));
        assert_eq!(s.bank().effort(Channel::Arm), Some(0.0));
    }

    #[test]
    fn toggle_binding_alternates() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let h = s.register(Probe::new("climb", &[ActuatorId::Climber], &log)).unwrap();
        let (pressed, trigger) = scripted();
        s.bind(trigger, BindingKind::ToggleOnTrue, h).unwrap();

        pressed.set(true);
        s.tick();
        assert!(s.is_scheduled(h));
        pressed.set(false);
        s.tick();
        assert!(s.is_scheduled(h));
        pressed.set(true);
        s.tick();
        assert!(!s.is_scheduled(h));
    }

    #[test]
    fn cancel_all_interrupts_everything() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let a = s.register(Probe::new("a", &[ActuatorId::Roller], &log)).unwrap();
        let b = s.register(Probe::new("b", &[ActuatorId::Arm], &log)).unwrap();
        s.schedule(a).unwrap();
        s.schedule(b).unwrap();
        take(&log);

        s.cancel_all();
        assert_eq!(take(&log), vec!["b.end(true)", "a.end(true)"]);
        assert!(s.scheduled().is_empty());
        assert_eq!(s.owner(ActuatorId::Roller), None);
    }

    #[test]
    fn ownership_changes_are_published_once() {
        let log = Log::default();
        let sink = RecordingSink::default();
        let mut s = Scheduler::new(SimBank::full()).with_sink(Box::new(sink.clone()));
        let h = s.register(Probe::new("intake", &[ActuatorId::Roller], &log)).unwrap();

        s.schedule(h).unwrap();
        s.tick();
        s.tick();

        let ownership: Vec<_> = sink
            .0
            .borrow()
            .iter()
            .filter_map(|p| match p {
                EventPayload::Ownership(entries) => Some(entries.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ownership.len(), 1);
        let roller = ownership[0]
            .iter()
            .find(|e| e.actuator == ActuatorId::Roller)
            .unwrap();
        assert_eq!(roller.command.as_deref(), Some("intake"));
    }

    #[test]
    fn configuration_errors_fail_fast() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::new().with_roller().build());

        let err = s.register(Probe::new("drive", &[ActuatorId::Drivetrain], &log));
        assert!(matches!(err, Err(RobotError::Config(_))));

        let intake = s.register(Probe::new("intake", &[ActuatorId::Roller], &log)).unwrap();
        assert!(matches!(
            s.set_default_command(ActuatorId::Arm, intake),
            Err(RobotError::Config(_))
        ));

        let bogus = CommandHandle::from_index(42);
        let (_, trigger) = scripted();
        assert_eq!(
            s.bind(trigger, BindingKind::OnTrue, bogus),
            Err(RobotError::UnknownCommand(42))
        );
        assert!(s.schedule(bogus).is_err());
        assert!(s.cancel(bogus).is_err());
    }

    #[test]
    fn at_most_one_owner_under_random_presses() {
        let log = Log::default();
        let mut s = Scheduler::new(SimBank::full());
        let specs: [(&'static str, &[ActuatorId]); 5] = [
            ("r", &[ActuatorId::Roller]),
            ("a", &[ActuatorId::Arm]),
            ("ra", &[ActuatorId::Roller, ActuatorId::Arm]),
            ("d", &[ActuatorId::Drivetrain]),
            ("all", &[ActuatorId::Drivetrain, ActuatorId::Roller, ActuatorId::Climber]),
        ];
        let mut flags = Vec::new();
        for (i, &(name, reqs)) in specs.iter().enumerate() {
            let h = s
                .register(Probe::new(name, reqs, &log).finishing_after(3 + i as u32))
                .unwrap();
            let (flag, trigger) = scripted();
            let kind = if i % 2 == 0 { BindingKind::WhileTrue } else { BindingKind::OnTrue };
            s.bind(trigger, kind, h).unwrap();
            flags.push(flag);
        }

        // Deterministic pseudo-random press pattern.
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..500 {
            for flag in &flags {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                flag.set(seed % 3 == 0);
            }
            s.tick();
            assert_single_owner(&s);
            for (actuator, owner) in s.ownership.iter() {
                assert!(s.is_scheduled(owner), "{actuator} owned by idle command");
            }
        }
    }
}
