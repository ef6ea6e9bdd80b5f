//! Trigger conditions and the binding table that turns them into schedule and
//! cancel requests.
//!
//! A [`Trigger`] wraps a narrow boolean capability (`Fn() -> bool`) supplied
//! at construction, so bindings never touch hardware directly and tests can
//! drive them with scripted values.  Each [`TriggerBinding`] keeps its own
//! previous sample for edge detection.
//!
//! | Kind | Rising edge | Falling edge |
//! |---|---|---|
//! | [`BindingKind::OnTrue`] | schedule | – |
//! | [`BindingKind::OnFalse`] | – | schedule |
//! | [`BindingKind::WhileTrue`] | schedule | cancel |
//! | [`BindingKind::WhileFalse`] | cancel | schedule |
//! | [`BindingKind::ToggleOnTrue`] | toggle | – |
//!
//! The first poll has no previous sample.  It counts as an edge into the
//! current level, so a binding whose condition already holds at startup
//! schedules its command (`OnTrue` with the condition true, `WhileFalse`
//! with it false).  Cancel requests are never produced by the first poll.
//!
//! # Precedence
//!
//! Bindings are polled in registration order and their requests are applied
//! in that same order.  When two bindings fire in the same tick for commands
//! that share an actuator, the binding registered later preempts the earlier
//! one.  This is the only tie-break rule; there are no priorities.

use crate::command::CommandHandle;

/// A boolean input condition.
pub struct Trigger {
    condition: Box<dyn Fn() -> bool>,
}

impl Trigger {
    pub fn new(condition: impl Fn() -> bool + 'static) -> Self {
        Self {
            condition: Box::new(condition),
        }
    }

    /// Active while `axis() > threshold`.
    pub fn axis_above(axis: impl Fn() -> f64 + 'static, threshold: f64) -> Self {
        Self::new(move || axis() > threshold)
    }

    /// Active while `axis() < threshold`.
    pub fn axis_below(axis: impl Fn() -> f64 + 'static, threshold: f64) -> Self {
        Self::new(move || axis() < threshold)
    }

    /// Active while both triggers are active.
    pub fn and(self, other: Trigger) -> Self {
        Self::new(move || self.sample() && other.sample())
    }

    /// Active while either trigger is active.
    pub fn or(self, other: Trigger) -> Self {
        Self::new(move || self.sample() || other.sample())
    }

    /// Active while this trigger is not.
    pub fn negate(self) -> Self {
        Self::new(move || !self.sample())
    }

    /// Read the condition now.
    pub fn sample(&self) -> bool {
        (self.condition)()
    }
}

/// How a binding reacts to edges of its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    OnTrue,
    OnFalse,
    WhileTrue,
    WhileFalse,
    ToggleOnTrue,
}

/// A transition requested by a binding for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Schedule(CommandHandle),
    Cancel(CommandHandle),
    Toggle(CommandHandle),
}

/// One row of the binding table.  Immutable apart from its edge memory.
pub struct TriggerBinding {
    trigger: Trigger,
    kind: BindingKind,
    command: CommandHandle,
    last: Option<bool>,
}

impl TriggerBinding {
    pub fn new(trigger: Trigger, kind: BindingKind, command: CommandHandle) -> Self {
        Self {
            trigger,
            kind,
            command,
            last: None,
        }
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn command(&self) -> CommandHandle {
        self.command
    }

    /// Sample the trigger and return the request implied by the edge, if any.
    pub fn poll(&mut self) -> Option<Request> {
        let now = self.trigger.sample();
        let first = self.last.is_none();
        let last = self.last.replace(now).unwrap_or(!now);
        let rising = now && !last;
        let falling = !now && last;

        let command = self.command;
        let request = match self.kind {
            BindingKind::OnTrue if rising => Some(Request::Schedule(command)),
            BindingKind::OnFalse if falling => Some(Request::Schedule(command)),
            BindingKind::WhileTrue if rising => Some(Request::Schedule(command)),
            BindingKind::WhileTrue if falling => Some(Request::Cancel(command)),
            BindingKind::WhileFalse if falling => Some(Request::Schedule(command)),
            BindingKind::WhileFalse if rising => Some(Request::Cancel(command)),
            BindingKind::ToggleOnTrue if rising => Some(Request::Toggle(command)),
            _ => None,
        };
        match request {
            Some(Request::Cancel(_)) if first => None,
            other => other,
        }
    }
}

/// Ordered list of bindings.
#[derive(Default)]
pub struct BindingTable {
    bindings: Vec<TriggerBinding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, binding: TriggerBinding) {
        self.bindings.push(binding);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Poll every binding in registration order.
    pub fn poll(&mut self) -> Vec<Request> {
        self.bindings.iter_mut().filter_map(TriggerBinding::poll).collect()
    }
}
