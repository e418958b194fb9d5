//! Ping-pong role tracking for the two particle buffer slots.
//!
//! Exactly two physical slots exist. One holds the latest completed
//! generation (`current`), the other is free to be overwritten (`next`).
//! Every integration step reads `current`, writes `next`, then flips, so the
//! renderer that runs after the step draws the slot that was just written.

/// One of the two physical buffer slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Index into a `[T; 2]`.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn from_index(index: usize) -> Slot {
        if index % 2 == 0 {
            Slot::A
        } else {
            Slot::B
        }
    }
}

/// Slots bound for one integration step.
///
/// Handed out by [`BufferRoles::begin_step`] and consumed by
/// [`BufferRoles::finish_step`]; `read != write` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "a started step must be finished to flip buffer roles"]
pub struct StepSlots {
    pub read: Slot,
    pub write: Slot,
}

/// Two-state machine: A is current, or B is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferRoles {
    a_is_current: bool,
}

impl BufferRoles {
    pub fn new(initial: Slot) -> Self {
        Self {
            a_is_current: initial == Slot::A,
        }
    }

    /// Slot holding the latest completed generation. Rendering reads this.
    #[inline]
    pub fn current(&self) -> Slot {
        if self.a_is_current {
            Slot::A
        } else {
            Slot::B
        }
    }

    /// Slot the next step will overwrite.
    #[inline]
    pub fn next(&self) -> Slot {
        self.current().other()
    }

    /// Read/write pair for the step about to run.
    pub fn begin_step(&self) -> StepSlots {
        StepSlots {
            read: self.current(),
            write: self.next(),
        }
    }

    /// Mark `step.write` as the latest generation.
    pub fn finish_step(&mut self, step: StepSlots) {
        debug_assert_eq!(step, self.begin_step(), "step finished out of order");
        self.a_is_current = step.write == Slot::A;
    }

    /// Unconditional role swap.
    pub fn flip(&mut self) {
        self.a_is_current = !self.a_is_current;
    }

    /// Slot the renderer must draw: the one the last step wrote.
    #[inline]
    pub fn render_slot(&self) -> Slot {
        self.current()
    }
}

impl Default for BufferRoles {
    fn default() -> Self {
        Self::new(Slot::A)
    }
}
