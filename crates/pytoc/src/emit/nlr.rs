//! The NLR (non-local-return) checkpoint stack: a Rust-side emission-time bookkeeping
//! structure, not a runtime object (spec §9, "NLR stack is a Rust-side emission concept").
//!
//! Exists only for the duration of emitting one function's body and is discarded afterward.

/// Tracks currently-open `nlr_push` checkpoints so a `return` emitted inside nested
/// try-blocks pops every still-active checkpoint, innermost first (spec §4.2, "Nested try").
#[derive(Debug, Default)]
pub struct NlrStack {
    active: Vec<String>,
    next_id: u32,
}

impl NlrStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh checkpoint name and marks it active (entering a `Try`'s protected
    /// body/else region).
    pub fn enter(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        let name = format!("nlr_{id}");
        self.active.push(name.clone());
        name
    }

    /// Deactivates the innermost checkpoint - called once the emitter leaves the protected
    /// body/else region and starts emitting except-handler bodies, which no longer need to
    /// pop that checkpoint before a `return` (the exception path already consumed it).
    pub fn exit_to_handlers(&mut self) -> String {
        self.active.pop().expect("checkpoint exited without being entered")
    }

    /// All checkpoints a `return` emitted right now must pop, innermost (most recently
    /// entered) first.
    #[must_use]
    pub fn pending_pops(&self) -> Vec<String> {
        self.active.iter().rev().cloned().collect()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_checkpoints_pop_innermost_first() {
        let mut stack = NlrStack::new();
        let outer = stack.enter();
        let inner = stack.enter();
        assert_eq!(stack.pending_pops(), vec![inner.clone(), outer.clone()]);
        assert_eq!(stack.exit_to_handlers(), inner);
        assert_eq!(stack.pending_pops(), vec![outer.clone()]);
        assert_eq!(stack.exit_to_handlers(), outer);
        assert_eq!(stack.depth(), 0);
    }
}
