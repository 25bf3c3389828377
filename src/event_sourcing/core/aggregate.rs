use anyhow::Result;

// ============================================================================
// Aggregate Reducer - State + Command -> (State, Events)
// ============================================================================
//
// Key Principles:
// 1. Commands are validated against the current state without mutating it
// 2. Events are the only thing that changes state
// 3. A transition commits a whole new state value or nothing at all
//
// ============================================================================

/// Generic reducer-style aggregate.
///
/// Type Parameters:
/// - `Event`: the facts this aggregate records
/// - `Command`: the intents it accepts
/// - `Error`: business rule violations
pub trait Aggregate: Sized + Clone + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Validate a command and decide which events it produces
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Apply a single event to the state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Current version (number of events applied)
    fn version(&self) -> i64;

    /// Run one full transition.
    ///
    /// The current value is never touched; the caller swaps in the returned
    /// state only when the whole command succeeded.
    fn execute(&self, command: &Self::Command) -> Result<(Self, Vec<Self::Event>), Self::Error> {
        let events = self.handle_command(command)?;

        let mut next = self.clone();
        for event in &events {
            next.apply_event(event)?;
        }

        Ok((next, events))
    }

    /// Rebuild state by replaying an event history on top of `initial`
    fn replay<'a, I>(initial: Self, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
        Self::Error: std::fmt::Display,
    {
        let mut aggregate = initial;
        for event in events {
            aggregate
                .apply_event(event)
                .map_err(|e| anyhow::anyhow!("Failed to apply event: {}", e))?;
        }
        Ok(aggregate)
    }
}
