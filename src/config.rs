//! Knobs governing how an `iterate` scope's [`Feedback`](crate::operators::iterate::Feedback)
//! operator decides its output frontier can safely retire an iteration's
//! worth of versions.

/// Configuration for a single `iterate` scope.
#[derive(Clone, Copy, Debug)]
pub struct IterationConfig {
    /// If set, the feedback loop refuses to apply its step past this many
    /// rounds, forcibly advancing its output frontier beyond any iteration
    /// count instead of looping forever on non-converging input. `None`
    /// (the default) relies purely on frontier convergence, matching the
    /// reference scheduler.
    pub iteration_limit: Option<usize>,
    /// How many candidate frontier elements the feedback operator is willing
    /// to retain at once while waiting to see whether an older, still-open
    /// version might produce a later update. Larger values retire versions
    /// more conservatively at the cost of holding more state; smaller values
    /// risk declaring a version closed while a looping update for it is
    /// still in flight.
    pub feedback_tolerance: usize,
}

impl Default for IterationConfig {
    fn default() -> Self {
        IterationConfig { iteration_limit: None, feedback_tolerance: 3 }
    }
}
