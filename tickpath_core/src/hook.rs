// Per-iteration step hooks.
//
// Hooks run once per search-loop iteration, before the abort check, on the
// thread running the search. Hosts use them for cooperative bookkeeping such
// as watchdog resets or progress reporting. A hook that blocks stalls the
// whole search.

/// What a hook is told about the current iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepContext {
    /// Iteration counter, starting at 1.
    pub depth: u32,
}

pub trait PathfinderHook: Send + Sync {
    fn on_step(&self, ctx: &StepContext);
}

impl<F> PathfinderHook for F
where
    F: Fn(&StepContext) + Send + Sync,
{
    fn on_step(&self, ctx: &StepContext) {
        self(ctx)
    }
}
