/// Derived representation of a candidate, rebuilt by replaying its design
/// elements (an occupancy grid, for example). It is a cache, never the source
/// of truth: the owning [`GenericLevel`](super::GenericLevel) clears it and
/// replays every element whenever bulk mutation invalidates it.
///
/// Exactly one environment exists per candidate. `Clone` must produce a fully
/// independent deep copy; mutating one candidate's environment can never be
/// observable through another.
pub trait SpawnEnvironment: Clone {
    /// Resets the environment to its empty state, ready for a replay.
    fn clear(&mut self);

    /// Computes derived metrics (reachability, path lengths, ...) once all
    /// elements have been spawned. Called exactly once per rebuild.
    fn finalize(&mut self);
}
