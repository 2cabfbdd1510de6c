//! Assignment of states to workers.
//!
//! A partition is a pure function of the state id and the worker count. Every worker
//! constructs its own instance from the same inputs and they all agree on ownership
//! without talking to each other.

/// Deterministic mapping from state ids to worker indices in `0..worker_count()`.
pub trait Partition {
    fn worker_count(&self) -> usize;

    fn owner(&self, state: usize) -> usize;

    fn is_local(&self, state: usize, worker: usize) -> bool {
        self.owner(state) == worker
    }
}

/// Round-robin: state `i` belongs to worker `i mod N`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModuloPartition {
    workers: usize,
}

impl ModuloPartition {
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0, "Partition needs at least one worker");
        Self { workers }
    }
}

impl Partition for ModuloPartition {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn owner(&self, state: usize) -> usize {
        state % self.workers
    }
}

/// Contiguous ranges: the first `ceil(S/N)` states go to worker 0, and so on.
///
/// Neighbors along dimension 0 differ by one in their id, so most of them share an owner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockPartition {
    workers: usize,
    block: usize,
}

impl BlockPartition {
    pub fn new(workers: usize, state_count: usize) -> Self {
        assert!(workers > 0, "Partition needs at least one worker");
        let block = state_count.div_ceil(workers).max(1);
        Self { workers, block }
    }
}

impl Partition for BlockPartition {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn owner(&self, state: usize) -> usize {
        // States beyond the declared count still get a valid owner.
        (state / self.block).min(self.workers - 1)
    }
}

/// Everything on one worker.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SinglePartition;

impl Partition for SinglePartition {
    fn worker_count(&self) -> usize {
        1
    }

    fn owner(&self, _state: usize) -> usize {
        0
    }
}

/// States in `0..state_count` owned by `worker`, in increasing order.
pub fn owned_states<P: Partition + ?Sized>(
    partition: &P,
    worker: usize,
    state_count: usize,
) -> impl Iterator<Item = usize> + '_ {
    (0..state_count).filter(move |&state| partition.owner(state) == worker)
}
