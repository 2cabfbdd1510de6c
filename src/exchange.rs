//! Boundary exchange between partitioned workers.
//!
//! Each worker builds the transition system for the states it owns. Edges whose target lies in
//! another worker's partition are shipped to that worker, so that every worker ends up knowing
//! all edges entering its own states, including those computed elsewhere.
//!
//! A batch from one worker to another is three messages with the same tag:
//!
//! 1. `Int` header `[edges, rects]`,
//! 2. `Int` body `[source, target, rect_count]` per edge,
//! 3. `Double` bounds, `low, high` per parameter for each rectangle, edge after edge.
//!
//! Every worker sends a batch (possibly empty) to every other worker and receives one back.

use std::collections::BTreeMap;

use log::debug;

use crate::comm::Comm;
use crate::error::{Error, Result};
use crate::params::ParamSet;
use crate::partition::{owned_states, Partition};
use crate::rect::{Interval, Rectangle};
use crate::solver::Solver;
use crate::transition::{DirectionLabel, OdeTransitionSystem, TransitionSystem};

/// An edge `source -> target` labelled with its colors.
pub type BoundaryEdge = (usize, usize, ParamSet);

/// Largest body or bounds message a receiver allocates for.
pub const MAX_BATCH_LEN: usize = 1 << 26;

/// Edges from states owned by `worker` into states owned by someone else, grouped by the
/// owner of the target.
pub fn outgoing_boundary<T, P>(
    ts: &T,
    partition: &P,
    worker: usize,
) -> Result<BTreeMap<usize, Vec<(usize, usize, T::Colors)>>>
where
    T: TransitionSystem,
    P: Partition + ?Sized,
{
    let mut batches: BTreeMap<usize, Vec<_>> = BTreeMap::new();
    for state in owned_states(partition, worker, ts.state_count()) {
        for transition in ts.successors(state)? {
            if transition.direction == DirectionLabel::Loop {
                continue;
            }
            let owner = partition.owner(transition.target);
            if owner != worker {
                batches
                    .entry(owner)
                    .or_default()
                    .push((state, transition.target, transition.colors));
            }
        }
    }
    Ok(batches)
}

/// Sends one batch of edges to `destination`.
pub fn send_edges<C: Comm>(comm: &C, edges: &[BoundaryEdge], destination: usize, tag: i32) -> Result<()> {
    let rects: usize = edges.iter().map(|(_, _, colors)| colors.len()).sum();
    let header = [edges.len() as i64, rects as i64];
    let body: Vec<i64> = edges
        .iter()
        .flat_map(|(source, target, colors)| [*source as i64, *target as i64, colors.len() as i64])
        .collect();
    let bounds: Vec<f64> = edges
        .iter()
        .flat_map(|(_, _, colors)| colors.rectangles().iter().flat_map(Rectangle::to_bounds))
        .collect();

    comm.send(&header, destination, tag)?;
    comm.send(&body, destination, tag)?;
    comm.send(&bounds, destination, tag)?;
    Ok(())
}

/// Receives one batch of edges over `dimensions` parameters from `source`.
pub fn receive_edges<C: Comm>(comm: &C, dimensions: usize, source: usize, tag: i32) -> Result<Vec<BoundaryEdge>> {
    let malformed = |reason: String| Error::MalformedBatch { from: source, reason };
    let to_usize = |x: i64| usize::try_from(x).map_err(|_| malformed(format!("negative count or id {}", x)));

    let batch_len = |count: usize, width: usize| {
        count
            .checked_mul(width)
            .filter(|&len| len <= MAX_BATCH_LEN)
            .ok_or_else(|| malformed(format!("{} entries of width {} exceed the batch limit", count, width)))
    };

    let mut header = [0i64; 2];
    comm.receive(&mut header, source, tag)?;
    let edges = to_usize(header[0])?;
    let rects = to_usize(header[1])?;

    let body_len = batch_len(edges, 3)?;
    let bounds_len = batch_len(rects, 2 * dimensions)?;
    // Rectangles over zero parameters carry no bounds, so their count is limited on its own.
    batch_len(rects, 1)?;

    let mut body = vec![0i64; body_len];
    comm.receive(&mut body, source, tag)?;
    let mut bounds = vec![0.0f64; bounds_len];
    comm.receive(&mut bounds, source, tag)?;

    let mut declared = 0usize;
    for chunk in body.chunks(3) {
        declared = declared
            .checked_add(to_usize(chunk[2])?)
            .ok_or_else(|| malformed("rectangle counts overflow".to_string()))?;
    }
    if declared != rects {
        return Err(malformed(format!("header announces {} rectangles, body {}", rects, declared)));
    }

    let mut rectangles = bounds.chunks(2 * dimensions.max(1)).map(|b| {
        Rectangle::new(b.chunks(2).map(|lh| Interval::new(lh[0], lh[1])).collect())
    });
    let mut result = Vec::with_capacity(edges);
    for chunk in body.chunks(3) {
        let count = to_usize(chunk[2])?;
        let colors = if dimensions == 0 {
            ParamSet::new((0..count).map(|_| Rectangle::new(Vec::new())))
        } else {
            ParamSet::new(rectangles.by_ref().take(count))
        };
        result.push((to_usize(chunk[0])?, to_usize(chunk[1])?, colors));
    }
    Ok(result)
}

/// Ships boundary edges of the local partition to their owners and collects the edges that
/// other workers computed into local states.
///
/// Received edges are returned in the order of their sender's rank. Any transport error is
/// fatal for the whole group and is returned as is. The partition must be over exactly as
/// many workers as the group has.
pub fn exchange_boundary<S, C, P>(
    comm: &C,
    ts: &OdeTransitionSystem<S>,
    partition: &P,
    tag: i32,
) -> Result<Vec<BoundaryEdge>>
where
    S: Solver<Colors = ParamSet>,
    C: Comm,
    P: Partition + ?Sized,
{
    let rank = comm.rank();
    if partition.worker_count() != comm.size() {
        return Err(Error::GroupSizeMismatch {
            partition: partition.worker_count(),
            group: comm.size(),
        });
    }
    let dimensions = ts.engine().model().parameters().len();

    let mut outgoing = outgoing_boundary(ts, partition, rank)?;
    for destination in (0..comm.size()).filter(|&w| w != rank) {
        let edges = outgoing.remove(&destination).unwrap_or_default();
        debug!("worker {}: sending {} edges to {}", rank, edges.len(), destination);
        send_edges(comm, &edges, destination, tag)?;
    }

    let mut incoming = Vec::new();
    for source in (0..comm.size()).filter(|&w| w != rank) {
        let edges = receive_edges(comm, dimensions, source, tag)?;
        for (from, to, _) in &edges {
            if partition.owner(*from) != source || partition.owner(*to) != rank {
                return Err(Error::MalformedBatch {
                    from: source,
                    reason: format!("edge {} -> {} does not cross from {} to {}", from, to, source, rank),
                });
            }
        }
        debug!("worker {}: received {} edges from {}", rank, edges.len(), source);
        incoming.extend(edges);
    }
    Ok(incoming)
}
