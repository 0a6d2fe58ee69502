//! Semaphore Planner: scans dependency edges for cross-queue transitions
//! and assigns the minimal set of semaphores a backend needs to order
//! them, deduplicating repeated edges between the same producer/consumer
//! pair.

use std::collections::HashMap;

use crate::analyzer::Node;
use crate::dependency::Edge;
use crate::resources::{NodeId, Queue};

/// One semaphore a backend must allocate: `signal_node` on `signal_queue`
/// signals it, `wait_node` on `wait_queue` waits on it. Exactly one
/// record exists per cross-queue `(signal_node, wait_node)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreRecord {
    pub signal_queue: Queue,
    pub wait_queue: Queue,
    pub signal_node: NodeId,
    pub wait_node: NodeId,
}

/// Assign sequential semaphore indices to every cross-queue edge,
/// populate each node's `wait_semaphores`/`signal_semaphores`, and
/// return the resulting semaphore set in assignment order.
///
/// A binary semaphore's signal satisfies exactly one wait, so the
/// dedup key must be the full `(src, dst)` pair: two edges only share a
/// semaphore if they are the same producer/consumer pair repeated
/// (e.g. two independent edges between the same two nodes), never two
/// distinct consumers waiting on the same producer.
pub fn plan_semaphores(nodes: &mut [Node], edges: &[Edge]) -> Vec<SemaphoreRecord> {
    let mut semaphore_of: HashMap<(NodeId, NodeId), u32> = HashMap::new();
    let mut records = Vec::new();

    for edge in edges {
        let (Some(src_queue), Some(dst_queue)) = (nodes[edge.src as usize].queue, nodes[edge.dst as usize].queue)
        else {
            continue;
        };
        if src_queue == dst_queue {
            continue;
        }

        let key = (edge.src, edge.dst);
        let semaphore = *semaphore_of.entry(key).or_insert_with(|| {
            let id = records.len() as u32;
            records.push(SemaphoreRecord {
                signal_queue: src_queue,
                wait_queue: dst_queue,
                signal_node: edge.src,
                wait_node: edge.dst,
            });
            id
        });

        let src = &mut nodes[edge.src as usize];
        if !src.signal_semaphores.contains(&semaphore) {
            src.signal_semaphores.push(semaphore);
        }
        let dst = &mut nodes[edge.dst as usize];
        if !dst.wait_semaphores.contains(&semaphore) {
            dst.wait_semaphores.push(semaphore);
        }
    }

    log::debug!("semaphore planner assigned {} semaphores across {} edges", records.len(), edges.len());
    records
}
