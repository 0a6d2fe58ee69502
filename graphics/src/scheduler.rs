//! Scheduler: topological ordering via DFS with an explicit recursion-stack
//! flag (so a cycle is detected as a back-edge, not merely "didn't finish"),
//! followed by longest-path level assignment.

use crate::analyzer::Node;
use crate::dependency::{Edge, EdgeType};
use crate::error::CompileError;
use crate::resources::NodeId;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Topologically sort `node_count` nodes given their dependency edges,
/// detecting cycles via an explicit recursion-stack flag rather than
/// relying on Kahn's in-degree bookkeeping.
pub fn topological_sort(node_count: usize, edges: &[Edge]) -> Result<Vec<NodeId>, CompileError> {
    let mut adjacency: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for edge in edges {
        adjacency[edge.src as usize].push(edge.dst);
    }

    let mut mark = vec![Mark::Unvisited; node_count];
    let mut order = Vec::with_capacity(node_count);

    for start in 0..node_count as NodeId {
        if mark[start as usize] == Mark::Unvisited {
            visit(start, &adjacency, &mut mark, &mut order)?;
        }
    }

    order.reverse();
    log::trace!("topological sort ordered {} nodes", order.len());
    Ok(order)
}

fn visit(
    node: NodeId,
    adjacency: &[Vec<NodeId>],
    mark: &mut [Mark],
    order: &mut Vec<NodeId>,
) -> Result<(), CompileError> {
    mark[node as usize] = Mark::InProgress;
    for &next in &adjacency[node as usize] {
        match mark[next as usize] {
            Mark::InProgress => {
                log::error!("cycle detected: node {node} reaches in-progress node {next}");
                return Err(CompileError::CyclicDependency);
            }
            Mark::Done => continue,
            Mark::Unvisited => visit(next, adjacency, mark, order)?,
        }
    }
    mark[node as usize] = Mark::Done;
    order.push(node);
    Ok(())
}

/// Assign each node's `level` by longest path from node 0, in the given
/// topological order. Edge weight is 0 for `ResourceShare` (shared-state
/// usages schedule at the same level) and 1 for `ResourceDependency`/
/// `Initialization`.
pub fn assign_levels(nodes: &mut [Node], topo_order: &[NodeId], edges: &[Edge]) {
    for node in nodes.iter_mut() {
        node.level = 0;
    }

    let mut outgoing: Vec<Vec<(NodeId, u32)>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        let delta = match edge.edge_type {
            EdgeType::ResourceShare => 0,
            EdgeType::ResourceDependency | EdgeType::Initialization => 1,
        };
        outgoing[edge.src as usize].push((edge.dst, delta));
    }

    for &src in topo_order {
        let src_level = nodes[src as usize].level;
        for &(dst, delta) in &outgoing[src as usize] {
            let candidate = src_level + delta;
            if candidate > nodes[dst as usize].level {
                nodes[dst as usize].level = candidate;
            }
        }
    }

    let max_level = nodes.iter().map(|n| n.level).max().unwrap_or(0);
    log::trace!("assigned levels up to {max_level}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::ResourceRef;
    use crate::resources::{BufferHandle, Queue};

    fn edge(src: NodeId, dst: NodeId, edge_type: EdgeType) -> Edge {
        Edge {
            src,
            dst,
            resource: ResourceRef::Buffer(BufferHandle::new(0)),
            edge_type,
        }
    }

    fn node(id: NodeId) -> Node {
        Node {
            id,
            name: format!("n{id}"),
            level: 0,
            priority: id,
            queue: Some(Queue::Graphics),
            commands: Vec::new(),
            wait_semaphores: Vec::new(),
            signal_semaphores: Vec::new(),
        }
    }

    #[test]
    fn linear_chain_sorts_in_order() {
        let edges = vec![
            edge(0, 1, EdgeType::Initialization),
            edge(1, 2, EdgeType::ResourceDependency),
        ];
        let order = topological_sort(3, &edges).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn cycle_is_detected() {
        let edges = vec![
            edge(0, 1, EdgeType::ResourceDependency),
            edge(1, 2, EdgeType::ResourceDependency),
            edge(2, 0, EdgeType::ResourceDependency),
        ];
        let result = topological_sort(3, &edges);
        assert_eq!(result, Err(CompileError::CyclicDependency));
    }

    #[test]
    fn levels_follow_longest_path_with_dependency_weight() {
        let edges = vec![
            edge(0, 1, EdgeType::Initialization),
            edge(0, 2, EdgeType::Initialization),
            edge(1, 3, EdgeType::ResourceDependency),
            edge(2, 3, EdgeType::ResourceDependency),
        ];
        let mut nodes: Vec<Node> = (0..4).map(node).collect();
        let order = topological_sort(4, &edges).unwrap();
        assign_levels(&mut nodes, &order, &edges);
        assert_eq!(nodes[0].level, 0);
        assert_eq!(nodes[1].level, 1);
        assert_eq!(nodes[2].level, 1);
        assert_eq!(nodes[3].level, 2);
    }

    #[test]
    fn resource_share_edges_do_not_advance_level() {
        let edges = vec![
            edge(0, 1, EdgeType::Initialization),
            edge(1, 2, EdgeType::ResourceShare),
        ];
        let mut nodes: Vec<Node> = (0..3).map(node).collect();
        let order = topological_sort(3, &edges).unwrap();
        assign_levels(&mut nodes, &order, &edges);
        assert_eq!(nodes[1].level, 1);
        assert_eq!(nodes[2].level, 1);
    }
}
