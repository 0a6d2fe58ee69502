//! Dependency Builder: replays every resource's usage list through a
//! subresource index to discover read-after-write (and sharing) edges
//! between the nodes that touch it.

use crate::error::CompileError;
use crate::resources::{
    BufferHandle, BufferUsageRecord, NodeId, ResourceDatabase, ScratchBufferHandle, TextureHandle,
    TextureUsageRecord,
};
use crate::subresource::{IntervalTreap, RectTreap};
use crate::types::{AccessPattern, ResourceLayout};

/// Tag value meaning "nothing has touched this subresource yet" — the
/// seed state every index starts from. No real node carries this id.
const SENTINEL: NodeId = NodeId::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    Initialization,
    ResourceDependency,
    ResourceShare,
}

/// Identifies which resource an [`Edge`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Buffer(BufferHandle),
    ScratchBuffer(ScratchBufferHandle),
    Texture(TextureHandle),
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    pub resource: ResourceRef,
    pub edge_type: EdgeType,
}

/// Build every `ResourceDependency`/`ResourceShare` edge for all buffers
/// and textures, plus an `Initialization` edge from node 0 to every other
/// node. `node_count` is the total number of scheduled nodes, including
/// node 0.
pub fn build_dependencies(
    db: &ResourceDatabase,
    node_count: usize,
    subresource_capacity: usize,
) -> Result<Vec<Edge>, CompileError> {
    let mut edges = Vec::new();

    for (handle, meta) in db.buffers() {
        build_buffer_edges(
            ResourceRef::Buffer(handle),
            meta.info.size,
            &meta.usages,
            subresource_capacity,
            &mut edges,
        )?;
    }

    for (handle, meta) in db.scratch_buffers() {
        build_buffer_edges(
            ResourceRef::ScratchBuffer(handle),
            meta.info.size,
            &meta.usages,
            subresource_capacity,
            &mut edges,
        )?;
    }

    for (handle, meta) in db.textures() {
        build_texture_edges(
            ResourceRef::Texture(handle),
            meta.info.mip_levels,
            meta.info.array_layers,
            &meta.usages,
            subresource_capacity,
            &mut edges,
        )?;
    }

    for node_id in 1..node_count as NodeId {
        edges.push(Edge {
            src: 0,
            dst: node_id,
            // Initialization edges are not about any one resource; Buffer(0)
            // is a placeholder the barrier/semaphore stages never consult
            // for this edge type.
            resource: ResourceRef::Buffer(BufferHandle::new(0)),
            edge_type: EdgeType::Initialization,
        });
    }

    log::debug!("dependency builder produced {} edges over {node_count} nodes", edges.len());
    Ok(edges)
}

fn build_buffer_edges(
    resource: ResourceRef,
    size: u64,
    usages: &[BufferUsageRecord],
    capacity: usize,
    edges: &mut Vec<Edge>,
) -> Result<(), CompileError> {
    if usages.is_empty() {
        return Ok(());
    }
    let mut ordered: Vec<&BufferUsageRecord> = usages.iter().collect();
    ordered.sort_by_key(|u| u.consumer);

    let mut index = IntervalTreap::<(AccessPattern, NodeId)>::seeded(
        capacity,
        size,
        (AccessPattern::NONE, SENTINEL),
    )?;

    for usage in ordered {
        let lo = usage.footprint.offset;
        let hi = usage.footprint.end();
        let mut overlaps = Vec::new();
        index.query_all(lo, hi, &mut overlaps);
        for (_, _, (prev_access, prev_consumer)) in overlaps {
            if prev_consumer != usage.consumer && prev_consumer != SENTINEL {
                let edge_type = if prev_access != usage.access {
                    EdgeType::ResourceDependency
                } else {
                    EdgeType::ResourceShare
                };
                edges.push(Edge {
                    src: prev_consumer,
                    dst: usage.consumer,
                    resource,
                    edge_type,
                });
            }
        }
        index.insert(lo, hi, (usage.access, usage.consumer))?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_texture_edges(
    resource: ResourceRef,
    mip_levels: u32,
    array_layers: u32,
    usages: &[TextureUsageRecord],
    capacity: usize,
    edges: &mut Vec<Edge>,
) -> Result<(), CompileError> {
    if usages.is_empty() {
        return Ok(());
    }
    let mut ordered: Vec<&TextureUsageRecord> = usages.iter().collect();
    ordered.sort_by_key(|u| u.consumer);

    let mut index = RectTreap::<(AccessPattern, ResourceLayout, NodeId)>::seeded(
        capacity,
        mip_levels,
        array_layers,
        (AccessPattern::NONE, ResourceLayout::Undefined, SENTINEL),
    )?;

    for usage in ordered {
        let (x1, y1, x2, y2) = (
            usage.footprint.base_mip,
            usage.footprint.base_layer,
            usage.footprint.mip_end(),
            usage.footprint.layer_end(),
        );
        let mut overlaps = Vec::new();
        index.query_all(x1, y1, x2, y2, &mut overlaps);
        for (.., (prev_access, prev_layout, prev_consumer)) in overlaps {
            if prev_consumer != usage.consumer && prev_consumer != SENTINEL {
                let edge_type = if prev_access != usage.access || prev_layout != usage.layout {
                    EdgeType::ResourceDependency
                } else {
                    EdgeType::ResourceShare
                };
                edges.push(Edge {
                    src: prev_consumer,
                    dst: usage.consumer,
                    resource,
                    edge_type,
                });
            }
        }
        index.insert(x1, y1, x2, y2, (usage.access, usage.layout, usage.consumer))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BufferFootprint, BufferInfo, BufferUsage, ResourceDatabase};

    #[test]
    fn write_then_read_produces_a_dependency_edge() {
        let db = ResourceDatabase::new();
        let handle = db
            .create_buffer(
                "b",
                BufferInfo {
                    size: 64,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        db.register_buffer_usage(handle, 1, BufferFootprint::new(0, 64), AccessPattern::SHADER_WRITE);
        db.register_buffer_usage(handle, 2, BufferFootprint::new(0, 64), AccessPattern::SHADER_READ);

        let edges = build_dependencies(&db, 3, 64).unwrap();
        let resource_edges: Vec<_> = edges
            .iter()
            .filter(|e| e.edge_type != EdgeType::Initialization)
            .collect();
        assert_eq!(resource_edges.len(), 1);
        assert_eq!(resource_edges[0].src, 1);
        assert_eq!(resource_edges[0].dst, 2);
        assert_eq!(resource_edges[0].edge_type, EdgeType::ResourceDependency);
    }

    #[test]
    fn two_reads_produce_a_share_edge() {
        let db = ResourceDatabase::new();
        let handle = db
            .create_buffer(
                "b",
                BufferInfo {
                    size: 64,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        db.register_buffer_usage(handle, 1, BufferFootprint::new(0, 64), AccessPattern::SHADER_READ);
        db.register_buffer_usage(handle, 2, BufferFootprint::new(0, 64), AccessPattern::SHADER_READ);

        let edges = build_dependencies(&db, 3, 64).unwrap();
        let resource_edges: Vec<_> = edges
            .iter()
            .filter(|e| e.edge_type != EdgeType::Initialization)
            .collect();
        assert_eq!(resource_edges.len(), 1);
        assert_eq!(resource_edges[0].edge_type, EdgeType::ResourceShare);
    }

    #[test]
    fn disjoint_ranges_do_not_create_an_edge() {
        let db = ResourceDatabase::new();
        let handle = db
            .create_buffer(
                "b",
                BufferInfo {
                    size: 64,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        db.register_buffer_usage(handle, 1, BufferFootprint::new(0, 32), AccessPattern::SHADER_WRITE);
        db.register_buffer_usage(handle, 2, BufferFootprint::new(32, 32), AccessPattern::SHADER_WRITE);

        let edges = build_dependencies(&db, 3, 64).unwrap();
        assert!(edges.iter().all(|e| e.edge_type == EdgeType::Initialization));
    }

    #[test]
    fn initialization_edges_cover_every_non_root_node() {
        let db = ResourceDatabase::new();
        let edges = build_dependencies(&db, 4, 16).unwrap();
        let inits: Vec<_> = edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Initialization)
            .map(|e| e.dst)
            .collect();
        assert_eq!(inits, vec![1, 2, 3]);
    }
}
