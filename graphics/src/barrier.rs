//! Barrier Synthesizer: replays each resource's usages a second time, now
//! in scheduled order, to emit the minimal set of layout/access
//! transitions a backend needs to insert before executing a node.

use crate::error::CompileError;
use crate::resources::{
    BufferHandle, BufferUsageRecord, NodeId, ResourceDatabase, ScratchBufferHandle, TextureHandle,
    TextureUsageRecord,
};
use crate::subresource::{IntervalTreap, RectTreap};
use crate::types::{AccessPattern, ResourceLayout};

/// Tag for "no transition needed yet" — the seed state of a fresh index.
const SEED_ACCESS: AccessPattern = AccessPattern::NONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierResource {
    Buffer(BufferHandle),
    ScratchBuffer(ScratchBufferHandle),
    Texture(TextureHandle),
}

/// A buffer subresource transition to insert immediately before `at_level`.
#[derive(Debug, Clone, Copy)]
pub struct BufferBarrier {
    pub resource: BarrierResource,
    pub offset: u64,
    pub size: u64,
    pub src_access: AccessPattern,
    pub dst_access: AccessPattern,
    pub at_level: u32,
}

/// A texture subresource layout transition to insert immediately before
/// `at_level`.
#[derive(Debug, Clone, Copy)]
pub struct TextureBarrier {
    pub resource: TextureHandle,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    pub src_access: AccessPattern,
    pub dst_access: AccessPattern,
    pub src_layout: ResourceLayout,
    pub dst_layout: ResourceLayout,
    pub at_level: u32,
}

#[derive(Default)]
pub struct BarrierPlan {
    pub buffer_barriers: Vec<BufferBarrier>,
    pub texture_barriers: Vec<TextureBarrier>,
}

/// Synthesize every barrier needed across all resources, given each
/// node's final scheduled `level`.
pub fn synthesize_barriers(
    db: &ResourceDatabase,
    node_levels: &[u32],
    subresource_capacity: usize,
) -> Result<BarrierPlan, CompileError> {
    let mut plan = BarrierPlan::default();

    for (handle, meta) in db.buffers() {
        synthesize_buffer_barriers(
            BarrierResource::Buffer(handle),
            meta.info.size,
            &meta.usages,
            node_levels,
            subresource_capacity,
            &mut plan.buffer_barriers,
        )?;
    }

    for (handle, meta) in db.scratch_buffers() {
        synthesize_buffer_barriers(
            BarrierResource::ScratchBuffer(handle),
            meta.info.size,
            &meta.usages,
            node_levels,
            subresource_capacity,
            &mut plan.buffer_barriers,
        )?;
    }

    for (handle, meta) in db.textures() {
        synthesize_texture_barriers(
            handle,
            meta.info.mip_levels,
            meta.info.array_layers,
            &meta.usages,
            node_levels,
            subresource_capacity,
            &mut plan.texture_barriers,
        )?;
    }

    log::debug!(
        "barrier synthesizer emitted {} buffer and {} texture barriers",
        plan.buffer_barriers.len(),
        plan.texture_barriers.len()
    );
    Ok(plan)
}

fn synthesize_buffer_barriers(
    resource: BarrierResource,
    size: u64,
    usages: &[BufferUsageRecord],
    node_levels: &[u32],
    capacity: usize,
    out: &mut Vec<BufferBarrier>,
) -> Result<(), CompileError> {
    if usages.is_empty() {
        return Ok(());
    }
    let mut ordered: Vec<&BufferUsageRecord> = usages.iter().collect();
    ordered.sort_by_key(|u| level_of(node_levels, u.consumer));

    let mut index = IntervalTreap::<AccessPattern>::seeded(capacity, size, SEED_ACCESS)?;

    for usage in ordered {
        let lo = usage.footprint.offset;
        let hi = usage.footprint.end();
        let mut overlaps = Vec::new();
        index.query(lo, hi, &usage.access, &mut overlaps);
        for (o_lo, o_hi, prev_access) in overlaps {
            out.push(BufferBarrier {
                resource,
                offset: o_lo,
                size: o_hi - o_lo,
                src_access: prev_access,
                dst_access: usage.access,
                at_level: level_of(node_levels, usage.consumer),
            });
        }
        index.insert(lo, hi, usage.access)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn synthesize_texture_barriers(
    resource: TextureHandle,
    mip_levels: u32,
    array_layers: u32,
    usages: &[TextureUsageRecord],
    node_levels: &[u32],
    capacity: usize,
    out: &mut Vec<TextureBarrier>,
) -> Result<(), CompileError> {
    if usages.is_empty() {
        return Ok(());
    }
    let mut ordered: Vec<&TextureUsageRecord> = usages.iter().collect();
    ordered.sort_by_key(|u| level_of(node_levels, u.consumer));

    let seed = (SEED_ACCESS, ResourceLayout::Undefined);
    let mut index = RectTreap::<(AccessPattern, ResourceLayout)>::seeded(
        capacity,
        mip_levels,
        array_layers,
        seed,
    )?;

    for usage in ordered {
        let (x1, y1, x2, y2) = (
            usage.footprint.base_mip,
            usage.footprint.base_layer,
            usage.footprint.mip_end(),
            usage.footprint.layer_end(),
        );
        let mut overlaps = Vec::new();
        index.query(x1, y1, x2, y2, &(usage.access, usage.layout), &mut overlaps);
        for (mx1, my1, mx2, my2, (prev_access, prev_layout)) in overlaps {
            out.push(TextureBarrier {
                resource,
                base_mip: mx1,
                mip_count: mx2 - mx1,
                base_layer: my1,
                layer_count: my2 - my1,
                src_access: prev_access,
                dst_access: usage.access,
                src_layout: prev_layout,
                dst_layout: usage.layout,
                at_level: level_of(node_levels, usage.consumer),
            });
        }
        index.insert(x1, y1, x2, y2, (usage.access, usage.layout))?;
    }
    Ok(())
}

fn level_of(node_levels: &[u32], consumer: NodeId) -> u32 {
    node_levels[consumer as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BufferFootprint, BufferInfo, BufferUsage, TextureFootprint, TextureInfo, TextureUsage};

    #[test]
    fn write_then_read_emits_one_buffer_barrier() {
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
        db.register_buffer_usage(handle, 0, BufferFootprint::new(0, 64), AccessPattern::SHADER_WRITE);
        db.register_buffer_usage(handle, 1, BufferFootprint::new(0, 64), AccessPattern::SHADER_READ);

        let levels = vec![0, 1];
        let plan = synthesize_barriers(&db, &levels, 64).unwrap();
        assert_eq!(plan.buffer_barriers.len(), 1);
        let barrier = plan.buffer_barriers[0];
        assert_eq!(barrier.src_access, AccessPattern::SHADER_WRITE);
        assert_eq!(barrier.dst_access, AccessPattern::SHADER_READ);
        assert_eq!(barrier.at_level, 1);
    }

    #[test]
    fn two_reads_at_the_same_access_emit_no_barrier() {
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
        db.register_buffer_usage(handle, 0, BufferFootprint::new(0, 64), AccessPattern::SHADER_READ);
        db.register_buffer_usage(handle, 1, BufferFootprint::new(0, 64), AccessPattern::SHADER_READ);

        let levels = vec![0, 1];
        let plan = synthesize_barriers(&db, &levels, 64).unwrap();
        assert!(plan.buffer_barriers.is_empty());
    }

    #[test]
    fn texture_layout_change_emits_a_barrier() {
        let db = ResourceDatabase::new();
        let handle = db
            .create_texture(
                "t",
                TextureInfo {
                    mip_levels: 1,
                    array_layers: 1,
                    usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
                },
            )
            .unwrap();
        db.register_texture_usage(
            handle,
            0,
            TextureFootprint::whole(1, 1),
            AccessPattern::COLOR_ATTACHMENT_WRITE,
            ResourceLayout::ColorAttachment,
        );
        db.register_texture_usage(
            handle,
            1,
            TextureFootprint::whole(1, 1),
            AccessPattern::SHADER_READ,
            ResourceLayout::ShaderReadOnly,
        );

        let levels = vec![0, 1];
        let plan = synthesize_barriers(&db, &levels, 64).unwrap();
        assert_eq!(plan.texture_barriers.len(), 1);
        assert_eq!(plan.texture_barriers[0].src_layout, ResourceLayout::ColorAttachment);
        assert_eq!(plan.texture_barriers[0].dst_layout, ResourceLayout::ShaderReadOnly);
    }
}
