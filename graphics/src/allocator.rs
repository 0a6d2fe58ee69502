//! Allocator: packs transient scratch buffers into aliased backing
//! buffers via greedy interval-graph coloring over their active-level
//! ranges, grouped by usage mask.

use std::collections::HashMap;

use crate::analyzer::Node;
use crate::resources::database::ScratchAllocation;
use crate::resources::{BufferUsage, ResourceDatabase, ScratchBufferHandle};

/// One aliased backing buffer a group of scratch buffers share.
#[derive(Debug, Clone)]
pub struct BackingBufferLayout {
    pub usage: BufferUsage,
    pub size: u64,
}

struct Request {
    handle: ScratchBufferHandle,
    usage: BufferUsage,
    size: u64,
    first_used_at: u32,
    last_used_at: u32,
}

struct Color {
    last_end: u32,
    size: u64,
}

fn align_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

/// Compute the `first_used_at`/`last_used_at` level interval for every
/// scratch buffer, group by usage mask, and greedily color each group's
/// intervals into the minimum number of overlapping-free backing-buffer
/// slots. Writes the resulting `(backing_buffer, offset)` back into the
/// database and returns the sized backing buffers in creation order.
pub fn allocate_scratch_buffers(
    db: &ResourceDatabase,
    nodes: &[Node],
    align: u64,
) -> Vec<BackingBufferLayout> {
    let scratch = db.scratch_buffers();

    let mut group_order: Vec<BufferUsage> = Vec::new();
    let mut groups: HashMap<BufferUsage, Vec<Request>> = HashMap::new();

    for (handle, meta) in &scratch {
        if meta.usages.is_empty() {
            continue;
        }
        let first_used_at = meta
            .usages
            .iter()
            .map(|u| nodes[u.consumer as usize].level)
            .min()
            .unwrap();
        let last_used_at = meta
            .usages
            .iter()
            .map(|u| nodes[u.consumer as usize].level)
            .max()
            .unwrap();
        let request = Request {
            handle: *handle,
            usage: meta.info.usage,
            size: meta.info.size,
            first_used_at,
            last_used_at,
        };
        groups.entry(request.usage).or_insert_with(Vec::new).push(request);
    }
    // `group_order` lists each usage mask in first-seen scratch-buffer
    // creation order, independent of `HashMap` iteration, so output is
    // deterministic across runs.
    for (_, meta) in &scratch {
        if meta.usages.is_empty() {
            continue;
        }
        if !group_order.contains(&meta.info.usage) {
            group_order.push(meta.info.usage);
        }
    }

    let mut layouts = Vec::new();
    for usage in group_order {
        let Some(mut requests) = groups.remove(&usage) else {
            continue;
        };
        requests.sort_by_key(|r| r.first_used_at);

        let mut colors: Vec<Color> = Vec::new();
        let mut slot_of: Vec<usize> = Vec::with_capacity(requests.len());

        for request in &requests {
            let mut chosen = None;
            for (i, color) in colors.iter().enumerate() {
                if color.last_end < request.first_used_at {
                    chosen = Some(i);
                    break;
                }
            }
            match chosen {
                Some(i) => {
                    colors[i].last_end = request.last_used_at;
                    colors[i].size = colors[i].size.max(request.size);
                    slot_of.push(i);
                }
                None => {
                    colors.push(Color {
                        last_end: request.last_used_at,
                        size: request.size,
                    });
                    slot_of.push(colors.len() - 1);
                }
            }
        }

        let mut offsets = Vec::with_capacity(colors.len());
        let mut running = 0u64;
        for color in &colors {
            offsets.push(running);
            running += align_up(color.size, align);
        }

        let backing_index = layouts.len() as u32;
        for (request, &slot) in requests.iter().zip(slot_of.iter()) {
            db.set_scratch_allocation(
                request.handle,
                ScratchAllocation {
                    backing_buffer: backing_index,
                    offset: offsets[slot],
                    first_used_at: request.first_used_at,
                    last_used_at: request.last_used_at,
                },
            );
        }

        layouts.push(BackingBufferLayout { usage, size: running });
    }

    log::debug!("allocator packed {} scratch buffers into {} backing buffers", scratch.len(), layouts.len());
    layouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::handle::Queue;
    use crate::resources::{BufferFootprint, ScratchBufferInfo};

    fn node(id: u32, level: u32) -> Node {
        Node {
            id,
            name: format!("n{id}"),
            level,
            priority: id,
            queue: Some(Queue::Graphics),
            commands: Vec::new(),
            wait_semaphores: Vec::new(),
            signal_semaphores: Vec::new(),
        }
    }

    #[test]
    fn disjoint_lifetimes_share_one_color() {
        let db = ResourceDatabase::new();
        let a = db
            .create_scratch_buffer(
                "a",
                ScratchBufferInfo {
                    size: 256,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        let b = db
            .create_scratch_buffer(
                "b",
                ScratchBufferInfo {
                    size: 128,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        db.register_scratch_buffer_usage(a, 0, BufferFootprint::whole(256), crate::types::AccessPattern::SHADER_WRITE);
        db.register_scratch_buffer_usage(b, 1, BufferFootprint::whole(128), crate::types::AccessPattern::SHADER_WRITE);

        let nodes = vec![node(0, 0), node(1, 1)];
        let layouts = allocate_scratch_buffers(&db, &nodes, 16);

        assert_eq!(layouts.len(), 1);
        // Both fit in the same color; size is the larger of the two, aligned up.
        assert_eq!(layouts[0].size, 256);
        assert_eq!(db.scratch_buffer_meta(a).allocation.offset, 0);
        assert_eq!(db.scratch_buffer_meta(b).allocation.offset, 0);
    }

    #[test]
    fn overlapping_lifetimes_get_distinct_colors() {
        let db = ResourceDatabase::new();
        let a = db
            .create_scratch_buffer(
                "a",
                ScratchBufferInfo {
                    size: 100,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        let b = db
            .create_scratch_buffer(
                "b",
                ScratchBufferInfo {
                    size: 50,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        db.register_scratch_buffer_usage(a, 0, BufferFootprint::whole(100), crate::types::AccessPattern::SHADER_WRITE);
        db.register_scratch_buffer_usage(a, 1, BufferFootprint::whole(100), crate::types::AccessPattern::SHADER_READ);
        db.register_scratch_buffer_usage(b, 1, BufferFootprint::whole(50), crate::types::AccessPattern::SHADER_WRITE);

        let nodes = vec![node(0, 0), node(1, 1)];
        let layouts = allocate_scratch_buffers(&db, &nodes, 16);

        assert_eq!(layouts.len(), 1);
        let offset_a = db.scratch_buffer_meta(a).allocation.offset;
        let offset_b = db.scratch_buffer_meta(b).allocation.offset;
        assert_ne!(offset_a, offset_b);
        // 100 aligned up to 16 is 112; b's color should start right after.
        assert_eq!(offset_b, 112);
    }

    #[test]
    fn different_usage_masks_never_share_a_backing_buffer() {
        let db = ResourceDatabase::new();
        let a = db
            .create_scratch_buffer(
                "a",
                ScratchBufferInfo {
                    size: 64,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        let b = db
            .create_scratch_buffer(
                "b",
                ScratchBufferInfo {
                    size: 64,
                    usage: BufferUsage::VERTEX,
                },
            )
            .unwrap();
        db.register_scratch_buffer_usage(a, 0, BufferFootprint::whole(64), crate::types::AccessPattern::SHADER_WRITE);
        db.register_scratch_buffer_usage(b, 0, BufferFootprint::whole(64), crate::types::AccessPattern::VERTEX_ATTRIBUTE_READ);

        let nodes = vec![node(0, 0)];
        let layouts = allocate_scratch_buffers(&db, &nodes, 16);
        assert_eq!(layouts.len(), 2);
        assert_ne!(
            db.scratch_buffer_meta(a).allocation.backing_buffer,
            db.scratch_buffer_meta(b).allocation.backing_buffer
        );
    }
}
