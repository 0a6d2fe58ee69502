//! The resource database: a stable, name-addressed symbol table for every
//! kind of graph resource, safe to populate from multiple threads while
//! nothing is compiling.
//!
//! Each kind gets its own sharded table. The shard a name lands in is
//! chosen by hashing the name, so unrelated resources created concurrently
//! rarely contend on the same lock; within a shard, creation and lookup
//! are simple `HashMap` operations behind a `parking_lot::RwLock`.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;

use crate::error::DatabaseError;
use crate::resources::handle::{
    BindingGroupsHandle, BindingsLayoutHandle, BufferHandle, ComputePipelineHandle,
    GraphicsPipelineHandle, Handle, NodeId, SamplerHandle, ScratchBufferHandle, TextureHandle,
};
use crate::resources::info::{
    BindingGroupsInfo, BindingsLayoutInfo, BufferInfo, ComputePipelineInfo,
    GraphicsPipelineInfo, SamplerInfo, ScratchBufferInfo, TextureInfo,
};
use crate::types::{AccessPattern, BufferFootprint, ResourceLayout, TextureFootprint};

const SHARD_COUNT: usize = 16;
const SHARD_BITS: u32 = 24;

/// One recorded usage of a buffer subresource by a node.
#[derive(Debug, Clone, Copy)]
pub struct BufferUsageRecord {
    pub consumer: NodeId,
    pub footprint: BufferFootprint,
    pub access: AccessPattern,
}

/// One recorded usage of a texture subresource by a node.
#[derive(Debug, Clone, Copy)]
pub struct TextureUsageRecord {
    pub consumer: NodeId,
    pub footprint: TextureFootprint,
    pub access: AccessPattern,
    pub layout: ResourceLayout,
}

/// Where a scratch buffer landed within its aliased backing buffer after
/// the allocator ran. Zeroed before the first successful `compile()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScratchAllocation {
    pub backing_buffer: u32,
    pub offset: u64,
    pub first_used_at: u32,
    pub last_used_at: u32,
}

#[derive(Debug, Clone)]
pub struct BufferMeta {
    pub info: BufferInfo,
    pub usages: Vec<BufferUsageRecord>,
}

#[derive(Debug, Clone)]
pub struct ScratchBufferMeta {
    pub info: ScratchBufferInfo,
    pub usages: Vec<BufferUsageRecord>,
    pub allocation: ScratchAllocation,
}

#[derive(Debug, Clone)]
pub struct TextureMeta {
    pub info: TextureInfo,
    pub usages: Vec<TextureUsageRecord>,
}

#[derive(Debug, Clone)]
pub struct SamplerMeta {
    pub info: SamplerInfo,
}

#[derive(Debug, Clone)]
pub struct BindingsLayoutMeta {
    pub info: BindingsLayoutInfo,
}

#[derive(Debug, Clone)]
pub struct BindingGroupsMeta {
    pub info: BindingGroupsInfo,
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineMeta {
    pub info: GraphicsPipelineInfo,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineMeta {
    pub info: ComputePipelineInfo,
}

struct Shard<Meta> {
    name_to_local: HashMap<String, u32>,
    metas: Vec<Meta>,
}

impl<Meta> Default for Shard<Meta> {
    fn default() -> Self {
        Self {
            name_to_local: HashMap::new(),
            metas: Vec::new(),
        }
    }
}

/// A sharded name -> metadata table for one resource kind.
struct ResourceTable<K, Meta> {
    shards: Vec<RwLock<Shard<Meta>>>,
    _kind: std::marker::PhantomData<fn() -> K>,
}

fn shard_of(name: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    (hasher.finish() as usize) % SHARD_COUNT
}

fn encode(shard: usize, local: u32) -> u32 {
    debug_assert!(local < (1 << SHARD_BITS));
    ((shard as u32) << SHARD_BITS) | local
}

fn decode(global: u32) -> (usize, u32) {
    ((global >> SHARD_BITS) as usize, global & ((1 << SHARD_BITS) - 1))
}

impl<K, Meta: Clone> ResourceTable<K, Meta> {
    fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(Shard::default())).collect(),
            _kind: std::marker::PhantomData,
        }
    }

    fn create(&self, name: &str, meta: Meta) -> Result<Handle<K>, DatabaseError> {
        let shard_id = shard_of(name);
        let mut shard = self.shards[shard_id].write();
        if shard.name_to_local.contains_key(name) {
            return Err(DatabaseError::DuplicateName(name.to_string()));
        }
        let local = shard.metas.len() as u32;
        shard.metas.push(meta);
        shard.name_to_local.insert(name.to_string(), local);
        Ok(Handle::new(encode(shard_id, local)))
    }

    fn get(&self, name: &str) -> Result<Handle<K>, DatabaseError> {
        let shard_id = shard_of(name);
        let shard = self.shards[shard_id].read();
        shard
            .name_to_local
            .get(name)
            .map(|&local| Handle::new(encode(shard_id, local)))
            .ok_or_else(|| DatabaseError::UnknownName(name.to_string()))
    }

    fn meta(&self, handle: Handle<K>) -> Meta {
        let (shard_id, local) = decode(handle.index());
        self.shards[shard_id].read().metas[local as usize].clone()
    }

    fn with_meta_mut<R>(&self, handle: Handle<K>, f: impl FnOnce(&mut Meta) -> R) -> R {
        let (shard_id, local) = decode(handle.index());
        let mut shard = self.shards[shard_id].write();
        f(&mut shard.metas[local as usize])
    }

    /// All `(handle, meta)` pairs, ordered deterministically by global
    /// index (shard, then creation order within the shard) so downstream
    /// passes that iterate every resource of a kind get reproducible
    /// output regardless of shard hashing.
    fn snapshot(&self) -> Vec<(Handle<K>, Meta)> {
        let mut out = Vec::new();
        for (shard_id, shard) in self.shards.iter().enumerate() {
            let shard = shard.read();
            for (local, meta) in shard.metas.iter().enumerate() {
                out.push((Handle::new(encode(shard_id, local as u32)), meta.clone()));
            }
        }
        out.sort_by_key(|(h, _)| h.index());
        out
    }
}

/// Stable, name-addressed symbol table for every resource kind a render
/// graph can declare.
#[derive(Default)]
pub struct ResourceDatabase {
    buffers: ResourceTable<crate::resources::handle::kind::Buffer, BufferMeta>,
    scratch_buffers: ResourceTable<crate::resources::handle::kind::ScratchBuffer, ScratchBufferMeta>,
    textures: ResourceTable<crate::resources::handle::kind::Texture, TextureMeta>,
    samplers: ResourceTable<crate::resources::handle::kind::Sampler, SamplerMeta>,
    bindings_layouts: ResourceTable<crate::resources::handle::kind::BindingsLayout, BindingsLayoutMeta>,
    binding_groups: ResourceTable<crate::resources::handle::kind::BindingGroups, BindingGroupsMeta>,
    graphics_pipelines: ResourceTable<crate::resources::handle::kind::GraphicsPipeline, GraphicsPipelineMeta>,
    compute_pipelines: ResourceTable<crate::resources::handle::kind::ComputePipeline, ComputePipelineMeta>,
}

impl<K, Meta: Clone> Default for ResourceTable<K, Meta> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! table_accessors {
    ($create:ident, $get:ident, $meta:ident, $table:ident, $info_ty:ty, $meta_ty:ty, $handle_ty:ty, $new_meta:expr) => {
        pub fn $create(&self, name: &str, info: $info_ty) -> Result<$handle_ty, DatabaseError> {
            self.$table.create(name, $new_meta(info))
        }

        pub fn $get(&self, name: &str) -> Result<$handle_ty, DatabaseError> {
            self.$table.get(name)
        }

        pub fn $meta(&self, handle: $handle_ty) -> $meta_ty {
            self.$table.meta(handle)
        }
    };
}

impl ResourceDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    table_accessors!(
        create_buffer,
        get_buffer,
        buffer_meta,
        buffers,
        BufferInfo,
        BufferMeta,
        BufferHandle,
        |info| BufferMeta {
            info,
            usages: Vec::new(),
        }
    );

    table_accessors!(
        create_scratch_buffer,
        get_scratch_buffer,
        scratch_buffer_meta,
        scratch_buffers,
        ScratchBufferInfo,
        ScratchBufferMeta,
        ScratchBufferHandle,
        |info| ScratchBufferMeta {
            info,
            usages: Vec::new(),
            allocation: ScratchAllocation::default(),
        }
    );

    table_accessors!(
        create_texture,
        get_texture,
        texture_meta,
        textures,
        TextureInfo,
        TextureMeta,
        TextureHandle,
        |info| TextureMeta {
            info,
            usages: Vec::new(),
        }
    );

    table_accessors!(
        create_sampler,
        get_sampler,
        sampler_meta,
        samplers,
        SamplerInfo,
        SamplerMeta,
        SamplerHandle,
        |info| SamplerMeta { info }
    );

    table_accessors!(
        create_bindings_layout,
        get_bindings_layout,
        bindings_layout_meta,
        bindings_layouts,
        BindingsLayoutInfo,
        BindingsLayoutMeta,
        BindingsLayoutHandle,
        |info| BindingsLayoutMeta { info }
    );

    table_accessors!(
        create_binding_groups,
        get_binding_groups,
        binding_groups_meta,
        binding_groups,
        BindingGroupsInfo,
        BindingGroupsMeta,
        BindingGroupsHandle,
        |info| BindingGroupsMeta { info }
    );

    table_accessors!(
        create_graphics_pipeline,
        get_graphics_pipeline,
        graphics_pipeline_meta,
        graphics_pipelines,
        GraphicsPipelineInfo,
        GraphicsPipelineMeta,
        GraphicsPipelineHandle,
        |info| GraphicsPipelineMeta { info }
    );

    table_accessors!(
        create_compute_pipeline,
        get_compute_pipeline,
        compute_pipeline_meta,
        compute_pipelines,
        ComputePipelineInfo,
        ComputePipelineMeta,
        ComputePipelineHandle,
        |info| ComputePipelineMeta { info }
    );

    pub fn register_buffer_usage(
        &self,
        handle: BufferHandle,
        consumer: NodeId,
        footprint: BufferFootprint,
        access: AccessPattern,
    ) {
        self.buffers.with_meta_mut(handle, |meta| {
            meta.usages.push(BufferUsageRecord {
                consumer,
                footprint,
                access,
            });
        });
    }

    pub fn register_scratch_buffer_usage(
        &self,
        handle: ScratchBufferHandle,
        consumer: NodeId,
        footprint: BufferFootprint,
        access: AccessPattern,
    ) {
        self.scratch_buffers.with_meta_mut(handle, |meta| {
            meta.usages.push(BufferUsageRecord {
                consumer,
                footprint,
                access,
            });
        });
    }

    pub fn register_texture_usage(
        &self,
        handle: TextureHandle,
        consumer: NodeId,
        footprint: TextureFootprint,
        access: AccessPattern,
        layout: ResourceLayout,
    ) {
        self.textures.with_meta_mut(handle, |meta| {
            meta.usages.push(TextureUsageRecord {
                consumer,
                footprint,
                access,
                layout,
            });
        });
    }

    pub fn set_scratch_allocation(&self, handle: ScratchBufferHandle, allocation: ScratchAllocation) {
        self.scratch_buffers.with_meta_mut(handle, |meta| {
            meta.allocation = allocation;
        });
    }

    pub fn buffers(&self) -> Vec<(BufferHandle, BufferMeta)> {
        self.buffers.snapshot()
    }

    pub fn scratch_buffers(&self) -> Vec<(ScratchBufferHandle, ScratchBufferMeta)> {
        self.scratch_buffers.snapshot()
    }

    pub fn textures(&self) -> Vec<(TextureHandle, TextureMeta)> {
        self.textures.snapshot()
    }

    pub fn binding_groups_meta_by_name(&self, name: &str) -> Result<BindingGroupsMeta, DatabaseError> {
        let handle = self.binding_groups.get(name)?;
        Ok(self.binding_groups.meta(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::info::BufferUsage;

    #[test]
    fn create_and_get_round_trips() {
        let db = ResourceDatabase::new();
        let handle = db
            .create_buffer(
                "g_buffer",
                BufferInfo {
                    size: 1024,
                    usage: BufferUsage::STORAGE,
                },
            )
            .unwrap();
        let looked_up = db.get_buffer("g_buffer").unwrap();
        assert_eq!(handle, looked_up);
        assert_eq!(db.buffer_meta(handle).info.size, 1024);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let db = ResourceDatabase::new();
        db.create_buffer(
            "dup",
            BufferInfo {
                size: 1,
                usage: BufferUsage::STORAGE,
            },
        )
        .unwrap();
        let err = db.create_buffer(
            "dup",
            BufferInfo {
                size: 1,
                usage: BufferUsage::STORAGE,
            },
        );
        assert_eq!(err, Err(DatabaseError::DuplicateName("dup".to_string())));
    }

    #[test]
    fn unknown_name_is_reported() {
        let db = ResourceDatabase::new();
        assert_eq!(
            db.get_buffer("missing"),
            Err(DatabaseError::UnknownName("missing".to_string()))
        );
    }

    #[test]
    fn register_usage_appends_to_the_right_resource() {
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
        db.register_buffer_usage(
            handle,
            3,
            BufferFootprint::new(0, 64),
            AccessPattern::SHADER_READ,
        );
        let meta = db.buffer_meta(handle);
        assert_eq!(meta.usages.len(), 1);
        assert_eq!(meta.usages[0].consumer, 3);
    }

    #[test]
    fn snapshot_is_ordered_by_handle_index() {
        let db = ResourceDatabase::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            handles.push(
                db.create_buffer(
                    &format!("buf_{i}"),
                    BufferInfo {
                        size: 1,
                        usage: BufferUsage::STORAGE,
                    },
                )
                .unwrap(),
            );
        }
        let snapshot = db.buffers();
        assert_eq!(snapshot.len(), 32);
        let indices: Vec<u32> = snapshot.iter().map(|(h, _)| h.index()).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted);
    }
}
