//! Resource metadata: typed handles, creation info, and the sharded
//! database that maps resource names to both.

pub mod database;
pub mod handle;
pub mod info;

pub use database::{
    BufferMeta, BufferUsageRecord, ResourceDatabase, ScratchAllocation, ScratchBufferMeta,
    TextureMeta, TextureUsageRecord,
};
pub use handle::{
    BindingGroupsHandle, BindingsLayoutHandle, BufferHandle, ComputePipelineHandle,
    GraphicsPipelineHandle, Handle, NodeId, PassHandle, Queue, SamplerHandle, ScratchBufferHandle,
    TextureHandle,
};
pub use info::{
    BindingEntry, BindingGroupsInfo, BindingsLayoutInfo, BufferInfo, BufferUsage,
    ComputePipelineInfo, GraphicsPipelineInfo, SamplerInfo, ScratchBufferInfo, TextureInfo,
    TextureUsage,
};
