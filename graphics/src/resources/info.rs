//! Resource creation info: the immutable description each resource is
//! created with, stored alongside its usage list in the database.

use bitflags::bitflags;

use crate::types::{AccessPattern, ResourceLayout};

bitflags! {
    /// Creation-time usage flags for a buffer, distinct from the
    /// per-access [`AccessPattern`](crate::types::AccessPattern) a usage
    /// carries. Scratch buffers are grouped for aliasing by this mask:
    /// two scratch buffers with different usage masks never share a
    /// backing allocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX    = 1 << 0;
        const INDEX     = 1 << 1;
        const UNIFORM   = 1 << 2;
        const STORAGE   = 1 << 3;
        const INDIRECT  = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
    }
}

bitflags! {
    /// Creation-time usage flags for a texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED           = 1 << 0;
        const STORAGE           = 1 << 1;
        const COLOR_ATTACHMENT   = 1 << 2;
        const DEPTH_STENCIL      = 1 << 3;
        const TRANSFER_SRC       = 1 << 4;
        const TRANSFER_DST       = 1 << 5;
    }
}

/// Creation info for a persistent buffer.
#[derive(Debug, Clone, Copy)]
pub struct BufferInfo {
    pub size: u64,
    pub usage: BufferUsage,
}

/// Creation info for a transient scratch buffer. The allocator assigns
/// its `(offset, size)` within an aliased backing buffer during
/// `compile()`; before the first successful compile these are
/// [`ScratchAllocation::default`](super::database::ScratchAllocation).
#[derive(Debug, Clone, Copy)]
pub struct ScratchBufferInfo {
    pub size: u64,
    pub usage: BufferUsage,
}

/// Creation info for a texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureInfo {
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: TextureUsage,
}

/// Creation info for a sampler. Carries no fields the compiler inspects;
/// it exists purely as an addressable resource name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerInfo;

/// Creation info for a bindings layout (the set of binding slots a
/// binding-groups resource can be built against).
#[derive(Debug, Clone, Default)]
pub struct BindingsLayoutInfo {
    pub entry_count: u32,
}

/// One binding inside a [`BindingGroupsInfo`]: the resource bound at that
/// slot and the access the bound pass makes through it. `layout` only
/// applies when the bound resource turns out to be a texture; it is
/// ignored for buffers and scratch buffers.
#[derive(Debug, Clone)]
pub struct BindingEntry {
    pub resource_name: String,
    pub access: AccessPattern,
    pub layout: ResourceLayout,
}

/// Creation info for a bound binding-groups resource. The Pass Analyzer
/// recursively registers every entry as a consumer whenever a
/// `BindBindingGroups` command references it.
#[derive(Debug, Clone, Default)]
pub struct BindingGroupsInfo {
    pub layout_name: String,
    pub entries: Vec<BindingEntry>,
}

/// Creation info for a graphics pipeline. Opaque to the compiler beyond
/// its name; carried so passes can bind it.
#[derive(Debug, Clone, Default)]
pub struct GraphicsPipelineInfo;

/// Creation info for a compute pipeline.
#[derive(Debug, Clone, Default)]
pub struct ComputePipelineInfo;
