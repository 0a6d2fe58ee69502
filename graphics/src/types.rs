//! Core value types shared across the compiler: access patterns, image
//! layouts, resource kinds, and subresource footprints.

use bitflags::bitflags;

bitflags! {
    /// The intent of a single resource access, as a composable bit set.
    ///
    /// Mirrors the access/stage vocabulary Vulkan exposes through
    /// `VkAccessFlags2`; kept backend-agnostic here since this crate never
    /// talks to a driver directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessPattern: u32 {
        const NONE                            = 0;
        const VERTEX_ATTRIBUTE_READ            = 1 << 0;
        const INDEX_READ                       = 1 << 1;
        const UNIFORM_READ                     = 1 << 2;
        const SHADER_READ                      = 1 << 3;
        const SHADER_WRITE                     = 1 << 4;
        const COLOR_ATTACHMENT_READ             = 1 << 5;
        const COLOR_ATTACHMENT_WRITE            = 1 << 6;
        const DEPTH_STENCIL_ATTACHMENT_READ      = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT_WRITE     = 1 << 8;
        const TRANSFER_READ                     = 1 << 9;
        const TRANSFER_WRITE                    = 1 << 10;
        const INDIRECT_COMMAND_READ             = 1 << 11;
        const MEMORY_READ                       = 1 << 12;
        const MEMORY_WRITE                      = 1 << 13;
    }
}

impl AccessPattern {
    /// Whether this access pattern writes to the resource in any way.
    pub fn is_write(self) -> bool {
        self.intersects(
            Self::SHADER_WRITE
                | Self::COLOR_ATTACHMENT_WRITE
                | Self::DEPTH_STENCIL_ATTACHMENT_WRITE
                | Self::TRANSFER_WRITE
                | Self::MEMORY_WRITE,
        )
    }
}

impl Default for AccessPattern {
    fn default() -> Self {
        Self::NONE
    }
}

/// Image layout a texture subresource is in at a point in the schedule.
///
/// Closed enumeration matching Vulkan's `VkImageLayout` subset actually
/// reachable through this compiler's tracked access patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    Preinitialized,
    PresentSrc,
}

/// A half-open byte range `[offset, offset + size)` within a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferFootprint {
    pub offset: u64,
    pub size: u64,
}

impl BufferFootprint {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    pub fn whole(size: u64) -> Self {
        Self { offset: 0, size }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// A rectangle over `[base_mip, base_mip + mip_count) x [base_layer,
/// base_layer + layer_count)` within a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFootprint {
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl TextureFootprint {
    pub fn new(base_mip: u32, mip_count: u32, base_layer: u32, layer_count: u32) -> Self {
        Self {
            base_mip,
            mip_count,
            base_layer,
            layer_count,
        }
    }

    pub fn whole(mip_levels: u32, array_layers: u32) -> Self {
        Self {
            base_mip: 0,
            mip_count: mip_levels,
            base_layer: 0,
            layer_count: array_layers,
        }
    }

    pub fn mip_end(&self) -> u32 {
        self.base_mip + self.mip_count
    }

    pub fn layer_end(&self) -> u32 {
        self.base_layer + self.layer_count
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.base_mip < other.mip_end()
            && other.base_mip < self.mip_end()
            && self.base_layer < other.layer_end()
            && other.base_layer < self.layer_end()
    }
}
