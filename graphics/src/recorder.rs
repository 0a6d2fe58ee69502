//! Command recording: the abstract GPU command stream a pass's `record`
//! callback builds up, auto-split into independent command sequences at
//! dispatch/copy boundaries.

use crate::error::CompileError;
use crate::types::{AccessPattern, BufferFootprint, ResourceLayout, TextureFootprint};

/// A view of a buffer subresource as touched by a single command.
#[derive(Debug, Clone)]
pub struct BufferView {
    pub resource: String,
    pub footprint: BufferFootprint,
    pub access: AccessPattern,
}

/// A view of a texture subresource as touched by a single command.
#[derive(Debug, Clone)]
pub struct TextureView {
    pub resource: String,
    pub footprint: TextureFootprint,
    pub access: AccessPattern,
    pub layout: ResourceLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Uint16,
    Uint32,
}

/// Attachments a `BeginRenderPass` command touches.
#[derive(Debug, Clone, Default)]
pub struct RenderPassInfo {
    pub color_attachments: Vec<TextureView>,
    pub depth_stencil_attachment: Option<TextureView>,
}

/// One abstract GPU command recorded into a pass's command stream.
#[derive(Debug, Clone)]
pub enum Command {
    BeginRenderPass(RenderPassInfo),
    EndRenderPass,
    CopyBuffer {
        src: BufferView,
        dst: BufferView,
    },
    BindBindingGroups {
        groups: String,
        dynamic_offsets: Vec<u32>,
    },
    BindGraphicsPipeline(String),
    BindComputePipeline(String),
    BindVertexBuffer {
        slot: u32,
        view: BufferView,
    },
    BindIndexBuffer {
        view: BufferView,
        index_type: IndexType,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndexedIndirect {
        view: BufferView,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
}

impl Command {
    /// Whether this command ends the current command sequence.
    fn is_sequence_boundary(&self) -> bool {
        matches!(
            self,
            Command::CopyBuffer { .. }
                | Command::Draw { .. }
                | Command::DrawIndexed { .. }
                | Command::DrawIndexedIndirect { .. }
                | Command::Dispatch { .. }
        )
    }

    fn setup_kind(&self) -> Option<&'static str> {
        match self {
            Command::BeginRenderPass(_) => Some("BeginRenderPass"),
            Command::EndRenderPass => Some("EndRenderPass"),
            Command::BindGraphicsPipeline(_) => Some("BindGraphicsPipeline"),
            Command::BindComputePipeline(_) => Some("BindComputePipeline"),
            Command::BindVertexBuffer { .. } => Some("BindVertexBuffer"),
            Command::BindIndexBuffer { .. } => Some("BindIndexBuffer"),
            Command::BindBindingGroups { .. } => Some("BindBindingGroups"),
            _ => None,
        }
    }
}

/// An independent sequence of commands ending at (and including) a
/// dispatch/copy boundary, or the final, possibly-empty tail sequence.
#[derive(Debug, Clone, Default)]
pub struct CommandSequence {
    pub commands: Vec<Command>,
}

/// Records a pass's abstract command stream, auto-splitting into
/// [`CommandSequence`]s at dispatch/copy boundaries.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    sequences: Vec<CommandSequence>,
    current: CommandSequence,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: Command) {
        let splits = command.is_sequence_boundary();
        self.current.commands.push(command);
        if splits {
            let finished = std::mem::take(&mut self.current);
            self.sequences.push(finished);
        }
    }

    pub fn begin_render_pass(&mut self, info: RenderPassInfo) {
        self.push(Command::BeginRenderPass(info));
    }

    pub fn end_render_pass(&mut self) {
        self.push(Command::EndRenderPass);
    }

    pub fn copy_buffer(&mut self, src: BufferView, dst: BufferView) {
        self.push(Command::CopyBuffer { src, dst });
    }

    pub fn bind_binding_groups(&mut self, groups: impl Into<String>, dynamic_offsets: Vec<u32>) {
        self.push(Command::BindBindingGroups {
            groups: groups.into(),
            dynamic_offsets,
        });
    }

    pub fn bind_graphics_pipeline(&mut self, pipeline: impl Into<String>) {
        self.push(Command::BindGraphicsPipeline(pipeline.into()));
    }

    pub fn bind_compute_pipeline(&mut self, pipeline: impl Into<String>) {
        self.push(Command::BindComputePipeline(pipeline.into()));
    }

    pub fn bind_vertex_buffer(&mut self, slot: u32, view: BufferView) {
        self.push(Command::BindVertexBuffer { slot, view });
    }

    pub fn bind_index_buffer(&mut self, view: BufferView, index_type: IndexType) {
        self.push(Command::BindIndexBuffer { view, index_type });
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.push(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    pub fn draw_indexed_indirect(&mut self, view: BufferView, offset: u64, draw_count: u32, stride: u32) {
        self.push(Command::DrawIndexedIndirect {
            view,
            offset,
            draw_count,
            stride,
        });
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.push(Command::Dispatch { x, y, z });
    }

    /// Finalize the recording, validating every sequence and returning
    /// them in recorded order. The trailing sequence is included even if
    /// it never hit a dispatch/copy boundary (and is dropped by the Pass
    /// Analyzer if it ends up empty).
    pub fn finish(mut self) -> Result<Vec<CommandSequence>, CompileError> {
        if !self.current.commands.is_empty() {
            let tail = std::mem::take(&mut self.current);
            self.sequences.push(tail);
        }
        for sequence in &self.sequences {
            validate_sequence(sequence)?;
        }
        Ok(self.sequences)
    }
}

fn validate_sequence(sequence: &CommandSequence) -> Result<(), CompileError> {
    let mut seen: Vec<&'static str> = Vec::new();
    for command in &sequence.commands {
        if let Some(kind) = command.setup_kind() {
            if seen.contains(&kind) {
                log::warn!("{kind} recorded more than once before the next dispatch/copy boundary");
                return Err(CompileError::InvalidCommandSequence(format!(
                    "{kind} recorded more than once before the next dispatch/copy boundary"
                )));
            }
            seen.push(kind);
        }
    }
    Ok(())
}
