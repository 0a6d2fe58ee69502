//! # rendergraph
//!
//! An offline render graph compiler: given a set of declared resources
//! and recorded passes, it analyzes subresource-granularity access
//! patterns, schedules passes into levels, aliases transient scratch
//! buffers, and synthesizes the minimal set of barriers and cross-queue
//! semaphores a backend needs to execute the graph.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderGraph`] - declare resources and passes, then [`RenderGraph::compile`]
//! - [`CompiledPlan`] - the scheduled, barrier-annotated result of a compile
//! - [`CommandRecorder`] - the abstract command stream a pass's callback records into
//!
//! ## Example
//!
//! ```
//! use rendergraph::{BufferInfo, BufferUsage, PassExecution, RenderGraph};
//!
//! let mut graph = RenderGraph::new();
//! graph
//!     .create_buffer("particles", BufferInfo { size: 4096, usage: BufferUsage::STORAGE })
//!     .unwrap();
//! graph.add_pass("simulate", PassExecution::Always, |_db, recorder| {
//!     recorder.bind_compute_pipeline("simulate");
//!     recorder.dispatch(64, 1, 1);
//! });
//! let plan = graph.compile().unwrap();
//! assert_eq!(plan.nodes.len(), 2);
//! ```

pub mod allocator;
pub mod analyzer;
pub mod barrier;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod recorder;
pub mod resources;
pub mod scheduler;
pub mod semaphore;
pub mod subresource;
pub mod types;

pub use allocator::BackingBufferLayout;
pub use barrier::{BarrierPlan, BarrierResource, BufferBarrier, TextureBarrier};
pub use dependency::{Edge, EdgeType, ResourceRef};
pub use error::{CompileError, DatabaseError};
pub use graph::{CompiledPlan, CompilerLimits, PassExecution, RenderGraph};
pub use recorder::{BufferView, Command, CommandRecorder, CommandSequence, IndexType, RenderPassInfo, TextureView};
pub use resources::{
    BindingEntry, BindingGroupsHandle, BindingGroupsInfo, BindingsLayoutHandle, BindingsLayoutInfo,
    BufferHandle, BufferInfo, BufferUsage, ComputePipelineHandle, ComputePipelineInfo,
    GraphicsPipelineHandle, GraphicsPipelineInfo, NodeId, PassHandle, Queue, ResourceDatabase,
    SamplerHandle, SamplerInfo, ScratchBufferHandle, ScratchBufferInfo, TextureHandle, TextureInfo,
    TextureUsage,
};
pub use semaphore::SemaphoreRecord;
pub use types::{AccessPattern, BufferFootprint, ResourceLayout, TextureFootprint};

/// Graphics library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
