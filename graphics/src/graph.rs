//! The public render graph API: declare resources and passes, then
//! `compile()` them into a scheduled, barrier-annotated execution plan.

use rendergraph_core::pool::{Poolable, Pooled};

use crate::allocator::{self, BackingBufferLayout};
use crate::analyzer::{self, Node};
use crate::barrier::{self, BufferBarrier, TextureBarrier};
use crate::dependency::{self, Edge};
use crate::error::{CompileError, DatabaseError};
use crate::recorder::CommandRecorder;
use crate::resources::{
    BindingGroupsHandle, BindingGroupsInfo, BindingsLayoutHandle, BindingsLayoutInfo, BufferHandle,
    BufferInfo, ComputePipelineHandle, ComputePipelineInfo, GraphicsPipelineHandle,
    GraphicsPipelineInfo, NodeId, PassHandle, ResourceDatabase, SamplerHandle, SamplerInfo,
    ScratchBufferHandle, ScratchBufferInfo, TextureHandle, TextureInfo,
};
use crate::scheduler;
use crate::semaphore::{self, SemaphoreRecord};

/// Caps and tunables a compile runs under, separate from a pass's own
/// limits. Defaults are generous enough for small-to-medium graphs; size
/// upward for graphs that legitimately touch more distinct byte ranges
/// or mip/layer rectangles per resource than the default pool holds.
#[derive(Debug, Clone, Copy)]
pub struct CompilerLimits {
    /// Maximum live nodes in each per-resource subresource index, shared
    /// by the Dependency Builder and the Barrier Synthesizer (each keeps
    /// its own index, but both are capped the same way).
    pub subresource_node_pool: usize,
    /// Byte alignment applied to every scratch buffer's offset within
    /// its aliased backing buffer.
    pub scratch_alignment: u64,
}

impl Default for CompilerLimits {
    fn default() -> Self {
        Self {
            subresource_node_pool: 1024,
            scratch_alignment: 16,
        }
    }
}

/// When a pass's commands are re-analyzed on every `compile()` call, or
/// only the first time the graph is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassExecution {
    /// Re-record and re-analyze this pass on every compile.
    Always,
    /// Record this pass only on the graph's first successful compile —
    /// for one-time setup work such as an initial resource upload.
    OnFirstRun,
}

struct PassRecord {
    name: String,
    execution: PassExecution,
    record: Box<dyn Fn(&ResourceDatabase, &mut CommandRecorder)>,
    has_run: bool,
}

/// The output of `compile()`: a scheduled node list plus everything a
/// backend needs to execute it — barriers and scratch-buffer placement.
/// Kept inside a [`Pooled`] so repeated compiles reuse its allocations.
#[derive(Debug, Default)]
pub struct CompiledPlan {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub topo_order: Vec<NodeId>,
    pub buffer_barriers: Vec<BufferBarrier>,
    pub texture_barriers: Vec<TextureBarrier>,
    pub backing_buffers: Vec<BackingBufferLayout>,
    pub semaphores: Vec<SemaphoreRecord>,
}

impl Poolable for CompiledPlan {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.topo_order.clear();
        self.buffer_barriers.clear();
        self.texture_barriers.clear();
        self.backing_buffers.clear();
        self.semaphores.clear();
    }
}

/// A render graph: a resource database plus a list of passes, compiled
/// into a [`CompiledPlan`] on demand.
pub struct RenderGraph {
    db: ResourceDatabase,
    limits: CompilerLimits,
    passes: Vec<PassRecord>,
    plan: Pooled<CompiledPlan>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::with_limits(CompilerLimits::default())
    }

    pub fn with_limits(limits: CompilerLimits) -> Self {
        Self {
            db: ResourceDatabase::new(),
            limits,
            passes: Vec::new(),
            plan: Pooled::default(),
        }
    }

    pub fn create_buffer(&self, name: &str, info: BufferInfo) -> Result<BufferHandle, DatabaseError> {
        self.db.create_buffer(name, info)
    }

    pub fn create_scratch_buffer(
        &self,
        name: &str,
        info: ScratchBufferInfo,
    ) -> Result<ScratchBufferHandle, DatabaseError> {
        self.db.create_scratch_buffer(name, info)
    }

    pub fn get_scratch_buffer(&self, name: &str) -> Result<ScratchBufferHandle, DatabaseError> {
        self.db.get_scratch_buffer(name)
    }

    pub fn create_texture(&self, name: &str, info: TextureInfo) -> Result<TextureHandle, DatabaseError> {
        self.db.create_texture(name, info)
    }

    pub fn create_sampler(&self, name: &str, info: SamplerInfo) -> Result<SamplerHandle, DatabaseError> {
        self.db.create_sampler(name, info)
    }

    pub fn create_bindings_layout(
        &self,
        name: &str,
        info: BindingsLayoutInfo,
    ) -> Result<BindingsLayoutHandle, DatabaseError> {
        self.db.create_bindings_layout(name, info)
    }

    pub fn create_binding_groups(
        &self,
        name: &str,
        info: BindingGroupsInfo,
    ) -> Result<BindingGroupsHandle, DatabaseError> {
        self.db.create_binding_groups(name, info)
    }

    pub fn create_graphics_pipeline(
        &self,
        name: &str,
        info: GraphicsPipelineInfo,
    ) -> Result<GraphicsPipelineHandle, DatabaseError> {
        self.db.create_graphics_pipeline(name, info)
    }

    pub fn create_compute_pipeline(
        &self,
        name: &str,
        info: ComputePipelineInfo,
    ) -> Result<ComputePipelineHandle, DatabaseError> {
        self.db.create_compute_pipeline(name, info)
    }

    /// Register a pass. `record` is invoked with the resource database
    /// (to look up handles by name) and a fresh [`CommandRecorder`] every
    /// time the pass participates in a compile.
    pub fn add_pass(
        &mut self,
        name: impl Into<String>,
        execution: PassExecution,
        record: impl Fn(&ResourceDatabase, &mut CommandRecorder) + 'static,
    ) -> PassHandle {
        let handle_index = self.passes.len() as u32;
        self.passes.push(PassRecord {
            name: name.into(),
            execution,
            record: Box::new(record),
            has_run: false,
        });
        PassHandle::new(handle_index)
    }

    /// Run the full pipeline: Pass Analyzer, Dependency Builder,
    /// Scheduler, Allocator, Barrier Synthesizer, Semaphore Planner.
    pub fn compile(&mut self) -> Result<&CompiledPlan, CompileError> {
        log::debug!("compiling render graph with {} registered passes", self.passes.len());
        let plan = self.plan.activate();
        plan.reset();

        let mut nodes = vec![Node::root()];
        for pass in &mut self.passes {
            let should_run = match pass.execution {
                PassExecution::Always => true,
                PassExecution::OnFirstRun => !pass.has_run,
            };
            if !should_run {
                continue;
            }
            analyzer::analyze_pass(&self.db, &pass.name, |db, r| (pass.record)(db, r), &mut nodes)?;
            pass.has_run = true;
        }
        log::trace!("pass analyzer produced {} nodes", nodes.len());

        let node_count = nodes.len();
        let edges = dependency::build_dependencies(&self.db, node_count, self.limits.subresource_node_pool)?;
        log::trace!("dependency builder produced {} edges", edges.len());

        let topo_order = scheduler::topological_sort(node_count, &edges)?;
        scheduler::assign_levels(&mut nodes, &topo_order, &edges);

        let backing_buffers = allocator::allocate_scratch_buffers(&self.db, &nodes, self.limits.scratch_alignment);
        log::trace!("allocator packed scratch buffers into {} backing buffers", backing_buffers.len());

        let node_levels: Vec<u32> = nodes.iter().map(|n| n.level).collect();
        let barrier_plan = barrier::synthesize_barriers(&self.db, &node_levels, self.limits.subresource_node_pool)?;
        log::trace!(
            "barrier synthesizer emitted {} buffer and {} texture barriers",
            barrier_plan.buffer_barriers.len(),
            barrier_plan.texture_barriers.len()
        );

        let semaphores = semaphore::plan_semaphores(&mut nodes, &edges);
        log::trace!("semaphore planner emitted {} semaphores", semaphores.len());

        plan.nodes = nodes;
        plan.edges = edges;
        plan.topo_order = topo_order;
        plan.buffer_barriers = barrier_plan.buffer_barriers;
        plan.texture_barriers = barrier_plan.texture_barriers;
        plan.backing_buffers = backing_buffers;
        plan.semaphores = semaphores;

        Ok(self.plan.get().expect("plan was just activated"))
    }

    /// The most recently compiled plan, if `compile()` has succeeded at
    /// least once and hasn't been released back to the pool since.
    pub fn last_plan(&self) -> Option<&CompiledPlan> {
        self.plan.get()
    }

    /// Where a scratch buffer landed after the last successful compile —
    /// which backing buffer and byte offset a backend should bind it at.
    pub fn scratch_allocation(&self, handle: ScratchBufferHandle) -> crate::resources::ScratchAllocation {
        self.db.scratch_buffer_meta(handle).allocation
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}
