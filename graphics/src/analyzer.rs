//! Pass Analyzer: turns one pass's recorded command sequences into graph
//! nodes and registers every resource usage those commands touch.

use crate::error::CompileError;
use crate::recorder::{Command, CommandRecorder, CommandSequence};
use crate::resources::{NodeId, Queue, ResourceDatabase};
use crate::types::{BufferFootprint, TextureFootprint};

/// A scheduled unit of work: one non-empty command sequence produced by a
/// pass. Populated with `level`/`priority` by the Scheduler and with
/// semaphore indices by the Semaphore Planner; `queue` and `commands` are
/// fixed once the Pass Analyzer creates the node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub level: u32,
    pub priority: u32,
    pub queue: Option<Queue>,
    pub commands: Vec<Command>,
    pub wait_semaphores: Vec<u32>,
    pub signal_semaphores: Vec<u32>,
}

impl Node {
    fn new(id: NodeId, name: String, queue: Option<Queue>, commands: Vec<Command>) -> Self {
        Self {
            priority: id,
            id,
            name,
            level: 0,
            queue,
            commands,
            wait_semaphores: Vec::new(),
            signal_semaphores: Vec::new(),
        }
    }

    /// The synthetic node every compile starts with: id 0, no commands,
    /// no queue. Every other node gets an `Initialization` edge from it,
    /// so a graph with a single real pass still has two nodes and that
    /// pass schedules at level ≥ 1.
    pub(crate) fn root() -> Self {
        Self::new(0, "root".to_string(), None, Vec::new())
    }
}

fn queue_for_sequence(sequence: &CommandSequence) -> Option<Queue> {
    match sequence.commands.last()? {
        Command::CopyBuffer { .. } => Some(Queue::Transfer),
        Command::Draw { .. } | Command::DrawIndexed { .. } | Command::DrawIndexedIndirect { .. } => {
            Some(Queue::Graphics)
        }
        Command::Dispatch { .. } => Some(Queue::Compute),
        _ => None,
    }
}

/// Record one pass's commands, split them into sequences, allocate one
/// node per non-empty sequence, and register every resource usage those
/// commands touch. Node ids assigned are `nodes.len()` at allocation time,
/// so doubling as priorities (creation order is the tie-break).
pub fn analyze_pass(
    db: &ResourceDatabase,
    pass_name: &str,
    record: impl FnOnce(&ResourceDatabase, &mut CommandRecorder),
    nodes: &mut Vec<Node>,
) -> Result<(), CompileError> {
    let mut recorder = CommandRecorder::new();
    record(db, &mut recorder);
    let sequences = recorder.finish()?;
    let nodes_before = nodes.len();

    for (seq_index, sequence) in sequences.into_iter().enumerate() {
        if sequence.commands.is_empty() {
            continue;
        }
        let queue = queue_for_sequence(&sequence);
        let node_id = nodes.len() as NodeId;
        let node_name = if seq_index == 0 {
            pass_name.to_string()
        } else {
            format!("{pass_name}#{seq_index}")
        };

        for command in &sequence.commands {
            register_command_usages(db, node_id, command)?;
        }

        nodes.push(Node::new(node_id, node_name, queue, sequence.commands));
    }

    log::trace!("pass '{pass_name}' analyzed into {} node(s)", nodes.len() - nodes_before);
    Ok(())
}

fn register_command_usages(
    db: &ResourceDatabase,
    node_id: NodeId,
    command: &Command,
) -> Result<(), CompileError> {
    match command {
        Command::BeginRenderPass(info) => {
            for attachment in &info.color_attachments {
                register_texture_view(db, node_id, attachment)?;
            }
            if let Some(depth) = &info.depth_stencil_attachment {
                register_texture_view(db, node_id, depth)?;
            }
        }
        Command::EndRenderPass => {}
        Command::CopyBuffer { src, dst } => {
            register_buffer_view(db, node_id, src)?;
            register_buffer_view(db, node_id, dst)?;
        }
        Command::BindBindingGroups { groups, .. } => {
            register_binding_groups(db, node_id, groups)?;
        }
        Command::BindGraphicsPipeline(_) | Command::BindComputePipeline(_) => {}
        Command::BindVertexBuffer { view, .. } => {
            register_buffer_view(db, node_id, view)?;
        }
        Command::BindIndexBuffer { view, .. } => {
            register_buffer_view(db, node_id, view)?;
        }
        Command::Draw { .. } => {}
        Command::DrawIndexed { .. } => {}
        Command::DrawIndexedIndirect { view, .. } => {
            register_buffer_view(db, node_id, view)?;
        }
        Command::Dispatch { .. } => {}
    }
    Ok(())
}

fn register_buffer_view(
    db: &ResourceDatabase,
    node_id: NodeId,
    view: &crate::recorder::BufferView,
) -> Result<(), CompileError> {
    if let Ok(handle) = db.get_buffer(&view.resource) {
        db.register_buffer_usage(handle, node_id, view.footprint, view.access);
        return Ok(());
    }
    if let Ok(handle) = db.get_scratch_buffer(&view.resource) {
        db.register_scratch_buffer_usage(handle, node_id, view.footprint, view.access);
        return Ok(());
    }
    Err(CompileError::UnknownResource(view.resource.clone()))
}

fn register_texture_view(
    db: &ResourceDatabase,
    node_id: NodeId,
    view: &crate::recorder::TextureView,
) -> Result<(), CompileError> {
    let handle = db
        .get_texture(&view.resource)
        .map_err(|_| CompileError::UnknownResource(view.resource.clone()))?;
    db.register_texture_usage(handle, node_id, view.footprint, view.access, view.layout);
    Ok(())
}

/// Recursively register every buffer/texture entry of a bound
/// binding-groups resource as a whole-resource consumer, using each
/// entry's own `access` (and, for textures, `layout`). Samplers and
/// pipelines named in a group are addressable but carry no subresource
/// footprint to track, so they are validated to exist and otherwise
/// skipped.
fn register_binding_groups(
    db: &ResourceDatabase,
    node_id: NodeId,
    groups_name: &str,
) -> Result<(), CompileError> {
    let groups = db
        .binding_groups_meta_by_name(groups_name)
        .map_err(|_| CompileError::UnknownResource(groups_name.to_string()))?;

    db.get_bindings_layout(&groups.info.layout_name)
        .map_err(|_| CompileError::UnknownResource(groups.info.layout_name.clone()))?;

    for entry in &groups.info.entries {
        if let Ok(handle) = db.get_buffer(&entry.resource_name) {
            let size = db.buffer_meta(handle).info.size;
            db.register_buffer_usage(handle, node_id, BufferFootprint::whole(size), entry.access);
        } else if let Ok(handle) = db.get_scratch_buffer(&entry.resource_name) {
            let size = db.scratch_buffer_meta(handle).info.size;
            db.register_scratch_buffer_usage(handle, node_id, BufferFootprint::whole(size), entry.access);
        } else if let Ok(handle) = db.get_texture(&entry.resource_name) {
            let meta = db.texture_meta(handle);
            db.register_texture_usage(
                handle,
                node_id,
                TextureFootprint::whole(meta.info.mip_levels, meta.info.array_layers),
                entry.access,
                entry.layout,
            );
        } else if db.get_sampler(&entry.resource_name).is_err() {
            return Err(CompileError::UnknownResource(entry.resource_name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::BufferView;
    use crate::resources::{BufferInfo, BufferUsage};
    use crate::types::AccessPattern;

    #[test]
    fn single_dispatch_pass_produces_one_node() {
        let db = ResourceDatabase::new();
        db.create_buffer(
            "params",
            BufferInfo {
                size: 64,
                usage: BufferUsage::UNIFORM,
            },
        )
        .unwrap();

        let mut nodes = Vec::new();
        analyze_pass(
            &db,
            "simulate",
            |_db, r| {
                r.bind_compute_pipeline("sim");
                r.dispatch(8, 1, 1);
            },
            &mut nodes,
        )
        .unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].queue, Some(Queue::Compute));
        assert_eq!(nodes[0].name, "simulate");
    }

    #[test]
    fn two_dispatch_sequences_produce_two_nodes_with_suffixed_names() {
        let db = ResourceDatabase::new();
        let mut nodes = Vec::new();
        analyze_pass(
            &db,
            "multi",
            |_db, r| {
                r.dispatch(1, 1, 1);
                r.dispatch(1, 1, 1);
            },
            &mut nodes,
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "multi");
        assert_eq!(nodes[1].name, "multi#1");
    }

    #[test]
    fn unknown_resource_is_reported() {
        let db = ResourceDatabase::new();
        let mut nodes = Vec::new();
        let result = analyze_pass(
            &db,
            "broken",
            |_db, r| {
                r.copy_buffer(
                    BufferView {
                        resource: "missing".to_string(),
                        footprint: BufferFootprint::new(0, 16),
                        access: AccessPattern::TRANSFER_READ,
                    },
                    BufferView {
                        resource: "missing2".to_string(),
                        footprint: BufferFootprint::new(0, 16),
                        access: AccessPattern::TRANSFER_WRITE,
                    },
                );
            },
            &mut nodes,
        );
        assert!(matches!(result, Err(CompileError::UnknownResource(_))));
    }
}
