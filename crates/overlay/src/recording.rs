//! Recording render client (test double)
//!
//! Keeps every presented scene in a shared log and can simulate context
//! loss on `present`.

use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{FrameId, NodeId, RenderClient, RenderError, SceneNode, Viewport};

/// Scene as it was presented
#[derive(Debug, Clone)]
pub struct PresentedScene {
    /// Frame drawn by the first image node
    pub frame_id: Option<FrameId>,
    /// Nodes in draw order
    pub nodes: Vec<SceneNode>,
}

impl PresentedScene {
    /// Whether the scene contains annotation primitives
    pub fn is_annotated(&self) -> bool {
        self.nodes.iter().any(|n| {
            matches!(
                n,
                SceneNode::Segments { .. } | SceneNode::Outline { .. }
            )
        })
    }
}

#[derive(Debug, Default)]
struct LogInner {
    presented: Vec<PresentedScene>,
    lost: u64,
    clears: u64,
}

/// Shared handle to the presented scenes
#[derive(Debug, Clone, Default)]
pub struct RecordingLog(Arc<Mutex<LogInner>>);

impl RecordingLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // A poisoned log still holds valid scenes
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Presented scenes in order
    pub fn presented(&self) -> Vec<PresentedScene> {
        self.lock().presented.clone()
    }

    /// Frame ids of presented scenes in order
    pub fn frame_ids(&self) -> Vec<u64> {
        self.lock()
            .presented
            .iter()
            .filter_map(|s| s.frame_id.map(FrameId::get))
            .collect()
    }

    /// Frame ids of presented scenes that carried an annotation
    pub fn annotated_ids(&self) -> Vec<u64> {
        self.lock()
            .presented
            .iter()
            .filter(|s| s.is_annotated())
            .filter_map(|s| s.frame_id.map(FrameId::get))
            .collect()
    }

    /// Presentations that failed with a simulated context loss
    pub fn context_losses(&self) -> u64 {
        self.lock().lost
    }

    /// Number of `clear` calls
    pub fn clears(&self) -> u64 {
        self.lock().clears
    }
}

/// Render client that records instead of drawing
#[derive(Debug)]
pub struct RecordingClient {
    viewport: Viewport,
    nodes: Vec<SceneNode>,
    lose_next: u32,
    log: RecordingLog,
}

impl RecordingClient {
    /// Create a client with the given viewport
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            nodes: Vec::new(),
            lose_next: 0,
            log: RecordingLog::default(),
        }
    }

    /// Shared log handle
    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }

    /// Fail the next `count` presents with a context loss
    pub fn lose_context(&mut self, count: u32) {
        self.lose_next = count;
    }
}

impl RenderClient for RecordingClient {
    fn name(&self) -> &str {
        "recording"
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.nodes.clear();
        self.log.lock().clears += 1;
        Ok(())
    }

    fn add_node(&mut self, node: SceneNode) -> Result<NodeId, RenderError> {
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn update_node(&mut self, id: NodeId, node: SceneNode) -> Result<(), RenderError> {
        let slot = self
            .nodes
            .get_mut(id.0)
            .ok_or(RenderError::UnknownNode(id))?;
        *slot = node;
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let nodes = std::mem::take(&mut self.nodes);

        if self.lose_next > 0 {
            self.lose_next -= 1;
            self.log.lock().lost += 1;
            return Err(RenderError::ContextLost("simulated context loss".to_string()));
        }

        let frame_id = nodes.iter().find_map(|n| match n {
            SceneNode::Image { frame, .. } => Some(frame.id),
            _ => None,
        });
        self.log.lock().presented.push(PresentedScene { frame_id, nodes });
        Ok(())
    }
}
