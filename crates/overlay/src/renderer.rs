//! Overlay renderer
//!
//! Turns one `SyncedPair` into a fresh scene: the frame as a textured
//! quad, the flow annotation, an optional legend and an info HUD. Nothing is kept
//! from one tick to the next except the context-loss counter.

use contracts::{
    NodeId, PairStatus, RenderClient, RenderConfig, RenderError, Rgba, SceneNode, SyncedPair,
    VisError,
};
use kurbo::{Point, Rect};
use tracing::{debug, instrument, warn};

use crate::annotation::{annotate, confidence_color};
use crate::geometry::letterbox;

/// Legend panel origin and size (viewport pixels)
const LEGEND_ORIGIN: (f64, f64) = (8.0, 8.0);
const LEGEND_SIZE: (f64, f64) = (168.0, 28.0);
const CONFIDENCE_BAR_WIDTH: f64 = 120.0;

/// HUD text size and gap below the legend (viewport pixels)
const HUD_FONT_SIZE: f32 = 12.0;
const HUD_GAP: f64 = 6.0;

/// Outcome of rendering one pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Scene presented
    Presented {
        /// Whether any annotation was drawn
        annotated: bool,
    },
    /// Context lost; the same pair must be retried next tick
    Skipped {
        /// Consecutive losses so far
        attempt: u32,
    },
}

/// Renderer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Scenes presented
    pub presented: u64,
    /// Presented scenes carrying an annotation
    pub annotated: u64,
    /// Presentations skipped after a context loss
    pub skipped: u64,
    /// Nodes issued to the client
    pub nodes: u64,
}

/// Renderer settings
#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions {
    /// Consecutive context losses tolerated
    pub retry_budget: u32,
    /// Draw the status/confidence legend
    pub show_legend: bool,
    /// Displacement grid density for homography/affine
    pub vector_grid: u32,
    /// Draw the frame info HUD
    pub show_hud: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for OverlayOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            retry_budget: config.retry_budget,
            show_legend: config.show_legend,
            vector_grid: config.vector_grid,
            show_hud: config.show_hud,
        }
    }
}

/// Overlay renderer
#[derive(Debug)]
pub struct OverlayRenderer {
    options: OverlayOptions,
    consecutive_losses: u32,
    stats: RenderStats,
}

impl OverlayRenderer {
    /// Create a renderer
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            consecutive_losses: 0,
            stats: RenderStats::default(),
        }
    }

    /// Render and present one pair.
    ///
    /// # Errors
    /// [`VisError::RenderContextLost`] once the context was lost more than
    /// `retry_budget` times in a row; [`VisError::RenderFailed`] carrying
    /// the client error on any other failure.
    #[instrument(
        level = "trace",
        name = "overlay_render",
        skip(self, client, pair),
        fields(frame_id = pair.frame_id().get(), status = ?pair.status)
    )]
    pub fn render(
        &mut self,
        client: &mut dyn RenderClient,
        pair: &SyncedPair,
    ) -> Result<RenderOutcome, VisError> {
        match self.draw(client, pair) {
            Ok(annotated) => {
                if self.consecutive_losses > 0 {
                    debug!(
                        losses = self.consecutive_losses,
                        "render context recovered"
                    );
                }
                self.consecutive_losses = 0;
                self.stats.presented += 1;
                if annotated {
                    self.stats.annotated += 1;
                }
                metrics::counter!("tfvis_frames_presented_total", "annotated" => annotated.to_string())
                    .increment(1);
                Ok(RenderOutcome::Presented { annotated })
            }
            Err(RenderError::ContextLost(message)) => {
                self.consecutive_losses += 1;
                metrics::counter!("tfvis_render_context_lost_total").increment(1);

                if self.consecutive_losses > self.options.retry_budget {
                    warn!(
                        client = client.name(),
                        attempts = self.consecutive_losses,
                        "render context lost beyond retry budget"
                    );
                    return Err(VisError::render_context_lost(
                        self.consecutive_losses,
                        message,
                    ));
                }

                warn!(
                    client = client.name(),
                    attempt = self.consecutive_losses,
                    budget = self.options.retry_budget,
                    error = %message,
                    "render context lost, retrying next tick"
                );
                self.stats.skipped += 1;
                Ok(RenderOutcome::Skipped {
                    attempt: self.consecutive_losses,
                })
            }
            Err(other) => {
                warn!(client = client.name(), error = %other, "render client failed");
                Err(VisError::render_failed(other))
            }
        }
    }

    fn draw(&mut self, client: &mut dyn RenderClient, pair: &SyncedPair) -> Result<bool, RenderError> {
        client.clear()?;

        let viewport = client.viewport();
        let to_view = letterbox(pair.frame.width, pair.frame.height, viewport);
        self.add(
            client,
            SceneNode::Image {
                frame: pair.frame.clone(),
                transform: to_view,
            },
        )?;

        let legend = if self.options.show_legend {
            Some(self.add_legend(client)?)
        } else {
            None
        };

        let annotation = pair
            .annotation()
            .map(|result| annotate(result, &pair.frame, self.options.vector_grid, to_view))
            .unwrap_or_default();
        let annotated = !annotation.is_empty();
        for node in annotation {
            self.add(client, node)?;
        }

        if let Some(legend) = legend {
            self.finish_legend(client, legend, pair, annotated)?;
        }

        if self.options.show_hud {
            let y = if self.options.show_legend {
                LEGEND_ORIGIN.1 + LEGEND_SIZE.1 + HUD_GAP
            } else {
                LEGEND_ORIGIN.1
            };
            self.add(
                client,
                SceneNode::Text {
                    lines: hud_lines(pair, annotated),
                    origin: Point::new(LEGEND_ORIGIN.0, y),
                    size: HUD_FONT_SIZE,
                    color: Rgba::WHITE,
                },
            )?;
        }

        client.present()?;
        Ok(annotated)
    }

    fn add(&mut self, client: &mut dyn RenderClient, node: SceneNode) -> Result<NodeId, RenderError> {
        let id = client.add_node(node)?;
        self.stats.nodes += 1;
        Ok(id)
    }

    /// Legend placeholders; filled in once the annotation is known
    fn add_legend(&mut self, client: &mut dyn RenderClient) -> Result<Legend, RenderError> {
        let (x, y) = LEGEND_ORIGIN;
        let (w, h) = LEGEND_SIZE;

        self.add(
            client,
            SceneNode::FillRect {
                rect: Rect::new(x, y, x + w, y + h),
                color: Rgba::BLACK.with_alpha(160),
            },
        )?;
        let swatch = self.add(
            client,
            SceneNode::FillRect {
                rect: swatch_rect(),
                color: Rgba::GREY,
            },
        )?;
        let bar = self.add(
            client,
            SceneNode::FillRect {
                rect: bar_rect(0.0),
                color: Rgba::GREY,
            },
        )?;

        Ok(Legend { swatch, bar })
    }

    fn finish_legend(
        &mut self,
        client: &mut dyn RenderClient,
        legend: Legend,
        pair: &SyncedPair,
        annotated: bool,
    ) -> Result<(), RenderError> {
        let status_color = match pair.status {
            PairStatus::Annotated if annotated => Rgba::GREEN,
            PairStatus::Annotated | PairStatus::TimedOut => Rgba::GREY,
            PairStatus::Invalid => Rgba::RED,
            PairStatus::Evicted => Rgba::AMBER,
        };
        client.update_node(
            legend.swatch,
            SceneNode::FillRect {
                rect: swatch_rect(),
                color: status_color,
            },
        )?;

        let confidence = pair
            .annotation()
            .filter(|_| annotated)
            .map_or(0.0, |r| r.confidence);
        client.update_node(
            legend.bar,
            SceneNode::FillRect {
                rect: bar_rect(confidence as f64),
                color: confidence_color(confidence),
            },
        )
    }

    /// Consecutive context losses so far
    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    /// Renderer counters
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Active options
    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }
}

struct Legend {
    swatch: NodeId,
    bar: NodeId,
}

/// Frame id, timestamp and size; pairing status; descriptor summary
fn hud_lines(pair: &SyncedPair, annotated: bool) -> Vec<String> {
    let frame = &pair.frame;
    let descriptor = match pair.result.as_ref() {
        Some(result) if annotated => format!(
            "{}  confidence {:.2}",
            result.descriptor.kind(),
            result.confidence
        ),
        Some(result) => format!("{}  not drawn", result.descriptor.kind()),
        None => "no flow result".to_string(),
    };

    vec![
        format!(
            "frame {}  t={:.3}s  {}x{}",
            frame.id.get(),
            frame.timestamp,
            frame.width,
            frame.height
        ),
        format!(
            "{}  waited {} ticks",
            pair.status.as_str(),
            pair.meta.wait_ticks()
        ),
        descriptor,
    ]
}

fn swatch_rect() -> Rect {
    let (x, y) = LEGEND_ORIGIN;
    Rect::new(x + 6.0, y + 6.0, x + 22.0, y + 22.0)
}

fn bar_rect(confidence: f64) -> Rect {
    let (x, y) = LEGEND_ORIGIN;
    let x0 = x + 32.0;
    Rect::new(x0, y + 9.0, x0 + CONFIDENCE_BAR_WIDTH * confidence.clamp(0.0, 1.0), y + 19.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingClient;
    use bytes::Bytes;
    use contracts::{
        FlowResult, Frame, FrameId, PixelFormat, SyncMeta, TransformDescriptor, Viewport,
    };

    fn pair(status: PairStatus, result: Option<FlowResult>) -> SyncedPair {
        SyncedPair {
            frame: Frame {
                id: FrameId::new(1),
                timestamp: 0.0,
                width: 40,
                height: 30,
                format: PixelFormat::Gray8,
                data: Bytes::from(vec![0u8; 1200]),
            },
            result,
            status,
            meta: SyncMeta::default(),
        }
    }

    fn annotated_pair() -> SyncedPair {
        pair(
            PairStatus::Annotated,
            Some(FlowResult::new(
                FrameId::new(1),
                TransformDescriptor::Affine([1.0, 0.0, 0.0, 1.0, 3.0, 0.0]),
                0.9,
            )),
        )
    }

    fn client() -> RecordingClient {
        RecordingClient::new(Viewport {
            width: 80,
            height: 60,
        })
    }

    #[test]
    fn test_annotated_scene() {
        let mut client = client();
        let log = client.log();
        let mut renderer = OverlayRenderer::new(OverlayOptions::default());

        let outcome = renderer.render(&mut client, &annotated_pair()).unwrap();
        assert_eq!(outcome, RenderOutcome::Presented { annotated: true });

        let scenes = log.presented();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].frame_id, Some(FrameId::new(1)));
        assert!(scenes[0].is_annotated());
        assert_eq!(scenes[0].nodes[0].kind(), "image");
    }

    #[test]
    fn test_timed_out_scene_is_plain() {
        let mut client = client();
        let log = client.log();
        let mut renderer = OverlayRenderer::new(OverlayOptions {
            show_legend: false,
            show_hud: false,
            ..Default::default()
        });

        let outcome = renderer.render(&mut client, &pair(PairStatus::TimedOut, None)).unwrap();
        assert_eq!(outcome, RenderOutcome::Presented { annotated: false });
        assert_eq!(log.presented()[0].nodes.len(), 1);
    }

    #[test]
    fn test_legend_reflects_status() {
        let mut client = client();
        let log = client.log();
        let mut renderer = OverlayRenderer::new(OverlayOptions::default());

        let invalid = pair(PairStatus::Invalid, Some(FlowResult::invalid(FrameId::new(1))));
        renderer.render(&mut client, &invalid).unwrap();

        let scene = &log.presented()[0];
        let swatch = scene
            .nodes
            .iter()
            .find_map(|n| match n {
                SceneNode::FillRect { rect, color } if *rect == swatch_rect() => Some(*color),
                _ => None,
            })
            .unwrap();
        assert_eq!(swatch, Rgba::RED);
        assert!(!scene.is_annotated());
    }

    #[test]
    fn test_context_loss_retry_budget() {
        let mut client = client();
        let mut renderer = OverlayRenderer::new(OverlayOptions {
            retry_budget: 2,
            ..Default::default()
        });
        let pair = annotated_pair();

        client.lose_context(2);
        assert_eq!(
            renderer.render(&mut client, &pair).unwrap(),
            RenderOutcome::Skipped { attempt: 1 }
        );
        assert_eq!(
            renderer.render(&mut client, &pair).unwrap(),
            RenderOutcome::Skipped { attempt: 2 }
        );
        // Success resets the counter
        assert!(matches!(
            renderer.render(&mut client, &pair).unwrap(),
            RenderOutcome::Presented { .. }
        ));
        assert_eq!(renderer.consecutive_losses(), 0);

        client.lose_context(3);
        renderer.render(&mut client, &pair).unwrap();
        renderer.render(&mut client, &pair).unwrap();
        let err = renderer.render(&mut client, &pair).unwrap_err();
        assert!(matches!(err, VisError::RenderContextLost { attempts: 3, .. }));
        assert_eq!(err.collaborator(), "rendering client");
        assert_eq!(renderer.stats().skipped, 4);
    }

    #[test]
    fn test_hud_describes_the_pair() {
        let mut client = client();
        let log = client.log();
        let mut renderer = OverlayRenderer::new(OverlayOptions::default());

        let mut pair = annotated_pair();
        pair.frame.timestamp = 1.25;
        pair.meta.enqueued_tick = 4;
        pair.meta.emitted_tick = 6;
        renderer.render(&mut client, &pair).unwrap();

        let scene = &log.presented()[0];
        let (lines, origin) = scene
            .nodes
            .iter()
            .find_map(|n| match n {
                SceneNode::Text { lines, origin, .. } => Some((lines.clone(), *origin)),
                _ => None,
            })
            .unwrap();
        assert_eq!(lines[0], "frame 1  t=1.250s  40x30");
        assert_eq!(lines[1], "annotated  waited 2 ticks");
        assert_eq!(lines[2], "affine  confidence 0.90");
        // below the legend panel
        assert!(origin.y > LEGEND_ORIGIN.1 + LEGEND_SIZE.1);
        assert!(scene.is_annotated());
    }

    #[test]
    fn test_hud_without_result() {
        let mut client = client();
        let log = client.log();
        let mut renderer = OverlayRenderer::new(OverlayOptions {
            show_legend: false,
            ..Default::default()
        });

        renderer.render(&mut client, &pair(PairStatus::TimedOut, None)).unwrap();

        let scene = &log.presented()[0];
        assert_eq!(scene.nodes.len(), 2);
        match &scene.nodes[1] {
            SceneNode::Text { lines, origin, .. } => {
                assert_eq!(lines[1], "timed_out  waited 0 ticks");
                assert_eq!(lines[2], "no flow result");
                assert_eq!(origin.y, LEGEND_ORIGIN.1);
            }
            other => panic!("expected text node, got {}", other.kind()),
        }
    }

    /// Client whose backend fails on every present
    struct FailingClient;

    impl RenderClient for FailingClient {
        fn name(&self) -> &str {
            "failing"
        }

        fn viewport(&self) -> Viewport {
            Viewport {
                width: 80,
                height: 60,
            }
        }

        fn clear(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn add_node(&mut self, _node: SceneNode) -> Result<NodeId, RenderError> {
            Ok(NodeId(0))
        }

        fn update_node(&mut self, _id: NodeId, _node: SceneNode) -> Result<(), RenderError> {
            Ok(())
        }

        fn present(&mut self) -> Result<(), RenderError> {
            Err(RenderError::Backend("surface allocation failed".into()))
        }
    }

    #[test]
    fn test_backend_failure_keeps_client_error() {
        let mut renderer = OverlayRenderer::new(OverlayOptions::default());

        let err = renderer.render(&mut FailingClient, &annotated_pair()).unwrap_err();
        assert!(matches!(
            err,
            VisError::RenderFailed {
                source: RenderError::Backend(_)
            }
        ));
        assert_eq!(err.collaborator(), "rendering client");
        assert!(err.to_string().contains("surface allocation failed"));
        // not a context loss: nothing to retry
        assert_eq!(renderer.consecutive_losses(), 0);
        assert_eq!(renderer.stats().skipped, 0);
    }
}
