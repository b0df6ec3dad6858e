//! Layer capability set.
//!
//! A map view hosts a stack of layers and drives them through a small fixed
//! set of calls. [`TileLayer`] is the tile-backed implementation: it forwards
//! draws to a [`TileOrchestrator`] and owns the orchestrator's lifetime.

use tracing::{debug, info};

use super::composite::CompositeSink;
use super::orchestrator::{RenderSummary, TileOrchestrator};
use crate::tile::ViewBounds;

/// Calls a map view makes on each of its layers.
pub trait Layer {
    /// Name shown in layer lists and logs.
    fn name(&self) -> &str;

    /// The layer was attached to a view.
    fn added(&mut self);

    /// The layer was detached. No further draws follow.
    fn removed(&mut self);

    fn set_visible(&mut self, visible: bool);

    fn visible(&self) -> bool;

    /// Draw the layer's content for `view` at `scale_index`.
    fn draw(
        &mut self,
        view: &ViewBounds,
        scale_index: u32,
        sink: &mut dyn CompositeSink,
    ) -> RenderSummary;
}

/// Tile-backed layer.
pub struct TileLayer {
    orchestrator: TileOrchestrator,
    visible: bool,
    attached: bool,
}

impl TileLayer {
    /// Wrap an orchestrator. The layer starts visible but detached.
    pub fn new(orchestrator: TileOrchestrator) -> Self {
        Self {
            orchestrator,
            visible: true,
            attached: false,
        }
    }

    pub fn orchestrator(&self) -> &TileOrchestrator {
        &self.orchestrator
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Layer for TileLayer {
    fn name(&self) -> &str {
        &self.orchestrator.config().namespace
    }

    fn added(&mut self) {
        self.attached = true;
        debug!(layer = %self.name(), "Layer added");
    }

    fn removed(&mut self) {
        self.attached = false;
        self.orchestrator.shutdown_blocking();
        info!(layer = %self.name(), "Layer removed");
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn draw(
        &mut self,
        view: &ViewBounds,
        scale_index: u32,
        sink: &mut dyn CompositeSink,
    ) -> RenderSummary {
        if !self.visible || !self.attached {
            return RenderSummary::default();
        }
        self.orchestrator.render_visible_region(view, scale_index, sink)
    }
}

impl Drop for TileLayer {
    fn drop(&mut self) {
        // A layer dropped while still attached never saw `removed`.
        if !self.orchestrator.is_shut_down() {
            self.orchestrator.shutdown_blocking();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheProvider;
    use crate::config::LayerConfig;
    use crate::executor::{WorkerPool, WorkerPoolConfig};
    use crate::layer::NullSink;
    use crate::redraw::RedrawSignal;
    use crate::tile::{FillError, TileIdentity, UniformGrid};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn layer() -> TileLayer {
        let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::default().with_workers(1)).unwrap());
        let orchestrator = TileOrchestrator::new(
            LayerConfig::new("depth"),
            Arc::new(UniformGrid::new(256, vec![256.0])),
            Arc::new(MemoryCacheProvider::new(1_000_000)),
            Arc::new(|_: &TileIdentity, _: &CancellationToken| -> Result<Vec<u8>, FillError> {
                Err(FillError::NoData)
            }),
            pool,
            RedrawSignal::new(),
        )
        .unwrap();
        TileLayer::new(orchestrator)
    }

    #[test]
    fn test_name_is_namespace() {
        let layer = layer();
        assert_eq!(layer.name(), "depth");
    }

    #[test]
    fn test_draw_requires_attached_and_visible() {
        let mut layer = layer();
        let view = ViewBounds::new(0.0, 0.0, 256.0, 256.0);

        assert_eq!(layer.draw(&view, 0, &mut NullSink).tiles, 0);

        layer.added();
        assert_eq!(layer.draw(&view, 0, &mut NullSink).tiles, 1);

        layer.set_visible(false);
        assert!(!layer.visible());
        assert_eq!(layer.draw(&view, 0, &mut NullSink).tiles, 0);
    }

    #[test]
    fn test_removed_joins_queue() {
        let mut layer = layer();
        layer.added();
        layer.removed();

        assert!(!layer.is_attached());
        assert!(layer.orchestrator().is_shut_down());
    }
}
