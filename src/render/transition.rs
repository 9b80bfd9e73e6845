use crate::assets::visual::VisualAsset;
use crate::effects::transitions::{CompositeOp, TransitionKind, composite_op};
use crate::foundation::error::ReelResult;
use crate::render::surface::Surface;

/// Draws scene assets onto a [`Surface`] with the selected entry transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionRenderer {
    kind: TransitionKind,
}

impl TransitionRenderer {
    pub fn new(kind: TransitionKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// Draw `asset` as the incoming scene at local transition `progress`.
    ///
    /// Clips are sampled at `time_within_asset` (looped to their duration); images ignore it.
    pub fn render(
        &self,
        surface: &mut Surface,
        asset: &mut VisualAsset,
        time_within_asset: f64,
        progress: f64,
    ) -> ReelResult<()> {
        let frame = asset.prepare_frame(time_within_asset)?;
        let op = composite_op(self.kind, progress, surface.canvas().width);
        surface.draw(&frame, op)
    }

    /// Draw `asset` fully presented, as the departing scene under a transition.
    pub fn render_presented(
        &self,
        surface: &mut Surface,
        asset: &mut VisualAsset,
        time_within_asset: f64,
    ) -> ReelResult<()> {
        let frame = asset.prepare_frame(time_within_asset)?;
        surface.draw(&frame, CompositeOp::PRESENTED)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/transition.rs"]
mod tests;
