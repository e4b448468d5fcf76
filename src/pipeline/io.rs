use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::types::Quad;
use crate::error::Result;
use crate::pipeline::{Mode, Pipeline};

/// One decoded video frame handed to the pipeline by the embedder.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// Capture collaborator: yields frames until the stream ends.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Overlay collaborator: receives the quad per frame (`None` hides the
/// overlay) and a notification whenever the pipeline re-enters detection so
/// playback can pause.
pub trait OverlaySink {
    fn emit_quad(&mut self, quad: Option<&Quad>);

    fn detection_started(&mut self) {}
}

/// Drive the pipeline until the source runs dry or `shutdown` is raised.
///
/// Cancellation is only observed at frame boundaries; a tick in flight
/// always completes.
pub fn run<S, K>(
    pipeline: &mut Pipeline,
    source: &mut S,
    sink: &mut K,
    shutdown: &AtomicBool,
) -> Result<()>
where
    S: FrameSource,
    K: OverlaySink,
{
    while !shutdown.load(Ordering::Relaxed) {
        let Some(frame) = source.next_frame() else {
            break;
        };

        let mode_before = pipeline.mode();
        let quad = pipeline.tick(&frame.rgba, frame.width, frame.height)?;
        if mode_before == Mode::Tracking && pipeline.mode() == Mode::Detecting {
            sink.detection_started();
        }
        sink.emit_quad(quad.as_ref());
    }

    Ok(())
}
