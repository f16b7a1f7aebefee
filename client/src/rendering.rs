use crate::registry::PlayerRegistry;
use log::debug;
use shared::{PlayerId, Tick};

/// Everything a renderer may read at the end of a frame.
pub struct FrameView<'a> {
    pub frame: u64,
    pub estimated_tick: Tick,
    pub latency_ms: Option<f64>,
    pub players: &'a PlayerRegistry,
}

/// Drawing is owned by the host; the frame loop only hands the view over.
pub trait Renderer {
    fn render(&mut self, view: &FrameView<'_>);
}

/// Logs display positions instead of drawing them.
pub struct HeadlessRenderer {
    log_every: u64,
}

impl HeadlessRenderer {
    pub fn new(log_every: u64) -> Self {
        Self {
            log_every: log_every.max(1),
        }
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, view: &FrameView<'_>) {
        if view.frame % self.log_every != 0 {
            return;
        }

        let mut players: Vec<_> = view.players.iter().collect();
        players.sort_by_key(|(id, _)| **id);
        for (id, entry) in players {
            let marker = if view.players.is_local(*id) { "*" } else { " " };
            debug!(
                "[frame {} tick {}]{}player {} x={:.1} h={:.1} hp={:.0}",
                view.frame,
                view.estimated_tick,
                marker,
                id,
                entry.render.x,
                entry.render.height,
                entry.state.health
            );
        }
    }
}

/// Keeps every view it is handed; used by tests to observe frames.
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<(u64, Tick, Vec<(PlayerId, f32)>)>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, view: &FrameView<'_>) {
        let mut positions: Vec<(PlayerId, f32)> = view
            .players
            .iter()
            .map(|(id, entry)| (*id, entry.render.x))
            .collect();
        positions.sort_by_key(|(id, _)| *id);
        self.frames.push((view.frame, view.estimated_tick, positions));
    }
}
