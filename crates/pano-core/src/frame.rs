use instant::Instant;

/// Metadata for one rendered frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame.
    pub dt_s: f64,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self { index, dt_s }
    }
}

/// Render loop state with an explicit stop flag.
///
/// Drivers (requestAnimationFrame on the web, a plain loop natively) ask
/// `is_running` before scheduling the next frame.
#[derive(Debug, Default)]
pub struct FrameLoop {
    running: bool,
    next_index: u64,
    last: Option<Instant>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if !self.running {
            log::debug!("[frame] loop started at #{}", self.next_index);
        }
        self.running = true;
        self.last = None;
    }

    pub fn stop(&mut self) {
        if self.running {
            log::debug!("[frame] loop stopped at #{}", self.next_index);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Index the next frame will get.
    pub fn current_index(&self) -> u64 {
        self.next_index
    }

    /// Begin a frame timed against the wall clock; `None` once stopped.
    pub fn tick(&mut self) -> Option<Frame> {
        if !self.running {
            return None;
        }
        let now = Instant::now();
        let dt = self
            .last
            .map(|prev| now.duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last = Some(now);
        Some(self.advance(dt))
    }

    /// Begin a frame with a caller-supplied delta.
    pub fn advance(&mut self, dt_s: f64) -> Frame {
        let f = Frame::new(self.next_index, dt_s);
        self.next_index += 1;
        f
    }
}
