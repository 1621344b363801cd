use std::time::Duration;

pub trait Display: Send {
    fn update(&mut self) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    BootScreen,
    TimeAndDate,
    WeatherReport,
    IndoorSensors,
}

impl Frame {
    pub const ALL: [Frame; 4] = [
        Self::BootScreen,
        Self::TimeAndDate,
        Self::WeatherReport,
        Self::IndoorSensors,
    ];

    pub(crate) fn bit(self) -> u8 {
        match self {
            Self::BootScreen => 1 << 0,
            Self::TimeAndDate => 1 << 1,
            Self::WeatherReport => 1 << 2,
            Self::IndoorSensors => 1 << 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BootScreen => "boot",
            Self::TimeAndDate => "time-and-date",
            Self::WeatherReport => "weather-report",
            Self::IndoorSensors => "indoor-sensors",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameRotation {
    dwell_ms: u64,
    current: Frame,
    shown_since_ms: u64,
}

impl FrameRotation {
    pub fn new(dwell_ms: u64) -> Self {
        Self {
            dwell_ms,
            current: Frame::BootScreen,
            shown_since_ms: 0,
        }
    }

    pub fn current(&self) -> Frame {
        self.current
    }

    /// Picks the frame to show at `now_ms`. Returns it and the time left
    /// before it changes.
    pub fn advance(&mut self, enabled: &[Frame], now_ms: u64) -> (Frame, Duration) {
        let content: Vec<Frame> = enabled
            .iter()
            .copied()
            .filter(|frame| *frame != Frame::BootScreen)
            .collect();

        if content.is_empty() {
            self.current = Frame::BootScreen;
            self.shown_since_ms = now_ms;
            return (self.current, Duration::from_millis(self.dwell_ms));
        }

        let elapsed = now_ms.saturating_sub(self.shown_since_ms);
        if !content.contains(&self.current) || elapsed >= self.dwell_ms {
            let next = content
                .iter()
                .position(|frame| *frame == self.current)
                .map_or(0, |index| (index + 1) % content.len());
            self.current = content[next];
            self.shown_since_ms = now_ms;
        }

        let remaining = self
            .dwell_ms
            .saturating_sub(now_ms.saturating_sub(self.shown_since_ms));
        (self.current, Duration::from_millis(remaining))
    }
}
