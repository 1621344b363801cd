use std::time::{Duration, Instant};

use station_common::{Display, Frame, FrameRotation, SharedState, WallClock};
use tracing::info;

const FRAME_DWELL_MS: u64 = 5_000;

pub struct ConsoleDisplay {
    state: SharedState,
    clock: WallClock,
    rotation: FrameRotation,
    shown: Option<Frame>,
    started: Instant,
}

impl ConsoleDisplay {
    pub fn new(state: SharedState, clock: WallClock) -> Self {
        Self {
            state,
            clock,
            rotation: FrameRotation::new(FRAME_DWELL_MS),
            shown: None,
            started: Instant::now(),
        }
    }

    fn render(&self, frame: Frame) -> String {
        let quality = self.state.link_quality();
        let body = match frame {
            Frame::BootScreen => "starting up".to_string(),
            Frame::TimeAndDate => match (self.clock.formatted_time(), self.clock.formatted_date()) {
                (Ok(time), Ok(date)) => format!("{time}  {date}"),
                _ => "--:--:--".to_string(),
            },
            Frame::WeatherReport => match self.state.conditions() {
                Some(conditions) => {
                    let now = &conditions.observation;
                    let days: Vec<String> = conditions
                        .forecasts
                        .iter()
                        .map(|day| format!("{} {:.0}/{:.0}", day.weekday, day.high, day.low))
                        .collect();
                    format!(
                        "{} {:.1}C {} [{}] | {}",
                        now.city,
                        now.temperature,
                        now.description,
                        now.icon,
                        days.join(", ")
                    )
                }
                None => "no weather report".to_string(),
            },
            Frame::IndoorSensors => {
                let mut parts = Vec::new();
                if let Some(env) = self.state.environment() {
                    parts.push(format!(
                        "{:.1}C {:.0}% {:.1}hPa",
                        env.temperature, env.humidity, env.pressure
                    ));
                }
                if let Some(aq) = self.state.air_quality() {
                    parts.push(format!("eCO2 {}ppm TVOC {}ppb", aq.eco2, aq.tvoc));
                }
                parts.join(" | ")
            }
        };
        format!("[{}] {body} (wifi {quality}%)", frame.as_str())
    }
}

impl Display for ConsoleDisplay {
    fn update(&mut self) -> Duration {
        let now_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let frames = self.state.frames();
        let (frame, remaining) = self.rotation.advance(&frames, now_ms);

        if self.shown != Some(frame) {
            info!(target: "display", "{}", self.render(frame));
            self.shown = Some(frame);
        }
        remaining
    }
}
