//! `grimoireplot live-test`: grows a sine and a cosine plot one point at a time.

use grimoire_client::{push_plot, ClientError, Figure, PushTarget};
use serde_json::json;
use std::time::Duration;

pub const LIVE_CHAPTER: &str = "Live Test";
pub const SINE_PLOT: &str = "Sine Wave";
pub const COSINE_PLOT: &str = "Cosine Wave";

/// Accumulated points of both waves.
#[derive(Debug, Default)]
pub struct LiveSeries {
    steps: Vec<u64>,
    sine: Vec<f64>,
    cosine: Vec<f64>,
}

impl LiveSeries {
    /// Appends the point for the next step and returns its `(sin, cos)` values.
    pub fn advance(&mut self) -> (f64, f64) {
        let step = self.steps.len() as u64;
        let x = step as f64;
        let sine = (x * 0.1).sin() + x * 0.01;
        let cosine = (x * 0.1).cos() + x * 0.01;
        self.steps.push(step);
        self.sine.push(sine);
        self.cosine.push(cosine);
        (sine, cosine)
    }

    pub fn points(&self) -> usize {
        self.steps.len()
    }

    pub fn sine_figure(&self) -> Figure {
        wave_figure(SINE_PLOT, "blue", &self.steps, &self.sine)
    }

    pub fn cosine_figure(&self) -> Figure {
        wave_figure(COSINE_PLOT, "red", &self.steps, &self.cosine)
    }
}

fn wave_figure(name: &str, color: &str, steps: &[u64], values: &[f64]) -> Figure {
    Figure::new()
        .trace(json!({
            "type": "scatter",
            "x": steps,
            "y": values,
            "mode": "lines+markers",
            "name": name,
            "line": {"color": color},
            "marker": {"size": 6}
        }))
        .title(format!("{name} (Point {})", steps.len()))
        .layout_entry("xaxis", json!({ "title": { "text": "Step" } }))
        .layout_entry("yaxis", json!({ "title": { "text": "Value" } }))
}

/// Pushes one point per `interval` until `max_points` (0 = unlimited) or Ctrl-C.
///
/// Returns the number of points generated.
pub async fn run_live_test(
    target: &PushTarget,
    grimoire: &str,
    interval: Duration,
    max_points: u64,
) -> u64 {
    let mut series = LiveSeries::default();
    let mut interrupted = tokio::spawn(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    while max_points == 0 || (series.points() as u64) < max_points {
        let (sine, cosine) = series.advance();
        let point = series.points();
        match push_point(target, grimoire, &series).await {
            Ok(()) => println!("  Point {point}: sin={sine:.4}, cos={cosine:.4}"),
            Err(err) => println!("  [ERROR] Failed to push point {point}: {err}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut interrupted => {
                println!();
                return series.points() as u64;
            }
        }
    }
    interrupted.abort();
    series.points() as u64
}

async fn push_point(
    target: &PushTarget,
    grimoire: &str,
    series: &LiveSeries,
) -> Result<(), ClientError> {
    let sine = series.sine_figure();
    push_plot(target, grimoire, LIVE_CHAPTER, SINE_PLOT, &sine).await?;
    let cosine = series.cosine_figure();
    push_plot(target, grimoire, LIVE_CHAPTER, COSINE_PLOT, &cosine).await?;
    Ok(())
}
