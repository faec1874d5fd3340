use anyhow::Result;
use std::time::Instant;
use yubi_tracker::config::Config;
use yubi_tracker::pipeline::FramePipeline;
use yubi_tracker::synth;

fn main() -> Result<()> {
    let mut pipeline = FramePipeline::new(&Config::default())?;
    let frame = synth::hand_frame(5);

    // パイプライン全体を100フレーム計測
    let start = Instant::now();
    let iterations = 100;
    for _ in 0..iterations {
        let _ = pipeline.process(&frame.distances, frame.width, frame.height)?;
    }
    let elapsed = start.elapsed();

    let avg_ms = elapsed.as_millis() as f64 / iterations as f64;
    let fps = 1000.0 / avg_ms;

    println!("Pipeline: {:.2}ms/frame = {:.1} FPS", avg_ms, fps);

    Ok(())
}
