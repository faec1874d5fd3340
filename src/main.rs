use anyhow::Result;
use std::io::{self, Write};

use yubi_tracker::config::Config;
use yubi_tracker::pipeline::FramePipeline;
use yubi_tracker::recognizer::{GestureEvent, GestureRecognizer};
use yubi_tracker::synth;

/// 合成フレームを count 枚流し、下流に渡った手を認識器へ送る
fn feed_frames(
    pipeline: &mut FramePipeline,
    recognizer: &mut GestureRecognizer,
    fingers: usize,
    count: usize,
) -> Result<Vec<GestureEvent>> {
    let mut events = Vec::new();
    let frame = synth::hand_frame(fingers);
    for _ in 0..count {
        let analysis = pipeline.process(&frame.distances, frame.width, frame.height)?;
        for hand in analysis.forwarded {
            if let Some(event) = recognizer.analyze_frame(hand) {
                events.push(event);
            }
        }
    }
    Ok(events)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Yubi Tracker v{} ===", env!("CARGO_PKG_VERSION"));
    println!("合成深度フレームでパイプラインを動かすテストコンソール");
    println!();
    println!("コマンド:");
    println!("  t n           - 指 n 本のフレームを1枚処理して指本数を表示");
    println!("  r name        - 指5本のフレーム40枚でジェスチャーを記録");
    println!("  g             - 記録済みジェスチャーに対して認識を実行");
    println!("  s path        - ライブラリを保存");
    println!("  l path        - ライブラリを読み込み");
    println!("  q             - 終了");
    println!();

    let config = Config::default();
    let mut pipeline = FramePipeline::new(&config)?;
    let mut recognizer = GestureRecognizer::from_config(&config)?;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "t" if parts.len() == 2 => {
                let fingers: usize = parts[1].parse()?;
                let frame = synth::hand_frame(fingers);
                let analysis = pipeline.process(&frame.distances, frame.width, frame.height)?;
                println!(
                    "輪郭 {} ピクセル, 曲率点 {}, 指 {} 本",
                    analysis.contour.len(),
                    analysis.curves.len(),
                    analysis.hand.finger_count()
                );
            }
            "r" if parts.len() == 2 => {
                recognizer.start_recording();
                feed_frames(&mut pipeline, &mut recognizer, 5, 40)?;
                match recognizer.stop_recording(parts[1]) {
                    Some(GestureEvent::Recorded(gesture)) => {
                        println!("記録しました: {} ({} フレーム)", gesture.name, gesture.frames.len());
                        recognizer.store_gesture(gesture);
                    }
                    _ => println!("フレームが足りません"),
                }
            }
            "g" => {
                recognizer.start_recognizing();
                let events = feed_frames(&mut pipeline, &mut recognizer, 5, 40)?;
                recognizer.stop_recognizing();
                if events.is_empty() {
                    println!("認識されませんでした");
                }
                for event in events {
                    if let GestureEvent::Recognized(gesture) = event {
                        println!("認識: {}", gesture.name);
                    }
                }
            }
            "s" if parts.len() == 2 => {
                if recognizer.save_library(parts[1]) {
                    println!("保存しました: {}", parts[1]);
                } else {
                    println!("保存に失敗しました");
                }
            }
            "l" if parts.len() == 2 => {
                if recognizer.load_library(parts[1]) {
                    println!("読み込みました: {} 件", recognizer.library().len());
                } else {
                    println!("読み込みに失敗しました");
                }
            }
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
            }
        }
    }

    Ok(())
}
