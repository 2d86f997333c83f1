use std::env;
use tone_core::platform::SimPlatform;
use tone_core::{Design, DesignConfig, ToneDesign};

fn main() {
    let args: Vec<String> = env::args().collect();
    let tone_hz = args
        .get(1)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(880.0);

    let config = DesignConfig {
        tone_hz,
        ..Default::default()
    };
    let mut platform = SimPlatform::icebreaker();
    let mut design = ToneDesign::build(&config, &mut platform).unwrap();
    let frame = design.step_frame().unwrap();
    println!("Headless first frame: L={} R={}", frame.left, frame.right);
    println!("Save-state: {}", serde_json::to_string_pretty(&design.save_state()).unwrap());
}
