use hand_control::video::{CameraSettings, VideoSource};

fn main() {
    tracing_subscriber::fmt::init();

    let settings = CameraSettings::default();
    println!(
        "Testing camera {} at {}x{}...\n",
        settings.index, settings.width, settings.height
    );

    hand_control::video::list_cameras();

    match VideoSource::open(&settings) {
        Ok(mut source) => {
            let (width, height) = source.resolution();
            println!("✓ Camera opened at {}x{}", width, height);

            match source.read_frame() {
                Ok(frame) => println!("✓ Frame captured ({}x{})", frame.width(), frame.height()),
                Err(e) => println!("✗ {}", e),
            }
        }
        Err(e) => {
            println!("✗ {}", e);
            println!("\nPossible causes:");
            println!("1. Camera is being used by another app");
            println!("2. Camera permissions not granted");
            println!("3. No camera connected");
            std::process::exit(1);
        }
    }
}
