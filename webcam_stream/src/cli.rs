use crate::config::Resolution;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "webcam_stream", about = "YOLOv8 live webcam stream")]
pub struct Cli {
    /// Requested capture width and height
    #[arg(
        long = "webcam-resolution",
        num_args = 2,
        value_names = ["WIDTH", "HEIGHT"],
        default_values_t = [480, 480]
    )]
    pub webcam_resolution: Vec<u32>,
}

impl Cli {
    pub fn resolution(&self) -> Resolution {
        match self.webcam_resolution.as_slice() {
            [width, height] => Resolution {
                width: *width,
                height: *height,
            },
            _ => Resolution::default(),
        }
    }
}
