//! Output encoding profiles.

use prost::Message;

/// A single transcoding target.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct VideoProfile {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    #[prost(uint32, tag = "4")]
    pub bitrate_kbps: u32,
    #[prost(uint32, tag = "5")]
    pub fps: u32,
}

/// Built-in presets: name, width, height, bitrate (kbps), fps.
const PRESETS: &[(&str, u32, u32, u32, u32)] = &[
    ("P720p60fps16x9", 1280, 720, 6000, 60),
    ("P720p30fps16x9", 1280, 720, 4000, 30),
    ("P576p30fps16x9", 1024, 576, 1500, 30),
    ("P360p30fps16x9", 640, 360, 1200, 30),
    ("P240p30fps16x9", 426, 240, 600, 30),
    ("P144p30fps16x9", 256, 144, 400, 30),
];

impl VideoProfile {
    pub fn new(name: impl Into<String>, width: u32, height: u32, bitrate_kbps: u32, fps: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            bitrate_kbps,
            fps,
        }
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(n, ..)| *n == name)
            .map(|&(n, w, h, br, fps)| Self::new(n, w, h, br, fps))
    }

    /// Names of all built-in presets.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(n, ..)| *n)
    }

    /// `WIDTHxHEIGHT`, as accepted by ffmpeg's `-s`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn p720p60fps16x9() -> Self {
        Self::new("P720p60fps16x9", 1280, 720, 6000, 60)
    }

    pub fn p240p30fps16x9() -> Self {
        Self::new("P240p30fps16x9", 426, 240, 600, 30)
    }
}
