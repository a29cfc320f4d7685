// Filigrane: tiled text watermarks composited over background images

pub mod config;
pub mod logging;
pub mod watermark;
