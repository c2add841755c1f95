pub mod channel_controller;
pub mod extract_controller;
pub mod health_controller;
pub mod playlist_controller;
pub mod segment_controller;
pub mod subtitle_controller;
