pub mod playlist_utils;
pub mod relay_utils;
pub mod subtitle_utils;
pub mod url_utils;
