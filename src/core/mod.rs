pub mod media;
pub mod timecode;
