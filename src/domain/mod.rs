pub mod narration;
pub mod voiceover;
