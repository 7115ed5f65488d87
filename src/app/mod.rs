pub mod crawler;
pub mod images;
pub mod preview;
