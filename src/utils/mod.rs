pub mod time;
pub mod token;
pub mod validation;
pub mod video;
