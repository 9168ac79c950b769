pub mod dialogue;
pub mod font;
pub mod input;
pub mod motion;
pub mod reveal;
pub mod textbox;
pub mod time;
pub mod wrap;
