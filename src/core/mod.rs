pub mod clock;
pub mod control;
pub mod coords;
pub mod hotkey;
pub mod input;
pub mod notify;
pub mod screen_capture;
