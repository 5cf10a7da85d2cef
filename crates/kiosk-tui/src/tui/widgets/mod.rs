// TUI widget modules for each screen panel.

pub mod fullness;
pub mod keypad;
pub mod name_display;
pub mod namesakes;
pub mod notice;
pub mod participants;
pub mod status_bar;
pub mod teams;
