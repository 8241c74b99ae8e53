pub mod db;
pub mod dialog;
pub mod keybinds;
pub mod logging;
pub mod ui;
