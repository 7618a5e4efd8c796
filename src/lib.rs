pub mod app;
pub mod emucore;
pub mod util;
