pub mod reaper;

pub use reaper::{run_reaper_sweep, spawn_reaper_task, ReaperStats};
