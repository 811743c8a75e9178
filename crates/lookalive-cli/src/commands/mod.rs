pub mod calibrate;
pub mod config;
pub mod run;
pub mod stats;

use chrono::NaiveDateTime;

/// Local wall-clock time, the clock all core timestamps use.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
