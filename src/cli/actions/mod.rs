pub mod run;

use crate::collectors::config::Configuration;

#[derive(Debug)]
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        telemetry_path: String,
        config: Box<Configuration>,
    },
}
