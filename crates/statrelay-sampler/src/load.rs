use crate::Sampler;
use anyhow::Result;
use sysinfo::System;

pub struct LoadSampler;

impl LoadSampler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoadSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for LoadSampler {
    fn name(&self) -> &str {
        "load"
    }

    fn sample(&mut self) -> Result<Vec<(String, f64)>> {
        let load_avg = System::load_average();
        let uptime = System::uptime();

        Ok(vec![
            ("system.load_1".to_string(), load_avg.one),
            ("system.load_5".to_string(), load_avg.five),
            ("system.load_15".to_string(), load_avg.fifteen),
            ("system.uptime".to_string(), uptime as f64),
        ])
    }
}
