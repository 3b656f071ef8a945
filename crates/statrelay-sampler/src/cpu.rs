use crate::Sampler;
use anyhow::Result;
use sysinfo::System;

pub struct CpuSampler {
    system: System,
}

impl CpuSampler {
    pub fn new() -> Self {
        // Usage percentages need a previous refresh to diff against.
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for CpuSampler {
    fn name(&self) -> &str {
        "cpu"
    }

    fn sample(&mut self) -> Result<Vec<(String, f64)>> {
        self.system.refresh_cpu_all();

        let mut readings = vec![(
            "cpu.usage".to_string(),
            self.system.global_cpu_usage() as f64,
        )];
        readings.push(("cpu.count".to_string(), self.system.cpus().len() as f64));
        Ok(readings)
    }
}
