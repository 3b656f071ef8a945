use crate::Sampler;
use anyhow::Result;
use sysinfo::System;

pub struct MemorySampler {
    system: System,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for MemorySampler {
    fn name(&self) -> &str {
        "memory"
    }

    fn sample(&mut self) -> Result<Vec<(String, f64)>> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let available = self.system.available_memory();
        let used_pct = if total > 0 {
            (used as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();

        Ok(vec![
            ("memory.total".to_string(), total as f64),
            ("memory.used".to_string(), used as f64),
            ("memory.available".to_string(), available as f64),
            ("memory.used_percent".to_string(), used_pct),
            ("memory.swap_total".to_string(), swap_total as f64),
            ("memory.swap_used".to_string(), swap_used as f64),
        ])
    }
}
