use sysinfo::System;

pub struct MemoryMonitor {
    system: System,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self { system }
    }

    pub fn refresh(&mut self) {
        self.system.refresh_memory();
    }

    /// Returns memory usage as a value between 0.0 and 1.0, or `None` when the
    /// host reports no physical memory.
    pub fn usage(&self) -> Option<f64> {
        let total = self.system.total_memory();
        let used = self.system.used_memory();

        if total == 0 {
            return None;
        }

        Some(used as f64 / total as f64)
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}
