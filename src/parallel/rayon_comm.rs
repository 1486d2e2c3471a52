// rayon-based shared-memory communication: one process, many threads

pub struct RayonComm;

impl RayonComm {
    pub fn new() -> Self {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build_global()
            .ok();
        RayonComm
    }
}

impl Default for RayonComm {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Comm for RayonComm {
    // All threads share one address space, so the process view is a single rank.
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn barrier(&self) { rayon::scope(|_| {}); }
    fn all_reduce(&self, x: f64) -> f64 {
        x
    }
}
