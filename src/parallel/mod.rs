//! Process-level communication used by distributed vectors.
//!
//! Every collective here must be entered by all processes in the same order;
//! the multigrid cycle relies on this by running an identical stage sequence
//! on every rank.

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Sum `x` over all processes.
    fn all_reduce(&self, x: f64) -> f64;
    /// Sum of `x` over ranks `0..=rank` (inclusive prefix sum).
    fn scan_sum(&self, x: f64) -> f64 {
        x
    }
    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        let local = a.iter().zip(b).map(|(&x, &y)| x * y).sum::<f64>();
        self.all_reduce(local)
    }
}

/// Single process, no communication.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn barrier(&self) {}
    fn all_reduce(&self, x: f64) -> f64 { x }
}

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

#[cfg(feature="rayon")]
pub mod rayon_comm;
#[cfg(feature="rayon")]
pub use rayon_comm::RayonComm;

pub enum UniverseComm {
    #[cfg(feature="mpi")]
    Mpi(MpiComm),
    #[cfg(feature="rayon")]
    Rayon(RayonComm),
    Serial(SerialComm),
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.rank(),
            UniverseComm::Serial(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.size(),
            UniverseComm::Serial(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.barrier(),
            UniverseComm::Serial(comm) => comm.barrier(),
        }
    }
    fn all_reduce(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce(x),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.all_reduce(x),
            UniverseComm::Serial(comm) => comm.all_reduce(x),
        }
    }
    fn scan_sum(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.scan_sum(x),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.scan_sum(x),
            UniverseComm::Serial(comm) => comm.scan_sum(x),
        }
    }
}
