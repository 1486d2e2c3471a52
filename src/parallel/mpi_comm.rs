//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
//! backend for distributed-memory parallelism. Distributed vectors use it for their global reductions;
//! the multigrid cycle itself is unaware of it. The implementation is only available when the `mpi`
//! feature is enabled.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use mgsolve::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().expect("MPI already initialized");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

#[cfg(feature = "mpi")]
use mpi::traits::*;
#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;

/// MPI communicator wrapper for distributed parallelism.
///
/// Holds the MPI environment (finalized on drop), the world communicator, the rank of the
/// current process, and the total number of processes.
#[cfg(feature = "mpi")]
pub struct MpiComm {
    /// Keeps MPI initialized for as long as the communicator lives.
    _universe: mpi::environment::Universe,
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
}

#[cfg(feature = "mpi")]
impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// Returns `None` if MPI has already been initialized.
    pub fn new() -> Option<Self> {
        let universe = mpi::initialize()?;
        let world    = universe.world();
        let rank     = world.rank() as usize;
        let size     = world.size() as usize;
        Some(MpiComm { _universe: universe, world, rank, size })
    }
}

#[cfg(feature = "mpi")]
impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize { self.rank }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize { self.size }
    /// Synchronizes all processes at a barrier.
    fn barrier(&self) { self.world.barrier(); }

    /// Performs an all-reduce sum operation across all processes.
    fn all_reduce(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }

    /// Inclusive prefix sum over ranks.
    fn scan_sum(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.scan_into(&x, &mut y, &SystemOperation::sum());
        y
    }
}
