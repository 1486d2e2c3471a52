//! Options for the multigrid solver.
//!
//! This module provides `MgSolverParameters`, the raw option set as it is read
//! from a parameter file or set key by key (`smoother.degree = 3`), and
//! `MgSettings`, the validated form in which every string tag has been turned
//! into an enum. Resolution happens once, before any level operator is
//! touched, so an unsupported smoother or coarse-solver name aborts the solve
//! without partial work.

use crate::error::MgError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Smoother options, shared by every level above the coarsest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherParameters {
    /// Smoother family; only "chebyshev" is supported.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ratio max/min of the eigenvalue window damped by the smoother.
    pub smoothing_range: f64,
    /// Polynomial degree (number of operator applications per sweep).
    pub degree: usize,
    /// CG iterations used to estimate the extremal eigenvalues.
    pub eig_cg_n_iterations: usize,
}

impl Default for SmootherParameters {
    fn default() -> Self {
        Self {
            kind: "chebyshev".to_string(),
            smoothing_range: 20.0,
            degree: 5,
            eig_cg_n_iterations: 20,
        }
    }
}

/// Coarse-grid solver options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseSolverParameters {
    /// Strategy tag, see [`CoarseSolverKind`].
    #[serde(rename = "type")]
    pub kind: String,
    pub maxiter: usize,
    pub abstol: f64,
    pub reltol: f64,
    /// AMG: pre- and post-smoothing sweeps per level.
    pub smoother_sweeps: usize,
    /// AMG: V-cycles per preconditioner application.
    pub n_cycles: usize,
    /// AMG: relaxation used inside the AMG hierarchy.
    pub smoother_type: String,
}

impl Default for CoarseSolverParameters {
    fn default() -> Self {
        Self {
            kind: "cg".to_string(),
            maxiter: 10000,
            abstol: 1e-20,
            reltol: 1e-4,
            smoother_sweeps: 1,
            n_cycles: 1,
            smoother_type: "symmetric-gauss-seidel".to_string(),
        }
    }
}

/// Complete multigrid option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MgSolverParameters {
    pub smoother: SmootherParameters,
    pub coarse_solver: CoarseSolverParameters,
    /// Estimate eigenvalues on all levels once per solve and report them.
    pub estimate_eigenvalues: bool,
    /// Reuse eigenvalue estimates across solves on an unchanged hierarchy.
    pub cache_eigenvalues: bool,
    /// Collect per-level stage timings.
    pub log_levels: bool,
}

impl Default for MgSolverParameters {
    fn default() -> Self {
        Self {
            smoother: SmootherParameters::default(),
            coarse_solver: CoarseSolverParameters::default(),
            estimate_eigenvalues: true,
            cache_eigenvalues: false,
            log_levels: false,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, MgError> {
    value
        .trim()
        .parse()
        .map_err(|_| MgError::invalid_option(key, value, "could not parse value"))
}

impl MgSolverParameters {
    /// Set a single option by its dotted key, e.g. `coarse_solver.reltol`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), MgError> {
        match key {
            "smoother.type" => self.smoother.kind = value.trim().to_string(),
            "smoother.smoothing_range" => self.smoother.smoothing_range = parse_value(key, value)?,
            "smoother.degree" => self.smoother.degree = parse_value(key, value)?,
            "smoother.eig_cg_n_iterations" => {
                self.smoother.eig_cg_n_iterations = parse_value(key, value)?
            }
            "estimate_eigenvalues" => self.estimate_eigenvalues = parse_value(key, value)?,
            "cache_eigenvalues" => self.cache_eigenvalues = parse_value(key, value)?,
            "coarse_solver.type" => self.coarse_solver.kind = value.trim().to_string(),
            "coarse_solver.maxiter" => self.coarse_solver.maxiter = parse_value(key, value)?,
            "coarse_solver.abstol" => self.coarse_solver.abstol = parse_value(key, value)?,
            "coarse_solver.reltol" => self.coarse_solver.reltol = parse_value(key, value)?,
            "coarse_solver.smoother_sweeps" => {
                self.coarse_solver.smoother_sweeps = parse_value(key, value)?
            }
            "coarse_solver.n_cycles" => self.coarse_solver.n_cycles = parse_value(key, value)?,
            "coarse_solver.smoother_type" => {
                self.coarse_solver.smoother_type = value.trim().to_string()
            }
            "log_levels" => self.log_levels = parse_value(key, value)?,
            _ => return Err(MgError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Build parameters from `(key, value)` pairs on top of the defaults.
    pub fn from_options<'a, I>(options: I) -> Result<Self, MgError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (key, value) in options {
            params.set(key, value)?;
        }
        Ok(params)
    }

    /// Validate all options and resolve the string tags into enums.
    pub fn resolve(&self) -> Result<MgSettings, MgError> {
        let smoother_kind: SmootherKind = self.smoother.kind.parse()?;
        let coarse_kind: CoarseSolverKind = self.coarse_solver.kind.parse()?;

        if self.smoother.degree == 0 {
            return Err(MgError::invalid_option("smoother.degree", 0, "must be at least 1"));
        }
        if !(self.smoother.smoothing_range > 1.0) {
            return Err(MgError::invalid_option(
                "smoother.smoothing_range",
                self.smoother.smoothing_range,
                "must be greater than 1",
            ));
        }
        if self.coarse_solver.maxiter == 0 {
            return Err(MgError::invalid_option("coarse_solver.maxiter", 0, "must be at least 1"));
        }
        for (key, tol) in [
            ("coarse_solver.abstol", self.coarse_solver.abstol),
            ("coarse_solver.reltol", self.coarse_solver.reltol),
        ] {
            if !(tol >= 0.0) {
                return Err(MgError::invalid_option(key, tol, "must be non-negative"));
            }
        }
        // Without a precomputed bound every Chebyshev instance estimates on first use.
        let needs_inline_estimate =
            !self.estimate_eigenvalues || coarse_kind == CoarseSolverKind::Chebyshev;
        if needs_inline_estimate && self.smoother.eig_cg_n_iterations == 0 {
            return Err(MgError::invalid_option(
                "smoother.eig_cg_n_iterations",
                0,
                "must be positive when eigenvalues are not estimated up front",
            ));
        }

        let amg = if coarse_kind == CoarseSolverKind::Amg {
            if !cfg!(feature = "amg") {
                return Err(MgError::AmgUnavailable);
            }
            if self.coarse_solver.n_cycles == 0 {
                return Err(MgError::invalid_option("coarse_solver.n_cycles", 0, "must be at least 1"));
            }
            Some(AmgSettings {
                smoother_sweeps: self.coarse_solver.smoother_sweeps,
                n_cycles: self.coarse_solver.n_cycles,
                smoother: self.coarse_solver.smoother_type.parse()?,
            })
        } else {
            None
        };

        Ok(MgSettings {
            smoother: SmootherSettings {
                kind: smoother_kind,
                smoothing_range: self.smoother.smoothing_range,
                degree: self.smoother.degree,
                eig_cg_n_iterations: self.smoother.eig_cg_n_iterations,
            },
            coarse: CoarseSettings {
                kind: coarse_kind,
                maxiter: self.coarse_solver.maxiter,
                abstol: self.coarse_solver.abstol,
                reltol: self.coarse_solver.reltol,
                amg,
            },
            estimate_eigenvalues: self.estimate_eigenvalues,
            cache_eigenvalues: self.cache_eigenvalues,
            log_levels: self.log_levels,
        })
    }
}

/// Smoother family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmootherKind {
    Chebyshev,
}

impl FromStr for SmootherKind {
    type Err = MgError;
    fn from_str(s: &str) -> Result<Self, MgError> {
        match s.trim() {
            "chebyshev" => Ok(SmootherKind::Chebyshev),
            other => Err(MgError::UnsupportedSmoother(other.to_string())),
        }
    }
}

/// Coarse-grid solution strategy. All variants run CG on the coarsest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarseSolverKind {
    /// Unpreconditioned CG.
    Plain,
    /// CG preconditioned by a diagonally scaled Chebyshev iteration.
    Chebyshev,
    /// CG preconditioned by algebraic multigrid on the assembled matrix.
    Amg,
}

impl FromStr for CoarseSolverKind {
    type Err = MgError;
    fn from_str(s: &str) -> Result<Self, MgError> {
        match s.trim() {
            "cg" | "plain" => Ok(CoarseSolverKind::Plain),
            "cg_with_chebyshev" | "preconditioned-by-smoother" => Ok(CoarseSolverKind::Chebyshev),
            "cg_with_amg" | "preconditioned-by-algebraic-multigrid" => Ok(CoarseSolverKind::Amg),
            other => Err(MgError::UnsupportedCoarseSolver(other.to_string())),
        }
    }
}

/// Relaxation inside the AMG coarse preconditioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmgSmootherKind {
    Jacobi,
    SymmetricGaussSeidel,
}

impl FromStr for AmgSmootherKind {
    type Err = MgError;
    fn from_str(s: &str) -> Result<Self, MgError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jacobi" => Ok(AmgSmootherKind::Jacobi),
            "symmetric-gauss-seidel" | "symmetric gauss-seidel" | "ssor" => {
                Ok(AmgSmootherKind::SymmetricGaussSeidel)
            }
            _ => Err(MgError::UnsupportedAmgSmoother(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmootherSettings {
    pub kind: SmootherKind,
    pub smoothing_range: f64,
    pub degree: usize,
    pub eig_cg_n_iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmgSettings {
    pub smoother_sweeps: usize,
    pub n_cycles: usize,
    pub smoother: AmgSmootherKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseSettings {
    pub kind: CoarseSolverKind,
    pub maxiter: usize,
    pub abstol: f64,
    pub reltol: f64,
    /// Present exactly when `kind` is [`CoarseSolverKind::Amg`].
    pub amg: Option<AmgSettings>,
}

/// Validated configuration, produced by [`MgSolverParameters::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MgSettings {
    pub smoother: SmootherSettings,
    pub coarse: CoarseSettings,
    pub estimate_eigenvalues: bool,
    pub cache_eigenvalues: bool,
    pub log_levels: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let settings = MgSolverParameters::default().resolve().unwrap();
        assert_eq!(settings.smoother.kind, SmootherKind::Chebyshev);
        assert_eq!(settings.coarse.kind, CoarseSolverKind::Plain);
        assert!(settings.coarse.amg.is_none());
        assert!(settings.estimate_eigenvalues);
    }

    #[test]
    fn dotted_keys_set_nested_fields() {
        let params = MgSolverParameters::from_options([
            ("smoother.degree", "3"),
            ("smoother.smoothing_range", "10"),
            ("coarse_solver.type", "preconditioned-by-smoother"),
            ("log_levels", "true"),
        ])
        .unwrap();
        assert_eq!(params.smoother.degree, 3);
        assert_eq!(params.smoother.smoothing_range, 10.0);
        assert!(params.log_levels);
        let settings = params.resolve().unwrap();
        assert_eq!(settings.coarse.kind, CoarseSolverKind::Chebyshev);
    }

    #[test]
    fn unknown_key_and_bad_value_are_rejected() {
        let mut params = MgSolverParameters::default();
        assert!(matches!(params.set("smoother.omega", "1"), Err(MgError::UnknownOption(_))));
        assert!(matches!(
            params.set("smoother.degree", "three"),
            Err(MgError::InvalidOption { .. })
        ));
    }

    #[test]
    fn unsupported_tags_fail_resolution() {
        let mut params = MgSolverParameters::default();
        params.smoother.kind = "jacobi".into();
        assert!(matches!(params.resolve(), Err(MgError::UnsupportedSmoother(s)) if s == "jacobi"));

        let mut params = MgSolverParameters::default();
        params.coarse_solver.kind = "direct".into();
        assert!(matches!(params.resolve(), Err(MgError::UnsupportedCoarseSolver(_))));
    }

    #[test]
    fn degenerate_numbers_fail_resolution() {
        let mut params = MgSolverParameters::default();
        params.smoother.smoothing_range = 1.0;
        assert!(matches!(params.resolve(), Err(MgError::InvalidOption { .. })));

        let mut params = MgSolverParameters::default();
        params.estimate_eigenvalues = false;
        params.smoother.eig_cg_n_iterations = 0;
        assert!(matches!(params.resolve(), Err(MgError::InvalidOption { .. })));
    }

    #[cfg(feature = "amg")]
    #[test]
    fn amg_settings_are_resolved() {
        let mut params = MgSolverParameters::default();
        params.coarse_solver.kind = "cg_with_amg".into();
        params.coarse_solver.smoother_type = "Jacobi".into();
        params.coarse_solver.n_cycles = 2;
        let amg = params.resolve().unwrap().coarse.amg.unwrap();
        assert_eq!(amg.smoother, AmgSmootherKind::Jacobi);
        assert_eq!(amg.n_cycles, 2);
    }

    #[cfg(not(feature = "amg"))]
    #[test]
    fn amg_without_feature_is_a_configuration_error() {
        let mut params = MgSolverParameters::default();
        params.coarse_solver.kind = "cg_with_amg".into();
        assert!(matches!(params.resolve(), Err(MgError::AmgUnavailable)));
    }
}
