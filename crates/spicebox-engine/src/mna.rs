//! Modified Nodal Analysis (MNA) matrix structures.
//!
//! One generic system serves both real (DC, transient) and complex (AC)
//! analyses. Unknowns are the non-ground node voltages followed by one branch
//! current per voltage source and inductor.

use nalgebra::{ComplexField, DMatrix, DVector};

use crate::error::{Error, Result};

/// MNA system `A x = b`.
#[derive(Debug, Clone)]
pub struct MnaSystem<T: ComplexField<RealField = f64>> {
    pub matrix: DMatrix<T>,
    pub rhs: DVector<T>,
    num_nodes: usize,
}

impl<T: ComplexField<RealField = f64>> MnaSystem<T> {
    pub fn new(num_nodes: usize, num_branches: usize) -> Self {
        let size = num_nodes + num_branches;
        let zero = T::from_real(0.0);
        Self {
            matrix: DMatrix::from_element(size, size, zero.clone()),
            rhs: DVector::from_element(size, zero),
            num_nodes,
        }
    }

    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Stamp an admittance between two nodes (`None` is ground).
    pub fn stamp_admittance(&mut self, node_i: Option<usize>, node_j: Option<usize>, y: T) {
        if let Some(i) = node_i {
            self.matrix[(i, i)] += y.clone();
        }
        if let Some(j) = node_j {
            self.matrix[(j, j)] += y.clone();
        }
        if let (Some(i), Some(j)) = (node_i, node_j) {
            self.matrix[(i, j)] -= y.clone();
            self.matrix[(j, i)] -= y;
        }
    }

    /// Stamp a real conductance between two nodes.
    pub fn stamp_conductance(&mut self, node_i: Option<usize>, node_j: Option<usize>, g: f64) {
        self.stamp_admittance(node_i, node_j, T::from_real(g));
    }

    /// Stamp a current source whose current flows from `node_i` through the
    /// source to `node_j` (it leaves `node_i` and enters `node_j`).
    pub fn stamp_current_source(&mut self, node_i: Option<usize>, node_j: Option<usize>, current: T) {
        if let Some(i) = node_i {
            self.rhs[i] -= current.clone();
        }
        if let Some(j) = node_j {
            self.rhs[j] += current;
        }
    }

    /// Stamp the KCL coupling of a branch current between two nodes and the
    /// voltage row of the branch: `V(pos) - V(neg) - z * I = value`.
    pub fn stamp_branch(
        &mut self,
        node_pos: Option<usize>,
        node_neg: Option<usize>,
        branch: usize,
        z: T,
        value: T,
    ) {
        let row = self.num_nodes + branch;
        let one = T::from_real(1.0);
        if let Some(i) = node_pos {
            self.matrix[(i, row)] += one.clone();
            self.matrix[(row, i)] += one.clone();
        }
        if let Some(j) = node_neg {
            self.matrix[(j, row)] -= one.clone();
            self.matrix[(row, j)] -= one;
        }
        self.matrix[(row, row)] -= z;
        self.rhs[row] = value;
    }

    /// Add `gmin` from every node to ground.
    pub fn stamp_gmin(&mut self, gmin: f64) {
        if gmin > 0.0 {
            let g = T::from_real(gmin);
            for i in 0..self.num_nodes {
                self.matrix[(i, i)] += g.clone();
            }
        }
    }

    /// Solve by dense LU decomposition.
    pub fn solve(self, analysis: &'static str) -> Result<DVector<T>> {
        if self.size() == 0 {
            return Err(Error::EmptyCircuit);
        }
        let solution = self
            .matrix
            .lu()
            .solve(&self.rhs)
            .ok_or(Error::SingularMatrix(analysis))?;
        if solution.iter().any(|x| !x.is_finite()) {
            return Err(Error::SingularMatrix(analysis));
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_stamp_conductance() {
        let mut sys = MnaSystem::<f64>::new(2, 0);
        sys.stamp_conductance(Some(0), Some(1), 1.0);
        assert_eq!(sys.matrix[(0, 0)], 1.0);
        assert_eq!(sys.matrix[(1, 1)], 1.0);
        assert_eq!(sys.matrix[(0, 1)], -1.0);
        assert_eq!(sys.matrix[(1, 0)], -1.0);
    }

    #[test]
    fn test_stamp_current_source_direction() {
        let mut sys = MnaSystem::<f64>::new(2, 0);
        // Current leaves ground and enters node 0.
        sys.stamp_current_source(None, Some(0), 1.0);
        assert_eq!(sys.rhs[0], 1.0);
        assert_eq!(sys.rhs[1], 0.0);
    }

    #[test]
    fn test_voltage_divider() {
        // V1 = 10 V at node 0, R1 = 1k from 0 to 1, R2 = 1k from 1 to ground.
        let mut sys = MnaSystem::<f64>::new(2, 1);
        sys.stamp_branch(Some(0), None, 0, 0.0, 10.0);
        sys.stamp_conductance(Some(0), Some(1), 1e-3);
        sys.stamp_conductance(Some(1), None, 1e-3);
        let x = sys.solve("op").unwrap();
        assert!((x[0] - 10.0).abs() < 1e-9);
        assert!((x[1] - 5.0).abs() < 1e-9);
        assert!((x[2] + 5e-3).abs() < 1e-12);
    }

    #[test]
    fn test_complex_rc() {
        // 1 V source, R = 1 ohm, C with admittance j1 at omega: v(out) = 1 / (1 + j).
        let mut sys = MnaSystem::<Complex64>::new(2, 1);
        sys.stamp_branch(Some(0), None, 0, Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0));
        sys.stamp_conductance(Some(0), Some(1), 1.0);
        sys.stamp_admittance(Some(1), None, Complex64::new(0.0, 1.0));
        let x = sys.solve("ac").unwrap();
        assert!((x[1].re - 0.5).abs() < 1e-12);
        assert!((x[1].im + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_floating_node_singular_without_gmin() {
        let mut sys = MnaSystem::<f64>::new(2, 0);
        sys.stamp_conductance(Some(0), None, 1.0);
        assert!(matches!(sys.solve("op"), Err(Error::SingularMatrix("op"))));
    }
}
