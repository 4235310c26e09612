use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A dense row-major matrix as persisted in the artifact files.
///
/// Shape is explicit so that a truncated or hand-edited artifact fails
/// loudly at load time instead of producing garbage scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    pub fn from_array(array: &Array2<f32>) -> Self {
        Self {
            rows: array.nrows(),
            cols: array.ncols(),
            data: array.iter().copied().collect(),
        }
    }

    /// Validates the declared shape against the payload and converts to ndarray
    pub fn into_array(self, what: &str) -> AppResult<Array2<f32>> {
        if self.data.len() != self.rows * self.cols {
            return Err(AppError::Artifact(format!(
                "{}: expected {}x{} = {} values, got {}",
                what,
                self.rows,
                self.cols,
                self.rows * self.cols,
                self.data.len()
            )));
        }
        Array2::from_shape_vec((self.rows, self.cols), self.data)
            .map_err(|e| AppError::Artifact(format!("{}: {}", what, e)))
    }
}

/// Converts a persisted vector, checking its expected length
pub fn vector_of_len(data: Vec<f32>, len: usize, what: &str) -> AppResult<Array1<f32>> {
    if data.len() != len {
        return Err(AppError::Artifact(format!(
            "{}: expected {} values, got {}",
            what,
            len,
            data.len()
        )));
    }
    Ok(Array1::from_vec(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_matrix_round_trip() {
        let original = array![[1.0_f32, 2.0], [3.0, 4.0]];
        let matrix = Matrix::from_array(&original);
        let restored = matrix.into_array("test").unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_matrix_shape_mismatch_is_an_error() {
        let matrix = Matrix {
            rows: 2,
            cols: 3,
            data: vec![1.0; 5],
        };
        let err = matrix.into_array("weights").unwrap_err();
        assert!(err.to_string().contains("weights"));
    }

    #[test]
    fn test_vector_length_checked() {
        assert!(vector_of_len(vec![1.0, 2.0], 2, "bias").is_ok());
        assert!(vector_of_len(vec![1.0], 2, "bias").is_err());
    }
}
