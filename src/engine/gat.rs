use ndarray::{s, Array1, Array2};

use crate::error::{AppError, AppResult};

/// Leaky-ReLU slope used for attention logits
const NEGATIVE_SLOPE: f32 = 0.2;

/// One multi-head graph-attention convolution over a single edge type.
///
/// Bipartite form: source and destination node sets may be different node
/// types with different widths. Messages flow source to destination; the
/// destination projection only feeds the attention logits.
#[derive(Debug, Clone)]
pub struct GatConv {
    lin_src: Array2<f32>,
    lin_dst: Array2<f32>,
    att_src: Array2<f32>,
    att_dst: Array2<f32>,
    bias: Array1<f32>,
    heads: usize,
    out_channels: usize,
}

impl GatConv {
    pub fn new(
        lin_src: Array2<f32>,
        lin_dst: Array2<f32>,
        att_src: Array2<f32>,
        att_dst: Array2<f32>,
        bias: Array1<f32>,
        heads: usize,
    ) -> AppResult<Self> {
        if heads == 0 || lin_src.ncols() % heads != 0 {
            return Err(AppError::Artifact(format!(
                "attention projection width {} not divisible into {} heads",
                lin_src.ncols(),
                heads
            )));
        }
        let out_channels = lin_src.ncols() / heads;
        if lin_dst.ncols() != lin_src.ncols() {
            return Err(AppError::Artifact(format!(
                "source and destination projections disagree: {} vs {}",
                lin_src.ncols(),
                lin_dst.ncols()
            )));
        }
        if att_src.dim() != (heads, out_channels) || att_dst.dim() != (heads, out_channels) {
            return Err(AppError::Artifact(format!(
                "attention vectors must be {}x{}",
                heads, out_channels
            )));
        }
        if bias.len() != heads * out_channels {
            return Err(AppError::Artifact(format!(
                "bias length {} does not match output width {}",
                bias.len(),
                heads * out_channels
            )));
        }
        Ok(Self {
            lin_src,
            lin_dst,
            att_src,
            att_dst,
            bias,
            heads,
            out_channels,
        })
    }

    /// Input width expected for source nodes
    pub fn in_src(&self) -> usize {
        self.lin_src.nrows()
    }

    /// Input width expected for destination nodes
    pub fn in_dst(&self) -> usize {
        self.lin_dst.nrows()
    }

    /// Output width (`heads * out_channels`; heads are concatenated)
    pub fn out_width(&self) -> usize {
        self.heads * self.out_channels
    }

    /// Runs the convolution.
    ///
    /// For each destination node, attention coefficients over its incoming
    /// edges are softmax-normalised per head; destinations with no incoming
    /// edges receive only the bias.
    pub fn forward(
        &self,
        x_src: &Array2<f32>,
        x_dst: &Array2<f32>,
        edges: &[[u32; 2]],
    ) -> AppResult<Array2<f32>> {
        if x_src.ncols() != self.in_src() || x_dst.ncols() != self.in_dst() {
            return Err(AppError::Internal(format!(
                "convolution input width mismatch: got {}/{}, expected {}/{}",
                x_src.ncols(),
                x_dst.ncols(),
                self.in_src(),
                self.in_dst()
            )));
        }

        let heads = self.heads;
        let out = self.out_channels;
        let n_dst = x_dst.nrows();

        let h_src = x_src.dot(&self.lin_src);
        let h_dst = x_dst.dot(&self.lin_dst);

        // Per-node, per-head attention logit contributions
        let mut alpha_src = Array2::<f32>::zeros((h_src.nrows(), heads));
        for i in 0..h_src.nrows() {
            for h in 0..heads {
                alpha_src[[i, h]] = h_src
                    .slice(s![i, h * out..(h + 1) * out])
                    .dot(&self.att_src.row(h));
            }
        }
        let mut alpha_dst = Array2::<f32>::zeros((n_dst, heads));
        for j in 0..n_dst {
            for h in 0..heads {
                alpha_dst[[j, h]] = h_dst
                    .slice(s![j, h * out..(h + 1) * out])
                    .dot(&self.att_dst.row(h));
            }
        }

        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n_dst];
        for &[src, dst] in edges {
            incoming[dst as usize].push(src as usize);
        }

        let mut output = Array2::<f32>::zeros((n_dst, heads * out));
        for (dst, sources) in incoming.iter().enumerate() {
            if sources.is_empty() {
                continue;
            }
            for h in 0..heads {
                let logits: Vec<f32> = sources
                    .iter()
                    .map(|&src| leaky_relu(alpha_src[[src, h]] + alpha_dst[[dst, h]]))
                    .collect();
                let weights = softmax(&logits);
                for (&src, weight) in sources.iter().zip(weights) {
                    for c in 0..out {
                        output[[dst, h * out + c]] += weight * h_src[[src, h * out + c]];
                    }
                }
            }
        }

        output += &self.bias;
        Ok(output)
    }
}

fn leaky_relu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        NEGATIVE_SLOPE * x
    }
}

/// Numerically stable softmax over a small logit slice
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
