use candle_core::{Tensor, D};
use candle_nn::VarBuilder;

pub(crate) struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    /// Loads `weight`/`bias`, falling back to the legacy `gamma`/`beta` names
    /// found in older BERT checkpoints.
    pub(crate) fn load(size: usize, eps: f64, vb: VarBuilder) -> candle_core::Result<Self> {
        let (weight, bias) = if vb.contains_tensor("weight") {
            (vb.get(size, "weight")?, vb.get(size, "bias")?)
        } else {
            (vb.get(size, "gamma")?, vb.get(size, "beta")?)
        };
        Ok(Self { weight, bias, eps })
    }

    pub(crate) fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let hidden = self.weight.dim(0)? as f64;
        let mean = (x.sum_keepdim(D::Minus1)? / hidden)?;
        let centered = x.broadcast_sub(&mean)?;
        let var = (centered.sqr()?.sum_keepdim(D::Minus1)? / hidden)?;
        let normed = centered.broadcast_div(&(var + self.eps)?.sqrt()?)?;
        normed.broadcast_mul(&self.weight)?.broadcast_add(&self.bias)
    }
}

pub(crate) fn layer_norm(size: usize, eps: f64, vb: VarBuilder) -> candle_core::Result<LayerNorm> {
    LayerNorm::load(size, eps, vb)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HiddenAct {
    /// Exact erf-based GELU, the BERT default.
    Gelu,
    /// Tanh approximation (`gelu_new` / `gelu_pytorch_tanh`).
    GeluApprox,
    Relu,
}

impl HiddenAct {
    pub(crate) fn parse(name: &str) -> candle_core::Result<Self> {
        match name {
            "gelu" => Ok(Self::Gelu),
            "gelu_new" | "gelu_pytorch_tanh" | "gelu_fast" => Ok(Self::GeluApprox),
            "relu" => Ok(Self::Relu),
            other => Err(candle_core::Error::Msg(format!(
                "unsupported hidden_act '{other}'"
            ))),
        }
    }

    pub(crate) fn forward(self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Gelu => xs.gelu_erf(),
            Self::GeluApprox => xs.gelu(),
            Self::Relu => xs.relu(),
        }
    }
}
