use candle_core::{DType, Module, Tensor, D};
use candle_nn::{Linear, VarBuilder};

use crate::config::BertModelConfig;
use crate::model::layers::{layer_norm, HiddenAct, LayerNorm};

const MASKED_SCORE: f64 = -10_000.0;

struct SelfAttention {
    q: Linear,
    k: Linear,
    v: Linear,
    out: Linear,
    out_norm: LayerNorm,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl SelfAttention {
    fn load(cfg: &BertModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        if cfg.hidden_size % cfg.num_attention_heads != 0 {
            return Err(candle_core::Error::Msg(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                cfg.hidden_size, cfg.num_attention_heads
            )));
        }
        let hd = cfg.hidden_size / cfg.num_attention_heads;
        let attn = vb.pp("self");
        let output = vb.pp("output");
        Ok(Self {
            q: candle_nn::linear(cfg.hidden_size, cfg.hidden_size, attn.pp("query"))?,
            k: candle_nn::linear(cfg.hidden_size, cfg.hidden_size, attn.pp("key"))?,
            v: candle_nn::linear(cfg.hidden_size, cfg.hidden_size, attn.pp("value"))?,
            out: candle_nn::linear(cfg.hidden_size, cfg.hidden_size, output.pp("dense"))?,
            out_norm: layer_norm(cfg.hidden_size, cfg.layer_norm_eps, output.pp("LayerNorm"))?,
            num_heads: cfg.num_attention_heads,
            head_dim: hd,
            scale: (hd as f64).powf(-0.5),
        })
    }

    /// `bias` is the additive `[batch, 1, 1, seq_len]` attention mask.
    fn forward(&self, xs: &Tensor, bias: &Tensor) -> candle_core::Result<Tensor> {
        let (b, t, _) = xs.dims3()?;
        let reshape = |x: Tensor| {
            x.reshape((b, t, self.num_heads, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };

        let q = reshape((self.q.forward(xs)? * self.scale)?)?;
        let k = reshape(self.k.forward(xs)?)?;
        let v = reshape(self.v.forward(xs)?)?;

        let scores = q
            .matmul(&k.transpose(2, 3)?.contiguous()?)?
            .broadcast_add(bias)?;
        let attn = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let ctx = attn.matmul(&v)?.transpose(1, 2)?.contiguous()?.reshape((
            b,
            t,
            self.num_heads * self.head_dim,
        ))?;
        // Post-norm residual: ln(x + dense(ctx)).
        self.out_norm.forward(&(xs + self.out.forward(&ctx)?)?)
    }
}

struct FeedForward {
    up: Linear,
    down: Linear,
    norm: LayerNorm,
    act: HiddenAct,
}

impl FeedForward {
    fn load(cfg: &BertModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            up: candle_nn::linear(
                cfg.hidden_size,
                cfg.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            down: candle_nn::linear(
                cfg.intermediate_size,
                cfg.hidden_size,
                vb.pp("output").pp("dense"),
            )?,
            norm: layer_norm(
                cfg.hidden_size,
                cfg.layer_norm_eps,
                vb.pp("output").pp("LayerNorm"),
            )?,
            act: HiddenAct::parse(&cfg.hidden_act)?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.down.forward(&self.act.forward(&self.up.forward(xs)?)?)?;
        self.norm.forward(&(xs + h)?)
    }
}

struct EncoderLayer {
    attn: SelfAttention,
    ff: FeedForward,
}

impl EncoderLayer {
    fn load(cfg: &BertModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            attn: SelfAttention::load(cfg, vb.pp("attention"))?,
            ff: FeedForward::load(cfg, vb.clone())?,
        })
    }

    fn forward(&self, xs: &Tensor, bias: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.attn.forward(xs, bias)?;
        self.ff.forward(&h)
    }
}

pub(crate) struct Encoder {
    layers: Vec<EncoderLayer>,
}

impl Encoder {
    pub(crate) fn load(cfg: &BertModelConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let mut layers = Vec::with_capacity(cfg.num_hidden_layers);
        for i in 0..cfg.num_hidden_layers {
            layers.push(EncoderLayer::load(cfg, vb.pp(format!("layer.{i}")))?);
        }
        Ok(Self { layers })
    }

    /// `attention_mask` is `[batch, seq_len]` with 1 for real tokens.
    pub(crate) fn forward(
        &self,
        xs: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let bias = attention_bias(attention_mask, xs.dtype())?;
        let mut h = xs.clone();
        for layer in &self.layers {
            h = layer.forward(&h, &bias)?;
        }
        Ok(h)
    }
}

/// 0 where attended, a large negative score where padded; `[batch, 1, 1, seq_len]`.
fn attention_bias(attention_mask: &Tensor, dtype: DType) -> candle_core::Result<Tensor> {
    let (b, t) = attention_mask.dims2()?;
    attention_mask
        .to_dtype(dtype)?
        .affine(-MASKED_SCORE, MASKED_SCORE)?
        .reshape((b, 1, 1, t))
}
