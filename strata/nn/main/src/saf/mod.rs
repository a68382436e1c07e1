//! Facade re-exports for strata-nn

pub use crate::api::capability::*;
pub use crate::api::error::*;
pub use crate::api::traits::*;
pub use crate::api::types::*;
pub use crate::core::chain::Chain;
pub use crate::core::conv::{conv_flops, Conv, LayerState};
pub use crate::core::data::ConvData;
pub use crate::core::options::{
    apply, redefine, with_activation, with_dilation, with_dropout, with_flops, with_kernel_shape,
    with_name, with_pad, with_size, with_stride, without_activation, ConsOpt,
};
