//! # mpegv-scale
//!
//! 色度上采样与 YCbCr 到 ARGB 的颜色转换.
//!
//! - `upsample`: 1:2 FIR 插值 (水平/垂直, 逐行/隔行)
//! - `convert`: 定点矩阵变换, 按 matrix_coefficients 选择 8 组系数之一

pub mod convert;
pub mod upsample;

pub use convert::{ColorConverter, INVERSE_COEFFICIENTS, OutputParams, YuvFrame, ycbcr_to_argb};
