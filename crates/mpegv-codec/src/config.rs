//! 解码器配置

use serde::{Deserialize, Serialize};

use crate::idct::{InverseTransform, ReferenceIdct, SimpleIdct};

/// 逆 DCT 实现选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdctKind {
    /// 整数实现
    #[default]
    Simple,
    /// 双精度参考实现
    Reference,
}

impl IdctKind {
    pub(crate) fn build(self) -> Box<dyn InverseTransform> {
        match self {
            Self::Simple => Box::new(SimpleIdct),
            Self::Reference => Box::new(ReferenceIdct),
        }
    }
}

/// 输出尺寸策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSize {
    /// horizontal_size x vertical_size
    #[default]
    Display,
    /// 完整宏块网格
    Coded,
}

/// 解码器配置, 所有字段均有默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// 逆 DCT 实现
    pub idct: IdctKind,
    /// 输出尺寸
    pub output_size: OutputSize,
    /// 每个会话最多记录的码流错误条数, 之后只计数
    pub max_faults_logged: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            idct: IdctKind::Simple,
            output_size: OutputSize::Display,
            max_faults_logged: 32,
        }
    }
}
