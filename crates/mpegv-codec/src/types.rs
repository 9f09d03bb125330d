//! 码流语法元素的类型定义.

use bitflags::bitflags;

/// 图像编码类型 (picture_coding_type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureCodingType {
    /// 帧内编码
    I,
    /// 前向预测
    P,
    /// 双向预测
    B,
    /// 仅 DC 系数 (MPEG-1)
    D,
}

impl PictureCodingType {
    /// 从 3 位码值构造, 0 与 5..7 为禁用/保留值
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::I),
            2 => Some(Self::P),
            3 => Some(Self::B),
            4 => Some(Self::D),
            _ => None,
        }
    }

    /// 3 位码值
    pub fn code(self) -> u32 {
        match self {
            Self::I => 1,
            Self::P => 2,
            Self::B => 3,
            Self::D => 4,
        }
    }

    /// 单字符名称
    pub fn as_char(self) -> char {
        match self {
            Self::I => 'I',
            Self::P => 'P',
            Self::B => 'B',
            Self::D => 'D',
        }
    }
}

/// 图像结构 (picture_structure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureStructure {
    /// 顶场
    TopField,
    /// 底场
    BottomField,
    /// 帧图像
    #[default]
    Frame,
}

impl PictureStructure {
    /// 从 2 位码值构造, 0 为保留值
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::TopField),
            2 => Some(Self::BottomField),
            3 => Some(Self::Frame),
            _ => None,
        }
    }

    /// 是否为场图像
    pub fn is_field(self) -> bool {
        self != Self::Frame
    }

    /// 场奇偶 (顶场 0, 底场 1), 帧图像返回 0
    pub fn parity(self) -> usize {
        usize::from(self == Self::BottomField)
    }
}

bitflags! {
    /// 宏块类型标志 (macroblock_type)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MacroblockType: u8 {
        /// 帧内编码
        const INTRA = 1;
        /// 有 coded_block_pattern
        const PATTERN = 1 << 1;
        /// 后向运动补偿
        const MOTION_BACKWARD = 1 << 2;
        /// 前向运动补偿
        const MOTION_FORWARD = 1 << 3;
        /// 携带新的 quantiser_scale_code
        const QUANT = 1 << 4;
    }
}

/// 运动补偿类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionType {
    /// 场预测
    Field,
    /// 帧预测 (仅帧图像)
    #[default]
    Frame,
    /// 16x8 预测 (仅场图像)
    Field16x8,
    /// 双基预测
    DualPrime,
}

impl MotionType {
    /// 解析 2 位 frame_motion_type / field_motion_type, 0 为保留值
    pub fn from_code(code: u32, field_picture: bool) -> Option<Self> {
        match (code, field_picture) {
            (1, _) => Some(Self::Field),
            (2, false) => Some(Self::Frame),
            (2, true) => Some(Self::Field16x8),
            (3, _) => Some(Self::DualPrime),
            _ => None,
        }
    }
}
