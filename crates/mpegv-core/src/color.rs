//! 色度格式与 YCbCr 矩阵系数.

/// 色度采样格式 (sequence_extension 中的 chroma_format)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChromaFormat {
    /// 4:2:0, 色度水平与垂直均为亮度的一半
    #[default]
    Yuv420,
    /// 4:2:2, 色度仅水平减半
    Yuv422,
    /// 4:4:4, 色度与亮度同分辨率
    Yuv444,
}

impl ChromaFormat {
    /// 从 2 位 chroma_format 码值构造, 0 为保留值
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Yuv420),
            2 => Some(Self::Yuv422),
            3 => Some(Self::Yuv444),
            _ => None,
        }
    }

    /// 对应的 2 位码值
    pub fn code(self) -> u32 {
        match self {
            Self::Yuv420 => 1,
            Self::Yuv422 => 2,
            Self::Yuv444 => 3,
        }
    }

    /// 每个宏块包含的 8x8 块数量 (4 个亮度块 + 色度块)
    pub fn block_count(self) -> usize {
        match self {
            Self::Yuv420 => 6,
            Self::Yuv422 => 8,
            Self::Yuv444 => 12,
        }
    }

    /// 色度水平方向是否减半
    pub fn is_horizontally_subsampled(self) -> bool {
        self != Self::Yuv444
    }

    /// 色度垂直方向是否减半
    pub fn is_vertically_subsampled(self) -> bool {
        self == Self::Yuv420
    }

    /// 根据亮度尺寸计算色度平面尺寸
    pub fn chroma_size(self, width: usize, height: usize) -> (usize, usize) {
        let w = if self.is_horizontally_subsampled() {
            width >> 1
        } else {
            width
        };
        let h = if self.is_vertically_subsampled() {
            height >> 1
        } else {
            height
        };
        (w, h)
    }
}

/// YCbCr 矩阵系数 (sequence_display_extension 中的 matrix_coefficients)
///
/// 码值 0..=7 各对应一组固定的反变换系数, 超出范围时退回默认值.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixCoefficients {
    /// 0: 禁用值, 按 ITU-R BT.709 系数处理
    Forbidden,
    /// 1: ITU-R BT.709
    Bt709,
    /// 2: 未指定
    Unspecified,
    /// 3: 保留
    Reserved,
    /// 4: FCC
    Fcc,
    /// 5: ITU-R BT.470-2 System B/G (ITU-R 624-4), MPEG-1 与缺省值
    #[default]
    Bt470bg,
    /// 6: SMPTE 170M
    Smpte170m,
    /// 7: SMPTE 240M
    Smpte240m,
}

impl MatrixCoefficients {
    /// 从 8 位码值构造, 超过 7 返回 `None`
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Forbidden,
            1 => Self::Bt709,
            2 => Self::Unspecified,
            3 => Self::Reserved,
            4 => Self::Fcc,
            5 => Self::Bt470bg,
            6 => Self::Smpte170m,
            7 => Self::Smpte240m,
            _ => return None,
        })
    }

    /// 码值, 也是反变换系数表的行号
    pub fn code(self) -> usize {
        self as usize
    }
}
