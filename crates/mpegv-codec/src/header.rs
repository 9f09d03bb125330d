//! 序列/GOP/图像头部与扩展头部解析

use std::collections::HashSet;

use log::{debug, trace, warn};
use mpegv_core::{ByteSource, ChromaFormat, MatrixCoefficients, Rational};

use crate::bitstream::BitCursor;
use crate::tables::{DEFAULT_INTRA_MATRIX, DEFAULT_NON_INTRA_WEIGHT, ZIGZAG_SCAN, frame_rate};
use crate::types::{PictureCodingType, PictureStructure};

// ============================================================================
// 起始码
// ============================================================================

pub(crate) const PICTURE_START_CODE: u32 = 0x0000_0100;
pub(crate) const SLICE_START_CODE_MIN: u32 = 0x0000_0101;
pub(crate) const SLICE_START_CODE_MAX: u32 = 0x0000_01AF;
pub(crate) const USER_DATA_START_CODE: u32 = 0x0000_01B2;
pub(crate) const SEQUENCE_HEADER_CODE: u32 = 0x0000_01B3;
pub(crate) const EXTENSION_START_CODE: u32 = 0x0000_01B5;
pub(crate) const SEQUENCE_END_CODE: u32 = 0x0000_01B7;
pub(crate) const GROUP_START_CODE: u32 = 0x0000_01B8;

/// extension_start_code_identifier
const SEQUENCE_EXTENSION_ID: u32 = 1;
const SEQUENCE_DISPLAY_EXTENSION_ID: u32 = 2;
const QUANT_MATRIX_EXTENSION_ID: u32 = 3;
const COPYRIGHT_EXTENSION_ID: u32 = 4;
const SEQUENCE_SCALABLE_EXTENSION_ID: u32 = 5;
const PICTURE_DISPLAY_EXTENSION_ID: u32 = 7;
const PICTURE_CODING_EXTENSION_ID: u32 = 8;
const PICTURE_SPATIAL_SCALABLE_EXTENSION_ID: u32 = 9;
const PICTURE_TEMPORAL_SCALABLE_EXTENSION_ID: u32 = 10;

// ============================================================================
// 头部数据
// ============================================================================

/// 可分级模式 (sequence_scalable_extension)
///
/// 仅记录, 解码始终只处理基本层.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalableMode {
    /// 数据分区
    DataPartitioning,
    /// 空间可分级
    Spatial,
    /// SNR 可分级
    Snr,
    /// 时间可分级
    Temporal,
}

/// 色彩描述 (sequence_display_extension)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDescription {
    /// colour_primaries
    pub colour_primaries: u8,
    /// transfer_characteristics
    pub transfer_characteristics: u8,
    /// matrix_coefficients 原始码值
    pub matrix_coefficients: u8,
}

/// 序列级参数
#[derive(Debug, Clone)]
pub struct SequenceHeader {
    /// horizontal_size (含扩展高位)
    pub horizontal_size: u32,
    /// vertical_size (含扩展高位)
    pub vertical_size: u32,
    /// aspect_ratio_information
    pub aspect_ratio_code: u32,
    /// frame_rate_code
    pub frame_rate_code: u32,
    /// bit_rate, 单位 400 bit/s (含扩展高位)
    pub bit_rate_value: u32,
    /// vbv_buffer_size (含扩展高位)
    pub vbv_buffer_size: u32,
    /// MPEG-1 constrained_parameters_flag
    pub constrained_parameters: bool,
    /// 出现过 sequence_extension
    pub is_mpeg2: bool,
    /// profile_and_level_indication
    pub profile_and_level: u32,
    /// progressive_sequence
    pub progressive_sequence: bool,
    /// chroma_format
    pub chroma_format: ChromaFormat,
    /// low_delay
    pub low_delay: bool,
    /// frame_rate_extension_n
    pub frame_rate_extension_n: u32,
    /// frame_rate_extension_d
    pub frame_rate_extension_d: u32,
    /// video_format
    pub video_format: u32,
    /// 色彩描述
    pub color_description: Option<ColorDescription>,
    /// 用于颜色转换的矩阵系数
    pub matrix_coefficients: MatrixCoefficients,
    /// display_horizontal_size
    pub display_horizontal_size: u32,
    /// display_vertical_size
    pub display_vertical_size: u32,
    /// 可分级模式 (不参与解码)
    pub scalable_mode: Option<ScalableMode>,
    /// 量化矩阵 (光栅顺序)
    pub intra_quantizer_matrix: [u8; 64],
    /// 非 Intra 量化矩阵
    pub non_intra_quantizer_matrix: [u8; 64],
    /// 色度 Intra 量化矩阵
    pub chroma_intra_quantizer_matrix: [u8; 64],
    /// 色度非 Intra 量化矩阵
    pub chroma_non_intra_quantizer_matrix: [u8; 64],
    /// 码流显式加载了 Intra 矩阵
    pub load_intra_quantizer_matrix: bool,
    /// 码流显式加载了非 Intra 矩阵
    pub load_non_intra_quantizer_matrix: bool,
}

impl Default for SequenceHeader {
    fn default() -> Self {
        Self {
            horizontal_size: 0,
            vertical_size: 0,
            aspect_ratio_code: 0,
            frame_rate_code: 0,
            bit_rate_value: 0,
            vbv_buffer_size: 0,
            constrained_parameters: false,
            is_mpeg2: false,
            profile_and_level: 0,
            progressive_sequence: true,
            chroma_format: ChromaFormat::Yuv420,
            low_delay: false,
            frame_rate_extension_n: 0,
            frame_rate_extension_d: 0,
            video_format: 0,
            color_description: None,
            matrix_coefficients: MatrixCoefficients::default(),
            display_horizontal_size: 0,
            display_vertical_size: 0,
            scalable_mode: None,
            intra_quantizer_matrix: DEFAULT_INTRA_MATRIX,
            non_intra_quantizer_matrix: [DEFAULT_NON_INTRA_WEIGHT; 64],
            chroma_intra_quantizer_matrix: DEFAULT_INTRA_MATRIX,
            chroma_non_intra_quantizer_matrix: [DEFAULT_NON_INTRA_WEIGHT; 64],
            load_intra_quantizer_matrix: false,
            load_non_intra_quantizer_matrix: false,
        }
    }
}

impl SequenceHeader {
    /// 帧率 (MPEG-2 乘以扩展因子)
    pub fn frame_rate(&self) -> Rational {
        let base = frame_rate(self.frame_rate_code);
        if self.is_mpeg2 && base.is_valid() {
            base.scale(
                self.frame_rate_extension_n as i32 + 1,
                self.frame_rate_extension_d as i32 + 1,
            )
        } else {
            base
        }
    }

    /// 码率 (bit/s)
    pub fn bit_rate(&self) -> u64 {
        u64::from(self.bit_rate_value) * 400
    }
}

/// GOP 头部
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GopHeader {
    /// drop_frame_flag
    pub drop_frame: bool,
    /// 时
    pub hour: u32,
    /// 分
    pub minute: u32,
    /// 秒
    pub second: u32,
    /// 帧
    pub frame: u32,
    /// closed_gop
    pub closed_gop: bool,
    /// broken_link
    pub broken_link: bool,
}

/// 图像级参数 (picture_header + picture_coding_extension)
#[derive(Debug, Clone)]
pub struct PictureHeader {
    /// temporal_reference
    pub temporal_reference: u32,
    /// picture_coding_type
    pub coding_type: PictureCodingType,
    /// vbv_delay
    pub vbv_delay: u32,
    /// MPEG-1 full_pel_forward_vector
    pub full_pel_forward: bool,
    /// MPEG-1 full_pel_backward_vector
    pub full_pel_backward: bool,
    /// f_code[方向][分量], MPEG-1 时由 forward/backward_f_code 填入
    pub f_code: [[u32; 2]; 2],
    /// intra_dc_precision (0..=3 对应 8..=11 位)
    pub intra_dc_precision: u32,
    /// picture_structure
    pub picture_structure: PictureStructure,
    /// top_field_first
    pub top_field_first: bool,
    /// frame_pred_frame_dct
    pub frame_pred_frame_dct: bool,
    /// concealment_motion_vectors
    pub concealment_motion_vectors: bool,
    /// q_scale_type
    pub q_scale_type: bool,
    /// intra_vlc_format
    pub intra_vlc_format: bool,
    /// alternate_scan
    pub alternate_scan: bool,
    /// repeat_first_field
    pub repeat_first_field: bool,
    /// chroma_420_type
    pub chroma_420_type: bool,
    /// progressive_frame
    pub progressive_frame: bool,
    /// frame_centre 偏移 (picture_display_extension), 单位 1/16 像素
    pub frame_centre_offsets: Vec<(i32, i32)>,
}

impl Default for PictureHeader {
    fn default() -> Self {
        Self {
            temporal_reference: 0,
            coding_type: PictureCodingType::I,
            vbv_delay: 0,
            full_pel_forward: false,
            full_pel_backward: false,
            f_code: [[15; 2]; 2],
            intra_dc_precision: 0,
            picture_structure: PictureStructure::Frame,
            top_field_first: false,
            frame_pred_frame_dct: true,
            concealment_motion_vectors: false,
            q_scale_type: false,
            intra_vlc_format: false,
            alternate_scan: false,
            repeat_first_field: false,
            chroma_420_type: false,
            progressive_frame: true,
            frame_centre_offsets: Vec::new(),
        }
    }
}

/// `get_header` 的返回结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderEvent {
    /// 图像头已解析, 可以解码图像数据
    PictureReady,
    /// 遇到 sequence_end_code
    SequenceEnd,
}

// ============================================================================
// 头部解析器
// ============================================================================

/// 头部解析状态
#[derive(Debug, Default)]
pub(crate) struct HeaderParser {
    pub sequence: SequenceHeader,
    pub gop: Option<GopHeader>,
    pub picture: PictureHeader,
    /// 至少解析过一个序列头
    pub have_sequence: bool,
    /// 已记录过的不支持特性, 每种只告警一次
    notices: HashSet<&'static str>,
}

impl HeaderParser {
    /// 反复查找起始码并分派, 直到得到图像头或序列结束码
    pub fn get_header<S: ByteSource>(&mut self, c: &mut BitCursor<S>) -> HeaderEvent {
        loop {
            c.next_start_code();
            let code = c.get_bits(32);
            match code {
                SEQUENCE_HEADER_CODE => self.sequence_header(c),
                GROUP_START_CODE => self.group_of_pictures_header(c),
                PICTURE_START_CODE => {
                    if self.picture_header(c) {
                        return HeaderEvent::PictureReady;
                    }
                }
                SEQUENCE_END_CODE => return HeaderEvent::SequenceEnd,
                SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX => {
                    trace!("跳过图像外的 slice 起始码 {:#010x}", code);
                }
                _ => debug!("跳过意外的起始码 {:#010x}", code),
            }
        }
    }

    /// 对不支持的特性只告警一次
    pub fn notice_unsupported(&mut self, feature: &'static str) {
        if self.notices.insert(feature) {
            warn!("不支持的特性, 已忽略: {}", feature);
        }
    }

    fn sequence_header<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let seq = &mut self.sequence;
        seq.horizontal_size = c.get_bits(12);
        seq.vertical_size = c.get_bits(12);
        seq.aspect_ratio_code = c.get_bits(4);
        seq.frame_rate_code = c.get_bits(4);
        seq.bit_rate_value = c.get_bits(18);
        c.marker_bit("sequence_header");
        seq.vbv_buffer_size = c.get_bits(10);
        seq.constrained_parameters = c.get_bit();

        seq.load_intra_quantizer_matrix = c.get_bit();
        if seq.load_intra_quantizer_matrix {
            read_matrix(c, &mut seq.intra_quantizer_matrix);
        } else {
            seq.intra_quantizer_matrix = DEFAULT_INTRA_MATRIX;
        }
        seq.load_non_intra_quantizer_matrix = c.get_bit();
        if seq.load_non_intra_quantizer_matrix {
            read_matrix(c, &mut seq.non_intra_quantizer_matrix);
        } else {
            seq.non_intra_quantizer_matrix = [DEFAULT_NON_INTRA_WEIGHT; 64];
        }
        seq.chroma_intra_quantizer_matrix = seq.intra_quantizer_matrix;
        seq.chroma_non_intra_quantizer_matrix = seq.non_intra_quantizer_matrix;

        // 以下字段只能由扩展头改写, 每个序列头先恢复 MPEG-1 取值
        seq.is_mpeg2 = false;
        seq.profile_and_level = 0;
        seq.progressive_sequence = true;
        seq.chroma_format = ChromaFormat::Yuv420;
        seq.low_delay = false;
        seq.frame_rate_extension_n = 0;
        seq.frame_rate_extension_d = 0;
        seq.color_description = None;
        seq.matrix_coefficients = MatrixCoefficients::default();
        seq.display_horizontal_size = 0;
        seq.display_vertical_size = 0;
        seq.scalable_mode = None;

        self.have_sequence = true;
        self.extension_and_user_data(c);

        let seq = &self.sequence;
        debug!(
            "序列头: {}x{}, aspect={}, frame_rate={}, bit_rate={}, mpeg2={}, {:?}, progressive={}",
            seq.horizontal_size,
            seq.vertical_size,
            seq.aspect_ratio_code,
            seq.frame_rate(),
            seq.bit_rate(),
            seq.is_mpeg2,
            seq.chroma_format,
            seq.progressive_sequence,
        );
    }

    fn group_of_pictures_header<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let drop_frame = c.get_bit();
        let hour = c.get_bits(5);
        let minute = c.get_bits(6);
        c.marker_bit("group_of_pictures_header");
        let second = c.get_bits(6);
        let frame = c.get_bits(6);
        let closed_gop = c.get_bit();
        let broken_link = c.get_bit();
        let gop = GopHeader {
            drop_frame,
            hour,
            minute,
            second,
            frame,
            closed_gop,
            broken_link,
        };
        debug!(
            "GOP: {:02}:{:02}:{:02}:{:02}, closed={}, broken={}",
            hour, minute, second, frame, closed_gop, broken_link
        );
        self.gop = Some(gop);
        self.extension_and_user_data(c);
    }

    /// 解析图像头, 编码类型非法时返回 false
    fn picture_header<S: ByteSource>(&mut self, c: &mut BitCursor<S>) -> bool {
        let temporal_reference = c.get_bits(10);
        let type_code = c.get_bits(3);
        let vbv_delay = c.get_bits(16);

        let mut pic = PictureHeader {
            temporal_reference,
            vbv_delay,
            ..PictureHeader::default()
        };
        if type_code == 2 || type_code == 3 {
            pic.full_pel_forward = c.get_bit();
            let f = c.get_bits(3);
            pic.f_code[0] = [f, f];
        }
        if type_code == 3 {
            pic.full_pel_backward = c.get_bit();
            let f = c.get_bits(3);
            pic.f_code[1] = [f, f];
        }
        // extra_bit_picture / extra_information_picture
        while c.get_bit() {
            c.flush_bits(8);
        }

        let Some(coding_type) = PictureCodingType::from_code(type_code) else {
            warn!("非法的 picture_coding_type {}, 跳过该图像", type_code);
            return false;
        };
        pic.coding_type = coding_type;
        self.picture = pic;
        self.extension_and_user_data(c);

        let pic = &self.picture;
        debug!(
            "图像头: type={}, temporal_ref={}, structure={:?}, f_code={:?}, progressive={}",
            pic.coding_type.as_char(),
            pic.temporal_reference,
            pic.picture_structure,
            pic.f_code,
            pic.progressive_frame,
        );
        true
    }

    /// 处理紧随头部的扩展与用户数据
    fn extension_and_user_data<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        c.next_start_code();
        loop {
            match c.show_bits(32) {
                EXTENSION_START_CODE => {
                    c.flush_bits(32);
                    let id = c.get_bits(4);
                    match id {
                        SEQUENCE_EXTENSION_ID => self.sequence_extension(c),
                        SEQUENCE_DISPLAY_EXTENSION_ID => self.sequence_display_extension(c),
                        QUANT_MATRIX_EXTENSION_ID => self.quant_matrix_extension(c),
                        COPYRIGHT_EXTENSION_ID => copyright_extension(c),
                        SEQUENCE_SCALABLE_EXTENSION_ID => self.sequence_scalable_extension(c),
                        PICTURE_DISPLAY_EXTENSION_ID => self.picture_display_extension(c),
                        PICTURE_CODING_EXTENSION_ID => self.picture_coding_extension(c),
                        PICTURE_SPATIAL_SCALABLE_EXTENSION_ID => {
                            self.picture_spatial_scalable_extension(c)
                        }
                        PICTURE_TEMPORAL_SCALABLE_EXTENSION_ID => {
                            self.notice_unsupported("picture_temporal_scalable_extension");
                        }
                        _ => debug!("跳过保留的扩展 ID {}", id),
                    }
                    c.next_start_code();
                }
                USER_DATA_START_CODE => {
                    c.flush_bits(32);
                    let mut len = 0usize;
                    while c.show_bits(24) != 0x00_0001 {
                        c.flush_bits(8);
                        len += 1;
                    }
                    trace!("跳过用户数据 {} 字节", len);
                }
                _ => break,
            }
        }
    }

    fn sequence_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let seq = &mut self.sequence;
        seq.is_mpeg2 = true;
        seq.profile_and_level = c.get_bits(8);
        seq.progressive_sequence = c.get_bit();
        let chroma_code = c.get_bits(2);
        let horizontal_ext = c.get_bits(2);
        let vertical_ext = c.get_bits(2);
        let bit_rate_ext = c.get_bits(12);
        c.marker_bit("sequence_extension");
        let vbv_ext = c.get_bits(8);
        seq.low_delay = c.get_bit();
        seq.frame_rate_extension_n = c.get_bits(2);
        seq.frame_rate_extension_d = c.get_bits(5);

        seq.chroma_format = ChromaFormat::from_code(chroma_code).unwrap_or_else(|| {
            warn!("保留的 chroma_format 0, 按 4:2:0 处理");
            ChromaFormat::Yuv420
        });
        seq.horizontal_size = (horizontal_ext << 12) | (seq.horizontal_size & 0x0FFF);
        seq.vertical_size = (vertical_ext << 12) | (seq.vertical_size & 0x0FFF);
        seq.bit_rate_value |= bit_rate_ext << 18;
        seq.vbv_buffer_size |= vbv_ext << 10;

        // escape 位置 1 且 level 为 5 表示 4:2:2 profile
        let profile = if seq.profile_and_level >> 7 != 0 && seq.profile_and_level & 0x0F == 5 {
            "4:2:2"
        } else {
            match (seq.profile_and_level >> 4) & 7 {
                1 => "High",
                2 => "Spatially Scalable",
                3 => "SNR Scalable",
                4 => "Main",
                5 => "Simple",
                _ => "reserved",
            }
        };
        debug!(
            "序列扩展: profile={}, level={}, {:?}, progressive={}",
            profile,
            seq.profile_and_level & 0x0F,
            seq.chroma_format,
            seq.progressive_sequence
        );
    }

    fn sequence_display_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let seq = &mut self.sequence;
        seq.video_format = c.get_bits(3);
        if c.get_bit() {
            let desc = ColorDescription {
                colour_primaries: c.get_bits(8) as u8,
                transfer_characteristics: c.get_bits(8) as u8,
                matrix_coefficients: c.get_bits(8) as u8,
            };
            seq.matrix_coefficients = MatrixCoefficients::from_code(u32::from(desc.matrix_coefficients))
                .unwrap_or_else(|| {
                    debug!("matrix_coefficients {} 超出范围, 使用默认值", desc.matrix_coefficients);
                    MatrixCoefficients::default()
                });
            seq.color_description = Some(desc);
        }
        seq.display_horizontal_size = c.get_bits(14);
        c.marker_bit("sequence_display_extension");
        seq.display_vertical_size = c.get_bits(14);
        debug!(
            "序列显示扩展: video_format={}, display={}x{}, matrix={:?}",
            seq.video_format, seq.display_horizontal_size, seq.display_vertical_size, seq.matrix_coefficients
        );
    }

    fn quant_matrix_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let seq = &mut self.sequence;
        if c.get_bit() {
            seq.load_intra_quantizer_matrix = true;
            read_matrix(c, &mut seq.intra_quantizer_matrix);
            seq.chroma_intra_quantizer_matrix = seq.intra_quantizer_matrix;
        }
        if c.get_bit() {
            seq.load_non_intra_quantizer_matrix = true;
            read_matrix(c, &mut seq.non_intra_quantizer_matrix);
            seq.chroma_non_intra_quantizer_matrix = seq.non_intra_quantizer_matrix;
        }
        if c.get_bit() {
            read_matrix(c, &mut seq.chroma_intra_quantizer_matrix);
        }
        if c.get_bit() {
            read_matrix(c, &mut seq.chroma_non_intra_quantizer_matrix);
        }
        debug!("量化矩阵扩展已加载");
    }

    fn sequence_scalable_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let mode = match c.get_bits(2) {
            0 => ScalableMode::DataPartitioning,
            1 => ScalableMode::Spatial,
            2 => ScalableMode::Snr,
            _ => ScalableMode::Temporal,
        };
        let layer_id = c.get_bits(4);
        match mode {
            ScalableMode::Spatial => {
                let lower_h = c.get_bits(14);
                c.marker_bit("sequence_scalable_extension");
                let lower_v = c.get_bits(14);
                let factors = [c.get_bits(5), c.get_bits(5), c.get_bits(5), c.get_bits(5)];
                debug!(
                    "空间可分级: 下层 {}x{}, 采样因子 {:?}",
                    lower_h, lower_v, factors
                );
            }
            ScalableMode::Temporal => {
                // picture_mux 相关字段
                if c.get_bit() {
                    c.flush_bits(1);
                }
                c.flush_bits(6);
            }
            ScalableMode::DataPartitioning | ScalableMode::Snr => {}
        }
        debug!("序列可分级扩展: mode={:?}, layer_id={}", mode, layer_id);
        self.sequence.scalable_mode = Some(mode);
        self.notice_unsupported(match mode {
            ScalableMode::Temporal => "时间可分级",
            ScalableMode::Spatial => "空间可分级",
            ScalableMode::Snr => "SNR 可分级",
            ScalableMode::DataPartitioning => "数据分区",
        });
    }

    fn picture_display_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let pic = &mut self.picture;
        let count = if self.sequence.progressive_sequence || pic.picture_structure.is_field() {
            if self.sequence.progressive_sequence && pic.repeat_first_field {
                if pic.top_field_first { 3 } else { 2 }
            } else {
                1
            }
        } else if pic.repeat_first_field {
            3
        } else {
            2
        };
        pic.frame_centre_offsets.clear();
        for _ in 0..count {
            let h = sign_extend(c.get_bits(16), 16);
            c.marker_bit("picture_display_extension");
            let v = sign_extend(c.get_bits(16), 16);
            c.marker_bit("picture_display_extension");
            pic.frame_centre_offsets.push((h, v));
        }
        trace!("图像显示扩展: {:?}", pic.frame_centre_offsets);
    }

    fn picture_coding_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let pic = &mut self.picture;
        pic.f_code = [[c.get_bits(4), c.get_bits(4)], [c.get_bits(4), c.get_bits(4)]];
        pic.intra_dc_precision = c.get_bits(2);
        let structure_code = c.get_bits(2);
        pic.picture_structure = PictureStructure::from_code(structure_code).unwrap_or_else(|| {
            warn!("保留的 picture_structure 0, 按帧图像处理");
            PictureStructure::Frame
        });
        pic.top_field_first = c.get_bit();
        pic.frame_pred_frame_dct = c.get_bit();
        pic.concealment_motion_vectors = c.get_bit();
        pic.q_scale_type = c.get_bit();
        pic.intra_vlc_format = c.get_bit();
        pic.alternate_scan = c.get_bit();
        pic.repeat_first_field = c.get_bit();
        pic.chroma_420_type = c.get_bit();
        pic.progressive_frame = c.get_bit();
        if c.get_bit() {
            // composite_display: v_axis, field_sequence, sub_carrier, burst_amplitude, sub_carrier_phase
            c.flush_bits(1 + 3 + 1 + 7 + 8);
        }
    }

    fn picture_spatial_scalable_extension<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let temporal_ref = c.get_bits(10);
        c.marker_bit("picture_spatial_scalable_extension");
        let h_offset = sign_extend(c.get_bits(15), 15);
        c.marker_bit("picture_spatial_scalable_extension");
        let v_offset = sign_extend(c.get_bits(15), 15);
        let weight_table = c.get_bits(2);
        let _field_select = c.get_bit();
        let _progressive = c.get_bit();
        trace!(
            "图像空间可分级扩展: ref={}, offset=({}, {}), weight={}",
            temporal_ref, h_offset, v_offset, weight_table
        );
        self.notice_unsupported("picture_spatial_scalable_extension");
    }
}

fn copyright_extension<S: ByteSource>(c: &mut BitCursor<S>) {
    let flag = c.get_bit();
    let identifier = c.get_bits(8);
    let original = c.get_bit();
    c.flush_bits(7);
    c.marker_bit("copyright_extension");
    let n1 = c.get_bits(20);
    c.marker_bit("copyright_extension");
    let n2 = c.get_bits(22);
    c.marker_bit("copyright_extension");
    let n3 = c.get_bits(22);
    let number = (u64::from(n1) << 44) | (u64::from(n2) << 22) | u64::from(n3);
    debug!(
        "版权扩展: flag={}, id={}, original={}, number={:#x}",
        flag, identifier, original, number
    );
}

/// 按之字形顺序读取 64 个 8 位权重, 存为光栅顺序
fn read_matrix<S: ByteSource>(c: &mut BitCursor<S>, matrix: &mut [u8; 64]) {
    for &pos in ZIGZAG_SCAN.iter() {
        matrix[pos] = c.get_bits(8) as u8;
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}
