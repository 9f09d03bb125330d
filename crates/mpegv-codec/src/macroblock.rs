//! 宏块层语法: 宏块模式, 量化, 运动矢量, CBP 与块系数

use mpegv_core::{ByteSource, ChromaFormat};

use crate::bitstream::BitCursor;
use crate::block::{self, BlockQuant};
use crate::fault::{BitstreamFault, FaultResult};
use crate::header::HeaderParser;
use crate::motion::{self, MotionPredictors, VectorFormat};
use crate::picture::PictureEngine;
use crate::tables::{ALTERNATE_SCAN, ZIGZAG_SCAN};
use crate::types::{MacroblockType, MotionType, PictureCodingType, PictureStructure};
use crate::vlc::{decode_coded_block_pattern, decode_macroblock_type};

/// 单个宏块的解码状态, 预测器跨宏块保留
#[derive(Debug, Clone, Default)]
pub(crate) struct MacroblockState {
    pub mb_type: MacroblockType,
    pub motion_type: MotionType,
    /// 每个方向的矢量个数 (1 或 2)
    pub motion_vector_count: usize,
    /// 场矢量格式
    pub field_format: bool,
    pub dual_prime: bool,
    pub mv_scale: bool,
    /// 场 DCT
    pub dct_field: bool,
    /// 已编码块的掩码, 最高位对应第 0 块
    pub coded_block_pattern: u32,
    /// DC 预测值 (Y, Cb, Cr)
    pub dc_pred: [i32; 3],
    pub pmv: MotionPredictors,
    /// motion_vertical_field_select[r][s]
    pub field_select: [[bool; 2]; 2],
    pub dmvector: [i32; 2],
}

impl MacroblockState {
    /// slice 起始处清零全部预测器
    pub fn reset_predictors(&mut self) {
        self.dc_pred = [0; 3];
        self.pmv = MotionPredictors::default();
    }

    /// 第 `comp` 块是否已编码
    pub fn is_coded(&self, comp: usize, block_count: usize) -> bool {
        self.coded_block_pattern & (1 << (block_count - 1 - comp)) != 0
    }
}

/// 块序号 -> 颜色分量 {0,0,0,0,1,2,1,2,...}
#[inline]
pub(crate) fn component_of(comp: usize) -> usize {
    if comp < 4 { 0 } else { (comp & 1) + 1 }
}

impl PictureEngine {
    /// 解析 macroblock_type 并推导运动类型, 矢量格式与 DCT 类型
    fn macroblock_modes<S: ByteSource>(&mut self, c: &mut BitCursor<S>) -> FaultResult<()> {
        let pic = &self.headers.picture;
        let mb = &mut self.mb;
        let mb_type = decode_macroblock_type(c, pic.coding_type)?;
        let frame_picture = !pic.picture_structure.is_field();

        let motion_type = if mb_type.intersects(MacroblockType::MOTION_FORWARD | MacroblockType::MOTION_BACKWARD) {
            if frame_picture && pic.frame_pred_frame_dct {
                MotionType::Frame
            } else {
                MotionType::from_code(c.get_bits(2), !frame_picture).ok_or(BitstreamFault::InvalidMotionType)?
            }
        } else if frame_picture {
            MotionType::Frame
        } else {
            MotionType::Field
        };

        if frame_picture {
            mb.motion_vector_count = if motion_type == MotionType::Field { 2 } else { 1 };
            mb.field_format = motion_type != MotionType::Frame;
        } else {
            mb.motion_vector_count = if motion_type == MotionType::Field16x8 { 2 } else { 1 };
            mb.field_format = true;
        }
        mb.dual_prime = motion_type == MotionType::DualPrime;
        mb.mv_scale = mb.field_format && frame_picture;
        mb.dct_field = frame_picture
            && !pic.frame_pred_frame_dct
            && mb_type.intersects(MacroblockType::PATTERN | MacroblockType::INTRA)
            && c.get_bit();
        mb.mb_type = mb_type;
        mb.motion_type = motion_type;
        Ok(())
    }

    /// 解码一个非跳过宏块的全部语法元素, 系数写入 `self.blocks`
    pub(crate) fn decode_macroblock<S: ByteSource>(&mut self, c: &mut BitCursor<S>) -> FaultResult<()> {
        self.macroblock_modes(c)?;
        let mb_type = self.mb.mb_type;
        let intra = mb_type.contains(MacroblockType::INTRA);

        if mb_type.contains(MacroblockType::QUANT) {
            self.quantizer_scale = self.map_quantizer_scale(c.get_bits(5));
        }

        let seq = &self.headers.sequence;
        let pic = &self.headers.picture;
        let mb = &mut self.mb;
        let concealment = pic.concealment_motion_vectors;

        if mb_type.contains(MacroblockType::MOTION_FORWARD) || (intra && concealment) {
            let fmt = VectorFormat {
                h_r_size: VectorFormat::r_size(pic.f_code[0][0]),
                v_r_size: VectorFormat::r_size(pic.f_code[0][1]),
                dual_prime: mb.dual_prime,
                mv_scale: mb.mv_scale,
                full_pel: pic.full_pel_forward,
            };
            decode_direction(c, mb, seq.is_mpeg2, 0, &fmt)?;
        }
        if mb_type.contains(MacroblockType::MOTION_BACKWARD) {
            let fmt = VectorFormat {
                h_r_size: VectorFormat::r_size(pic.f_code[1][0]),
                v_r_size: VectorFormat::r_size(pic.f_code[1][1]),
                dual_prime: false,
                mv_scale: mb.mv_scale,
                full_pel: pic.full_pel_backward,
            };
            decode_direction(c, mb, seq.is_mpeg2, 1, &fmt)?;
        }
        if intra && concealment {
            c.marker_bit("concealment motion vectors");
        }

        let block_count = self.store.layout().block_count;
        mb.coded_block_pattern = if mb_type.contains(MacroblockType::PATTERN) {
            let cbp = decode_coded_block_pattern(c)?;
            match seq.chroma_format {
                ChromaFormat::Yuv420 => cbp,
                ChromaFormat::Yuv422 => (cbp << 2) | c.get_bits(2),
                ChromaFormat::Yuv444 => (cbp << 6) | c.get_bits(6),
            }
        } else if intra {
            (1 << block_count) - 1
        } else {
            0
        };

        decode_blocks(
            c,
            &self.headers,
            mb,
            &mut self.blocks[..block_count],
            self.quantizer_scale,
        )?;

        if pic.coding_type == PictureCodingType::D {
            c.marker_bit("end_of_macroblock");
        }
        if !intra {
            mb.dc_pred = [0; 3];
        }
        if intra && !concealment {
            mb.pmv = MotionPredictors::default();
        }
        // P 图像中无前向矢量的非 Intra 宏块: 零矢量前向预测
        if pic.coding_type == PictureCodingType::P
            && !mb_type.intersects(MacroblockType::MOTION_FORWARD | MacroblockType::INTRA)
        {
            mb.pmv[0][0] = [0, 0];
            mb.pmv[1][0] = [0, 0];
            if pic.picture_structure.is_field() {
                mb.motion_type = MotionType::Field;
                mb.field_select[0][0] = pic.picture_structure == PictureStructure::BottomField;
            } else {
                mb.motion_type = MotionType::Frame;
            }
        }
        Ok(())
    }

    /// 跳过的宏块: 系数清零, 沿用上一宏块的预测方向
    pub(crate) fn skipped_macroblock(&mut self) {
        for block in self.blocks.iter_mut() {
            block.fill(0);
        }
        let pic = &self.headers.picture;
        let mb = &mut self.mb;
        mb.coded_block_pattern = 0;
        mb.dc_pred = [0; 3];
        if pic.coding_type == PictureCodingType::P {
            mb.pmv[0][0] = [0, 0];
            mb.pmv[1][0] = [0, 0];
        }
        if pic.picture_structure.is_field() {
            mb.motion_type = MotionType::Field;
            let same_parity = pic.picture_structure == PictureStructure::BottomField;
            mb.field_select[0] = [same_parity; 2];
        } else {
            mb.motion_type = MotionType::Frame;
        }
        mb.mb_type.remove(MacroblockType::INTRA);
        mb.dct_field = false;
    }
}

/// 解码方向 `s` 的运动矢量
fn decode_direction<S: ByteSource>(
    c: &mut BitCursor<S>,
    mb: &mut MacroblockState,
    mpeg2: bool,
    s: usize,
    fmt: &VectorFormat,
) -> FaultResult<()> {
    if mpeg2 {
        motion::motion_vectors(
            c,
            &mut mb.pmv,
            &mut mb.dmvector,
            &mut mb.field_select,
            s,
            mb.motion_vector_count,
            mb.field_format,
            fmt,
        )
    } else {
        motion::motion_vector(c, &mut mb.pmv[0][s], &mut mb.dmvector, fmt)
    }
}

/// 按 CBP 解码各块, 未编码的块清零
fn decode_blocks<S: ByteSource>(
    c: &mut BitCursor<S>,
    headers: &HeaderParser,
    mb: &mut MacroblockState,
    blocks: &mut [[i32; 64]],
    quantizer_scale: i32,
) -> FaultResult<()> {
    let seq = &headers.sequence;
    let pic = &headers.picture;
    let intra = mb.mb_type.contains(MacroblockType::INTRA);
    let block_count = blocks.len();
    let scan = if seq.is_mpeg2 && pic.alternate_scan {
        &ALTERNATE_SCAN
    } else {
        &ZIGZAG_SCAN
    };

    for (comp, block) in blocks.iter_mut().enumerate() {
        block.fill(0);
        if !mb.is_coded(comp, block_count) {
            continue;
        }
        let cc = component_of(comp);
        // 4:2:0 的色度块沿用亮度矩阵
        let luma_matrix = cc == 0 || seq.chroma_format == ChromaFormat::Yuv420 || !seq.is_mpeg2;
        let matrix = match (intra, luma_matrix) {
            (true, true) => &seq.intra_quantizer_matrix,
            (true, false) => &seq.chroma_intra_quantizer_matrix,
            (false, true) => &seq.non_intra_quantizer_matrix,
            (false, false) => &seq.chroma_non_intra_quantizer_matrix,
        };
        let q = BlockQuant {
            scale: quantizer_scale,
            matrix,
            scan,
        };
        match (seq.is_mpeg2, intra) {
            (false, true) => block::mpeg1_intra_block(
                c,
                block,
                &mut mb.dc_pred[cc],
                cc == 0,
                &q,
                pic.coding_type == PictureCodingType::D,
            )?,
            (false, false) => block::mpeg1_non_intra_block(c, block, &q)?,
            (true, true) => block::mpeg2_intra_block(
                c,
                block,
                &mut mb.dc_pred[cc],
                cc == 0,
                &q,
                pic.intra_dc_precision,
                pic.intra_vlc_format,
            )?,
            (true, false) => block::mpeg2_non_intra_block(c, block, &q)?,
        }
    }
    Ok(())
}
