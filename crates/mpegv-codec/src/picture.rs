//! 图像层解码引擎
//!
//! 驱动 slice/宏块循环, 管理参考帧轮换与显示重排序, 把完成的帧交给颜色转换输出.
//!
//! 显示顺序: B 图像解码完成后立即输出; I/P 图像延迟一帧, 在下一个 I/P 图像
//! 解码完成时输出 (此时它已轮换到前向参考槽), 序列结束时输出仍在等待的参考帧.

use log::{debug, trace, warn};
use mpegv_core::{ByteSource, MatrixCoefficients, MpegvResult, PixelSink};
use mpegv_scale::{ColorConverter, OutputParams};

use crate::bitstream::BitCursor;
use crate::config::{DecoderConfig, OutputSize};
use crate::fault::BitstreamFault;
use crate::frame::{FrameStore, Layout};
use crate::header::{HeaderParser, ScalableMode, SLICE_START_CODE_MAX, SLICE_START_CODE_MIN, SequenceHeader};
use crate::idct::InverseTransform;
use crate::macroblock::MacroblockState;
use crate::recon::MbBuffer;
use crate::tables::NON_LINEAR_QSCALE;
use crate::types::{PictureCodingType, PictureStructure};
use crate::vlc::decode_mba_increment;

/// 解码统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// 已解码的图像数 (场图像每场计一次)
    pub pictures_decoded: u64,
    /// 已输出的帧数
    pub frames_output: u64,
    /// 可恢复码流错误数
    pub faults: u64,
    /// 因错误放弃并重新同步的 slice 数
    pub slices_resynced: u64,
}

/// 一次 `decode_picture` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureInfo {
    /// 图像编码类型
    pub coding_type: PictureCodingType,
    /// 图像结构
    pub structure: PictureStructure,
    /// temporal_reference
    pub temporal_reference: u32,
    /// 解码顺序号, 从 0 开始
    pub decode_index: u64,
    /// 本次调用输出的帧数 (0 或 1)
    pub frames_output: u32,
}

/// slice 解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SliceResult {
    /// 图像的全部宏块已处理, 或后面不再是 slice
    Done,
    /// slice 正常结束, 在下一个起始码处继续
    Resync,
    /// 码流错误, 放弃本 slice 的剩余部分
    Fault(BitstreamFault),
}

/// 序列级输出格式, 在序列参数变化前缓存, 供冲刷旧帧使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputFormat {
    width: usize,
    height: usize,
    matrix: MatrixCoefficients,
    mpeg1: bool,
}

impl OutputFormat {
    fn new(seq: &SequenceHeader, layout: &Layout, size: OutputSize) -> Self {
        let (width, height) = match size {
            OutputSize::Display => (
                (seq.horizontal_size as usize).min(layout.coded_width),
                (seq.vertical_size as usize).min(layout.coded_height),
            ),
            OutputSize::Coded => (layout.coded_width, layout.coded_height),
        };
        Self {
            width,
            height,
            matrix: seq.matrix_coefficients,
            mpeg1: !seq.is_mpeg2,
        }
    }
}

/// 由序列头推导宏块网格
pub(crate) fn sequence_layout(seq: &SequenceHeader) -> MpegvResult<Layout> {
    Layout::new(
        seq.horizontal_size,
        seq.vertical_size,
        seq.chroma_format,
        seq.is_mpeg2 && !seq.progressive_sequence,
    )
}

/// 图像层解码引擎
pub(crate) struct PictureEngine {
    pub(crate) headers: HeaderParser,
    pub(crate) config: DecoderConfig,
    pub(crate) store: FrameStore,
    pub(crate) mb: MacroblockState,
    /// 当前宏块的系数块
    pub(crate) blocks: Vec<[i32; 64]>,
    pub(crate) pred: MbBuffer,
    pub(crate) quantizer_scale: i32,
    /// 正在解码一帧中的第二场
    pub(crate) second_field: bool,
    /// 本序列已完成的参考帧 (I/P/D) 数, 为 0 时后向参考槽里没有可输出的内容
    reference_frames: u64,
    pub(crate) idct: Box<dyn InverseTransform>,
    converter: ColorConverter,
    pub(crate) stats: DecoderStats,
    output: OutputFormat,
}

impl PictureEngine {
    /// 用已解析的头部创建引擎并分配帧缓冲
    pub fn new(headers: HeaderParser, config: DecoderConfig) -> MpegvResult<Self> {
        let layout = sequence_layout(&headers.sequence)?;
        let store = FrameStore::new(layout)?;
        let output = OutputFormat::new(&headers.sequence, &layout, config.output_size);
        let idct = config.idct.build();
        debug!(
            "分配帧缓冲: {}x{} 宏块, {:?}, idct={}",
            layout.mb_width,
            layout.mb_height,
            layout.chroma_format,
            idct.name()
        );
        Ok(Self {
            idct,
            headers,
            config,
            store,
            mb: MacroblockState::default(),
            blocks: vec![[0; 64]; layout.block_count],
            pred: MbBuffer::new(&layout),
            quantizer_scale: 0,
            second_field: false,
            reference_frames: 0,
            converter: ColorConverter::new(),
            stats: DecoderStats::default(),
            output,
        })
    }

    /// 输出宽高
    pub fn output_size(&self) -> (usize, usize) {
        (self.output.width, self.output.height)
    }

    /// quantiser_scale_code -> quantiser_scale
    pub(crate) fn map_quantizer_scale(&self, code: u32) -> i32 {
        let code = (code & 31) as usize;
        if !self.headers.sequence.is_mpeg2 {
            code as i32
        } else if self.headers.picture.q_scale_type {
            i32::from(NON_LINEAR_QSCALE[code])
        } else {
            (code << 1) as i32
        }
    }

    /// 新图像开始前调用: 序列参数改变网格时先冲刷等待中的帧, 再重新分配
    ///
    /// 序列头尺寸为 0 时记一次码流错误并返回 false, 保留原有帧缓冲, 调用方丢弃这幅图像.
    pub fn configure<S: ByteSource, K: PixelSink + ?Sized>(
        &mut self,
        c: &BitCursor<S>,
        sink: &mut K,
    ) -> MpegvResult<bool> {
        let seq = &self.headers.sequence;
        if seq.horizontal_size == 0 || seq.vertical_size == 0 {
            let fault = BitstreamFault::InvalidSequenceSize {
                width: seq.horizontal_size,
                height: seq.vertical_size,
            };
            self.record_fault(fault, c.position());
            return Ok(false);
        }
        let layout = sequence_layout(seq)?;
        if layout != *self.store.layout() {
            debug!(
                "序列参数变化: {}x{} -> {}x{} 宏块, 重新分配帧缓冲",
                self.store.layout().mb_width,
                self.store.layout().mb_height,
                layout.mb_width,
                layout.mb_height
            );
            self.end_of_sequence(sink)?;
            self.store = FrameStore::new(layout)?;
            self.pred = MbBuffer::new(&layout);
            self.blocks = vec![[0; 64]; layout.block_count];
        }
        self.output = OutputFormat::new(&self.headers.sequence, &layout, self.config.output_size);
        Ok(true)
    }

    /// 解码一幅图像 (帧或单场) 的全部 slice, 随后按显示顺序输出
    ///
    /// 帧缓冲无法容纳的场图像记为码流错误并返回 `None`, 其 slice 留给头部解析跳过.
    pub fn decode_picture<S: ByteSource, K: PixelSink + ?Sized>(
        &mut self,
        c: &mut BitCursor<S>,
        sink: &mut K,
    ) -> MpegvResult<Option<PictureInfo>> {
        let pic = &self.headers.picture;
        let (coding_type, structure) = (pic.coding_type, pic.picture_structure);
        let mb_height = self.store.layout().mb_height;
        if structure.is_field() && mb_height % 2 != 0 {
            self.record_fault(BitstreamFault::UnalignedFieldPicture { mb_height }, c.position());
            return Ok(None);
        }
        if !structure.is_field() && self.second_field {
            warn!("第二场缺失, 丢弃未配对的场");
            self.second_field = false;
        }

        self.store.rotate(coding_type, self.second_field);
        self.store.current_mut().progressive_frame = self.headers.picture.progressive_frame;

        self.picture_data(c);

        let frame_complete = !structure.is_field() || self.second_field;
        let frames_output = if frame_complete {
            self.reorder(coding_type, sink)?
        } else {
            0
        };
        if structure.is_field() {
            self.second_field = !self.second_field;
        }
        if frame_complete && coding_type != PictureCodingType::B {
            self.reference_frames += 1;
        }
        let info = PictureInfo {
            coding_type,
            structure,
            temporal_reference: self.headers.picture.temporal_reference,
            decode_index: self.stats.pictures_decoded,
            frames_output,
        };
        self.stats.pictures_decoded += 1;
        trace!("图像完成: {:?}", info);
        Ok(Some(info))
    }

    /// 序列结束: 输出仍在等待的参考帧
    pub fn end_of_sequence<K: PixelSink + ?Sized>(&mut self, sink: &mut K) -> MpegvResult<()> {
        if self.second_field {
            warn!("序列结束时最后一帧只有一场, 不输出");
        } else if self.reference_frames != 0 {
            self.output_frame(self.store.backward_index(), sink)?;
        }
        self.reference_frames = 0;
        self.second_field = false;
        Ok(())
    }

    /// 释放帧缓冲之外的中间缓冲
    pub fn release(&mut self) {
        self.converter.release();
    }

    fn picture_data<S: ByteSource>(&mut self, c: &mut BitCursor<S>) {
        let layout = self.store.layout();
        let mba_max = if self.headers.picture.picture_structure.is_field() {
            layout.mb_width * (layout.mb_height >> 1)
        } else {
            layout.mb_width * layout.mb_height
        };
        loop {
            match self.slice(c, mba_max) {
                SliceResult::Done => break,
                SliceResult::Resync => {}
                SliceResult::Fault(fault) => {
                    self.record_fault(fault, c.position());
                    self.stats.slices_resynced += 1;
                }
            }
        }
    }

    fn slice<S: ByteSource>(&mut self, c: &mut BitCursor<S>, mba_max: usize) -> SliceResult {
        let mut mba = match self.start_of_slice(c) {
            Ok(Some(mba)) => mba,
            Ok(None) => return SliceResult::Done,
            Err(fault) => return SliceResult::Fault(fault),
        };
        if mba >= mba_max {
            return SliceResult::Fault(BitstreamFault::SliceAddressOutOfRange { mba, limit: mba_max });
        }
        let mut mba_inc = 1;
        loop {
            if mba >= mba_max {
                return SliceResult::Done;
            }
            if mba_inc == 0 {
                if c.show_bits(23) == 0 {
                    return SliceResult::Resync;
                }
                mba_inc = match decode_mba_increment(c) {
                    Ok(inc) => inc as usize,
                    Err(fault) => return SliceResult::Fault(fault),
                };
            }
            if mba_inc == 1 {
                if let Err(fault) = self.decode_macroblock(c) {
                    return SliceResult::Fault(fault);
                }
            } else {
                self.skipped_macroblock();
            }
            self.reconstruct_macroblock(mba);
            mba += 1;
            mba_inc -= 1;
        }
    }

    /// 解析 slice 头, 返回首个宏块地址; 下一个起始码不是 slice 时返回 `None`
    fn start_of_slice<S: ByteSource>(&mut self, c: &mut BitCursor<S>) -> Result<Option<usize>, BitstreamFault> {
        c.next_start_code();
        let code = c.show_bits(32);
        if !(SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX).contains(&code) {
            return Ok(None);
        }
        c.flush_bits(32);

        let seq = &self.headers.sequence;
        let ext = if seq.is_mpeg2 && seq.vertical_size > 2800 {
            c.get_bits(3) as usize
        } else {
            0
        };
        if seq.scalable_mode == Some(ScalableMode::DataPartitioning) {
            // priority_breakpoint
            c.flush_bits(7);
        }
        self.quantizer_scale = self.map_quantizer_scale(c.get_bits(5));
        if c.get_bit() {
            // intra_slice, slice_picture_id_enable, slice_picture_id
            c.flush_bits(8);
            while c.get_bit() {
                c.flush_bits(8);
            }
        }
        let inc = decode_mba_increment(c)? as usize;
        let row = (ext << 7) + (code & 255) as usize - 1;
        let mba = row * self.store.layout().mb_width + inc - 1;
        self.mb.reset_predictors();
        trace!("slice {:#x}: mba={}, qscale={}", code & 255, mba, self.quantizer_scale);
        Ok(Some(mba))
    }

    fn record_fault(&mut self, fault: BitstreamFault, position: u64) {
        self.stats.faults += 1;
        let limit = u64::from(self.config.max_faults_logged);
        if self.stats.faults <= limit {
            warn!("码流错误 (位置 {} 位): {}", position, fault);
        } else if self.stats.faults == limit + 1 {
            warn!("码流错误过多, 后续错误只计数");
        }
    }

    /// 一帧完成后按显示顺序输出, 返回输出的帧数
    ///
    /// 本序列还没有完成的参考帧时不输出: 开头的 B 图像没有可用的参考, 第一个
    /// I/P 图像之前的前向参考槽也从未写入.
    fn reorder<K: PixelSink + ?Sized>(&mut self, coding_type: PictureCodingType, sink: &mut K) -> MpegvResult<u32> {
        if self.reference_frames == 0 {
            return Ok(0);
        }
        let index = if coding_type == PictureCodingType::B {
            self.store.aux_index()
        } else {
            self.store.forward_index()
        };
        self.output_frame(index, sink)?;
        Ok(1)
    }

    fn output_frame<K: PixelSink + ?Sized>(&mut self, index: usize, sink: &mut K) -> MpegvResult<()> {
        let frame = self.store.frame(index);
        let params = OutputParams {
            width: self.output.width,
            height: self.output.height,
            matrix: self.output.matrix,
            progressive_frame: frame.progressive_frame,
            mpeg1: self.output.mpeg1,
        };
        self.converter.emit(&frame.yuv(), &params, sink)?;
        self.stats.frames_output += 1;
        Ok(())
    }
}
