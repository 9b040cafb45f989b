//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 只解析到 frame cropping 为止, 足以得到输出分辨率:
//! - Profile / Level 与 constraint_set 标志
//! - 色度格式与位深 (High profile 系列)
//! - 量化矩阵 (完整遍历, 保证后续字段位置正确)
//! - 图像尺寸 (宏块单位) 与 cropping
//!
//! VUI 等之后的字段不影响分辨率, 不做解析.

use bitflags::bitflags;
use vidres_core::{VidresError, VidresResult};

use crate::parsers::syntax::{SyntaxReader, TruncationPolicy};

bitflags! {
    /// constraint_set0..5 标志 (profile_idc 之后的 8 位)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConstraintFlags: u8 {
        /// constraint_set0_flag
        const SET0 = 1 << 7;
        /// constraint_set1_flag
        const SET1 = 1 << 6;
        /// constraint_set2_flag
        const SET2 = 1 << 5;
        /// constraint_set3_flag
        const SET3 = 1 << 4;
        /// constraint_set4_flag
        const SET4 = 1 << 3;
        /// constraint_set5_flag
        const SET5 = 1 << 2;
    }
}

/// SPS 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sps {
    /// profile_idc (编码规格, 如 66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// constraint_set 标志位
    pub constraint_flags: ConstraintFlags,
    /// level_idc (编码级别, 如 30=3.0, 41=4.1)
    pub level_idc: u8,
    /// SPS ID (seq_parameter_set_id)
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// 4:4:4 时色度平面是否独立编码
    pub separate_colour_plane: bool,
    /// 亮度位深
    pub bit_depth_luma: u32,
    /// 色度位深
    pub bit_depth_chroma: u32,
    /// 是否携带自定义量化矩阵
    pub scaling_matrix_present: bool,
    /// log2(max_frame_num)
    pub log2_max_frame_num: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub poc_type: u32,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// 宽度 (宏块数)
    pub pic_width_in_mbs: u32,
    /// 高度 (map unit 数, 场编码时为半帧)
    pub pic_height_in_map_units: u32,
    /// 是否为帧编码 (非场编码)
    pub frame_mbs_only: bool,
    /// cropping 偏移 (左)
    pub crop_left: u32,
    /// cropping 偏移 (右)
    pub crop_right: u32,
    /// cropping 偏移 (上)
    pub crop_top: u32,
    /// cropping 偏移 (下)
    pub crop_bottom: u32,
    /// 图像宽度 (像素, 已应用 cropping)
    pub width: u32,
    /// 图像高度 (像素, 已应用 cropping)
    pub height: u32,
    /// 码流在解析完成前截断 (仅容错模式)
    pub truncated: bool,
}

impl Sps {
    /// ChromaArrayType: 独立色度平面时为 0, 否则等于 chroma_format_idc
    pub fn chroma_array_type(&self) -> u32 {
        if self.separate_colour_plane {
            0
        } else {
            self.chroma_format_idc
        }
    }
}

/// 从 RBSP 数据 (不含 NAL 头部字节) 解析 SPS
pub fn parse_sps(rbsp: &[u8], policy: TruncationPolicy) -> VidresResult<Sps> {
    let mut r = SyntaxReader::new(rbsp, policy, "H.264");

    let profile_idc = r.u(8, "profile_idc")? as u8;
    let constraint_flags = ConstraintFlags::from_bits_retain(r.u(8, "constraint_set_flags")? as u8);
    let level_idc = r.u(8, "level_idc")? as u8;
    let sps_id = r.ue("seq_parameter_set_id")?;

    let mut chroma_format_idc = 1; // 默认 4:2:0
    let mut separate_colour_plane = false;
    let mut bit_depth_luma = 8;
    let mut bit_depth_chroma = 8;
    let mut scaling_matrix_present = false;

    // High profile 及以上有额外字段
    if is_high_profile(profile_idc) {
        chroma_format_idc = r.ue("chroma_format_idc")?;
        if chroma_format_idc > 3 {
            return Err(VidresError::InvalidData(format!(
                "H.264: chroma_format_idc 非法, value={}",
                chroma_format_idc
            )));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane = r.flag("separate_colour_plane_flag")?;
        }
        bit_depth_luma = r.ue("bit_depth_luma_minus8")?.saturating_add(8);
        bit_depth_chroma = r.ue("bit_depth_chroma_minus8")?.saturating_add(8);
        r.skip(1, "qpprime_y_zero_transform_bypass_flag")?;

        scaling_matrix_present = r.flag("seq_scaling_matrix_present_flag")?;
        if scaling_matrix_present {
            skip_seq_scaling_lists(&mut r, chroma_format_idc)?;
        }
    }

    let log2_max_frame_num = r.ue("log2_max_frame_num_minus4")?.saturating_add(4);

    let poc_type = r.ue("pic_order_cnt_type")?;
    match poc_type {
        0 => {
            r.ue("log2_max_pic_order_cnt_lsb_minus4")?;
        }
        1 => {
            r.skip(1, "delta_pic_order_always_zero_flag")?;
            r.se("offset_for_non_ref_pic")?;
            r.se("offset_for_top_to_bottom_field")?;
            let num_ref_in_cycle = r.ue("num_ref_frames_in_pic_order_cnt_cycle")?;
            if num_ref_in_cycle > 255 {
                return Err(VidresError::InvalidData(format!(
                    "H.264: num_ref_frames_in_pic_order_cnt_cycle 超出范围, value={}",
                    num_ref_in_cycle
                )));
            }
            for _ in 0..num_ref_in_cycle {
                r.se("offset_for_ref_frame")?;
            }
        }
        _ => {} // poc_type == 2 无额外字段, 其他取值不影响后续位置
    }

    let max_num_ref_frames = r.ue("max_num_ref_frames")?;
    r.skip(1, "gaps_in_frame_num_value_allowed_flag")?;

    // 图像尺寸 (宏块单位)
    let pic_width_in_mbs = plus_one(r.ue("pic_width_in_mbs_minus1")?, "pic_width_in_mbs")?;
    let pic_height_in_map_units = plus_one(
        r.ue("pic_height_in_map_units_minus1")?,
        "pic_height_in_map_units",
    )?;

    let frame_mbs_only = r.flag("frame_mbs_only_flag")?;
    if !frame_mbs_only {
        r.skip(1, "mb_adaptive_frame_field_flag")?;
    }
    r.skip(1, "direct_8x8_inference_flag")?;

    let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0, 0, 0, 0);
    if r.flag("frame_cropping_flag")? {
        crop_left = r.ue("frame_crop_left_offset")?;
        crop_right = r.ue("frame_crop_right_offset")?;
        crop_top = r.ue("frame_crop_top_offset")?;
        crop_bottom = r.ue("frame_crop_bottom_offset")?;
    }

    log::trace!("H.264: SPS 解析完成, bits_read={}", r.bits_read());

    let mut sps = Sps {
        profile_idc,
        constraint_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        separate_colour_plane,
        bit_depth_luma,
        bit_depth_chroma,
        scaling_matrix_present,
        log2_max_frame_num,
        poc_type,
        max_num_ref_frames,
        pic_width_in_mbs,
        pic_height_in_map_units,
        frame_mbs_only,
        crop_left,
        crop_right,
        crop_top,
        crop_bottom,
        width: 0,
        height: 0,
        truncated: r.truncated(),
    };
    let (width, height) = compute_size(&sps)?;
    sps.width = width;
    sps.height = height;
    Ok(sps)
}

/// 计算 cropping 后的像素尺寸
fn compute_size(sps: &Sps) -> VidresResult<(u32, u32)> {
    let (crop_unit_x, crop_unit_y) = cropping_unit(sps.chroma_array_type(), sps.frame_mbs_only);

    let raw_width = sps
        .pic_width_in_mbs
        .checked_mul(16)
        .ok_or_else(|| VidresError::InvalidData("H.264: 计算宽度时发生溢出".into()))?;
    let frame_height_in_mbs = sps
        .pic_height_in_map_units
        .checked_mul(if sps.frame_mbs_only { 1 } else { 2 })
        .ok_or_else(|| VidresError::InvalidData("H.264: 计算高度时发生溢出".into()))?;
    let raw_height = frame_height_in_mbs
        .checked_mul(16)
        .ok_or_else(|| VidresError::InvalidData("H.264: 计算高度时发生溢出".into()))?;

    let crop_x = sps
        .crop_left
        .checked_add(sps.crop_right)
        .and_then(|v| v.checked_mul(crop_unit_x))
        .ok_or_else(|| VidresError::InvalidData("H.264: 计算水平裁剪时发生溢出".into()))?;
    let crop_y = sps
        .crop_top
        .checked_add(sps.crop_bottom)
        .and_then(|v| v.checked_mul(crop_unit_y))
        .ok_or_else(|| VidresError::InvalidData("H.264: 计算垂直裁剪时发生溢出".into()))?;

    if crop_x >= raw_width || crop_y >= raw_height {
        return Err(VidresError::InvalidData(format!(
            "H.264: 裁剪参数非法, raw={}x{}, crop_x={}, crop_y={}",
            raw_width, raw_height, crop_x, crop_y
        )));
    }

    Ok((raw_width - crop_x, raw_height - crop_y))
}

fn plus_one(value: u32, field: &str) -> VidresResult<u32> {
    value
        .checked_add(1)
        .ok_or_else(|| VidresError::InvalidData(format!("H.264: {} 溢出", field)))
}

/// 是否为 High Profile 或更高 (SPS 中带色度格式等扩展字段)
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

/// 获取 cropping 单位 (CropUnitX, CropUnitY)
fn cropping_unit(chroma_array_type: u32, frame_mbs_only: bool) -> (u32, u32) {
    let height_mult = if frame_mbs_only { 1 } else { 2 };
    match chroma_array_type {
        1 => (2, 2 * height_mult),
        2 => (2, height_mult),
        // 单色, 4:4:4, 独立色度平面
        _ => (1, height_mult),
    }
}

/// 遍历 seq_scaling_list_present_flag 及其量化矩阵
fn skip_seq_scaling_lists(r: &mut SyntaxReader<'_>, chroma_format_idc: u32) -> VidresResult<()> {
    let list_count = if chroma_format_idc == 3 { 12 } else { 8 };
    for list_idx in 0..list_count {
        if r.flag("seq_scaling_list_present_flag")? {
            let size = if list_idx < 6 { 16 } else { 64 };
            skip_scaling_list(r, size)?;
        }
    }
    Ok(())
}

/// scaling_list(): delta_scale 循环, nextScale 为 0 后不再读取
fn skip_scaling_list(r: &mut SyntaxReader<'_>, size: usize) -> VidresResult<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = r.se("delta_scale")?;
            next_scale = (last_scale + i64::from(delta_scale) + 256).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidres_core::BitWriter;

    /// 测试 SPS 构造参数
    struct SpsFields {
        profile_idc: u8,
        constraints: u8,
        chroma_format_idc: u32,
        scaling_lists: bool,
        poc_type: u32,
        width_mbs_minus1: u32,
        height_map_units_minus1: u32,
        frame_mbs_only: bool,
        crop: Option<(u32, u32, u32, u32)>,
    }

    impl Default for SpsFields {
        fn default() -> Self {
            Self {
                profile_idc: 66,
                constraints: 0xC0,
                chroma_format_idc: 1,
                scaling_lists: false,
                poc_type: 0,
                width_mbs_minus1: 21,
                height_map_units_minus1: 17,
                frame_mbs_only: true,
                crop: None,
            }
        }
    }

    fn build_sps_rbsp(f: &SpsFields) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(u32::from(f.profile_idc), 8);
        bw.write_bits(u32::from(f.constraints), 8);
        bw.write_bits(30, 8); // level_idc
        bw.write_ue(0); // seq_parameter_set_id

        if is_high_profile(f.profile_idc) {
            bw.write_ue(f.chroma_format_idc);
            if f.chroma_format_idc == 3 {
                bw.write_flag(false); // separate_colour_plane_flag
            }
            bw.write_ue(2); // bit_depth_luma_minus8
            bw.write_ue(2); // bit_depth_chroma_minus8
            bw.write_flag(false); // qpprime_y_zero_transform_bypass_flag
            bw.write_flag(f.scaling_lists);
            if f.scaling_lists {
                let count = if f.chroma_format_idc == 3 { 12 } else { 8 };
                for idx in 0..count {
                    match idx {
                        // 4x4 列表: 一个非零 delta 后以 nextScale=0 结束
                        0 => {
                            bw.write_flag(true);
                            bw.write_se(5); // 8 + 5 = 13
                            bw.write_se(-13); // 13 - 13 = 0, 结束
                        }
                        // 8x8 列表: 全部 64 个 delta 都显式给出
                        6 => {
                            bw.write_flag(true);
                            for _ in 0..64 {
                                bw.write_se(1);
                            }
                        }
                        _ => bw.write_flag(false),
                    }
                }
            }
        }

        bw.write_ue(0); // log2_max_frame_num_minus4
        bw.write_ue(f.poc_type);
        match f.poc_type {
            0 => bw.write_ue(2), // log2_max_pic_order_cnt_lsb_minus4
            1 => {
                bw.write_flag(false); // delta_pic_order_always_zero_flag
                bw.write_se(-2); // offset_for_non_ref_pic
                bw.write_se(1); // offset_for_top_to_bottom_field
                bw.write_ue(3); // num_ref_frames_in_pic_order_cnt_cycle
                bw.write_se(4);
                bw.write_se(-4);
                bw.write_se(0);
            }
            _ => {}
        }
        bw.write_ue(1); // max_num_ref_frames
        bw.write_flag(false); // gaps_in_frame_num_value_allowed_flag
        bw.write_ue(f.width_mbs_minus1);
        bw.write_ue(f.height_map_units_minus1);
        bw.write_flag(f.frame_mbs_only);
        if !f.frame_mbs_only {
            bw.write_flag(false); // mb_adaptive_frame_field_flag
        }
        bw.write_flag(true); // direct_8x8_inference_flag
        match f.crop {
            Some((l, r, t, b)) => {
                bw.write_flag(true);
                bw.write_ue(l);
                bw.write_ue(r);
                bw.write_ue(t);
                bw.write_ue(b);
            }
            None => bw.write_flag(false),
        }
        bw.write_flag(false); // vui_parameters_present_flag
        bw.write_rbsp_trailing_bits();
        bw.finish()
    }

    #[test]
    fn test_sps_baseline_cif() {
        let rbsp = build_sps_rbsp(&SpsFields::default());
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();

        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.level_idc, 30);
        assert_eq!(sps.chroma_format_idc, 1, "Baseline 默认 4:2:0");
        assert!(sps.constraint_flags.contains(ConstraintFlags::SET0 | ConstraintFlags::SET1));
        assert!(!sps.constraint_flags.contains(ConstraintFlags::SET2));
        assert_eq!((sps.width, sps.height), (352, 288));
        assert!(!sps.truncated);
    }

    #[test]
    fn test_sps_1080p_cropping() {
        // 120x68 宏块 = 1920x1088, 底部裁剪 4 个单位 (8 行)
        let rbsp = build_sps_rbsp(&SpsFields {
            profile_idc: 77,
            width_mbs_minus1: 119,
            height_map_units_minus1: 67,
            crop: Some((0, 0, 0, 4)),
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert_eq!((sps.width, sps.height), (1920, 1080));
        assert_eq!(sps.crop_bottom, 4);
    }

    #[test]
    fn test_sps_high_profile_with_scaling_lists() {
        let rbsp = build_sps_rbsp(&SpsFields {
            profile_idc: 100,
            scaling_lists: true,
            width_mbs_minus1: 79,
            height_map_units_minus1: 44,
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert!(sps.scaling_matrix_present);
        assert_eq!(sps.bit_depth_luma, 10);
        assert_eq!(sps.bit_depth_chroma, 10);
        assert_eq!((sps.width, sps.height), (1280, 720));
    }

    #[test]
    fn test_sps_high444_twelve_scaling_lists() {
        let rbsp = build_sps_rbsp(&SpsFields {
            profile_idc: 244,
            chroma_format_idc: 3,
            scaling_lists: true,
            crop: Some((1, 1, 0, 0)),
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert_eq!(sps.chroma_format_idc, 3);
        assert_eq!(sps.chroma_array_type(), 3);
        // 4:4:4 的水平裁剪单位为 1
        assert_eq!((sps.width, sps.height), (350, 288));
    }

    #[test]
    fn test_sps_profile_135_has_chroma_fields() {
        let rbsp = build_sps_rbsp(&SpsFields {
            profile_idc: 135,
            chroma_format_idc: 2,
            crop: Some((0, 2, 0, 2)),
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert_eq!(sps.chroma_format_idc, 2);
        // 4:2:2: CropUnitX=2, CropUnitY=1
        assert_eq!((sps.width, sps.height), (348, 286));
    }

    #[test]
    fn test_sps_poc_type1() {
        let rbsp = build_sps_rbsp(&SpsFields {
            poc_type: 1,
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert_eq!(sps.poc_type, 1);
        assert_eq!(sps.max_num_ref_frames, 1);
        assert_eq!((sps.width, sps.height), (352, 288));
    }

    #[test]
    fn test_sps_poc_type2() {
        let rbsp = build_sps_rbsp(&SpsFields {
            poc_type: 2,
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert_eq!(sps.poc_type, 2);
        assert_eq!((sps.width, sps.height), (352, 288));
    }

    #[test]
    fn test_sps_field_coding_doubles_height() {
        // 场编码: 高度 = map_units * 2 * 16, 裁剪单位 Y = 4
        let rbsp = build_sps_rbsp(&SpsFields {
            width_mbs_minus1: 44,
            height_map_units_minus1: 17,
            frame_mbs_only: false,
            crop: Some((0, 0, 0, 2)),
            ..Default::default()
        });
        let sps = parse_sps(&rbsp, TruncationPolicy::Strict).unwrap();
        assert!(!sps.frame_mbs_only);
        assert_eq!((sps.width, sps.height), (720, 568));
    }

    #[test]
    fn test_sps_reject_crop_larger_than_frame() {
        let rbsp = build_sps_rbsp(&SpsFields {
            width_mbs_minus1: 0,
            height_map_units_minus1: 0,
            crop: Some((4, 4, 0, 0)),
            ..Default::default()
        });
        let err = parse_sps(&rbsp, TruncationPolicy::Strict).expect_err("裁剪超过图像应返回错误");
        assert!(format!("{err}").contains("裁剪参数非法"));
    }

    #[test]
    fn test_sps_reject_invalid_chroma_format() {
        let rbsp = build_sps_rbsp(&SpsFields {
            profile_idc: 100,
            chroma_format_idc: 4,
            ..Default::default()
        });
        assert!(parse_sps(&rbsp, TruncationPolicy::Tolerant).is_err());
    }

    #[test]
    fn test_sps_truncated_strict_and_tolerant() {
        let rbsp = build_sps_rbsp(&SpsFields::default());
        // 保留到 pic_width_in_mbs_minus1 的前导零中途
        let cut = &rbsp[..5];

        let err = parse_sps(cut, TruncationPolicy::Strict).expect_err("严格模式截断应失败");
        assert!(matches!(err, VidresError::InvalidData(_)));

        let sps = parse_sps(cut, TruncationPolicy::Tolerant).expect("容错模式应返回尽力结果");
        assert!(sps.truncated, "容错结果应带截断标记");
        assert_eq!(sps.profile_idc, 66);
    }

    #[test]
    fn test_sps_tolerant_zero_tail_does_not_overflow() {
        // sps_id..gaps_in_frame_num 占满 0xF4, 其后 pic_width_in_mbs_minus1 的前导零一直到末尾
        let mut rbsp = vec![0x42, 0xC0, 0x1E, 0xF4];
        rbsp.extend_from_slice(&[0x00; 8]);

        assert!(parse_sps(&rbsp, TruncationPolicy::Strict).is_err());

        let sps = parse_sps(&rbsp, TruncationPolicy::Tolerant).expect("容错模式不应因溢出失败");
        assert!(sps.truncated);
        assert_eq!(sps.max_num_ref_frames, 1);
        assert_eq!(sps.pic_width_in_mbs, 0x1_0000);
        assert_eq!((sps.width, sps.height), (0x1_0000 * 16, 32));
    }

    #[test]
    fn test_sps_empty_input() {
        assert!(parse_sps(&[], TruncationPolicy::Strict).is_err());
        // 容错模式: 全部字段按 0 处理, frame_mbs_only_flag=0 使高度翻倍
        let sps = parse_sps(&[], TruncationPolicy::Tolerant).unwrap();
        assert!(sps.truncated);
        assert!(!sps.frame_mbs_only);
        assert_eq!((sps.width, sps.height), (16, 32));
    }
}
