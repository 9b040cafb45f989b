//! H.265/HEVC SPS 解析器.
//!
//! 从 SPS NAL (含 2 字节头部) 中解析到 conformance window 为止:
//! profile/tier/level, 色度格式, 亮度采样尺寸与裁剪窗口.

use vidres_core::{VidresError, VidresResult};

use crate::parsers::syntax::{SyntaxReader, TruncationPolicy};

/// profile_tier_level 中的 general 部分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileTierLevel {
    /// general_profile_space
    pub profile_space: u8,
    /// general_tier_flag (false=Main, true=High)
    pub tier_flag: bool,
    /// general_profile_idc (1=Main, 2=Main10, 3=MainStillPicture, 4=RExt)
    pub profile_idc: u8,
    /// general_profile_compatibility_flag[32]
    pub compatibility_flags: u32,
    /// general_level_idc (level * 30, 如 93 = 3.1)
    pub level_idc: u8,
}

impl ProfileTierLevel {
    /// tier 名称
    pub fn tier_name(&self) -> &'static str {
        if self.tier_flag { "High" } else { "Main" }
    }
}

/// SPS 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcSps {
    /// SPS 所引用的 VPS ID
    pub vps_id: u8,
    /// 最大子层数 (sps_max_sub_layers_minus1 + 1)
    pub max_sub_layers: u8,
    /// sps_temporal_id_nesting_flag
    pub temporal_id_nesting: bool,
    /// general profile/tier/level
    pub ptl: ProfileTierLevel,
    /// SPS ID
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// 4:4:4 时色度平面是否独立编码
    pub separate_colour_plane: bool,
    /// pic_width_in_luma_samples (未裁剪)
    pub pic_width: u32,
    /// pic_height_in_luma_samples (未裁剪)
    pub pic_height: u32,
    /// conformance window 裁剪 (色度采样单位)
    pub conf_win_left: u32,
    /// conformance window 裁剪 (色度采样单位)
    pub conf_win_right: u32,
    /// conformance window 裁剪 (色度采样单位)
    pub conf_win_top: u32,
    /// conformance window 裁剪 (色度采样单位)
    pub conf_win_bottom: u32,
    /// 码流在解析完成前截断 (仅容错模式)
    pub truncated: bool,
}

impl HevcSps {
    /// 编码尺寸 (未应用 conformance window)
    pub fn coded_size(&self) -> (u32, u32) {
        (self.pic_width, self.pic_height)
    }

    /// 是否携带非零的 conformance window
    pub fn has_conformance_window(&self) -> bool {
        (self.conf_win_left | self.conf_win_right | self.conf_win_top | self.conf_win_bottom) != 0
    }

    /// 应用 conformance window 后的显示尺寸
    ///
    /// 裁剪单位为 SubWidthC / SubHeightC, 由色度格式决定.
    /// 没有 conformance window 时等于编码尺寸.
    pub fn cropped_size(&self) -> VidresResult<(u32, u32)> {
        if !self.has_conformance_window() {
            return Ok(self.coded_size());
        }

        let chroma_array_type = if self.separate_colour_plane {
            0
        } else {
            self.chroma_format_idc
        };
        let sub_width_c: u32 = if matches!(chroma_array_type, 1 | 2) { 2 } else { 1 };
        let sub_height_c: u32 = if chroma_array_type == 1 { 2 } else { 1 };

        let crop_x = self
            .conf_win_left
            .checked_add(self.conf_win_right)
            .and_then(|v| v.checked_mul(sub_width_c))
            .ok_or_else(|| VidresError::InvalidData("HEVC: 计算水平裁剪时发生溢出".into()))?;
        let crop_y = self
            .conf_win_top
            .checked_add(self.conf_win_bottom)
            .and_then(|v| v.checked_mul(sub_height_c))
            .ok_or_else(|| VidresError::InvalidData("HEVC: 计算垂直裁剪时发生溢出".into()))?;

        if crop_x >= self.pic_width || crop_y >= self.pic_height {
            return Err(VidresError::InvalidData(format!(
                "HEVC: conformance window 非法, pic={}x{}, crop_x={}, crop_y={}",
                self.pic_width, self.pic_height, crop_x, crop_y
            )));
        }

        Ok((self.pic_width - crop_x, self.pic_height - crop_y))
    }
}

/// 解析 HEVC SPS
///
/// `nal` 为移除防竞争字节后的 SPS NAL, 包含 2 字节 NAL 头.
pub fn parse_hevc_sps(nal: &[u8], policy: TruncationPolicy) -> VidresResult<HevcSps> {
    let mut r = SyntaxReader::new(nal, policy, "HEVC");

    r.skip(16, "nal_unit_header")?;

    let vps_id = r.u(4, "sps_video_parameter_set_id")? as u8;
    let max_sub_layers_minus1 = r.u(3, "sps_max_sub_layers_minus1")? as u8;
    let temporal_id_nesting = r.flag("sps_temporal_id_nesting_flag")?;

    let ptl = parse_profile_tier_level(&mut r, max_sub_layers_minus1)?;

    let sps_id = r.ue("sps_seq_parameter_set_id")?;
    let chroma_format_idc = r.ue("chroma_format_idc")?;
    if chroma_format_idc > 3 {
        return Err(VidresError::InvalidData(format!(
            "HEVC: chroma_format_idc 非法, value={}",
            chroma_format_idc
        )));
    }
    let separate_colour_plane = if chroma_format_idc == 3 {
        r.flag("separate_colour_plane_flag")?
    } else {
        false
    };

    let pic_width = r.ue("pic_width_in_luma_samples")?;
    let pic_height = r.ue("pic_height_in_luma_samples")?;

    let (mut conf_win_left, mut conf_win_right, mut conf_win_top, mut conf_win_bottom) =
        (0, 0, 0, 0);
    if r.flag("conformance_window_flag")? {
        conf_win_left = r.ue("conf_win_left_offset")?;
        conf_win_right = r.ue("conf_win_right_offset")?;
        conf_win_top = r.ue("conf_win_top_offset")?;
        conf_win_bottom = r.ue("conf_win_bottom_offset")?;
    }

    log::trace!("HEVC: SPS 解析完成, bits_read={}", r.bits_read());

    Ok(HevcSps {
        vps_id,
        max_sub_layers: max_sub_layers_minus1 + 1,
        temporal_id_nesting,
        ptl,
        sps_id,
        chroma_format_idc,
        separate_colour_plane,
        pic_width,
        pic_height,
        conf_win_left,
        conf_win_right,
        conf_win_top,
        conf_win_bottom,
        truncated: r.truncated(),
    })
}

/// 解析 profile_tier_level(1, max_sub_layers_minus1)
fn parse_profile_tier_level(
    r: &mut SyntaxReader<'_>,
    max_sub_layers_minus1: u8,
) -> VidresResult<ProfileTierLevel> {
    let profile_space = r.u(2, "general_profile_space")? as u8;
    let tier_flag = r.flag("general_tier_flag")?;
    let profile_idc = r.u(5, "general_profile_idc")? as u8;
    let compatibility_flags = r.u(32, "general_profile_compatibility_flags")?;
    // progressive/interlaced/non_packed/frame_only + 44 位约束标志
    r.skip(48, "general_constraint_flags")?;
    let level_idc = r.u(8, "general_level_idc")? as u8;

    let sub_layers = usize::from(max_sub_layers_minus1);
    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for i in 0..sub_layers {
        profile_present[i] = r.flag("sub_layer_profile_present_flag")?;
        level_present[i] = r.flag("sub_layer_level_present_flag")?;
    }
    if sub_layers > 0 {
        // reserved_zero_2bits, 补齐到 8 组
        r.skip(2 * (8 - u32::from(max_sub_layers_minus1)), "reserved_zero_2bits")?;
    }
    for i in 0..sub_layers {
        if profile_present[i] {
            // profile_space(2) + tier(1) + idc(5) + compat(32) + constraint(48)
            r.skip(88, "sub_layer_profile")?;
        }
        if level_present[i] {
            r.skip(8, "sub_layer_level_idc")?;
        }
    }

    Ok(ProfileTierLevel {
        profile_space,
        tier_flag,
        profile_idc,
        compatibility_flags,
        level_idc,
    })
}
