//! HEVC 分辨率提取集成测试

use bytes::Bytes;
use vidres::codec::parsers::h265::{HevcNalUnitType, parse_hevc_sps, split_hevc_annex_b};
use vidres::codec::{
    CodecId, DecoderConfig, ExtractOptions, Resolution, TruncationPolicy, collect_parameter_sets,
    detect_codec, extract_hevc_resolution, extract_resolution, probe_codec, probe_sps,
};
use vidres::core::BitWriter;

// ============================================================
// 码流构造
// ============================================================

/// 构造 HEVC SPS RBSP (含 2 字节 NAL 头, 未插入防竞争字节)
fn build_sps(width: u32, height: u32, conf_win_bottom: u32) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(0x4201, 16); // NAL 头: SPS, layer 0, tid 1
    bw.write_bits(0, 4); // sps_video_parameter_set_id
    bw.write_bits(1, 3); // sps_max_sub_layers_minus1
    bw.write_flag(true); // sps_temporal_id_nesting_flag

    // profile_tier_level: Main, Main tier, level 4.0
    bw.write_bits(0, 2);
    bw.write_flag(false);
    bw.write_bits(1, 5);
    bw.write_bits(0x6000_0000, 32);
    bw.write_bits(0x9000, 16);
    bw.write_bits(0, 32);
    bw.write_bits(120, 8);
    // 一个子层: 只有 level
    bw.write_flag(false);
    bw.write_flag(true);
    bw.write_bits(0, 14); // 2 * (8 - 1) 个保留位
    bw.write_bits(90, 8); // sub_layer_level_idc

    bw.write_ue(0); // sps_seq_parameter_set_id
    bw.write_ue(1); // chroma_format_idc = 4:2:0
    bw.write_ue(width);
    bw.write_ue(height);
    if conf_win_bottom > 0 {
        bw.write_flag(true);
        bw.write_ue(0);
        bw.write_ue(0);
        bw.write_ue(0);
        bw.write_ue(conf_win_bottom);
    } else {
        bw.write_flag(false);
    }
    bw.write_ue(0); // bit_depth_luma_minus8
    bw.write_ue(0); // bit_depth_chroma_minus8
    bw.write_ue(4); // log2_max_pic_order_cnt_lsb_minus4
    bw.write_rbsp_trailing_bits();
    bw.finish()
}

/// 插入防竞争字节
fn add_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 2);
    let mut zeros = 0;
    for &b in rbsp {
        if zeros >= 2 && b <= 0x03 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(b);
        zeros = if b == 0 { zeros + 1 } else { 0 };
    }
    out
}

/// VPS + SPS + PPS + IDR, 起始码长度混用
fn build_stream(width: u32, height: u32, conf_win_bottom: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x40, 0x01, 0x0C, 0x01, 0xFF, 0xFF]); // VPS
    data.extend_from_slice(&[0x00, 0x00, 0x01]);
    data.extend_from_slice(&add_emulation_prevention(&build_sps(width, height, conf_win_bottom)));
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x44, 0x01, 0xC1, 0x72, 0xB4]); // PPS
    data.extend_from_slice(&[0x00, 0x00, 0x01, 0x26, 0x01, 0xAF, 0x06, 0xB8]); // IDR_W_RADL
    data
}

// ============================================================
// 分辨率提取
// ============================================================

#[test]
fn test_extract_coded_size_by_default() {
    let data = build_stream(1920, 1088, 4);
    let res = extract_hevc_resolution(&data, &ExtractOptions::default()).unwrap();
    assert_eq!(res, Some(Resolution::new(1920, 1088)), "默认不应用 conformance window");
}

#[test]
fn test_extract_with_conformance_window() {
    let data = build_stream(1920, 1088, 4);
    let opts = ExtractOptions {
        apply_conformance_window: true,
        ..ExtractOptions::default()
    };
    let res = extract_resolution(CodecId::H265, &data, &opts).unwrap();
    assert_eq!(res, Some(Resolution::new(1920, 1080)), "4:2:0 下底部裁剪 2*4 行");
}

#[test]
fn test_emulation_prevention_in_ptl() {
    // compatibility flags 0x60000000 后紧跟零字节, 必然产生 00 00 03
    let raw = build_sps(1280, 720, 0);
    let escaped = add_emulation_prevention(&raw);
    assert!(escaped.len() > raw.len(), "PTL 中应插入防竞争字节");

    let data = build_stream(1280, 720, 0);
    let summary = probe_sps(CodecId::H265, &data, &ExtractOptions::default())
        .unwrap()
        .expect("应找到 SPS");
    assert_eq!(summary.resolution, Resolution::new(1280, 720));
    assert_eq!(summary.profile_idc, 1);
    assert_eq!(summary.level_idc, 120);
    assert_eq!(summary.sps_offset, 10);
    assert!(!summary.truncated);
}

#[test]
fn test_nal_split_and_direct_parse() {
    let data = build_stream(3840, 2160, 0);
    let nalus = split_hevc_annex_b(&data);
    let types: Vec<_> = nalus.iter().map(|n| n.nal_type).collect();
    assert_eq!(
        types,
        vec![
            HevcNalUnitType::Vps,
            HevcNalUnitType::Sps,
            HevcNalUnitType::Pps,
            HevcNalUnitType::IdrWRadl
        ]
    );

    let sps = parse_hevc_sps(&nalus[1].rbsp_with_header(), TruncationPolicy::Strict).unwrap();
    assert_eq!(sps.max_sub_layers, 2);
    assert_eq!(sps.coded_size(), (3840, 2160));
    assert!(!sps.has_conformance_window());
}

#[test]
fn test_extract_not_found() {
    let opts = ExtractOptions::default();
    // 只有 VPS 和 PPS
    let data = [
        0x00, 0x00, 0x01, 0x40, 0x01, 0x0C, 0x00, 0x00, 0x01, 0x44, 0x01, 0xC1,
    ];
    assert_eq!(extract_hevc_resolution(&data, &opts).unwrap(), None);
    assert_eq!(extract_hevc_resolution(&[], &opts).unwrap(), None);
    assert_eq!(extract_hevc_resolution(&[0u8; 64], &opts).unwrap(), None);
}

#[test]
fn test_extract_truncated_sps() {
    let full = build_stream(1920, 1080, 0);
    // VPS (10 字节) + 起始码 (3 字节) + SPS 前 12 字节, 截断在 PTL 中
    let cut = &full[..25];

    assert!(extract_hevc_resolution(cut, &ExtractOptions::default()).is_err());

    let tolerant = ExtractOptions {
        truncation: TruncationPolicy::Tolerant,
        ..ExtractOptions::default()
    };
    let summary = probe_sps(CodecId::H265, cut, &tolerant)
        .expect("容错模式不应报错")
        .expect("应找到 SPS");
    assert!(summary.truncated);
    assert_eq!(summary.profile_idc, 1);
}

#[test]
fn test_truncated_sps_without_window_when_cropping() {
    // SPS 在 profile_tier_level 中截断, 尺寸与 conformance_window_flag 都读为 0
    let data = [0x00, 0x00, 0x01, 0x42, 0x01, 0x01, 0x01, 0x60, 0x00];
    let opts = ExtractOptions {
        truncation: TruncationPolicy::Tolerant,
        apply_conformance_window: true,
    };
    let summary = probe_sps(CodecId::H265, &data, &opts)
        .expect("没有 conformance window 时裁剪不应报错")
        .expect("应找到 SPS");
    assert!(summary.truncated);
    assert_eq!(summary.resolution, Resolution::new(0, 0));

    let strict = ExtractOptions {
        apply_conformance_window: true,
        ..ExtractOptions::default()
    };
    assert!(extract_hevc_resolution(&data, &strict).is_err());
}

#[test]
fn test_invalid_conformance_window() {
    // 裁剪 2*600 行超过 1080
    let data = build_stream(1920, 1080, 600);
    let opts = ExtractOptions {
        apply_conformance_window: true,
        ..ExtractOptions::default()
    };
    assert!(extract_hevc_resolution(&data, &opts).is_err());
    // 不裁剪时仍返回编码尺寸
    assert_eq!(
        extract_hevc_resolution(&data, &ExtractOptions::default()).unwrap(),
        Some(Resolution::new(1920, 1080))
    );
}

// ============================================================
// 探测与解码器配置
// ============================================================

#[test]
fn test_probe_hevc_stream() {
    let data = build_stream(1920, 1080, 0);
    let result = detect_codec(&data).expect("应识别为 HEVC");
    assert_eq!(result.codec_id, CodecId::H265);

    // 扩展名写错时以内容为准
    let result = probe_codec(&data, Some("clip.264")).unwrap();
    assert_eq!(result.codec_id, CodecId::H265);
}

#[test]
fn test_decoder_config() {
    let data = Bytes::from(build_stream(1920, 1088, 4));
    let opts = ExtractOptions {
        apply_conformance_window: true,
        ..ExtractOptions::default()
    };
    let config = DecoderConfig::from_stream(CodecId::H265, &data, &opts).unwrap();
    assert_eq!(config.codec_id.name(), "hevc");
    assert_eq!(config.resolution, Resolution::new(1920, 1080));

    let sets = &config.parameter_sets;
    assert!(sets.is_complete());
    assert_eq!(sets.iter().count(), 3);
    assert_eq!(sets.vps.as_deref(), Some(&data[..10]));
    assert_eq!(&sets.sps.as_ref().unwrap()[..5], &[0x00, 0x00, 0x01, 0x42, 0x01]);

    // 去掉 VPS 后参数集不完整
    let without_vps = data.slice(10..);
    assert_eq!(collect_parameter_sets(CodecId::H265, &without_vps).missing(), vec!["VPS"]);
    assert!(DecoderConfig::from_stream(CodecId::H265, &without_vps, &opts).is_err());
}
