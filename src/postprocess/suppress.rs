// 该文件是 Fenjian （分拣） 项目的一部分。
// src/postprocess/suppress.rs - 非极大值抑制
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use tracing::debug;

use crate::postprocess::{Candidate, Detection};

const NMS_SCORE_THRESH: f32 = 0.5;
const NMS_OVERLAP_THRESH: f32 = 0.4;

/// 贪心非极大值抑制
///
/// 默认不区分类别：不同类别的框重叠足够多时同样会相互抑制。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Suppressor {
  pub score_threshold: f32,
  pub overlap_threshold: f32,
  pub class_aware: bool,
}

impl Default for Suppressor {
  fn default() -> Self {
    Self {
      score_threshold: NMS_SCORE_THRESH,
      overlap_threshold: NMS_OVERLAP_THRESH,
      class_aware: false,
    }
  }
}

impl Suppressor {
  pub fn new(score_threshold: f32, overlap_threshold: f32) -> Self {
    Self {
      score_threshold,
      overlap_threshold,
      ..Default::default()
    }
  }

  pub fn class_aware(mut self, class_aware: bool) -> Self {
    self.class_aware = class_aware;
    self
  }

  fn overlaps(&self, kept: &Candidate, other: &Candidate) -> bool {
    if self.class_aware && kept.class_id != other.class_id {
      return false;
    }
    kept.bbox.iou(&other.bbox) > self.overlap_threshold
  }

  /// 返回保留下来的检测结果，按置信度从高到低排列
  pub fn suppress(&self, candidates: Vec<Candidate>) -> Vec<Detection> {
    let mut remaining: Vec<Candidate> = candidates
      .into_iter()
      .filter(|c| c.confidence >= self.score_threshold)
      .collect();

    // 稳定排序，置信度相同时保持原有顺序
    remaining.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = Vec::new();
    while !remaining.is_empty() {
      let best = remaining.remove(0);
      remaining.retain(|other| !self.overlaps(&best, other));
      kept.push(Detection::from(best));
    }

    debug!("非极大值抑制后保留 {} 个检测结果", kept.len());
    kept
  }
}
