use crate::core::config::DedupConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum SlideState {
    /// 还没有出现过有内容的帧
    Idle,
    Open { index: usize, opened_at: f64, pts: f64 },
}

impl SlideState {
    pub fn new() -> Self {
        SlideState::Idle
    }

    /// `similarity` 是当前帧与打开的幻灯片的相似度，Idle 时为 None
    pub fn transition(
        &self,
        pts: f64,
        has_content: bool,
        similarity: Option<f32>,
        config: &DedupConfig,
    ) -> (SlideState, SlideAction) {
        if !has_content {
            return (self.clone(), SlideAction::Skip);
        }

        match self {
            SlideState::Idle => (
                SlideState::Open {
                    index: 0,
                    opened_at: pts,
                    pts,
                },
                SlideAction::Open,
            ),

            SlideState::Open {
                index, opened_at, ..
            } => {
                let similarity = similarity.unwrap_or(0.0);
                if similarity > config.similarity_threshold {
                    (
                        SlideState::Open {
                            index: *index,
                            opened_at: *opened_at,
                            pts,
                        },
                        SlideAction::Refresh,
                    )
                } else {
                    (
                        SlideState::Open {
                            index: index + 1,
                            opened_at: pts,
                            pts,
                        },
                        SlideAction::Transition,
                    )
                }
            }
        }
    }
}

impl Default for SlideState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlideAction {
    /// 无内容帧，不改变状态
    Skip,
    /// 打开第一张幻灯片
    Open,
    /// 同一张幻灯片，用当前帧覆盖
    Refresh,
    /// 结束当前幻灯片并打开新的一张
    Transition,
}

pub struct SlideStateMachine {
    state: SlideState,
    config: DedupConfig,
}

impl SlideStateMachine {
    pub fn new() -> Self {
        Self::with_config(DedupConfig::default())
    }

    pub fn with_config(config: DedupConfig) -> Self {
        Self {
            state: SlideState::new(),
            config,
        }
    }

    pub fn process_frame(
        &mut self,
        pts: f64,
        has_content: bool,
        similarity: Option<f32>,
    ) -> SlideAction {
        let (new_state, action) = self
            .state
            .transition(pts, has_content, similarity, &self.config);
        self.state = new_state;

        action
    }

    /// 已打开过的幻灯片数量（含当前打开的）
    pub fn slide_count(&self) -> usize {
        match self.state {
            SlideState::Idle => 0,
            SlideState::Open { index, .. } => index + 1,
        }
    }
}

impl Default for SlideStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(index: usize, opened_at: f64, pts: f64) -> SlideState {
        SlideState::Open {
            index,
            opened_at,
            pts,
        }
    }

    #[test]
    fn test_idle_to_open() {
        let config = DedupConfig::default();
        let (state, action) = SlideState::Idle.transition(0.0, true, None, &config);
        assert_eq!(action, SlideAction::Open);
        assert_eq!(state, open(0, 0.0, 0.0));

        let mut sm = SlideStateMachine::new();
        assert_eq!(sm.slide_count(), 0);
        assert_eq!(sm.process_frame(0.0, true, None), SlideAction::Open);
        assert_eq!(sm.slide_count(), 1);
    }

    #[test]
    fn test_contentless_frame_skipped() {
        let config = DedupConfig::default();
        let (state, action) = SlideState::Idle.transition(0.0, false, None, &config);
        assert_eq!(action, SlideAction::Skip);
        assert_eq!(state, SlideState::Idle);

        let current = open(0, 5.0, 5.0);
        let (state, action) = current.transition(10.0, false, Some(0.0), &config);
        assert_eq!(action, SlideAction::Skip);
        assert_eq!(state, current);
    }

    #[test]
    fn test_similar_frame_refreshes_pts_only() {
        let config = DedupConfig::default();
        let (state, action) = open(0, 0.0, 0.0).transition(5.0, true, Some(0.95), &config);
        assert_eq!(action, SlideAction::Refresh);
        assert_eq!(state, open(0, 0.0, 5.0));

        let mut sm = SlideStateMachine::new();
        sm.process_frame(0.0, true, None);
        sm.process_frame(5.0, true, Some(0.95));
        assert_eq!(sm.slide_count(), 1);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let config = DedupConfig::default();
        let threshold = config.similarity_threshold;
        let (state, action) = open(0, 0.0, 0.0).transition(5.0, true, Some(threshold), &config);
        assert_eq!(action, SlideAction::Transition);
        assert_eq!(state, open(1, 5.0, 5.0));
    }

    #[test]
    fn test_slide_count_monotonic() {
        let mut sm = SlideStateMachine::new();
        let script = [
            (true, None),
            (true, Some(0.9)),
            (false, None),
            (true, Some(0.1)),
            (true, Some(0.8)),
            (true, Some(0.2)),
        ];

        let mut last = 0;
        for (i, (has_content, sim)) in script.into_iter().enumerate() {
            sm.process_frame(i as f64 * 5.0, has_content, sim);
            assert!(sm.slide_count() >= last);
            assert!(sm.slide_count() <= last + 1);
            last = sm.slide_count();
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn test_custom_threshold() {
        let mut sm = SlideStateMachine::with_config(DedupConfig {
            similarity_threshold: 0.5,
            ..Default::default()
        });
        sm.process_frame(0.0, true, None);
        assert_eq!(sm.process_frame(5.0, true, Some(0.6)), SlideAction::Refresh);
        assert_eq!(sm.process_frame(10.0, true, Some(0.5)), SlideAction::Transition);
        assert_eq!(sm.slide_count(), 2);
    }
}
