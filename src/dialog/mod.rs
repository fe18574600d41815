//! Guided dialogue engine
//!
//! Sequences the fixed information-gathering steps, validates answers,
//! and canonicalizes them into [`CollectedInfo`]. The step order is a
//! contract: product info, product detail, age, gender, interest, tone.
//!
//! Single-select and free-text steps advance on one answer. Multi-select
//! steps accumulate toggles and advance on an explicit confirmation;
//! confirming an empty selection is a validation error. After the last
//! step the engine reports [`Advance::Ready`] and rejects further
//! structured answers - from then on input belongs to the modification
//! path (intent classification).

pub mod transforms;

use serde::Serialize;

use crate::conversation::Message;
use transforms::{
    canonical_ages, canonical_category, canonical_genders, canonical_interests, canonical_tone,
    split_product_detail, AUTO_ANALYZE, AUTO_TONE, NO_PREFERENCE,
};

/// Answer accumulator for one conversation. Fields stay `None`/empty
/// until their step is confirmed; multi-select fields always hold
/// canonical codes, never display labels.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectedInfo {
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub category: Option<String>,
    pub target_ages: Vec<String>,
    pub target_genders: Vec<String>,
    pub target_interests: Vec<String>,
    pub copy_tone: Option<String>,
    /// Stored-asset reference returned by the upload gateway. Survives
    /// regeneration so later image passes reuse it without re-uploading.
    pub product_image_path: Option<String>,
}

/// Identifies one step of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKey {
    ProductInfo,
    ProductDetail,
    TargetAge,
    TargetGender,
    TargetInterest,
    CopyTone,
}

/// How a step collects its answer, with the transform that
/// canonicalizes it into [`CollectedInfo`].
#[derive(Clone)]
pub enum StepKind {
    /// One option (or free text standing in for an option).
    SingleSelect {
        options: &'static [&'static str],
        apply: fn(&str, &mut CollectedInfo),
    },
    /// Toggled set plus explicit confirmation.
    MultiSelect {
        options: &'static [&'static str],
        apply: fn(&[String], &mut CollectedInfo),
    },
    /// Raw text.
    FreeText { apply: fn(&str, &mut CollectedInfo) },
}

#[derive(Clone)]
pub struct ConversationStep {
    pub key: StepKey,
    pub prompt: &'static str,
    pub kind: StepKind,
}

impl ConversationStep {
    pub fn options(&self) -> Option<&'static [&'static str]> {
        match &self.kind {
            StepKind::SingleSelect { options, .. } | StepKind::MultiSelect { options, .. } => {
                Some(options)
            }
            StepKind::FreeText { .. } => None,
        }
    }

    pub fn allows_multiple(&self) -> bool {
        matches!(self.kind, StepKind::MultiSelect { .. })
    }

    fn prompt_message(&self) -> Message {
        let msg = Message::assistant(self.prompt);
        match self.options() {
            Some(options) => msg.with_options(options.iter().map(|o| o.to_string()).collect()),
            None => msg,
        }
    }
}

/// The fixed step sequence.
pub fn conversation_flow() -> Vec<ConversationStep> {
    vec![
        ConversationStep {
            key: StepKey::ProductInfo,
            prompt: "어떤 제품이나 서비스의 마케팅 콘텐츠를 만들어드릴까요?\n\n아래에서 카테고리를 선택하거나 직접 입력해주세요.",
            kind: StepKind::SingleSelect {
                options: &[
                    "뷰티/화장품",
                    "패션/의류",
                    "식품/음료",
                    "건강/헬스",
                    "IT/전자제품",
                    "라이프스타일",
                    "직접 입력",
                ],
                apply: |answer, info| {
                    info.category = Some(canonical_category(answer));
                },
            },
        },
        ConversationStep {
            key: StepKey::ProductDetail,
            prompt: "제품명과 간단한 설명을 알려주세요.\n\n예: \"프리미엄 핸드크림 - 자연 유래 성분으로 만든 고보습 핸드크림\"",
            kind: StepKind::FreeText {
                apply: |answer, info| {
                    let (name, description) = split_product_detail(answer);
                    info.product_name = Some(name);
                    info.product_description = Some(description);
                },
            },
        },
        ConversationStep {
            key: StepKey::TargetAge,
            prompt: "타겟 연령대를 선택해주세요. (여러 개 선택 가능)",
            kind: StepKind::MultiSelect {
                options: &["10대", "20대", "30대", "40대", "50대 이상", AUTO_ANALYZE],
                apply: |selected, info| {
                    info.target_ages = canonical_ages(selected);
                },
            },
        },
        ConversationStep {
            key: StepKey::TargetGender,
            prompt: "타겟 성별을 선택해주세요. (여러 개 선택 가능)",
            kind: StepKind::MultiSelect {
                options: &["여성", "남성", NO_PREFERENCE],
                apply: |selected, info| {
                    info.target_genders = canonical_genders(selected);
                },
            },
        },
        ConversationStep {
            key: StepKey::TargetInterest,
            prompt: "타겟의 관심사를 선택해주세요. (여러 개 선택 가능)",
            kind: StepKind::MultiSelect {
                options: &[
                    "뷰티",
                    "패션",
                    "건강",
                    "운동",
                    "자기관리",
                    "트렌드",
                    "품질",
                    "가성비",
                    AUTO_ANALYZE,
                ],
                apply: |selected, info| {
                    info.target_interests = canonical_interests(selected);
                },
            },
        },
        ConversationStep {
            key: StepKey::CopyTone,
            prompt: "원하시는 카피 스타일을 선택해주세요.",
            kind: StepKind::SingleSelect {
                options: &["프로페셔널", "캐주얼", "임팩트", AUTO_TONE],
                apply: |answer, info| {
                    info.copy_tone = Some(canonical_tone(answer));
                },
            },
        },
    ]
}

/// Result of a successful advance.
#[derive(Debug, Clone)]
pub enum Advance {
    /// The next step's prompt, ready to append to the transcript.
    Next(Message),
    /// All steps answered; the collected info is ready for generation.
    Ready,
}

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("최소 1개 이상 선택해주세요.")]
    EmptySelection,

    #[error("이 단계는 선택 완료 버튼으로 확정해주세요.")]
    RequiresConfirmation,

    #[error("이 단계는 선택지를 눌러 선택하는 단계가 아닙니다.")]
    NotMultiSelect,

    #[error("선택지에 없는 항목입니다: {0}")]
    UnknownOption(String),

    #[error("모든 단계가 완료되었습니다.")]
    FlowComplete,
}

pub struct DialogEngine {
    steps: Vec<ConversationStep>,
    current: usize,
    pending_selection: Vec<String>,
}

impl DialogEngine {
    pub fn new() -> Self {
        Self {
            steps: conversation_flow(),
            current: 0,
            pending_selection: Vec::new(),
        }
    }

    pub fn current_step(&self) -> Option<&ConversationStep> {
        self.steps.get(self.current)
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.steps.len()
    }

    /// The opening assistant message for a fresh conversation.
    pub fn first_prompt(&self) -> Message {
        self.steps[0].prompt_message()
    }

    /// In-progress multi-select toggles for the current step.
    pub fn selection(&self) -> &[String] {
        &self.pending_selection
    }

    /// Record a single-select or free-text answer, canonicalize it into
    /// `info`, and move to the next step.
    pub fn advance(
        &mut self,
        answer: &str,
        info: &mut CollectedInfo,
    ) -> Result<Advance, DialogError> {
        let step = self.current_step().ok_or(DialogError::FlowComplete)?;

        match &step.kind {
            StepKind::SingleSelect { apply, .. } | StepKind::FreeText { apply } => {
                apply(answer, info);
            }
            StepKind::MultiSelect { .. } => return Err(DialogError::RequiresConfirmation),
        }

        tracing::debug!(step = ?step.key, "step answered");
        Ok(self.step_forward())
    }

    /// Toggle an option of the current multi-select step. Returns the
    /// updated selection; does not advance.
    pub fn toggle(&mut self, option: &str) -> Result<&[String], DialogError> {
        let step = self.current_step().ok_or(DialogError::FlowComplete)?;
        if !step.allows_multiple() {
            return Err(DialogError::NotMultiSelect);
        }
        // Only listed labels toggle; typos must not leak through the
        // canonicalization pass-through arms into collected values.
        if !step.options().unwrap_or(&[]).contains(&option) {
            return Err(DialogError::UnknownOption(option.to_string()));
        }

        if let Some(pos) = self.pending_selection.iter().position(|s| s == option) {
            self.pending_selection.remove(pos);
        } else {
            self.pending_selection.push(option.to_string());
        }
        Ok(&self.pending_selection)
    }

    /// Confirm the current multi-select step, canonicalizing the
    /// toggled set into `info`.
    pub fn confirm(&mut self, info: &mut CollectedInfo) -> Result<Advance, DialogError> {
        let step = self.current_step().ok_or(DialogError::FlowComplete)?;

        let apply = match &step.kind {
            StepKind::MultiSelect { apply, .. } => *apply,
            _ => return Err(DialogError::NotMultiSelect),
        };
        if self.pending_selection.is_empty() {
            return Err(DialogError::EmptySelection);
        }

        apply(&self.pending_selection, info);
        tracing::debug!(step = ?step.key, selected = ?self.pending_selection, "multi-select confirmed");
        self.pending_selection.clear();
        Ok(self.step_forward())
    }

    fn step_forward(&mut self) -> Advance {
        self.current += 1;
        match self.steps.get(self.current) {
            Some(step) => Advance::Next(step.prompt_message()),
            None => Advance::Ready,
        }
    }
}

impl Default for DialogEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the full six-step flow with typical answers.
    fn run_full_flow(info: &mut CollectedInfo) -> DialogEngine {
        let mut engine = DialogEngine::new();

        engine.advance("뷰티/화장품", info).unwrap();
        engine.advance("핸드크림 - 고보습 크림", info).unwrap();

        engine.toggle("20대").unwrap();
        engine.toggle("30대").unwrap();
        engine.confirm(info).unwrap();

        engine.toggle(NO_PREFERENCE).unwrap();
        engine.confirm(info).unwrap();

        engine.toggle("뷰티").unwrap();
        engine.confirm(info).unwrap();

        match engine.advance("프로페셔널", info).unwrap() {
            Advance::Ready => {}
            other => panic!("expected Ready, got {:?}", other),
        }
        engine
    }

    #[test]
    fn test_full_flow_canonicalizes_everything() {
        let mut info = CollectedInfo::default();
        let engine = run_full_flow(&mut info);

        assert!(engine.is_complete());
        assert_eq!(info.category.as_deref(), Some("beauty"));
        assert_eq!(info.product_name.as_deref(), Some("핸드크림"));
        assert_eq!(info.product_description.as_deref(), Some("고보습 크림"));
        assert_eq!(info.target_ages, vec!["20-29", "30-39"]);
        assert_eq!(info.target_genders, vec!["여성", "남성"]);
        assert_eq!(info.target_interests, vec!["뷰티"]);
        assert_eq!(info.copy_tone.as_deref(), Some("professional"));
    }

    #[test]
    fn test_empty_confirm_is_validation_error() {
        let mut engine = DialogEngine::new();
        let mut info = CollectedInfo::default();
        engine.advance("패션/의류", &mut info).unwrap();
        engine.advance("셔츠 - 린넨 셔츠", &mut info).unwrap();

        // Now at target_age, nothing toggled.
        assert!(matches!(
            engine.confirm(&mut info),
            Err(DialogError::EmptySelection)
        ));
        // Did not advance.
        assert_eq!(engine.current_step().unwrap().key, StepKey::TargetAge);
    }

    #[test]
    fn test_toggle_twice_deselects() {
        let mut engine = DialogEngine::new();
        let mut info = CollectedInfo::default();
        engine.advance("패션/의류", &mut info).unwrap();
        engine.advance("셔츠", &mut info).unwrap();

        engine.toggle("20대").unwrap();
        engine.toggle("20대").unwrap();
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_toggle_rejects_unknown_label() {
        let mut engine = DialogEngine::new();
        let mut info = CollectedInfo::default();
        engine.advance("패션/의류", &mut info).unwrap();
        engine.advance("셔츠", &mut info).unwrap();

        // Typo of "20대"; must not ride through to target_ages.
        assert!(matches!(
            engine.toggle("20데"),
            Err(DialogError::UnknownOption(_))
        ));
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_advance_rejected_on_multi_step() {
        let mut engine = DialogEngine::new();
        let mut info = CollectedInfo::default();
        engine.advance("패션/의류", &mut info).unwrap();
        engine.advance("셔츠", &mut info).unwrap();

        assert!(matches!(
            engine.advance("20대", &mut info),
            Err(DialogError::RequiresConfirmation)
        ));
    }

    #[test]
    fn test_no_structured_answers_after_completion() {
        let mut info = CollectedInfo::default();
        let mut engine = run_full_flow(&mut info);

        assert!(matches!(
            engine.advance("뭐든지", &mut info),
            Err(DialogError::FlowComplete)
        ));
    }

    #[test]
    fn test_next_prompt_carries_options() {
        let mut engine = DialogEngine::new();
        let mut info = CollectedInfo::default();
        match engine.advance("뷰티/화장품", &mut info).unwrap() {
            Advance::Next(msg) => {
                // product_detail is free text: no options.
                assert!(msg.options.is_none());
                assert!(msg.content.contains("제품명"));
            }
            other => panic!("expected Next, got {:?}", other),
        }
    }

    #[test]
    fn test_auto_sentinel_never_survives_into_info() {
        let mut engine = DialogEngine::new();
        let mut info = CollectedInfo::default();
        engine.advance("뷰티/화장품", &mut info).unwrap();
        engine.advance("핸드크림 - 크림", &mut info).unwrap();

        engine.toggle(AUTO_ANALYZE).unwrap();
        engine.confirm(&mut info).unwrap();
        assert!(info.target_ages.is_empty());
    }

    #[test]
    fn test_serialized_info_has_only_canonical_keys() {
        let mut info = CollectedInfo::default();
        run_full_flow(&mut info);

        let json = serde_json::to_value(&info).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in &keys {
            assert!(
                [
                    "product_name",
                    "product_description",
                    "category",
                    "target_ages",
                    "target_genders",
                    "target_interests",
                    "copy_tone",
                    "product_image_path",
                ]
                .contains(key),
                "unexpected key {}",
                key
            );
        }
    }
}
