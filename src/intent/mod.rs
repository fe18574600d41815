//! Modification-request intent classification
//!
//! Once generation has completed, every further user input is a
//! modification request. Exact menu phrases map directly to an action;
//! anything else goes through a pluggable [`IntentClassifier`] that
//! decides how much to regenerate. The default implementation is a
//! keyword-membership heuristic; swapping in a model-based classifier
//! only requires another trait impl.

use serde::Deserialize;

use crate::dialog::transforms::canonical_tone;

/// Which backend operation a modification request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateOp {
    All,
    Image,
    Copy,
}

impl RegenerateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegenerateOp::All => "all",
            RegenerateOp::Image => "image",
            RegenerateOp::Copy => "copy",
        }
    }
}

/// Resolved modification action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationAction {
    /// Regenerate; free-text requests carry the original text as a
    /// custom instruction for the backend.
    Regenerate {
        op: RegenerateOp,
        custom_request: Option<String>,
    },
    /// Show the tone submenu instead of regenerating anything.
    ToneMenu,
    /// Regenerate the copy with an explicitly chosen tone code.
    ChangeTone(String),
    /// Discard everything and restart the conversation.
    StartOver,
}

/// Menu options offered after a successful generation.
pub const MODIFICATION_OPTIONS: [&str; 5] = [
    "새 콘텐츠 생성",
    "전체 다시 생성",
    "이미지만 다시 생성",
    "카피만 다시 생성",
    "카피 톤 변경",
];

/// Tone submenu options.
pub const TONE_OPTIONS: [&str; 3] = ["프로페셔널", "캐주얼", "임팩트"];

/// Classifies free text into a regeneration operation.
///
/// Implementations must be pure: the same text always yields the same
/// operation.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> RegenerateOp;
}

/// Default keyword sets for [`KeywordClassifier`].
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSets {
    pub image: Vec<String>,
    pub copy: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        let to_vec = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            image: to_vec(&[
                "이미지", "사진", "그림", "비주얼", "디자인", "색상", "배경", "튜브형", "병",
                "용기", "패키지", "옷", "상의", "하의", "의상", "스타일", "모델", "사람", "포즈",
                "장소", "분위기", "조명", "느낌",
            ]),
            copy: to_vec(&["카피", "문구", "텍스트", "글", "메시지", "헤드라인", "슬로건"]),
        }
    }
}

/// Keyword-membership heuristic.
///
/// Image keywords without copy keywords narrows to image-only; copy
/// keywords without image keywords narrows to copy-only; both, neither,
/// or ambiguous regenerates everything - ambiguity is treated
/// conservatively.
pub struct KeywordClassifier {
    keywords: KeywordSets,
}

impl KeywordClassifier {
    pub fn new(keywords: KeywordSets) -> Self {
        Self { keywords }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(KeywordSets::default())
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> RegenerateOp {
        let lower = text.to_lowercase();
        let has_image = self.keywords.image.iter().any(|k| lower.contains(k.as_str()));
        let has_copy = self.keywords.copy.iter().any(|k| lower.contains(k.as_str()));

        match (has_image, has_copy) {
            (true, false) => RegenerateOp::Image,
            (false, true) => RegenerateOp::Copy,
            _ => RegenerateOp::All,
        }
    }
}

/// Resolve a post-generation input: exact menu phrases first, then the
/// classifier heuristic for free text.
pub fn resolve_action(text: &str, classifier: &dyn IntentClassifier) -> ModificationAction {
    match text {
        "새 콘텐츠 생성" => ModificationAction::StartOver,
        "전체 다시 생성" => ModificationAction::Regenerate {
            op: RegenerateOp::All,
            custom_request: None,
        },
        "이미지만 다시 생성" => ModificationAction::Regenerate {
            op: RegenerateOp::Image,
            custom_request: None,
        },
        "카피만 다시 생성" => ModificationAction::Regenerate {
            op: RegenerateOp::Copy,
            custom_request: None,
        },
        "카피 톤 변경" => ModificationAction::ToneMenu,
        tone if TONE_OPTIONS.contains(&tone) => {
            ModificationAction::ChangeTone(canonical_tone(tone))
        }
        free_text => ModificationAction::Regenerate {
            op: classifier.classify(free_text),
            custom_request: Some(free_text.to_string()),
        },
    }
}
