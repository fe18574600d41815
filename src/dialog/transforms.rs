//! Label canonicalization
//!
//! Every function here maps the user-facing label of one step to the
//! code the backend expects. They are pure and idempotent: feeding a
//! function its own output returns it unchanged, so re-running a step
//! can never corrupt collected values.

/// Sentinel option meaning "let the backend infer this field".
pub const AUTO_ANALYZE: &str = "AI가 자동 분석";
/// Sentinel tone option meaning "let the backend pick".
pub const AUTO_TONE: &str = "AI가 자동 선택";
/// Gender option meaning "no preference".
pub const NO_PREFERENCE: &str = "무관";
/// The full set of named genders, substituted for "무관".
pub const ALL_GENDERS: [&str; 2] = ["여성", "남성"];

const TONE_CODES: [&str; 4] = ["professional", "casual", "impact", "auto"];

/// Category label to category code. Unmapped labels (free-text
/// categories) are lowercased and used verbatim.
pub fn canonical_category(label: &str) -> String {
    match label {
        "뷰티/화장품" => "beauty".into(),
        "패션/의류" => "fashion".into(),
        "식품/음료" => "food".into(),
        "건강/헬스" => "health".into(),
        "IT/전자제품" => "tech".into(),
        "라이프스타일" => "lifestyle".into(),
        "직접 입력" => "other".into(),
        other => other.to_lowercase(),
    }
}

/// Split "name - description" on the first `-`.
///
/// Left side trimmed is the product name, falling back to the first
/// whitespace token, falling back to the whole answer. Right side
/// trimmed is the description, falling back to the whole answer.
pub fn split_product_detail(answer: &str) -> (String, String) {
    match answer.split_once('-') {
        Some((name, desc)) => {
            let name = name.trim();
            let name = if name.is_empty() {
                answer
                    .split_whitespace()
                    .next()
                    .unwrap_or(answer)
                    .to_string()
            } else {
                name.to_string()
            };
            let desc = desc.trim();
            let desc = if desc.is_empty() {
                answer.to_string()
            } else {
                desc.to_string()
            };
            (name, desc)
        }
        None => {
            let name = answer
                .split_whitespace()
                .next()
                .unwrap_or(answer)
                .to_string();
            (name, answer.to_string())
        }
    }
}

/// Age labels to canonical ranges. The auto sentinel empties the set
/// so the backend infers the target ages itself.
pub fn canonical_ages(selected: &[String]) -> Vec<String> {
    if selected.iter().any(|s| s == AUTO_ANALYZE) {
        return Vec::new();
    }
    selected
        .iter()
        .map(|label| match label.as_str() {
            "10대" => "10-19".into(),
            "20대" => "20-29".into(),
            "30대" => "30-39".into(),
            "40대" => "40-49".into(),
            "50대 이상" => "50+".into(),
            other => other.to_string(),
        })
        .collect()
}

/// "무관" expands to the full named-gender set; anything else passes
/// through unchanged.
pub fn canonical_genders(selected: &[String]) -> Vec<String> {
    if selected.iter().any(|s| s == NO_PREFERENCE) {
        ALL_GENDERS.iter().map(|g| g.to_string()).collect()
    } else {
        selected.to_vec()
    }
}

/// Same empty-set-on-sentinel rule as ages; labels pass through.
pub fn canonical_interests(selected: &[String]) -> Vec<String> {
    if selected.iter().any(|s| s == AUTO_ANALYZE) {
        Vec::new()
    } else {
        selected.to_vec()
    }
}

/// Tone label to tone code. Already-canonical codes pass through;
/// anything else falls back to the default tone.
pub fn canonical_tone(label: &str) -> String {
    match label {
        "프로페셔널" => "professional".into(),
        "캐주얼" => "casual".into(),
        "임팩트" => "impact".into(),
        AUTO_TONE => "auto".into(),
        code if TONE_CODES.contains(&code) => code.into(),
        _ => "professional".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_category_mapping_and_fallback() {
        assert_eq!(canonical_category("뷰티/화장품"), "beauty");
        assert_eq!(canonical_category("직접 입력"), "other");
        assert_eq!(canonical_category("Pet Supplies"), "pet supplies");
    }

    #[test]
    fn test_product_detail_split() {
        let (name, desc) = split_product_detail("핸드크림 - 고보습 크림");
        assert_eq!(name, "핸드크림");
        assert_eq!(desc, "고보습 크림");
    }

    #[test]
    fn test_product_detail_without_dash() {
        let (name, desc) = split_product_detail("프리미엄 핸드크림");
        assert_eq!(name, "프리미엄");
        assert_eq!(desc, "프리미엄 핸드크림");
    }

    #[test]
    fn test_product_detail_empty_sides() {
        let (name, desc) = split_product_detail("핸드크림 -");
        assert_eq!(name, "핸드크림");
        assert_eq!(desc, "핸드크림 -");
    }

    #[test]
    fn test_age_mapping() {
        assert_eq!(canonical_ages(&v(&["20대", "30대"])), v(&["20-29", "30-39"]));
    }

    #[test]
    fn test_age_auto_sentinel_empties_set() {
        let ages = canonical_ages(&v(&["20대", AUTO_ANALYZE]));
        assert!(ages.is_empty());
    }

    #[test]
    fn test_gender_no_preference_expands() {
        assert_eq!(canonical_genders(&v(&[NO_PREFERENCE])), v(&["여성", "남성"]));
        assert_eq!(canonical_genders(&v(&["여성"])), v(&["여성"]));
    }

    #[test]
    fn test_interest_auto_sentinel_empties_set() {
        assert!(canonical_interests(&v(&[AUTO_ANALYZE])).is_empty());
        assert_eq!(canonical_interests(&v(&["뷰티", "트렌드"])), v(&["뷰티", "트렌드"]));
    }

    #[test]
    fn test_tone_mapping_and_fallback() {
        assert_eq!(canonical_tone("캐주얼"), "casual");
        assert_eq!(canonical_tone(AUTO_TONE), "auto");
        assert_eq!(canonical_tone("아무거나"), "professional");
    }

    #[test]
    fn test_transforms_idempotent_on_own_output() {
        assert_eq!(canonical_category(&canonical_category("패션/의류")), "fashion");
        assert_eq!(canonical_tone(&canonical_tone("임팩트")), "impact");

        let once = canonical_ages(&v(&["20대"]));
        assert_eq!(canonical_ages(&once), once);
        assert_eq!(once, v(&["20-29"]));

        let genders = canonical_genders(&v(&[NO_PREFERENCE]));
        assert_eq!(canonical_genders(&genders), genders);
    }
}
