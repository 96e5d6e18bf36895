//! Style catalogue: the fixed set of tone targets and their instruction text.
//!
//! Both template sets are compile-time constants. The local model gets the
//! long rule lists (small models need them spelled out); the hosted API only
//! gets a one-line directive.

use std::fmt;
use std::str::FromStr;

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Formal,
    Casual,
    Polite,
    Cute,
}

/// How a deployment treats a style label outside the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylePolicy {
    /// Substitute the given style.
    Fallback(Style),
    /// Reject with `GenerationError::UnknownStyle`.
    Strict,
}

impl StylePolicy {
    pub fn resolve(self, label: &str) -> Result<Style, GenerationError> {
        match (label.parse::<Style>(), self) {
            (Ok(style), _) => Ok(style),
            (Err(_), StylePolicy::Fallback(default)) => {
                tracing::debug!("Unknown style {label:?}, falling back to {default}");
                Ok(default)
            }
            (Err(e), StylePolicy::Strict) => Err(e),
        }
    }
}

impl Style {
    pub const ALL: [Style; 4] = [Style::Formal, Style::Casual, Style::Polite, Style::Cute];

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Formal => "formal",
            Style::Casual => "casual",
            Style::Polite => "polite",
            Style::Cute => "cute",
        }
    }

    /// Styles whose output gets decorative symbols appended.
    pub fn is_decorative(self) -> bool {
        matches!(self, Style::Cute)
    }

    /// Detailed rewrite instruction for the local model.
    pub fn rules(self) -> &'static str {
        match self {
            Style::Formal => FORMAL_RULES,
            Style::Casual => CASUAL_RULES,
            Style::Polite => POLITE_RULES,
            Style::Cute => CUTE_RULES,
        }
    }

    /// One-line directive for the hosted chat API.
    pub fn directive(self) -> &'static str {
        match self {
            Style::Formal => "격식있고 공식적인 어투로 변환해주세요.",
            Style::Casual => "친근하고 편안한 어투로 변환해주세요.",
            Style::Polite => "매우 공손하고 예의바른 어투로 변환해주세요.",
            Style::Cute => "귀엽고 애교있는 어투로 변환해주세요.",
        }
    }
}

const FORMAL_RULES: &str = "\
다음 문장을 격식있고 공적인 말투로 변환해주세요.

규칙:
1. '-습니다', '-입니다' 등의 격식체 사용
2. 정중하고 예의바른 톤 유지
3. 불필요한 존댓말은 제외";

const CASUAL_RULES: &str = "\
다음 문장을 친근하고 편안한 말투로 변환해주세요.

규칙:
1. '-야', '-어' 등의 반말 사용
2. 자연스럽고 일상적인 표현 사용
3. 너무 격식없지 않게 유지";

const POLITE_RULES: &str = "\
다음 문장을 매우 공손하고 예의바른 말투로 변환해주세요.

규칙:
1. '-시옵니다', '-드립니다' 등 최상급 존댓말 사용
2. 겸손하고 정중한 표현 사용
3. 상대방을 최대한 존중하는 어조";

const CUTE_RULES: &str = "\
다음 문장을 귀엽고 발랄한 말투로 변환해주세요.

규칙:
1. \"~용\", \"~얏\", \"~냥\" 같은 귀여운 어미 사용하기
2. 밝고 긍정적인 톤으로 변환하기
3. 짧고 간단하게 변환하기
4. 문장 끝에는 느낌표나 물음표 사용하기";

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "formal" => Ok(Style::Formal),
            "casual" => Ok(Style::Casual),
            "polite" => Ok(Style::Polite),
            "cute" => Ok(Style::Cute),
            _ => Err(GenerationError::UnknownStyle(s.to_string())),
        }
    }
}
