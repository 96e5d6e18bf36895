//! Prompt builders for the two deployment flavours.
//!
//! Both produce a system/user pair. The user message always embeds the input
//! text verbatim.

use restyle_core::{ChatPrompt, Style};

/// Fixed system instruction for the local model.
const LOCAL_SYSTEM_PROMPT: &str = "\
당신은 문장의 말투를 바꿔주는 AI 어시스턴트입니다. \
주어진 문장의 의미는 그대로 유지하고, 요청된 말투로 바꾼 문장 하나만 출력합니다.";

/// Role and task description sent to the hosted API.
const REMOTE_TASK: &str = "\
#task
당신은 문장 변환 전문가입니다.
주어진 문장을 지정된 스타일로 변환해주세요.";

fn style_summary(style: Style) -> &'static str {
    match style {
        Style::Formal => "공식적이고 격식있는 표현",
        Style::Casual => "친근하고 일상적인 표현",
        Style::Polite => "매우 공손하고 예의바른 표현",
        Style::Cute => "귀엽고 애교있는 표현",
    }
}

/// System prompt for the hosted API: task plus the full style catalogue.
pub fn build_remote_system_prompt() -> String {
    let mut prompt = format!("{REMOTE_TASK}\n\n#스타일 종류\n");
    for style in Style::ALL {
        prompt.push_str(&format!("- {}: {}\n", style, style_summary(style)));
    }
    prompt
}

/// Rule-heavy prompt for a small local model, ending in an open `출력:` slot.
pub fn local_prompt(style: Style, text: &str) -> ChatPrompt {
    ChatPrompt {
        system: LOCAL_SYSTEM_PROMPT.to_string(),
        user: format!("{}\n\n입력: \"{text}\"\n출력:", style.rules()),
    }
}

pub fn remote_prompt(style: Style, text: &str) -> ChatPrompt {
    ChatPrompt {
        system: build_remote_system_prompt(),
        user: format!("다음 문장을 {}\n문장: {text}", style.directive()),
    }
}
