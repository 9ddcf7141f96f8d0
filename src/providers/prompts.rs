//! 提示词构建

/// 源语言未指定时使用
pub const AUTO_DETECT: &str = "auto";

/// 常见语言代码对应的名称，未知代码原样返回
pub fn language_name(code: &str) -> &str {
    match code.to_ascii_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-hans" => "Simplified Chinese",
        "zh-tw" | "zh-hk" | "zh-hant" => "Traditional Chinese",
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "ru" => "Russian",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ar" => "Arabic",
        _ => code,
    }
}

/// 润色风格说明
pub fn style_instruction(style: &str) -> &'static str {
    match style.to_ascii_lowercase().as_str() {
        "formal" => "Make the text formal and professional.",
        "casual" => "Make the text casual and conversational.",
        "academic" => "Make the text suitable for academic writing, precise and well structured.",
        "concise" => "Make the text concise. Remove redundancy without losing meaning.",
        "creative" => "Make the text vivid and expressive.",
        _ => "Improve fluency, grammar and word choice while preserving the meaning.",
    }
}

/// 翻译系统提示词
pub fn translation_system_prompt(source_lang: &str, target_lang: &str) -> String {
    let target = language_name(target_lang);
    let source = source_lang.trim();

    let direction = if source.is_empty() || source.eq_ignore_ascii_case(AUTO_DETECT) {
        format!("Detect the language of the user's text and translate it into {}.", target)
    } else {
        format!(
            "Translate the user's text from {} into {}.",
            language_name(source),
            target
        )
    };

    format!(
        "You are a professional translator. {} \
         Output only the translated text, without explanations, notes or quotes.",
        direction
    )
}

/// 润色系统提示词
pub fn polish_system_prompt(style: &str) -> String {
    format!(
        "You are a professional editor. Polish the user's text in its original language. {} \
         Output only the polished text, without explanations, notes or quotes.",
        style_instruction(style)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_prompt_with_pair() {
        let prompt = translation_system_prompt("en", "zh");
        assert!(prompt.contains("from English into Simplified Chinese"));
    }

    #[test]
    fn test_translation_prompt_auto_detect() {
        let prompt = translation_system_prompt("auto", "ja");
        assert!(prompt.contains("Detect the language"));
        assert!(prompt.contains("Japanese"));

        let prompt = translation_system_prompt("", "xx");
        assert!(prompt.contains("into xx"));
    }

    #[test]
    fn test_polish_prompt_styles() {
        assert!(polish_system_prompt("FORMAL").contains("formal and professional"));
        assert!(polish_system_prompt("unknown").contains("Improve fluency"));
    }
}
