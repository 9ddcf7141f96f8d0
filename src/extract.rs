//! 从模型的自由文本输出中提取翻译/润色结果
//!
//! 部分模型（如 DeepSeek）会在结果外包裹推理过程、代码块或说明性前缀。
//! 这里的规则是启发式的，提取失败时返回 [`Extraction::Failed`]。

use std::sync::LazyLock;

use regex::Regex;

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Extracted(String),
    Failed,
}

impl Extraction {
    pub fn into_option(self) -> Option<String> {
        match self {
            Extraction::Extracted(text) => Some(text),
            Extraction::Failed => None,
        }
    }
}

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n(.*?)\n?```$").expect("valid regex")
});

// 结果标签只认开头的那一行
static RESULT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\A[ \t]*(?:\*\*)?(?:translation|translated text|polished text|result|翻译结果|翻译|译文|润色结果|润色后|润色后的文本|结果)(?:\*\*)?[ \t]*[:：](?:\*\*)?[ \t]*",
    )
    .expect("valid regex")
});

// 标签前允许有一行客套话，例如“好的，以下是翻译。”
static PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A[ \t]*(?:好的|当然|以下是|下面是|here is|here's|sure|okay|ok\b)[^\n]*\z")
        .expect("valid regex")
});

/// 从模型原始输出中提取结果
pub fn extract_result(raw: &str) -> Extraction {
    let without_thinking = THINK_BLOCK.replace_all(raw, "");
    let mut text = without_thinking.trim();

    if let Some(caps) = CODE_FENCE.captures(text) {
        if let Some(body) = caps.get(1) {
            text = body.as_str().trim();
        }
    }

    let text = strip_wrapping_quotes(strip_result_label(text)).trim();

    if text.is_empty() {
        Extraction::Failed
    } else {
        Extraction::Extracted(text.to_string())
    }
}

/// 去掉开头的结果标签；正文中间出现的同名标签属于正文，保持不变
fn strip_result_label(text: &str) -> &str {
    if let Some(found) = RESULT_LABEL.find(text) {
        return text[found.end()..].trim();
    }

    if let Some((first, rest)) = text.split_once('\n') {
        let rest = rest.trim_start();
        if PREAMBLE.is_match(first) {
            if let Some(found) = RESULT_LABEL.find(rest) {
                return rest[found.end()..].trim();
            }
        }
    }
    text
}

fn strip_wrapping_quotes(text: &str) -> &str {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('“', '”'), ('「', '」'), ('\'', '\'')];

    for (open, close) in PAIRS {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            // 内部还有同样的引号时，说明引号属于正文
            if !inner.contains(open) && !inner.contains(close) {
                return inner;
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(text: &str) -> Extraction {
        Extraction::Extracted(text.to_string())
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(extract_result("  你好，世界  "), extracted("你好，世界"));
    }

    #[test]
    fn test_think_block_removed() {
        let raw = "<think>\nThe user wants Chinese.\n</think>\n\n你好";
        assert_eq!(extract_result(raw), extracted("你好"));
    }

    #[test]
    fn test_label_prefix_removed() {
        assert_eq!(extract_result("翻译结果：你好"), extracted("你好"));
        assert_eq!(extract_result("Translation: Hello"), extracted("Hello"));
        assert_eq!(extract_result("**译文**: 早上好"), extracted("早上好"));
    }

    #[test]
    fn test_label_after_preamble() {
        let raw = "好的，以下是翻译。\n译文：今天天气很好。";
        assert_eq!(extract_result(raw), extracted("今天天气很好。"));
    }

    #[test]
    fn test_label_inside_body_is_kept() {
        let raw = "第一段是正文。\n结果：我们赢了比赛。";
        assert_eq!(extract_result(raw), extracted(raw));

        let raw = "The match was close.\nResult: we won.";
        assert_eq!(extract_result(raw), extracted(raw));
    }

    #[test]
    fn test_code_fence_removed() {
        let raw = "```text\nBonjour\n```";
        assert_eq!(extract_result(raw), extracted("Bonjour"));
    }

    #[test]
    fn test_wrapping_quotes_removed() {
        assert_eq!(extract_result("\"Hello\""), extracted("Hello"));
        assert_eq!(extract_result("“你好”"), extracted("你好"));
        assert_eq!(
            extract_result("\"a\" and \"b\""),
            extracted("\"a\" and \"b\"")
        );
    }

    #[test]
    fn test_failure_sentinel() {
        assert_eq!(extract_result(""), Extraction::Failed);
        assert_eq!(extract_result("<think>only thinking</think>"), Extraction::Failed);
        assert_eq!(extract_result("翻译结果：   "), Extraction::Failed);
        assert_eq!(extract_result("   ").into_option(), None);
    }
}
