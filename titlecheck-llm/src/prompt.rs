//! Prompt text for headline classification.

/// System turn sent with every classification request.
pub const SYSTEM_PROMPT: &str = "你是一名经验丰富的标题研究专家，精通标题党的知识和技巧。你的任务是分析新闻标题，并以JSON格式返回分析结果。";

/// Build the user turn for one headline.
///
/// The headline is embedded verbatim. The reply is requested as a bare JSON
/// object with `probability`, `suggestions` and `modified_title`.
pub fn build_prompt(headline: &str) -> String {
    format!(
        r#"
作为一名经验丰富的标题研究专家，请分析以下新闻标题：'{headline}'

请评估其作为“标题党”或谣言标题的可能性，并给出以下信息：
1. 疑似“标题党”的概率（0.0到1.0之间的一个浮点数）。
2. 具体的修改建议，使其更符合新闻规范。
3. 如果疑似“标题党”的概率达到或超过50%（即概率 >= 0.5），请给出一个修改后的、更客观中立的标题建议。

请严格按照以下JSON格式返回结果，不要添加任何额外的解释或说明文字：
{{
    "probability": <float_value>,
    "suggestions": "<string_value>",
    "modified_title": "<string_value_or_empty_if_not_applicable>"
}}

谣言标题常见的套路包括：
- 伪装权威来源 (例如：“中央发话了”, “央视都播了”)
- 捏造夸大事实 (例如：“震惊！”, “惊爆！”, “出大事了！！！”)
- “煲鸡汤”煽情型 (例如：“为了你的家人，请一定要看”)
- 求阅读转发 (例如：“速看、马上删”, “警惕、紧急通知”)

请基于以上信息进行判断。
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_headline_verbatim() {
        let prompt = build_prompt("震惊！全网疯传 {x}");
        assert!(prompt.contains("'震惊！全网疯传 {x}'"));
    }

    #[test]
    fn requests_strict_json_with_three_fields() {
        let prompt = build_prompt("h");
        for key in ["\"probability\"", "\"suggestions\"", "\"modified_title\""] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.contains("概率 >= 0.5"));
        assert!(prompt.contains("不要添加任何额外的解释"));
    }

    #[test]
    fn lists_the_four_clickbait_patterns() {
        let prompt = build_prompt("h");
        for pattern in ["伪装权威来源", "捏造夸大事实", "煽情型", "求阅读转发"] {
            assert!(prompt.contains(pattern), "missing {pattern}");
        }
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(build_prompt("同一标题"), build_prompt("同一标题"));
    }
}
