//! 步骤解析：模型原始文本 → 有序步骤列表
//!
//! 逐行处理：去掉首尾空白、跳过空行，剥离项目符号（- * •）与编号前缀（1. / 1)），其余原样保留。

use std::sync::OnceLock;

use regex::Regex;

static LIST_PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn list_prefix() -> &'static Regex {
    LIST_PREFIX_RE.get_or_init(|| Regex::new(r"^(?:[-*•](?:\s+|$))*(?:\d+[.)](?:\s+|$))?").unwrap())
}

/// 解析步骤；无法得到任何步骤时返回空 Vec（由 Planner 决定兜底）
pub fn parse_steps(text: &str) -> Vec<String> {
    let re = list_prefix();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| re.replace(line, "").trim().to_string())
        .filter(|step| !step.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_list() {
        let steps = parse_steps("1. Install agent\n2. Configure dashboards");
        assert_eq!(steps, vec!["Install agent", "Configure dashboards"]);
    }

    #[test]
    fn test_bullets_and_blank_lines() {
        let steps = parse_steps("\n- First\n\n* Second\n  • Third  \n");
        assert_eq!(steps, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_bulleted_numbers_and_paren_style() {
        let steps = parse_steps("- 1. Alpha\n2) Beta");
        assert_eq!(steps, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_plain_lines_are_kept() {
        let steps = parse_steps("Here is the plan:\n1. Do it");
        assert_eq!(steps, vec!["Here is the plan:", "Do it"]);
    }

    #[test]
    fn test_decimal_inside_text_untouched() {
        let steps = parse_steps("Upgrade to version 2.5 of the agent");
        assert_eq!(steps, vec!["Upgrade to version 2.5 of the agent"]);
    }

    #[test]
    fn test_degenerate_input_yields_nothing() {
        assert!(parse_steps("").is_empty());
        assert!(parse_steps("   \n\n  ").is_empty());
        assert!(parse_steps("-\n*\n1.").is_empty());
    }
}
