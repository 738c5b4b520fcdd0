//! Prompt：system 指令与任务提示
//!
//! 内置默认文本；若配置了 prompts_dir 且其中存在 system.txt / task.txt，则用文件内容覆盖。
//! task.txt 中的 `{subject}` 会被替换为当前分析对象。

use std::path::Path;

use crate::react::outcome::{Category, Priority};

const DEFAULT_TASK: &str = "Analyse the recent transactions of user {subject} and produce your recommendations.";

#[derive(Clone, Debug)]
pub struct Prompts {
    system: String,
    task_template: String,
}

impl Prompts {
    /// 内置 prompt；max_items 写入输出约定
    pub fn builtin(max_items: usize) -> Self {
        Self {
            system: default_system_prompt(max_items),
            task_template: DEFAULT_TASK.to_string(),
        }
    }

    /// 从目录读取覆盖文件，缺失或读取失败时保留内置文本
    pub fn from_dir(dir: Option<&Path>, max_items: usize) -> Self {
        let mut prompts = Self::builtin(max_items);
        let Some(dir) = dir else {
            return prompts;
        };
        if let Some(system) = read_non_empty(&dir.join("system.txt")) {
            prompts.system = system;
        }
        if let Some(task) = read_non_empty(&dir.join("task.txt")) {
            prompts.task_template = task;
        }
        prompts
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn task(&self, subject_id: &str) -> String {
        self.task_template.replace("{subject}", subject_id)
    }
}

fn read_non_empty(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        tracing::debug!(path = %path.display(), "prompt override loaded");
        Some(text.to_string())
    }
}

fn default_system_prompt(max_items: usize) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let priorities: Vec<&str> = Priority::ALL.iter().map(|p| p.as_str()).collect();
    format!(
        r#"You are a personal finance analyst. You help one user understand their spending and find concrete, actionable improvements.

Use the available tools to look at the user's real data before drawing conclusions. Start broad (spending per category), then drill into anything notable (recurring charges, unusually large categories, frequent small purchases). Do not invent numbers: every claim must come from a tool result.

When you are done, reply with ONLY a JSON object of this exact shape and nothing else:
{{"recommendations": [{{"title": "...", "message": "...", "category": "...", "priority": "..."}}]}}

Rules:
- At most {max_items} recommendations, most valuable first.
- "title": short headline. "message": one or two sentences with the specific amounts or merchants involved.
- "category" must be one of: {categories}.
- "priority" must be one of: {priorities}.
- If there is nothing useful to recommend, return {{"recommendations": []}}."#,
        max_items = max_items,
        categories = categories.join(", "),
        priorities = priorities.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_mentions_vocabulary() {
        let p = Prompts::builtin(5);
        assert!(p.system().contains("At most 5"));
        assert!(p.system().contains("subscription"));
        assert!(p.system().contains("medium"));
        assert!(p.task("u-42").contains("u-42"));
    }

    #[test]
    fn test_dir_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("task.txt"), "Review {subject} please").unwrap();
        let p = Prompts::from_dir(Some(dir.path()), 5);
        assert_eq!(p.task("u1"), "Review u1 please");
        assert!(p.system().contains("personal finance"));
    }
}
