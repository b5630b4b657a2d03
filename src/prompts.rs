//! Prompt templates and the prompt builder.
//!
//! Every instruction sent to the model lives here so tests can inspect the
//! exact wording without a backend. [`build_prompt`] is the only entry point
//! the pipeline uses.

use crate::config::{Language, TaskMode};

/// Number of habits requested in the plan's habit stack.
pub const HABIT_STACK_SIZE: usize = 5;

/// Length of the day-by-day plan, in days.
pub const PLAN_DAYS: usize = 30;

const SUMMARY_PERSONA: &str = "You are an expert educator.";

const SUMMARY_SECTIONS: &str = r#"Summarize the text below with clear instructions. Your answer MUST contain these numbered sections:

1. CORE IDEAS
   - The central arguments of the text, in plain language

2. STEP-BY-STEP INSTRUCTIONS
   - Concrete actions a reader can take, in the order they should be taken

3. KEY TAKEAWAYS
   - The few points a reader should remember a month from now"#;

const PLAN_PERSONA: &str =
    "You are a Life Architect who turns the ideas of several books into one coherent plan.";

/// Plan template. `{days}` and `{habits}` are replaced at build time.
const PLAN_SECTIONS: &str = r#"Create a synthesized life action plan based on these books. Your answer MUST contain these numbered sections:

1. INTEGRATED SUMMARY
   - One summary that merges the ideas of all the books, not one summary per book

2. CONFLICT RESOLUTION
   - Where the books disagree, state the disagreement and decide which advice to follow and why

3. UNIFIED {days}-DAY ACTION PLAN
   - A day-by-day plan from Day 1 to Day {days}
   - Each day names one concrete action

4. HABIT STACK
   - Exactly {habits} daily habits, each anchored to an existing routine"#;

/// Cut `text` to its leading `budget` characters.
///
/// Counts Unicode scalar values so a multi-byte character is never split.
/// Text at or under the budget is returned unchanged.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the single instruction string sent to the model.
///
/// Layout: persona, output-language instruction, numbered sections, then the
/// (truncated) source text.
pub fn build_prompt(text: &str, language: Language, task_mode: TaskMode, budget: usize) -> String {
    let (persona, sections) = match task_mode {
        TaskMode::Summary => (SUMMARY_PERSONA, SUMMARY_SECTIONS.to_string()),
        TaskMode::Plan => (
            PLAN_PERSONA,
            PLAN_SECTIONS
                .replace("{days}", &PLAN_DAYS.to_string())
                .replace("{habits}", &HABIT_STACK_SIZE.to_string()),
        ),
    };

    format!(
        "{persona}\n\n{}\n\n{sections}\n\nText:\n{}",
        language_instruction(language),
        truncate_chars(text, budget)
    )
}

fn language_instruction(language: Language) -> String {
    format!("Write your entire answer in {language}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_exact_budget() {
        let text = "a".repeat(20_000);
        assert_eq!(truncate_chars(&text, 15_000).len(), 15_000);
    }

    #[test]
    fn short_text_passes_through() {
        assert_eq!(truncate_chars("hello", 15_000), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let text = "héllo wörld";
        let cut = truncate_chars(text, 2);
        assert_eq!(cut, "hé");
        assert_eq!(cut.chars().count(), 2);
    }

    #[test]
    fn plan_prompt_has_required_sections() {
        let p = build_prompt("BOOK", Language::Spanish, TaskMode::Plan, 100);
        assert!(p.starts_with(PLAN_PERSONA));
        assert!(p.contains("Write your entire answer in Spanish."));
        assert!(p.contains("1. INTEGRATED SUMMARY"));
        assert!(p.contains("2. CONFLICT RESOLUTION"));
        assert!(p.contains("3. UNIFIED 30-DAY ACTION PLAN"));
        assert!(p.contains("Exactly 5 daily habits"));
        assert!(p.ends_with("Text:\nBOOK"));
        assert!(!p.contains("{days}"));
    }

    #[test]
    fn summary_prompt_uses_educator_persona() {
        let p = build_prompt("BOOK", Language::French, TaskMode::Summary, 100);
        assert!(p.starts_with(SUMMARY_PERSONA));
        assert!(p.contains("in French"));
        assert!(!p.contains("HABIT STACK"));
    }

    #[test]
    fn prompt_embeds_only_the_budgeted_prefix() {
        let p = build_prompt("abcdefgh", Language::English, TaskMode::Plan, 3);
        assert!(p.ends_with("Text:\nabc"));
    }
}
