//! User-facing text.

use chrono::Duration;
use code_runner::Verdict;
use util::time::format_duration;

pub fn reminder(user_id: &str, assignment_id: &str, has_submitted: bool, remaining: Duration) -> String {
    let left = format_duration(remaining);
    if has_submitted {
        format!(
            "**[Reminder]** <@{user_id}> your submission for **#{assignment_id}** is not passing yet, please submit again. Time left: {left}."
        )
    } else {
        format!(
            "**[Reminder]** <@{user_id}> you have not submitted **#{assignment_id}** yet. Time left: {left}."
        )
    }
}

pub fn verdict(verdict: &Verdict) -> String {
    match verdict {
        Verdict::CompileFailed { diagnostics } => format!("Compilation failed:\n{diagnostics}"),
        Verdict::Compiled => "Compiled successfully.".to_string(),
        Verdict::NoEntryPoint => "No `main` method found in any submitted file.".to_string(),
        Verdict::MissingTestCases => "This assignment has no test cases yet.".to_string(),
        Verdict::RuntimeError { diagnostics } => format!("Error while running your code:\n{diagnostics}"),
        Verdict::TestFailed {
            input,
            actual,
            expected,
            ..
        } => format!(
            "Test case failed:\n**Input:** `{input}`\n**Output:** `{actual}`\n**Expected:** `{expected}`"
        ),
        Verdict::AllTestsPassed => "All test cases passed.".to_string(),
    }
}
