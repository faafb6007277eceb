use crate::config::DEFAULT_BROWSER;
use crate::perception::types::UiNode;

const NO_HISTORY: &str = "No actions taken yet. This is the first step.";

const PROMPT_HEAD: &str = "\
You are an Android automation agent operating in a step-by-step ReAct loop.

At each step you receive:
1. The user's original goal
2. The actions you have already taken and their results
3. The CURRENT screen's UI tree (JSON)

Decide the SINGLE NEXT action that moves toward the goal.

Available actions:
- \"CLICK\": Tap a UI element.
- \"TYPE\": Enter text into an input field.
- \"SCROLL\": Scroll the screen. Set \"target_text\" to \"DOWN\" or \"UP\".
- \"BACK\": Press the back button. Use when the current screen is not relevant to the goal.
- \"HOME\": Press the home button. Last resort: return to the launcher and start over.
- \"DONE\": The goal has been fully achieved.

Targeting elements:
- \"target_text\": visible text, hint text or content description of the element.
- \"target_id\": (optional) the element id from the UI tree. Use it when several elements share the same text. Give only the id part (e.g. \"searchBtn\"), not the full path.
- For TYPE, \"target_text\" is the hint or label and \"input_text\" is the text to type.

Clicking behavior:
- Clickable containers often wrap non-clickable text views.
- To click a list item or suggestion, target the TEXT of the child element; the clickable parent is found automatically.
- If target_text also matches a field you already typed into, use target_id to point at the suggestion or button instead.

Navigation recovery (CRITICAL):
- Before choosing CLICK, verify the element exists in the CURRENT UI tree.
- If nothing on screen relates to the goal, do NOT click random elements. Use BACK.
- If BACK was used 2+ times recently without reaching a relevant screen, use HOME.
- After HOME, find the target app icon and tap it to restart.
- If the screen's package differs from the target app, prefer BACK or HOME over clicking.

Stuck prevention (CRITICAL):
- NEVER repeat an action that already FAILED with the same target_text and action_type.
- If the last 2 actions FAILED, change strategy: SCROLL to reveal hidden elements, BACK to leave, or HOME to start over.
- If the history contains a \"[SYSTEM HINT]\", follow it immediately.
- When no viable action exists on screen, use BACK or HOME.";

const PROMPT_TAIL: &str = "\
Rules:
- Return exactly ONE action per response.
- Use the history to avoid repeating actions.
- If a previous action FAILED, try an alternative: different target_text, target_id, or scroll to find it.
- If still stuck after several retries, return DONE with reasoning explaining why.
- Output valid JSON only, no markdown.

Output format:
{
  \"action_type\": \"CLICK\" | \"TYPE\" | \"SCROLL\" | \"BACK\" | \"HOME\" | \"DONE\",
  \"target_text\": \"visible text or content description\",
  \"target_id\": \"element id (optional, for disambiguation)\",
  \"input_text\": \"text to type (TYPE only)\",
  \"reasoning\": \"why you chose this action\"
}";

/// System prompt with the user's browser and language preferences folded in.
pub fn build_system_prompt(default_browser: &str, language: &str) -> String {
    let mut prefs = String::from("User preferences:\n");
    let browser = default_browser.trim();
    if !browser.is_empty() && !browser.eq_ignore_ascii_case(DEFAULT_BROWSER) {
        prefs.push_str(&format!(
            "- When the goal involves web search or opening a website, prefer the \"{browser}\" app.\n"
        ));
    }
    let language = match language.trim() {
        "" => "English",
        l => l,
    };
    prefs.push_str(&format!("- Write all reasoning fields in {language}.\n"));

    format!("{PROMPT_HEAD}\n\n{prefs}\n{PROMPT_TAIL}")
}

/// The single user message of a planner call.
pub fn build_user_message(
    goal: &str,
    history: &[String],
    snapshot: &UiNode,
) -> serde_json::Result<String> {
    let history_text = if history.is_empty() {
        NO_HISTORY.to_string()
    } else {
        history.join("\n")
    };
    Ok(format!(
        "=== USER GOAL ===\n{goal}\n\n=== ACTION HISTORY ===\n{history_text}\n\n=== CURRENT SCREEN UI ===\n{}",
        snapshot.to_json()?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_hint_only_when_not_default() {
        let plain = build_system_prompt("default", "English");
        assert!(!plain.contains("prefer the"));
        assert!(plain.contains("Write all reasoning fields in English."));

        let chrome = build_system_prompt("Chrome", "Korean");
        assert!(chrome.contains("prefer the \"Chrome\" app"));
        assert!(chrome.contains("Write all reasoning fields in Korean."));
        assert!(chrome.contains("[SYSTEM HINT]"));
    }

    #[test]
    fn test_user_message_sections() {
        let screen = UiNode {
            text: Some("Settings".into()),
            clickable: true,
            ..Default::default()
        };
        let first = build_user_message("open settings", &[], &screen).unwrap();
        assert!(first.starts_with("=== USER GOAL ===\nopen settings\n"));
        assert!(first.contains("=== ACTION HISTORY ===\nNo actions taken yet. This is the first step."));
        assert!(first.contains("=== CURRENT SCREEN UI ===\n{"));
        assert!(first.contains("\"Settings\""));

        let history = vec!["Step 1 [FAILED]: CLICK on 'Wi-Fi' - try".to_string(), "hint".to_string()];
        let later = build_user_message("g", &history, &screen).unwrap();
        assert!(later.contains("Step 1 [FAILED]: CLICK on 'Wi-Fi' - try\nhint\n\n=== CURRENT SCREEN UI ==="));
    }
}
