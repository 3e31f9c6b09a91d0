//! System prompt shared by every completion provider.

use askama::Template;
use vitaguide_core::{Language, Profile};

/// Plain-text system prompt template.
#[derive(Template)]
#[template(path = "system_prompt.txt")]
struct SystemPrompt<'a> {
    language_name: &'a str,
    profile_context: &'a str,
}

/// Render the system prompt for a reply in `language`.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_system_prompt(
    language: Language,
    profile_context: &str,
) -> Result<String, askama::Error> {
    SystemPrompt {
        language_name: language.name(),
        profile_context: profile_context.trim(),
    }
    .render()
}

/// Summarize a stored profile for the completion prompt.
///
/// Returns an empty string when there is nothing worth telling the model.
#[must_use]
pub fn profile_context(profile: Option<&Profile>) -> String {
    let Some(profile) = profile else {
        return String::new();
    };

    let mut lines = Vec::new();
    if let Some(age) = profile.age {
        lines.push(format!("- Age: {age}"));
    }
    if let Some(gender) = profile.gender {
        lines.push(format!("- Gender: {}", gender.as_str()));
    }
    if !profile.goals.is_empty() {
        lines.push(format!("- Goals: {}", profile.goals.join(", ")));
    }
    if !profile.allergies.is_empty() {
        lines.push(format!("- Allergies: {}", profile.allergies.join(", ")));
    }
    if !profile.dietary_restrictions.is_empty() {
        lines.push(format!(
            "- Dietary restrictions: {}",
            profile.dietary_restrictions.join(", ")
        ));
    }
    if let Some(budget) = &profile.budget {
        lines.push(format!(
            "- Budget: {} to {} {}",
            budget.min, budget.max, budget.currency
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use vitaguide_core::{Gender, UserId};

    use super::*;

    #[test]
    fn test_profile_context_empty_without_profile() {
        assert_eq!(profile_context(None), "");
        assert_eq!(profile_context(Some(&Profile::empty(UserId::new("u")))), "");
    }

    #[test]
    fn test_profile_context_lists_known_fields() {
        let mut profile = Profile::empty(UserId::new("u"));
        profile.age = Some(34);
        profile.gender = Some(Gender::Female);
        profile.allergies = vec!["nuts".to_string()];

        let context = profile_context(Some(&profile));
        assert_eq!(context, "- Age: 34\n- Gender: female\n- Allergies: nuts");
    }

    #[test]
    fn test_system_prompt_includes_language_and_context() {
        let prompt = render_system_prompt(Language::En, "- Age: 34").expect("render");
        assert!(prompt.contains("Answer in English."));
        assert!(prompt.contains("- Age: 34"));

        let prompt = render_system_prompt(Language::Fr, "").expect("render");
        assert!(prompt.contains("Answer in French."));
        assert!(!prompt.contains("What you know about this user"));
    }
}
