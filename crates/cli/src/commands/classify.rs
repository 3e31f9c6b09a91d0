//! Offline intent classification.

use std::path::Path;

use vitaguide_assistant::intent::{classify, fallback_collections};

use super::{CommandError, read_profile};

/// Classify `message` and `reply` against an optional profile file and print
/// the intent. Uses the static collection table; nothing is fetched.
///
/// # Errors
///
/// Returns an error if the profile file cannot be read or parsed.
pub fn run(message: &str, reply: &str, profile: Option<&Path>) -> Result<(), CommandError> {
    let profile = profile.map(read_profile).transpose()?;
    let intent = classify(message, reply, profile.as_ref(), &fallback_collections());

    let json = serde_json::to_string_pretty(&intent)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
