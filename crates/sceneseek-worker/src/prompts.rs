//! Caption prompt templates.

/// Default scene-description prompt for the caption model.
pub const DEFAULT_PROMPT: &str = "\
Watch the following video scene closely and describe it in rich detail. \
Guidelines:\n\
1) If people are present, describe them thoroughly (appearance, clothing, \
expressions) as flowing prose, never as a list.\n\
2) If no people appear, describe the environment and objects in depth \
without apologizing or disclaiming.\n\
3) Detail each person's actions and movements: gestures, body language, eye \
contact, posture, and physical interactions with objects.\n\
4) Give context for the situation and setting (indoors or outdoors, \
lighting, time of day, weather) and explain what is happening.\n\
5) Mention notable objects and environmental details, including how they \
are positioned or used.\n\
6) Vary sentence openings; do not begin every sentence the same way.\n\
7) Be vivid but mark assumptions that are not directly visible.\n\
8) Weave everything into one cohesive narrative that reads like a story.";

/// Template appended to the prompt when a dialogue transcript is available.
/// `{transcript}` is substituted with the transcribed dialogue.
pub const AUDIO_PROMPT_TEMPLATE: &str = "\
\n\nA dialogue transcript from this scene is provided below. Read it for \
emotional tone, intent, and narrative cues, and let it inform the visual \
description. Integrate the dialogue naturally into the narrative instead of \
quoting it as a standalone block, and keep observed facts distinct from \
what the dialogue merely implies.\n\
Dialogue transcript: '{transcript}'";

/// Render the dialogue clause for a transcript.
pub fn audio_prompt(transcript: &str) -> String {
    AUDIO_PROMPT_TEMPLATE.replace("{transcript}", transcript)
}

/// Prefix telling the model how many frames represent the scene.
pub fn frame_prefix(frame_count: usize) -> String {
    format!("The scene is provided as {frame_count} sampled frames.\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_prompt_substitutes_transcript() {
        let rendered = audio_prompt("We have to leave tonight.");
        assert!(rendered.contains("We have to leave tonight."));
        assert!(!rendered.contains("{transcript}"));
    }

    #[test]
    fn test_frame_prefix() {
        assert!(frame_prefix(8).contains("8 sampled frames"));
    }
}
