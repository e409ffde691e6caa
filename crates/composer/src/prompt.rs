//! Prompt construction for the composition model.

/// System prompt pinning the reply to the music description wire format.
pub const SYSTEM_PROMPT: &str = "\
You are a music composer. Given an idea for a piece of music, reply with \
exactly one JSON object describing it, and nothing else. No prose, no \
markdown fences.

The object has this shape:

{
  \"title\": \"<short title>\",
  \"tempo\": <beats per minute, integer>,
  \"key\": \"<key, e.g. C major>\",
  \"time_signature\": [<numerator>, <denominator>],
  \"instruments\": [
    {
      \"program\": <General MIDI program 0-127, or the string \"percussion\" for a drum kit>,
      \"name\": \"<instrument name>\",
      \"soundfont_name\": \"<General MIDI patch name, optional>\",
      \"channel\": <MIDI channel 0-15>,
      \"patterns\": [
        {
          \"type\": \"<melody, bass, chords, drums, ...>\",
          \"notes\": [
            {\"pitch\": <MIDI note 0-127>, \"start\": <beats from the beginning>, \"duration\": <beats>, \"velocity\": <1-127>}
          ]
        }
      ]
    }
  ]
}

Rules:
- start and duration are in beats, measured from the start of the piece; \
they may be fractional.
- pitch is a MIDI note number (middle C is 60). velocity must be 1-127.
- Give each instrument its own channel. Percussion belongs on channel 9.
- Write at least 8 bars of music with real melodic and rhythmic interest, \
not a placeholder loop.";

/// System prompt extended with the catalog of patch names the model may
/// put in `soundfont_name`.
pub fn system_prompt_with_soundfonts<S: AsRef<str>>(names: &[S]) -> String {
    if names.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }
    let joined = names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{SYSTEM_PROMPT}\n\nAvailable soundfont names: {joined}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_the_wire_fields() {
        for field in [
            "title",
            "tempo",
            "instruments",
            "program",
            "patterns",
            "pitch",
            "start",
            "duration",
            "velocity",
        ] {
            assert!(
                SYSTEM_PROMPT.contains(field),
                "prompt should mention {field:?}"
            );
        }
        assert!(SYSTEM_PROMPT.contains("percussion"));
    }

    #[test]
    fn test_soundfont_hint_appended() {
        let prompt = system_prompt_with_soundfonts(&["Acoustic Grand Piano", "Violin"]);
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("Acoustic Grand Piano, Violin"));
    }

    #[test]
    fn test_no_hints_leaves_prompt_unchanged() {
        let prompt = system_prompt_with_soundfonts::<&str>(&[]);
        assert_eq!(prompt, SYSTEM_PROMPT);
    }
}
