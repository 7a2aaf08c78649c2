/// Hand-off to an external prose writer.
///
/// Each finalized character becomes a `BiographyRequest`; the writer gets a
/// prompt embedding the request as JSON and answers with free text that
/// should contain a JSON object carrying at least a `bio` field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProseError {
    #[error("prose collaborator failed: {0}")]
    Collaborator(String),
    #[error("no JSON object found in reply")]
    NoJsonObject,
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply carries no biography")]
    MissingBiography,
}

/// The structured record sent out for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiographyRequest {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub occupation: String,
    pub location: String,
    pub situations: Vec<String>,
    pub roles: Vec<String>,
    pub relations: Vec<String>,
    pub personality_traits: Vec<String>,
}

/// What the writer sent back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Biography {
    #[serde(default)]
    pub bio: String,
    #[serde(default, alias = "personalityTraits")]
    pub personality_traits: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub motivation: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reply {
    Batch { villagers: Vec<Biography> },
    Single(Biography),
}

/// Something that turns a prompt into prose, usually a remote text
/// generation service. Called once per character, one at a time.
pub trait BiographyWriter {
    fn write(&mut self, request: &BiographyRequest, prompt: &str) -> Result<String, ProseError>;
}

impl<F> BiographyWriter for F
where
    F: FnMut(&BiographyRequest, &str) -> Result<String, ProseError>,
{
    fn write(&mut self, request: &BiographyRequest, prompt: &str) -> Result<String, ProseError> {
        self(request, prompt)
    }
}

/// Instruction text with the request embedded as pretty JSON.
pub fn build_prompt(request: &BiographyRequest) -> Result<String, ProseError> {
    let seed = serde_json::to_string_pretty(request)?;
    Ok(format!(
        "You are writing a short biography for a character in a village drama.\n\
         Use the situations, roles and relations below; keep every given fact.\n\
         Write 2-4 sentences in the first person.\n\
         Return a single JSON object with the fields \"bio\", \"personality_traits\" \
         and \"motivation\".\n\n{seed}\n"
    ))
}

/// Pull the outermost `{...}` out of a reply and read the biography from it.
pub fn parse_biography_reply(reply: &str) -> Result<Biography, ProseError> {
    let start = reply.find('{').ok_or(ProseError::NoJsonObject)?;
    let end = reply.rfind('}').ok_or(ProseError::NoJsonObject)?;
    if end < start {
        return Err(ProseError::NoJsonObject);
    }
    let biography = match serde_json::from_str::<Reply>(reply[start..=end].trim())? {
        Reply::Batch { villagers } => villagers.into_iter().next().unwrap_or_default(),
        Reply::Single(biography) => biography,
    };
    if biography.bio.trim().is_empty() {
        return Err(ProseError::MissingBiography);
    }
    Ok(biography)
}

/// Prompt the writer for one character and parse its answer.
pub fn request_biography<W: BiographyWriter>(
    writer: &mut W,
    request: &BiographyRequest,
) -> Result<Biography, ProseError> {
    let prompt = build_prompt(request)?;
    let reply = writer.write(request, &prompt)?;
    parse_biography_reply(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BiographyRequest {
        BiographyRequest {
            name: "Hester Pike".into(),
            age: 44,
            gender: "Female".into(),
            occupation: "Midwife".into(),
            location: "Village".into(),
            situations: vec!["Betrayal".into()],
            roles: vec!["Betrayer".into()],
            relations: vec!["Committed adultery with Osric Marsh".into()],
            personality_traits: vec!["Secretive".into()],
        }
    }

    #[test]
    fn prompt_embeds_request_json() {
        let prompt = build_prompt(&request()).unwrap();
        assert!(prompt.contains("\"name\": \"Hester Pike\""));
        assert!(prompt.contains("Committed adultery with Osric Marsh"));
    }

    #[test]
    fn reply_with_surrounding_chatter() {
        let reply = "Sure! Here it is:\n```json\n{\"bio\": \"I deliver more than babies.\", \
                     \"motivation\": \"Keep the secret\"}\n```";
        let bio = parse_biography_reply(reply).unwrap();
        assert_eq!(bio.bio, "I deliver more than babies.");
        assert_eq!(bio.motivation, "Keep the secret");
    }

    #[test]
    fn batch_shaped_reply() {
        let reply = r#"{"villagers": [{"bio": "Hello.", "personalityTraits": ["Sly"]}]}"#;
        let bio = parse_biography_reply(reply).unwrap();
        assert_eq!(bio.bio, "Hello.");
        assert_eq!(bio.personality_traits, vec!["Sly"]);
    }

    #[test]
    fn malformed_replies() {
        assert!(matches!(parse_biography_reply("no braces here"), Err(ProseError::NoJsonObject)));
        assert!(matches!(parse_biography_reply("} backwards {"), Err(ProseError::NoJsonObject)));
        assert!(matches!(parse_biography_reply("{not json}"), Err(ProseError::Json(_))));
        assert!(matches!(
            parse_biography_reply(r#"{"motivation": "none"}"#),
            Err(ProseError::MissingBiography)
        ));
    }

    #[test]
    fn closures_are_writers() {
        let mut calls = 0;
        let mut writer = |req: &BiographyRequest, prompt: &str| {
            calls += 1;
            assert!(prompt.contains(&req.name));
            Ok::<_, ProseError>(format!("{{\"bio\": \"I am {}.\"}}", req.name))
        };
        let bio = request_biography(&mut writer, &request()).unwrap();
        assert_eq!(bio.bio, "I am Hester Pike.");
        assert_eq!(calls, 1);

        let mut failing =
            |_: &BiographyRequest, _: &str| Err::<String, _>(ProseError::Collaborator("timeout".into()));
        assert!(matches!(
            request_biography(&mut failing, &request()),
            Err(ProseError::Collaborator(_))
        ));
    }
}
