// SPDX-License-Identifier: GPL-3.0-only

//! `generateContent` request and response payloads

use crate::constants::endpoint::RESPONSE_MIME_TYPE;
use crate::constants::prompts::{
    CLASSIFICATION_FIELD, DESCRIPTION_FIELD, SYSTEM_INSTRUCTION, USER_INSTRUCTION,
};
use crate::media::ImageBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content container used in both requests and responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Text or inline media part
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 image payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Object,
    String,
}

/// Structured-output schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ResponseSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ResponseSchema {
    fn string() -> Self {
        Self {
            kind: SchemaType::String,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Object with the two required string fields
    pub fn classification() -> Self {
        let fields = [CLASSIFICATION_FIELD, DESCRIPTION_FIELD];
        Self {
            kind: SchemaType::Object,
            properties: fields
                .iter()
                .map(|name| (name.to_string(), Self::string()))
                .collect(),
            required: fields.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: ResponseSchema,
}

/// Body of `POST models/{model}:generateContent`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Build the fixed classification request around one image
    pub fn for_image(image: &ImageBuffer) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::Text {
                        text: USER_INSTRUCTION.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime().to_string(),
                            data: image.base64_payload().to_string(),
                        },
                    },
                ],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: RESPONSE_MIME_TYPE.to_string(),
                response_schema: ResponseSchema::classification(),
            },
        }
    }
}

/// Top-level `generateContent` response envelope
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// First text part of the first candidate
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
    }
}

/// Validated classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisResult {
    pub classification: String,
    pub description: String,
}

impl AnalysisResult {
    /// Non-empty description lines, trimmed
    pub fn description_lines(&self) -> impl Iterator<Item = &str> {
        self.description
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}
