use std::path::Path;

use crate::error::InfoLmError;
use crate::pipeline::traits::SentenceTokenizer;
use crate::types::{SpecialTokens, TokenizedSentence};

const PAD_CANDIDATES: [&str; 2] = ["[PAD]", "<pad>"];
const SEP_CANDIDATES: [&str; 2] = ["[SEP]", "</s>"];
const CLS_CANDIDATES: [&str; 2] = ["[CLS]", "<s>"];
const MASK_CANDIDATES: [&str; 2] = ["[MASK]", "<mask>"];

/// `tokenizers`-backed tokenizer producing `[CLS] tokens… [SEP] [PAD]…`.
///
/// Content tokens are truncated from the end so that the sequence including
/// both markers fits `max_length`.
pub struct HfSentenceTokenizer {
    tokenizer: tokenizers::Tokenizer,
    special_tokens: SpecialTokens,
}

impl HfSentenceTokenizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InfoLmError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path.as_ref())
            .map_err(|e| InfoLmError::runtime("load tokenizer.json", e))?;
        Self::from_tokenizer(tokenizer)
    }

    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, InfoLmError> {
        let tokenizer = tokenizers::Tokenizer::from_bytes(bytes)
            .map_err(|e| InfoLmError::runtime("parse tokenizer", e))?;
        Self::from_tokenizer(tokenizer)
    }

    /// Resolves pad/sep/cls/mask ids from the tokenizer vocabulary.
    ///
    /// Padding and truncation stored in `tokenizer.json` are cleared; length
    /// is governed by the `max_length` passed to `tokenize`.
    pub fn from_tokenizer(mut tokenizer: tokenizers::Tokenizer) -> Result<Self, InfoLmError> {
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| InfoLmError::runtime("disable tokenizer truncation", e))?;
        let lookup = |role: &str, candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|token| tokenizer.token_to_id(token))
                .ok_or_else(|| {
                    InfoLmError::invalid_input(format!(
                        "tokenizer has no {role} token (tried {})",
                        candidates.join(", ")
                    ))
                })
        };
        let special_tokens = SpecialTokens {
            pad: lookup("pad", &PAD_CANDIDATES)?,
            sep: lookup("sep", &SEP_CANDIDATES)?,
            cls: lookup("cls", &CLS_CANDIDATES)?,
            mask: lookup("mask", &MASK_CANDIDATES)?,
        };
        tracing::debug!(?special_tokens, "resolved special tokens");
        Ok(Self {
            tokenizer,
            special_tokens,
        })
    }
}

impl SentenceTokenizer for HfSentenceTokenizer {
    fn tokenize(
        &self,
        sentence: &str,
        max_length: usize,
    ) -> Result<TokenizedSentence, InfoLmError> {
        if max_length < 2 {
            return Err(InfoLmError::invalid_input(format!(
                "max_length must leave room for [CLS] and [SEP], got {max_length}"
            )));
        }
        let encoding = self
            .tokenizer
            .encode(sentence, false)
            .map_err(|e| InfoLmError::runtime("encode sentence", e))?;
        let content = encoding.get_ids();
        let keep = content.len().min(max_length - 2);

        let mut input_ids = Vec::with_capacity(max_length);
        input_ids.push(self.special_tokens.cls);
        input_ids.extend_from_slice(&content[..keep]);
        input_ids.push(self.special_tokens.sep);
        let mut attention_mask = vec![1u32; input_ids.len()];

        input_ids.resize(max_length, self.special_tokens.pad);
        attention_mask.resize(max_length, 0);
        Ok(TokenizedSentence {
            input_ids,
            attention_mask,
        })
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_LEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "[MASK]": 4,
                "the": 5, "cat": 6, "is": 7, "on": 8, "mat": 9
            },
            "unk_token": "[UNK]"
        }
    }"#;

    fn tokenizer() -> HfSentenceTokenizer {
        HfSentenceTokenizer::from_bytes(WORD_LEVEL_JSON).expect("valid tokenizer json")
    }

    #[test]
    fn resolves_special_tokens() {
        assert_eq!(
            tokenizer().special_tokens(),
            SpecialTokens {
                pad: 0,
                sep: 3,
                cls: 2,
                mask: 4,
            }
        );
    }

    #[test]
    fn pads_to_max_length() {
        let out = tokenizer().tokenize("the cat", 6).unwrap();
        assert_eq!(out.input_ids, vec![2, 5, 6, 3, 0, 0]);
        assert_eq!(out.attention_mask, vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn truncates_content_and_keeps_sep() {
        let out = tokenizer().tokenize("the cat is on the mat", 5).unwrap();
        assert_eq!(out.input_ids, vec![2, 5, 6, 7, 3]);
        assert_eq!(out.attention_mask, vec![1; 5]);
    }

    #[test]
    fn unknown_words_map_to_unk() {
        let out = tokenizer().tokenize("the dog", 4).unwrap();
        assert_eq!(out.input_ids, vec![2, 5, 1, 3]);
    }

    #[test]
    fn empty_sentence_has_only_markers() {
        let out = tokenizer().tokenize("", 4).unwrap();
        assert_eq!(out.input_ids, vec![2, 3, 0, 0]);
    }

    #[test]
    fn stored_padding_and_truncation_are_ignored() {
        let json = WORD_LEVEL_JSON
            .replace(
                "\"truncation\": null",
                r#""truncation": {"direction": "Right", "max_length": 2,
                    "strategy": "LongestFirst", "stride": 0}"#,
            )
            .replace(
                "\"padding\": null",
                r#""padding": {"strategy": {"Fixed": 8}, "direction": "Right",
                    "pad_to_multiple_of": null, "pad_id": 0, "pad_type_id": 0,
                    "pad_token": "[PAD]"}"#,
            );
        let tokenizer = HfSentenceTokenizer::from_bytes(json).expect("valid tokenizer json");

        let out = tokenizer.tokenize("the cat", 6).unwrap();
        assert_eq!(out.input_ids, vec![2, 5, 6, 3, 0, 0]);
        assert_eq!(out.attention_mask, vec![1, 1, 1, 1, 0, 0]);

        let out = tokenizer.tokenize("the cat is on", 6).unwrap();
        assert_eq!(out.input_ids, vec![2, 5, 6, 7, 8, 3]);
        assert_eq!(out.attention_mask, vec![1; 6]);
    }

    #[test]
    fn rejects_too_short_max_length() {
        assert!(tokenizer().tokenize("the", 1).is_err());
    }

    #[test]
    fn missing_mask_token_is_an_error() {
        let json = WORD_LEVEL_JSON.replace("\"[MASK]\": 4", "\"[BLANK]\": 4");
        let err = match HfSentenceTokenizer::from_bytes(json) {
            Ok(_) => panic!("tokenizer without a mask token must be rejected"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("mask"));
    }
}
