/*!
 * Prompt templates for the translate → reflect → improve workflow.
 *
 * Every stage has a system message and a user prompt. Whole-text prompts embed
 * the source directly; chunk prompts embed the full text with the current
 * chunk wrapped in `<TRANSLATE_THIS>` markers and repeat the chunk on its own.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// A literal prompt with `{name}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    pub const INITIAL_SYSTEM: &'static str =
        "You are an expert linguist, specializing in translation from {source_language} to {target_language}.";

    pub const REFLECTION_SYSTEM: &'static str = "You are an expert linguist specializing in translation from {source_language} to {target_language}. \
You will be provided with a source text and its translation and your goal is to improve the translation.";

    pub const IMPROVEMENT_SYSTEM: &'static str =
        "You are an expert linguist, specializing in translation editing from {source_language} to {target_language}.";

    pub const COUNTRY_STYLE: &'static str = "The final style and tone of the translation should match the style of {target_language} colloquially spoken in {country}. ";

    pub const ONE_CHUNK_INITIAL: &'static str = r#"This is a {source_language} to {target_language} translation, please provide the {target_language} translation for this text. Do not provide any explanations or text apart from the translation.
{source_language}: {source_text}

{target_language}:"#;

    pub const ONE_CHUNK_REFLECTION_INTRO: &'static str = "Your task is to carefully read a source text and a translation from {source_language} to {target_language}, and then give constructive criticism and helpful suggestions to improve the translation. ";

    pub const ONE_CHUNK_REFLECTION_BODY: &'static str = r#"
The source text and initial translation, delimited by XML tags <SOURCE_TEXT></SOURCE_TEXT> and <TRANSLATION></TRANSLATION>, are as follows:

<SOURCE_TEXT>
{source_text}
</SOURCE_TEXT>

<TRANSLATION>
{translation_1}
</TRANSLATION>

When writing suggestions, pay attention to whether there are ways to improve the translation's:
(i) accuracy (by correcting errors of addition, mistranslation, omission, or untranslated text),
(ii) fluency (by applying {target_language} grammar, spelling and punctuation rules, and ensuring there are no unnecessary repetitions),
(iii) style (by ensuring the translations reflect the style of the source text and takes into account any cultural context),
(iv) terminology (by ensuring terminology use is consistent and reflects the source text domain; and by only ensuring you use equivalent idioms {target_language}).

Write a list of specific, helpful and constructive suggestions for improving the translation.
Each suggestion should address one specific part of the translation.
Output only the suggestions and nothing else."#;

    pub const ONE_CHUNK_IMPROVEMENT: &'static str = r#"Your task is to carefully read, then edit, a translation from {source_language} to {target_language}, taking into
account a list of expert suggestions and constructive criticisms.

The source text, the initial translation, and the expert linguist suggestions are delimited by XML tags <SOURCE_TEXT></SOURCE_TEXT>, <TRANSLATION></TRANSLATION> and <EXPERT_SUGGESTIONS></EXPERT_SUGGESTIONS> as follows:

<SOURCE_TEXT>
{source_text}
</SOURCE_TEXT>

<TRANSLATION>
{translation_1}
</TRANSLATION>

<EXPERT_SUGGESTIONS>
{reflection}
</EXPERT_SUGGESTIONS>

Please take into account the expert suggestions when editing the translation. Edit the translation by ensuring:

(i) accuracy (by correcting errors of addition, mistranslation, omission, or untranslated text),
(ii) fluency (by applying {target_language} grammar, spelling and punctuation rules and ensuring there are no unnecessary repetitions),
(iii) style (by ensuring the translations reflect the style of the source text)
(iv) terminology (inappropriate for context, inconsistent use), or
(v) other errors.

Output only the new translation and nothing else."#;

    pub const MULTI_CHUNK_INITIAL: &'static str = r#"Your task is provide a professional translation from {source_language} to {target_language} of PART of a text.

The source text is below, delimited by XML tags <SOURCE_TEXT> and </SOURCE_TEXT>. Translate only the part within the source text
delimited by <TRANSLATE_THIS> and </TRANSLATE_THIS>. You can use the rest of the source text as context, but do not translate any
of the other text. Do not output anything other than the translation of the indicated part of the text.

<SOURCE_TEXT>
{tagged_text}
</SOURCE_TEXT>

To reiterate, you should translate only this part of the text, shown here again between <TRANSLATE_THIS> and </TRANSLATE_THIS>:
<TRANSLATE_THIS>
{chunk_to_translate}
</TRANSLATE_THIS>

Output only the translation of the portion you are asked to translate, and nothing else."#;

    pub const MULTI_CHUNK_REFLECTION_INTRO: &'static str = "Your task is to carefully read a source text and part of a translation of that text from {source_language} to {target_language}, and then give constructive criticism and helpful suggestions for improving the translation. ";

    pub const MULTI_CHUNK_REFLECTION_BODY: &'static str = r#"
The source text is below, delimited by XML tags <SOURCE_TEXT> and </SOURCE_TEXT>, and the part that has been translated
is delimited by <TRANSLATE_THIS> and </TRANSLATE_THIS> within the source text. You can use the rest of the source text
as context for critiquing the translated part.

<SOURCE_TEXT>
{tagged_text}
</SOURCE_TEXT>

To reiterate, only part of the text is being translated, shown here again between <TRANSLATE_THIS> and </TRANSLATE_THIS>:
<TRANSLATE_THIS>
{chunk_to_translate}
</TRANSLATE_THIS>

The translation of the indicated part, delimited below by <TRANSLATION> and </TRANSLATION>, is as follows:
<TRANSLATION>
{translation_1}
</TRANSLATION>

When writing suggestions, pay attention to whether there are ways to improve the translation's:
(i) accuracy (by correcting errors of addition, mistranslation, omission, or untranslated text),
(ii) fluency (by applying {target_language} grammar, spelling and punctuation rules, and ensuring there are no unnecessary repetitions),
(iii) style (by ensuring the translations reflect the style of the source text and takes into account any cultural context),
(iv) terminology (by ensuring terminology use is consistent and reflects the source text domain; and by only ensuring you use equivalent idioms {target_language}).

Write a list of specific, helpful and constructive suggestions for improving the translation.
Each suggestion should address one specific part of the translation.
Output only the suggestions and nothing else."#;

    pub const MULTI_CHUNK_IMPROVEMENT: &'static str = r#"Your task is to carefully read, then improve, a translation from {source_language} to {target_language}, taking into
account a set of expert suggestions and constructive critisms. Below, the source text, initial translation, and expert suggestions are provided.

The source text is below, delimited by XML tags <SOURCE_TEXT> and </SOURCE_TEXT>, and the part that has been translated
is delimited by <TRANSLATE_THIS> and </TRANSLATE_THIS> within the source text. You can use the rest of the source text
as context, but need to provide a translation only of the part indicated by <TRANSLATE_THIS> and </TRANSLATE_THIS>.

<SOURCE_TEXT>
{tagged_text}
</SOURCE_TEXT>

To reiterate, only part of the text is being translated, shown here again between <TRANSLATE_THIS> and </TRANSLATE_THIS>:
<TRANSLATE_THIS>
{chunk_to_translate}
</TRANSLATE_THIS>

The translation of the indicated part, delimited below by <TRANSLATION> and </TRANSLATION>, is as follows:
<TRANSLATION>
{translation_1}
</TRANSLATION>

The expert translations of the indicated part, delimited below by <EXPERT_SUGGESTIONS> and </EXPERT_SUGGESTIONS>, is as follows:
<EXPERT_SUGGESTIONS>
{reflection}
</EXPERT_SUGGESTIONS>

Taking into account the expert suggestions rewrite the translation to improve it, paying attention
to whether there are ways to improve the translation's

(i) accuracy (by correcting errors of addition, mistranslation, omission, or untranslated text),
(ii) fluency (by applying {target_language} grammar, spelling and punctuation rules and ensuring there are no unnecessary repetitions),
(iii) style (by ensuring the translations reflect the style of the source text)
(iv) terminology (inappropriate for context, inconsistent use), or
(v) other errors.

Output only the new translation of the indicated part and nothing else."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template, replacing each `{name}` with its value.
    ///
    /// Substitution is a single left-to-right pass over the template: inserted
    /// values are never scanned again, so a value that itself contains
    /// `{chunk_to_translate}` is emitted verbatim. Unknown placeholders are
    /// left untouched.
    pub fn render(&self, variables: &[(&str, &str)]) -> String {
        let mut rendered = String::with_capacity(
            self.template.len() + variables.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let value = after.find('}').and_then(|end| {
                let name = &after[..end];
                variables
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, end))
            });

            match value {
                Some((value, end)) => {
                    rendered.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }

        rendered.push_str(rest);
        rendered
    }
}

/// System message and user prompt for one completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePrompt {
    pub system_message: String,
    pub prompt: String,
}

/// Builds the prompts for every stage of a translation.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    country: String,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            country: String::new(),
        }
    }

    /// Ask reflections to match the colloquial style of `country`. Empty means unspecified.
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    fn system(&self, template: &str) -> String {
        PromptTemplate::new(template).render(&[
            ("source_language", &self.source_language),
            ("target_language", &self.target_language),
        ])
    }

    fn reflection_template(&self, intro: &str, body: &str) -> String {
        let mut template = String::from(intro);
        if !self.country.is_empty() {
            template.push_str(PromptTemplate::COUNTRY_STYLE);
        }
        template.push_str(body);
        template
    }

    /// Whole-text initial translation
    pub fn initial_translation(&self, source_text: &str) -> StagePrompt {
        StagePrompt {
            system_message: self.system(PromptTemplate::INITIAL_SYSTEM),
            prompt: PromptTemplate::new(PromptTemplate::ONE_CHUNK_INITIAL).render(&[
                ("source_language", &self.source_language),
                ("target_language", &self.target_language),
                ("source_text", source_text),
            ]),
        }
    }

    /// Whole-text reflection on the initial translation
    pub fn reflection(&self, source_text: &str, translation_1: &str) -> StagePrompt {
        let template = self.reflection_template(
            PromptTemplate::ONE_CHUNK_REFLECTION_INTRO,
            PromptTemplate::ONE_CHUNK_REFLECTION_BODY,
        );
        StagePrompt {
            system_message: self.system(PromptTemplate::REFLECTION_SYSTEM),
            prompt: PromptTemplate::new(&template).render(&[
                ("source_language", &self.source_language),
                ("target_language", &self.target_language),
                ("country", &self.country),
                ("source_text", source_text),
                ("translation_1", translation_1),
            ]),
        }
    }

    /// Whole-text improvement from the reflection
    pub fn improvement(&self, source_text: &str, translation_1: &str, reflection: &str) -> StagePrompt {
        StagePrompt {
            system_message: self.system(PromptTemplate::IMPROVEMENT_SYSTEM),
            prompt: PromptTemplate::new(PromptTemplate::ONE_CHUNK_IMPROVEMENT).render(&[
                ("source_language", &self.source_language),
                ("target_language", &self.target_language),
                ("source_text", source_text),
                ("translation_1", translation_1),
                ("reflection", reflection),
            ]),
        }
    }

    /// Initial translation of one chunk inside its tagged view
    pub fn chunk_initial_translation(&self, tagged_text: &str, chunk: &str) -> StagePrompt {
        StagePrompt {
            system_message: self.system(PromptTemplate::INITIAL_SYSTEM),
            prompt: PromptTemplate::new(PromptTemplate::MULTI_CHUNK_INITIAL).render(&[
                ("source_language", &self.source_language),
                ("target_language", &self.target_language),
                ("tagged_text", tagged_text),
                ("chunk_to_translate", chunk),
            ]),
        }
    }

    /// Reflection on one chunk's initial translation
    pub fn chunk_reflection(&self, tagged_text: &str, chunk: &str, translation_1: &str) -> StagePrompt {
        let template = self.reflection_template(
            PromptTemplate::MULTI_CHUNK_REFLECTION_INTRO,
            PromptTemplate::MULTI_CHUNK_REFLECTION_BODY,
        );
        StagePrompt {
            system_message: self.system(PromptTemplate::REFLECTION_SYSTEM),
            prompt: PromptTemplate::new(&template).render(&[
                ("source_language", &self.source_language),
                ("target_language", &self.target_language),
                ("country", &self.country),
                ("tagged_text", tagged_text),
                ("chunk_to_translate", chunk),
                ("translation_1", translation_1),
            ]),
        }
    }

    /// Improved translation of one chunk
    pub fn chunk_improvement(
        &self,
        tagged_text: &str,
        chunk: &str,
        translation_1: &str,
        reflection: &str,
    ) -> StagePrompt {
        StagePrompt {
            system_message: self.system(PromptTemplate::IMPROVEMENT_SYSTEM),
            prompt: PromptTemplate::new(PromptTemplate::MULTI_CHUNK_IMPROVEMENT).render(&[
                ("source_language", &self.source_language),
                ("target_language", &self.target_language),
                ("tagged_text", tagged_text),
                ("chunk_to_translate", chunk),
                ("translation_1", translation_1),
                ("reflection", reflection),
            ]),
        }
    }
}

static RESERVED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?(SOURCE_TEXT|TRANSLATE_THIS|TRANSLATION|EXPERT_SUGGESTIONS)>")
        .expect("reserved tag pattern is valid")
});

/// Names of the prompt delimiter tags that already occur in `text`, in order
/// of first appearance.
///
/// Such text makes the delimited sections of a prompt ambiguous to the model.
pub fn find_reserved_tags(text: &str) -> Vec<&'static str> {
    let mut found: Vec<&'static str> = Vec::new();
    for captures in RESERVED_TAG.captures_iter(text) {
        let name = match &captures[1] {
            "SOURCE_TEXT" => "SOURCE_TEXT",
            "TRANSLATE_THIS" => "TRANSLATE_THIS",
            "TRANSLATION" => "TRANSLATION",
            _ => "EXPERT_SUGGESTIONS",
        };
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}
