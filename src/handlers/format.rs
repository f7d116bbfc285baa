use once_cell::sync::Lazy;
use regex::Regex;

use crate::handlers::FieldHandler;
use crate::model::{Field, JsonType};
use crate::types::TypeIdentity;

/// Field-name heuristics, first match wins.
static FORMAT_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(^|_)[Ee]?[Mm]ail(_address)?$|[a-z]Email$", "email"),
        (r"(^|_)(url|uri|href|homepage|website)$|[a-z](Url|Uri|Href)$", "uri"),
        (r"(^|_)(created|updated|deleted|published)_at$|(^|_)timestamp$|[a-z]At$", "date-time"),
        (r"(^|_)(date|birthday|birth_date)$|_on$|[a-z]Date$", "date"),
    ]
    .into_iter()
    .filter_map(|(rx, format)| Regex::new(rx).ok().map(|rx| (rx, format)))
    .collect()
});

/// Guesses a string `format` from the field name when none was declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatGuessHandler;

pub fn guess_format(name: &str) -> Option<&'static str> {
    FORMAT_RULES
        .iter()
        .find(|(rx, _)| rx.is_match(name))
        .map(|(_, format)| *format)
}

impl FieldHandler for FormatGuessHandler {
    fn handle(&self, _owner: &TypeIdentity, field: &mut Field) {
        if field.format.is_some() || !field.has_type(JsonType::String) {
            return;
        }
        if let Some(format) = guess_format(&field.name) {
            field.format = Some(format.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_common_names() {
        assert_eq!(guess_format("email"), Some("email"));
        assert_eq!(guess_format("contact_email"), Some("email"));
        assert_eq!(guess_format("homepage"), Some("uri"));
        assert_eq!(guess_format("avatarUrl"), Some("uri"));
        assert_eq!(guess_format("created_at"), Some("date-time"));
        assert_eq!(guess_format("publishedAt"), Some("date-time"));
        assert_eq!(guess_format("birth_date"), Some("date"));
        assert_eq!(guess_format("name"), None);
        assert_eq!(guess_format("curl_flags"), None);
        assert_eq!(guess_format("format"), None);
    }

    #[test]
    fn only_untouched_strings_get_a_format() {
        let owner = TypeIdentity::new("Owner");

        let mut declared = Field::new("email");
        declared.ty = Some(JsonType::String);
        declared.format = Some("idn-email".into());
        FormatGuessHandler.handle(&owner, &mut declared);
        assert_eq!(declared.format.as_deref(), Some("idn-email"));

        let mut number = Field::new("created_at");
        number.ty = Some(JsonType::Integer);
        FormatGuessHandler.handle(&owner, &mut number);
        assert_eq!(number.format, None);

        let mut plain = Field::new("website");
        plain.ty = Some(JsonType::String);
        FormatGuessHandler.handle(&owner, &mut plain);
        FormatGuessHandler.handle(&owner, &mut plain);
        assert_eq!(plain.format.as_deref(), Some("uri"));
    }
}
