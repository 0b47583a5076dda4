use url::form_urlencoded;

use crate::ranking::CommentId;
use crate::target::Target;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("cutoff must be a whole number, got {0:?}")]
    NotANumber(String),
    #[error("cutoff must be at least 1")]
    Zero,
    #[error("highlight must be a comment number, got {0:?}")]
    BadHighlight(String),
}

pub fn parse_cutoff(raw: &str) -> Result<u32, InputError> {
    let trimmed = raw.trim();
    let value: u32 = trimmed
        .parse()
        .map_err(|_| InputError::NotANumber(trimmed.to_string()))?;
    if value == 0 {
        return Err(InputError::Zero);
    }
    Ok(value)
}

pub fn parse_highlight(raw: &str) -> Result<CommentId, InputError> {
    let trimmed = raw.trim().trim_start_matches('#');
    trimmed
        .parse::<CommentId>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| InputError::BadHighlight(trimmed.to_string()))
}

/// View inputs the presentation layer keeps in a shareable query string:
/// `userId=..&postId=..&cutoff=..#<commentId>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewParams {
    pub target: Option<Target>,
    pub cutoff: Option<u32>,
    pub highlight: Option<CommentId>,
}

impl ViewParams {
    /// Lenient: invalid pieces are dropped rather than reported.
    pub fn from_query(raw: &str) -> Self {
        let raw = raw.trim().trim_start_matches('?');
        let (query, fragment) = match raw.split_once('#') {
            Some((query, fragment)) => (query, Some(fragment)),
            None => (raw, None),
        };

        let mut owner = None;
        let mut post = None;
        let mut cutoff = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "userId" => owner = Some(value.into_owned()),
                "postId" => post = Some(value.into_owned()),
                "cutoff" => cutoff = parse_cutoff(&value).ok(),
                _ => {}
            }
        }

        let target = match (owner, post) {
            (Some(owner), Some(post)) => Target::from_query(&owner, &post),
            _ => None,
        };

        Self {
            target,
            cutoff,
            highlight: fragment.and_then(|f| parse_highlight(f).ok()),
        }
    }

    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(target) = &self.target {
            serializer.append_pair("userId", &target.owner_id);
            serializer.append_pair("postId", &target.post_id.to_string());
        }
        if let Some(cutoff) = self.cutoff {
            serializer.append_pair("cutoff", &cutoff.to_string());
        }
        let mut query = serializer.finish();
        if let Some(highlight) = self.highlight {
            query.push('#');
            query.push_str(&highlight.to_string());
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_query() {
        let params =
            ViewParams::from_query("?userId=lilpa0309&postId=185132049&cutoff=30#106993477");
        assert_eq!(params.target, Target::from_query("lilpa0309", "185132049"));
        assert_eq!(params.cutoff, Some(30));
        assert_eq!(params.highlight, Some(106993477));
        assert_eq!(
            params.to_query(),
            "userId=lilpa0309&postId=185132049&cutoff=30#106993477"
        );
    }

    #[test]
    fn drops_invalid_pieces() {
        let params = ViewParams::from_query("userId=abc&postId=x1&cutoff=0#nope");
        assert_eq!(params, ViewParams::default());
        assert_eq!(ViewParams::default().to_query(), "");
    }

    #[test]
    fn cutoff_errors_are_typed() {
        assert_eq!(parse_cutoff(" 4 "), Ok(4));
        assert_eq!(parse_cutoff("0"), Err(InputError::Zero));
        assert_eq!(
            parse_cutoff("four"),
            Err(InputError::NotANumber("four".into()))
        );
        assert_eq!(parse_highlight("#12"), Ok(12));
        assert!(parse_highlight("0").is_err());
    }
}
